//! Form-tree addressing.
//!
//! A position in the value tree is a sequence of string segments (property
//! names or array indices), serialized as segments joined by `/`. The root
//! is the empty sequence, serialized as the empty string. No normalization
//! is performed: an index is an opaque segment like any property name.

use serde_json::Value;
use thiserror::Error;

/// A path into the value tree: property names and array indices as strings.
pub type Path = Vec<String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path contains an empty segment: {0:?}")]
    EmptySegment(String),
}

/// Escapes one path segment for serialization.
///
/// `~` becomes `~0` and `/` becomes `~1`, so distinct (parent, key) pairs
/// never alias in serialized form.
pub fn escape_segment(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// Unescapes one serialized path segment.
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace("~1", "/").replace("~0", "~")
}

/// Serialize path segments by joining them with `/`.
///
/// The root path (no segments) serializes as `""`.
pub fn format_path(path: &[String]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&escape_segment(segment));
    }
    out
}

/// Parse a serialized path back into unescaped segments.
///
/// Examples:
/// - `"" -> []`
/// - `"a/0/b" -> ["a", "0", "b"]`
/// - `"a~1b" -> ["a/b"]`
pub fn parse_path(serialized: &str) -> Result<Path, PathError> {
    if serialized.is_empty() {
        return Ok(Vec::new());
    }
    let mut path = Vec::new();
    for segment in serialized.split('/') {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(serialized.to_string()));
        }
        path.push(unescape_segment(segment));
    }
    Ok(path)
}

/// Extend a parent path with one child key.
pub fn child_path(parent: &[String], key: &str) -> Path {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.extend_from_slice(parent);
    path.push(key.to_string());
    path
}

/// Decompose a path into (parent, last key). Returns `None` for the root.
pub fn split_last(path: &[String]) -> Option<(&[String], &str)> {
    let (last, parent) = path.split_last()?;
    Some((parent, last.as_str()))
}

/// Walk a JSON value tree along a path.
///
/// Objects are entered by member name, arrays by numeric segment. Returns
/// `None` as soon as a segment does not lead anywhere.
pub fn find<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`find`].
pub fn find_mut<'a>(value: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_and_parse_matrix() {
        assert_eq!(parse_path("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_path("a/0/b").unwrap(), vec!["a", "0", "b"]);
        assert_eq!(parse_path("a~1b/~0k").unwrap(), vec!["a/b", "~k"]);
        assert_eq!(
            format_path(&["a/b".to_string(), "~k".to_string()]),
            "a~1b/~0k"
        );
        assert_eq!(format_path(&[]), "");
        assert!(matches!(
            parse_path("a//b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(parse_path("/a"), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn round_trip_is_identity() {
        for case in [
            vec![],
            vec!["n".to_string()],
            vec!["lo".to_string(), "1".to_string(), "s".to_string()],
            vec!["odd/key".to_string(), "t~ilde".to_string()],
        ] {
            assert_eq!(parse_path(&format_path(&case)).unwrap(), case);
        }
    }

    #[test]
    fn child_path_decomposes_back() {
        let parent = vec!["a".to_string(), "b".to_string()];
        let child = child_path(&parent, "c");
        let (p, k) = split_last(&child).unwrap();
        assert_eq!(p, parent.as_slice());
        assert_eq!(k, "c");
        assert!(split_last(&[]).is_none());
    }

    #[test]
    fn addressing_is_injective() {
        // Distinct (parent, key) pairs must never serialize identically.
        let a = format_path(&child_path(&["a".to_string()], "b/c"));
        let b = format_path(&child_path(&["a".to_string(), "b".to_string()], "c"));
        assert_ne!(a, b);
    }

    #[test]
    fn find_walks_objects_and_arrays() {
        let value = json!({"lo": [{"s": "x"}, {"s": "y"}], "n": 5});
        assert_eq!(
            find(&value, &["lo".into(), "1".into(), "s".into()]),
            Some(&json!("y"))
        );
        assert_eq!(find(&value, &["n".into()]), Some(&json!(5)));
        assert_eq!(find(&value, &[]), Some(&value));
        assert_eq!(find(&value, &["lo".into(), "2".into()]), None);
        assert_eq!(find(&value, &["missing".into()]), None);
        assert_eq!(find(&value, &["n".into(), "deep".into()]), None);
    }

    #[test]
    fn find_mut_writes_in_place() {
        let mut value = json!({"li": [1, 2, 3]});
        *find_mut(&mut value, &["li".into(), "0".into()]).unwrap() = json!(9);
        assert_eq!(value, json!({"li": [9, 2, 3]}));
    }
}
