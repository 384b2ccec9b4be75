//! Raw-input coercion.
//!
//! Controls hand the engine raw textual or boolean input; [`coerce`] turns
//! it into the JSON value the remote store expects for the node's
//! controller type, and [`display`] renders the inverse for seeding and
//! refreshing controls. String arrays split on line breaks; numeric arrays
//! split on whitespace and parse element-wise. Parse failures never reach
//! the transport.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const INTEGER_TOKEN: &str = r"^-?\d+$";
const NUMBER_TOKEN: &str = r"^[-+]?(?:\d+\.?|\.\d)\d*(?:[Ee][-+]?\d+)?$";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoerceError {
    #[error("not a valid integer: {0:?}")]
    InvalidInteger(String),
    #[error("not a valid number: {0:?}")]
    InvalidNumber(String),
    #[error("expected a toggle input")]
    ExpectedFlag,
    #[error("expected a text input")]
    ExpectedText,
    #[error("no coercion for controller type {0:?}")]
    UnknownControllerType(String),
}

/// Raw input as a control reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Flag(bool),
}

impl RawInput {
    fn text(&self) -> Result<&str, CoerceError> {
        match self {
            RawInput::Text(text) => Ok(text),
            RawInput::Flag(_) => Err(CoerceError::ExpectedText),
        }
    }
}

/// Parse an integer token. The whole token must match; partial prefixes
/// such as `"3a"` are rejected.
pub fn to_int(token: &str) -> Result<i64, CoerceError> {
    let valid = Regex::new(INTEGER_TOKEN)
        .map(|re| re.is_match(token))
        .unwrap_or(false);
    if !valid {
        return Err(CoerceError::InvalidInteger(token.to_string()));
    }
    token
        .parse::<i64>()
        .map_err(|_| CoerceError::InvalidInteger(token.to_string()))
}

/// Parse a floating-point token (optional sign, decimal point, exponent).
pub fn to_float(token: &str) -> Result<f64, CoerceError> {
    let valid = Regex::new(NUMBER_TOKEN)
        .map(|re| re.is_match(token))
        .unwrap_or(false);
    if !valid {
        return Err(CoerceError::InvalidNumber(token.to_string()));
    }
    token
        .parse::<f64>()
        .map_err(|_| CoerceError::InvalidNumber(token.to_string()))
}

fn split_lines(text: &str) -> Vec<String> {
    // Line-break split: "\r\n", "\r", or "\n". A split always yields at
    // least one element, so an empty control submits [""].
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

/// Coerce raw control input into the value shape for `controller_type`.
pub fn coerce(controller_type: &str, raw: &RawInput) -> Result<Value, CoerceError> {
    match controller_type {
        "string" | "enum" | "file" | "directory" => Ok(Value::String(raw.text()?.to_string())),
        "integer" => Ok(Value::from(to_int(raw.text()?.trim())?)),
        "number" => Ok(Value::from(to_float(raw.text()?.trim())?)),
        "boolean" => match raw {
            RawInput::Flag(flag) => Ok(Value::Bool(*flag)),
            RawInput::Text(_) => Err(CoerceError::ExpectedFlag),
        },
        "list_string" => Ok(Value::Array(
            split_lines(raw.text()?)
                .into_iter()
                .map(Value::String)
                .collect(),
        )),
        "list_integer" => raw
            .text()?
            .trim()
            .split_whitespace()
            .map(|token| to_int(token).map(Value::from))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "list_number" => raw
            .text()?
            .trim()
            .split_whitespace()
            .map(|token| to_float(token).map(Value::from))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(CoerceError::UnknownControllerType(other.to_string())),
    }
}

/// Render a stored value as control display text for `controller_type`.
///
/// Values that do not match the expected shape render as the empty string
/// rather than failing.
pub fn display(controller_type: &str, value: &Value) -> String {
    match controller_type {
        "string" | "enum" | "file" | "directory" => {
            value.as_str().map(str::to_string).unwrap_or_default()
        }
        "integer" | "number" => match value {
            Value::Number(number) => number.to_string(),
            _ => String::new(),
        },
        "boolean" => match value.as_bool() {
            Some(true) => "true".to_string(),
            _ => "false".to_string(),
        },
        "list_string" | "list_integer" | "list_number" => match value.as_array() {
            Some(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        },
        _ => String::new(),
    }
}
