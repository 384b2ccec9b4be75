//! Schema node model and type resolution.
//!
//! A schema node is a JSON object carrying a `type` tag plus the optional
//! `enum`, `items`, `properties`, `$ref`, `allOf` fields and a vendor
//! metadata block. [`resolve`] eliminates `$ref` and `allOf` from one node,
//! yielding a self-contained [`ResolvedType`] descriptor; children under
//! `items`/`properties` are resolved lazily by the consumer as it recurses.

pub mod metadata;
pub mod resolve;
pub mod resolved;

pub use metadata::{Metadata, PathType, VENDOR_KEY};
pub use resolve::{resolve, SchemaReferenceError};
pub use resolved::{default_value, ResolvedType};

/// Type tags recognized by the standard widget set.
pub mod tag {
    pub const STRING: &str = "string";
    pub const INTEGER: &str = "integer";
    pub const NUMBER: &str = "number";
    pub const BOOLEAN: &str = "boolean";
    pub const ENUM: &str = "enum";
    pub const ARRAY: &str = "array";
    pub const OBJECT: &str = "object";
    pub const FILE: &str = "file";
    pub const DIRECTORY: &str = "directory";
}
