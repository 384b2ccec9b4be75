//! Unified error type for engine operations.

use thiserror::Error;

use crate::coerce::CoerceError;
use crate::transport::TransportError;
use crate::tree::TreeError;
use soma_forms_path::PathError;
use soma_forms_schema::SchemaReferenceError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormError {
    #[error(transparent)]
    Coerce(#[from] CoerceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Schema(#[from] SchemaReferenceError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("no live node at path {0:?}")]
    UnknownPath(String),
    #[error("operation needs a {expected} container at {path:?}")]
    NotAContainer { path: String, expected: &'static str },
}
