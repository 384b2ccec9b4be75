//! Remote-controller call contract.
//!
//! The engine consumes this surface and nothing else from the outside
//! world. Calls are return-or-fail: each one either completes with a value
//! or fails with the uniform [`TransportError`] envelope, which the sync
//! engine and the mutation protocol use to decide rollback. One call per
//! logical mutation; no batching. Timeout policy belongs to the transport
//! implementation.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The call completed but the store declined the value or operation.
    #[error("remote rejected {path:?}: {message}")]
    Rejected { path: String, message: String },
    /// The call could not complete.
    #[error("transport failure: {0}")]
    Failure(String),
}

/// The remote, authoritative owner of the value tree this UI mirrors.
pub trait Transport {
    /// Fetch a schema document. `None` names the store's default schema.
    fn get_schema(&mut self, name: Option<&str>) -> Result<Value, TransportError>;

    /// Fetch the value at a path; the empty path denotes the tree root.
    fn get_value(&mut self, path: &[String]) -> Result<Value, TransportError>;

    /// Store a value at a path. Returns the value as stored.
    fn set_value(&mut self, path: &[String], value: Value) -> Result<Value, TransportError>;

    /// Allocate the next element of the array at `path`. `None` denotes
    /// rejection without an error.
    fn new_list_item(&mut self, path: &[String]) -> Result<Option<usize>, TransportError>;

    /// Register a new named member on the open-membership object at
    /// `path`. The returned key may differ from the candidate when the
    /// store deduplicates or normalizes names; `None` denotes rejection.
    fn new_named_item(
        &mut self,
        path: &[String],
        candidate: &str,
    ) -> Result<Option<String>, TransportError>;

    /// Remove the value at `path`. `true` means it was removed.
    fn remove_item(&mut self, path: &[String]) -> Result<bool, TransportError>;

    /// Fetch the resolved schema fragment describing the value at `path`.
    fn get_type(&mut self, path: &[String]) -> Result<Value, TransportError>;

    /// Open a native file picker, if the transport has one.
    fn file_selector(&mut self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    /// Open a native directory picker, if the transport has one.
    fn directory_selector(&mut self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }
}
