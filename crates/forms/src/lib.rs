//! Schema-driven form widget tree with remote-controller synchronization.
//!
//! The engine turns a JSON-Schema-like type description into an editable
//! tree of UI nodes, keeps each node's value synchronized with a remote
//! value store over a small RPC surface, and lets the store evolve in shape
//! at runtime (array growth, dynamically-named object members).
//!
//! The tree is a headless node registry: nodes are addressed by path, carry
//! their own display text and error state, and never touch a rendering
//! surface, so the whole engine is testable in-process. Concrete transports
//! (a native bridge, an HTTP/JSON channel) live outside this crate behind
//! the [`Transport`] trait; [`store::MemoryTransport`] is the in-process
//! reference implementation.

pub mod coerce;
pub mod error;
pub mod factory;
pub mod mutation;
pub mod session;
pub mod store;
pub mod sync;
pub mod transport;
pub mod tree;

pub use coerce::{coerce, display, CoerceError, RawInput};
pub use error::FormError;
pub use factory::{WidgetFactory, WidgetRegistry};
pub use mutation::MutationProtocol;
pub use session::FormSession;
pub use store::MemoryTransport;
pub use transport::{Transport, TransportError};
pub use tree::{Control, FormTree, NodeId, NodeRole, UiNode};

pub use soma_forms_schema::{PathType, ResolvedType};
