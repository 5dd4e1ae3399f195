//! Descriptor object model for network-service topology editing.
//!
//! A typed, identity-preserving object graph built over a semi-structured
//! JSON document: schema metadata drives structure and serialization, the
//! reconciler maps raw fragments onto stable typed nodes, and mutations
//! write through to the document with cascading cross-reference cleanup.
//!
//! Geometry (layout and connection routing) lives in `composer-graph`.

pub mod error;
pub mod model;
pub mod schema;
pub mod serialize;

pub use error::{ComposerError, Result};
pub use model::{DescriptorTree, Node, NodeKey, PositionOverride, Rect, TypeTag, ViewState};
pub use serialize::serialize;
