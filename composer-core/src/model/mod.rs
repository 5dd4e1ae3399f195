//! Typed descriptor node hierarchy over the raw document.

mod cascade;
mod node;
mod tag;
mod tree;

pub use node::{Node, NodeKey, PositionOverride, Rect, ViewState};
pub use tag::TypeTag;
pub use tree::DescriptorTree;
