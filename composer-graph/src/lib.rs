//! Canvas geometry for descriptor editing: deterministic banded layout
//! plus connection routing (endpoint mounts and path splines).
//!
//! Both engines are stateless per pass. The only persisted geometry is the
//! position override map carried by the descriptor tree itself, which the
//! core crate folds into the document's `meta` field on serialization.

pub mod geometry;
pub mod layout;
pub mod route;

pub use geometry::{angle_deg, snap, Point};
pub use layout::{DropRequest, LayoutEngine};
pub use route::{ConnectionRouter, EdgeZone, Mount, MountSide, RoutedEdge, RouterOutput};
