//! Layout engine — deterministic per-type banded placement.
//!
//! Each pass assigns a position rectangle to every node from three inputs
//! only: the document structure, the fixed type-priority order, and the
//! persisted override map. No state accumulates between passes, so two
//! passes over the same tree and overrides produce identical rectangles.

use composer_core::{DescriptorTree, NodeKey, PositionOverride, Rect, TypeTag};
use tracing::debug;

use crate::geometry::{snap, Point};

// ── Layout constants ──

/// Grid quantum for user drags.
pub const GRID_QUANTUM: f64 = 15.0;
/// Minimum padding from the canvas edge.
pub const CANVAS_PADDING: f64 = 10.0;
/// Horizontal gap between siblings of one band.
pub const H_GAP: f64 = 30.0;
/// Vertical gap between bands.
pub const V_GAP: f64 = 40.0;
/// Per-ancestor vertical inset within a band.
pub const DEPTH_INSET: f64 = 20.0;

/// Fixed type-priority order. Later bands place themselves below the
/// extent established by earlier ones, so this order must not change.
const BANDS: &[&[TypeTag]] = &[
    &[TypeTag::Nsd],
    &[TypeTag::Vnffgd],
    &[TypeTag::Vnfd, TypeTag::ConstituentVnfd, TypeTag::Pnfd],
    &[TypeTag::Vld],
    &[TypeTag::InternalVld],
    &[TypeTag::Vdu],
];

/// Default shape size per descriptor type.
pub fn node_size(tag: TypeTag) -> (f64, f64) {
    match tag {
        TypeTag::Nsd => (300.0, 50.0),
        TypeTag::Vnffgd => (150.0, 50.0),
        TypeTag::Vnfd | TypeTag::ConstituentVnfd | TypeTag::Pnfd => (150.0, 50.0),
        TypeTag::Vld | TypeTag::InternalVld => (160.0, 38.0),
        TypeTag::Vdu => (120.0, 50.0),
        _ => (90.0, 30.0),
    }
}

/// A pending "drop at point" request from the external drag layer, in
/// screen coordinates.
#[derive(Debug, Clone)]
pub struct DropRequest {
    /// Scoped id of the dropped node (see `DescriptorTree::scoped_id`).
    pub node_id: String,
    pub x: f64,
    pub y: f64,
}

/// Stateless layout pass runner. The only persistent layout state is the
/// override map carried by the tree.
#[derive(Debug, Default)]
pub struct LayoutEngine {
    /// Canvas origin in screen coordinates, for drop conversion.
    pub origin: Point,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self {
            origin: Point::new(0.0, 0.0),
        }
    }

    pub fn with_origin(origin: Point) -> Self {
        Self { origin }
    }

    /// Run one layout pass: assign a rectangle to every node in the forest.
    pub fn layout(&self, tree: &mut DescriptorTree) {
        let keys = tree.walk();
        let mut band_top = CANVAS_PADDING;

        for band in BANDS {
            let mut cursor_left = CANVAS_PADDING;
            let mut band_bottom = band_top;
            let mut placed = 0usize;

            for tag in *band {
                for key in &keys {
                    let Ok(node) = tree.node(*key) else { continue };
                    if node.tag != *tag {
                        continue;
                    }
                    let (width, height) = node_size(*tag);
                    let depth = ancestor_depth(tree, *key);
                    let default_top = band_top + DEPTH_INSET * depth as f64;
                    let default_left = cursor_left;

                    // The band extent follows default placement only, so a
                    // dragged node never reflows other bands.
                    cursor_left += width + H_GAP;
                    band_bottom = band_bottom.max(default_top + height);
                    placed += 1;

                    // Overrides key on scoped ids so equal logical ids in
                    // different documents never share a position.
                    let Ok(id) = tree.scoped_id(*key) else { continue };
                    let rect = match tree.overrides.get(&id) {
                        Some(ov) => Rect::new(ov.top, ov.left, width, height),
                        None => Rect::new(default_top, default_left, width, height),
                    };
                    if let Ok(node) = tree.node_mut(*key) {
                        node.rect = rect;
                    }
                }
            }

            if placed > 0 {
                band_top = band_bottom + V_GAP;
            }
        }
        debug!(nodes = keys.len(), "layout pass complete");
    }

    /// Record a drop request as an override immediately, so the next pass
    /// (and every pass after) is stable. Screen coordinates are converted
    /// to canvas coordinates and clamped to non-negative bounds.
    pub fn drop_at(&self, tree: &mut DescriptorTree, request: &DropRequest) {
        let left = (request.x - self.origin.x).max(0.0);
        let top = (request.y - self.origin.y).max(0.0);
        tree.overrides
            .insert(request.node_id.clone(), PositionOverride { top, left });
    }

    /// Record a user drag for the node with the given scoped id: snapped to
    /// the grid quantum and clamped to the minimum canvas padding.
    pub fn drag_to(&self, tree: &mut DescriptorTree, node_id: &str, x: f64, y: f64) {
        let left = snap(x, GRID_QUANTUM).max(CANVAS_PADDING);
        let top = snap(y, GRID_QUANTUM).max(CANVAS_PADDING);
        tree.overrides
            .insert(node_id.to_string(), PositionOverride { top, left });
    }
}

fn ancestor_depth(tree: &DescriptorTree, key: NodeKey) -> usize {
    let mut depth = 0;
    let mut current = key;
    while let Ok(node) = tree.node(current) {
        match node.parent() {
            Some(parent) => {
                depth += 1;
                current = parent;
            }
            None => break,
        }
    }
    depth
}
