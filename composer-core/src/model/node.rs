//! Node and geometry primitives for the descriptor arena.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TypeTag;

/// Handle into the descriptor arena. Non-owning; parent links and
/// cross-component references use this instead of a second owning pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey(pub(crate) usize);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Canvas position rectangle. Top/left anchored, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// A persisted position override: user-placed top/left for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionOverride {
    pub top: f64,
    pub left: f64,
}

/// Transient per-node view state. Never serialized; the whitelisted subset
/// that survives (the override map) lives on the tree, keyed by node id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewState {
    pub selected: bool,
    pub dragging: bool,
}

/// One element of the document tree: a typed wrapper around a fragment of
/// the raw document, plus canvas geometry and transient view state.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub tag: TypeTag,
    /// Logical identity, stable across re-parses of the same fragment.
    pub id: String,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    /// Cached copy of the backing fragment. The root fragment is the source
    /// of truth; mutations write through to it (see `DescriptorTree`).
    pub fragment: Value,
    pub rect: Rect,
    pub view: ViewState,
}

impl Node {
    pub(crate) fn new(key: NodeKey, tag: TypeTag, id: String, fragment: Value) -> Self {
        Self {
            key,
            tag,
            id,
            parent: None,
            children: Vec::new(),
            fragment,
            rect: Rect::default(),
            view: ViewState::default(),
        }
    }

    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Display title: `name`, falling back to `short-name`, then the id.
    pub fn title(&self) -> String {
        for field in ["name", "short-name"] {
            if let Some(s) = self.fragment.get(field).and_then(Value::as_str) {
                if !s.trim().is_empty() {
                    return s.to_string();
                }
            }
        }
        self.id.clone()
    }
}
