//! The descriptor arena: typed nodes over a raw JSON document, with
//! identity-preserving reconciliation and write-through mutations.
//!
//! Root fragments are the source of truth. Every node caches a copy of its
//! backing fragment; structural accessors re-wrap the backing arrays through
//! [`DescriptorTree::reconcile`] on each access so node identity (and with
//! it selection state and position overrides) survives re-parses. Mutations
//! write through to the root fragment before anything else observes them.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use super::cascade::{self, RemovedNode};
use super::node::{Node, NodeKey, PositionOverride};
use super::TypeTag;
use crate::error::{ComposerError, Result};
use crate::schema;

/// A forest of descriptor documents sharing one arena: typically one NSD
/// plus the VNFD/PNFD catalogs it references.
#[derive(Debug, Default)]
pub struct DescriptorTree {
    slots: Vec<Option<Node>>,
    roots: Vec<NodeKey>,
    /// User-placed positions, keyed by scoped node id (see
    /// [`DescriptorTree::scoped_id`]). Persisted through the root `meta`
    /// field; everything else in view-state is transient.
    pub overrides: BTreeMap<String, PositionOverride>,
}

impl DescriptorTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one aggregate document (nsd, vnfd, or pnfd). Re-ingesting a
    /// document with the same id updates the existing root in place.
    pub fn add_document(&mut self, tag: TypeTag, doc: Value) -> Result<NodeKey> {
        if !tag.is_root() {
            return Err(ComposerError::InvalidFragment(format!(
                "{tag:?} is not an aggregate root"
            )));
        }
        self.load_meta(&doc);
        let key = self.reconcile(None, tag, doc)?;
        self.refresh(key)?;
        Ok(key)
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn node(&self, key: NodeKey) -> Result<&Node> {
        self.slots
            .get(key.0)
            .and_then(|s| s.as_ref())
            .ok_or(ComposerError::NodeNotFound)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node> {
        self.slots
            .get_mut(key.0)
            .and_then(|s| s.as_mut())
            .ok_or(ComposerError::NodeNotFound)
    }

    /// Globally unique id for a node: the bare id for aggregate roots,
    /// otherwise the logical id qualified by the owning root
    /// (`"{root-id}/{id}"`). Logical ids are only unique within their
    /// aggregate (two vnfds can each own a cp named `eth0`), so anything
    /// keyed across documents — the override map, `meta` folding, lookup —
    /// uses this form.
    pub fn scoped_id(&self, key: NodeKey) -> Result<String> {
        let root = self.root_of(key)?;
        if root == key {
            return Ok(self.node(key)?.id.clone());
        }
        let root_id = &self.node(root)?.id;
        Ok(format!("{root_id}/{}", self.node(key)?.id))
    }

    /// First live node whose scoped id matches, in document order.
    pub fn find_by_id(&self, id: &str) -> Option<NodeKey> {
        self.walk().into_iter().find(|k| {
            self.scoped_id(*k)
                .map(|s| s == id)
                .unwrap_or(false)
        })
    }

    /// Pre-order walk over all live nodes of the forest.
    pub fn walk(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.walk_into(*root, &mut out);
        }
        out
    }

    fn walk_into(&self, key: NodeKey, out: &mut Vec<NodeKey>) {
        if let Ok(node) = self.node(key) {
            out.push(key);
            for child in node.children.clone() {
                self.walk_into(child, out);
            }
        }
    }

    /// Walk parent links to the aggregate root owning `key`.
    pub fn root_of(&self, key: NodeKey) -> Result<NodeKey> {
        let mut current = key;
        loop {
            let node = self.node(current)?;
            match node.parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
    }

    // ── Identity reconciliation ──

    /// Map a raw fragment onto a possibly pre-existing typed node.
    ///
    /// If the scope (children of `parent`, or the root list) already holds a
    /// node with the fragment's identity and tag, its backing fragment is
    /// swapped in place and the same key is returned. Otherwise a new node
    /// is constructed and registered. Idempotent per (identity, scope).
    pub fn reconcile(
        &mut self,
        parent: Option<NodeKey>,
        tag: TypeTag,
        mut fragment: Value,
    ) -> Result<NodeKey> {
        let id = match tag.logical_id(&fragment) {
            Some(id) => id,
            None => {
                let generated = Uuid::new_v4().to_string();
                if let (Some(field), Some(obj)) = (tag.key_field(), fragment.as_object_mut()) {
                    obj.insert(field.to_string(), Value::String(generated.clone()));
                }
                generated
            }
        };

        let scope: Vec<NodeKey> = match parent {
            Some(p) => self.node(p)?.children.clone(),
            None => self.roots.clone(),
        };
        for key in scope {
            let node = self.node(key)?;
            if node.tag == tag && node.id == id {
                trace!(?tag, id, "reconcile reuse");
                self.node_mut(key)?.fragment = fragment;
                return Ok(key);
            }
        }

        let key = NodeKey(self.slots.len());
        let mut node = Node::new(key, tag, id.clone(), fragment);
        node.parent = parent;
        self.slots.push(Some(node));
        match parent {
            Some(p) => self.node_mut(p)?.children.push(key),
            None => self.roots.push(key),
        }
        trace!(?tag, id, "reconcile create");
        Ok(key)
    }

    // ── Structural accessors ──

    /// Typed children of `parent` for one child tag, wrapped from the
    /// backing array on this access. An absent array materializes as an
    /// empty ordered list. Children whose identity vanished from the array
    /// are pruned from the arena.
    pub fn children(&mut self, parent: NodeKey, tag: TypeTag) -> Result<Vec<NodeKey>> {
        let parent_tag = self.node(parent)?.tag;
        let Some(field) = parent_tag.list_field_for(tag) else {
            return Ok(Vec::new());
        };
        // Schema miss tolerance: a type with no metadata has no structure.
        if schema::lookup(parent_tag.schema_path()).is_none() {
            return Ok(Vec::new());
        }

        let items: Vec<Value> = self
            .node(parent)?
            .fragment
            .get(field)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut keys = Vec::with_capacity(items.len());
        for item in items {
            keys.push(self.reconcile(Some(parent), tag, item)?);
        }

        // Prune children of this tag that no longer exist in the document.
        let current = self.node(parent)?.children.clone();
        for key in current {
            let stale = self
                .node(key)
                .map(|n| n.tag == tag && !keys.contains(&key))
                .unwrap_or(false);
            if stale {
                self.free_subtree(key);
            }
        }

        // Rebuild ordering: other-tag children keep their relative order,
        // this tag's children take document order.
        let current = self.node(parent)?.children.clone();
        let mut rebuilt: Vec<NodeKey> = current
            .into_iter()
            .filter(|k| self.node(*k).map(|n| n.tag != tag).unwrap_or(false))
            .collect();
        rebuilt.extend(keys.iter().copied());
        self.node_mut(parent)?.children = rebuilt;

        Ok(keys)
    }

    /// Children already materialized in the arena, without re-wrapping.
    pub fn children_of(&self, parent: NodeKey, tag: TypeTag) -> Vec<NodeKey> {
        self.node(parent)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|k| self.node(*k).map(|c| c.tag == tag).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Materialize the full subtree under `key` through the reconciler.
    pub fn refresh(&mut self, key: NodeKey) -> Result<()> {
        let tag = self.node(key)?.tag;
        for (_, child_tag) in tag.child_fields() {
            for child in self.children(key, *child_tag)? {
                self.refresh(child)?;
            }
        }
        Ok(())
    }

    /// Materialize every aggregate in the forest.
    pub fn refresh_all(&mut self) -> Result<()> {
        for root in self.roots.clone() {
            self.refresh(root)?;
        }
        Ok(())
    }

    // ── Mutations ──

    /// Create a child under `parent`. Without a model fragment, a default is
    /// synthesized from schema metadata (fresh uuid ids, sequential unique
    /// names, next member index). Rejected before any mutation if the
    /// identity already exists under this parent.
    pub fn create_child(
        &mut self,
        parent: NodeKey,
        tag: TypeTag,
        model: Option<Value>,
    ) -> Result<NodeKey> {
        let parent_tag = self.node(parent)?.tag;
        let field = parent_tag.list_field_for(tag).ok_or_else(|| {
            ComposerError::InvalidFragment(format!("{parent_tag:?} does not own {tag:?}"))
        })?;

        let fragment = match model {
            Some(f) => f,
            None => self.scaffold(parent, tag)?,
        };
        let id = tag
            .logical_id(&fragment)
            .ok_or_else(|| ComposerError::InvalidFragment("fragment has no identity".into()))?;

        let duplicate = self.node(parent)?.children.iter().any(|k| {
            self.node(*k)
                .map(|n| n.tag == tag && n.id == id)
                .unwrap_or(false)
        });
        if duplicate {
            return Err(ComposerError::DuplicateChild {
                parent: parent_tag,
                id,
            });
        }

        {
            let node = self.node_mut(parent)?;
            let list = node
                .fragment
                .as_object_mut()
                .ok_or_else(|| ComposerError::InvalidFragment("parent is not an object".into()))?
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            list.as_array_mut()
                .ok_or_else(|| {
                    ComposerError::InvalidFragment(format!("field '{field}' is not a list"))
                })?
                .push(fragment.clone());
        }
        self.write_back(parent)?;

        debug!(?tag, id, "create child");
        self.reconcile(Some(parent), tag, fragment)
    }

    /// Attach an existing unowned node under `parent`. A node that already
    /// has an owner is rejected; ownership never becomes shared.
    pub fn attach(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let (tag, id, fragment) = {
            let node = self.node(child)?;
            if node.parent.is_some() {
                return Err(ComposerError::AlreadyOwned {
                    id: node.id.clone(),
                });
            }
            (node.tag, node.id.clone(), node.fragment.clone())
        };
        let parent_tag = self.node(parent)?.tag;
        let field = parent_tag.list_field_for(tag).ok_or_else(|| {
            ComposerError::InvalidFragment(format!("{parent_tag:?} does not own {tag:?}"))
        })?;
        let duplicate = self.node(parent)?.children.iter().any(|k| {
            self.node(*k)
                .map(|n| n.tag == tag && n.id == id)
                .unwrap_or(false)
        });
        if duplicate {
            return Err(ComposerError::DuplicateChild {
                parent: parent_tag,
                id,
            });
        }

        {
            let node = self.node_mut(parent)?;
            let list = node
                .fragment
                .as_object_mut()
                .ok_or_else(|| ComposerError::InvalidFragment("parent is not an object".into()))?
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            list.as_array_mut()
                .ok_or_else(|| {
                    ComposerError::InvalidFragment(format!("field '{field}' is not a list"))
                })?
                .push(fragment);
        }
        self.write_back(parent)?;
        self.roots.retain(|k| *k != child);
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Remove `child` from `parent`, then cascade-clean every cross
    /// reference in the whole forest that names the removed node.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let (tag, id, fragment) = {
            let node = self.node(child)?;
            if node.parent != Some(parent) {
                return Err(ComposerError::NodeNotFound);
            }
            (node.tag, node.id.clone(), node.fragment.clone())
        };
        let parent_tag = self.node(parent)?.tag;
        let field = parent_tag.list_field_for(tag).ok_or_else(|| {
            ComposerError::InvalidFragment(format!("{parent_tag:?} does not own {tag:?}"))
        })?;
        let root = self.root_of(child)?;
        let root_id = self.node(root)?.id.clone();

        // Detach from the backing array first, then from the arena.
        {
            let node = self.node_mut(parent)?;
            if let Some(list) = node.fragment.get_mut(field).and_then(Value::as_array_mut) {
                list.retain(|item| tag.logical_id(item).as_deref() != Some(id.as_str()));
            }
        }
        self.write_back(parent)?;
        self.node_mut(parent)?.children.retain(|k| *k != child);
        self.free_subtree(child);

        let removed = RemovedNode {
            tag,
            id: id.clone(),
            root_id,
            fragment,
        };
        cascade::sweep(self, &removed)?;
        self.refresh_all()?;
        debug!(?tag, id, "removed child with cascade");
        Ok(())
    }

    /// Write-through property setter: updates the cached fragment and
    /// propagates the change up to the root fragment.
    pub fn set_leaf(&mut self, key: NodeKey, field: &str, value: Value) -> Result<()> {
        let old_id = self.node(key)?.id.clone();
        {
            let node = self.node_mut(key)?;
            let obj = node
                .fragment
                .as_object_mut()
                .ok_or_else(|| ComposerError::InvalidFragment("fragment is not an object".into()))?;
            if value.is_null() {
                obj.remove(field);
            } else {
                obj.insert(field.to_string(), value);
            }
            if let Some(new_id) = node.tag.logical_id(&node.fragment) {
                node.id = new_id;
            }
        }
        self.write_back_as(key, &old_id)
    }

    // ── Connections ──

    /// Compatibility check for a prospective connection. Sibling endpoints
    /// of the same parent and cp/internal-cp pairings are never connectable.
    pub fn can_connect(&self, a: NodeKey, b: NodeKey) -> bool {
        let (Ok(na), Ok(nb)) = (self.node(a), self.node(b)) else {
            return false;
        };
        match (na.tag, nb.tag) {
            (TypeTag::ConnectionPoint, TypeTag::ConnectionPoint) => na.parent != nb.parent,
            (TypeTag::ConnectionPoint, TypeTag::Vld) | (TypeTag::Vld, TypeTag::ConnectionPoint) => {
                let (cp, vld) = if na.tag == TypeTag::ConnectionPoint {
                    (a, b)
                } else {
                    (b, a)
                };
                self.member_index_for(cp, vld).is_some()
            }
            (TypeTag::InternalConnectionPoint, TypeTag::InternalConnectionPoint) => {
                na.parent != nb.parent
                    && self.root_of(a).ok() == self.root_of(b).ok()
            }
            (TypeTag::InternalConnectionPoint, TypeTag::InternalVld)
            | (TypeTag::InternalVld, TypeTag::InternalConnectionPoint) => {
                self.root_of(a).ok() == self.root_of(b).ok()
            }
            _ => false,
        }
    }

    /// Wire `endpoint` to `target`, creating the reference entry that the
    /// canonical document carries. Refused with no partial edge when the
    /// pairing is incompatible.
    pub fn connect(&mut self, endpoint: NodeKey, target: NodeKey) -> Result<NodeKey> {
        if !self.can_connect(endpoint, target) {
            let from = self.node(endpoint)?.tag;
            let to = self.node(target)?.tag;
            return Err(ComposerError::IncompatibleConnection { from, to });
        }
        let endpoint_tag = self.node(endpoint)?.tag;
        let target_tag = self.node(target)?.tag;
        match (endpoint_tag, target_tag) {
            (TypeTag::ConnectionPoint, TypeTag::Vld) => {
                let (member_index, vnfd_id) = self
                    .member_index_for(endpoint, target)
                    .ok_or(ComposerError::IncompatibleConnection {
                        from: endpoint_tag,
                        to: target_tag,
                    })?;
                let cp_name = self.node(endpoint)?.id.clone();
                self.create_child(
                    target,
                    TypeTag::VldConnectionPointRef,
                    Some(json!({
                        "member-vnf-index-ref": member_index,
                        "vnfd-id-ref": vnfd_id,
                        "vnfd-connection-point-ref": cp_name,
                    })),
                )
            }
            (TypeTag::InternalConnectionPoint, TypeTag::InternalVld) => {
                let icp_id = self.node(endpoint)?.id.clone();
                {
                    let node = self.node_mut(target)?;
                    let obj = node.fragment.as_object_mut().ok_or_else(|| {
                        ComposerError::InvalidFragment("internal-vld is not an object".into())
                    })?;
                    let refs = obj
                        .entry("internal-connection-point-ref".to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Some(list) = refs.as_array_mut() {
                        if !list.iter().any(|v| v.as_str() == Some(icp_id.as_str())) {
                            list.push(Value::String(icp_id));
                        }
                    }
                }
                self.write_back(target)?;
                Ok(target)
            }
            (from, to) => Err(ComposerError::IncompatibleConnection { from, to }),
        }
    }

    /// Resolve the (member-vnf-index, vnfd-id) of the constituent entry the
    /// endpoint's owning vnfd participates in, within the vld's nsd.
    fn member_index_for(&self, cp: NodeKey, vld: NodeKey) -> Option<(Value, String)> {
        let vnfd_root = self.root_of(cp).ok()?;
        let vnfd = self.node(vnfd_root).ok()?;
        if vnfd.tag != TypeTag::Vnfd {
            return None;
        }
        let nsd_root = self.root_of(vld).ok()?;
        let nsd = self.node(nsd_root).ok()?;
        let constituents = nsd.fragment.get("constituent-vnfd")?.as_array()?;
        constituents
            .iter()
            .find(|c| c.get("vnfd-id-ref").and_then(Value::as_str) == Some(vnfd.id.as_str()))
            .and_then(|c| c.get("member-vnf-index").cloned())
            .map(|idx| (idx, vnfd.id.clone()))
    }

    // ── Internals ──

    /// Synthesize a schema-default fragment for a fresh child of `parent`.
    fn scaffold(&self, parent: NodeKey, tag: TypeTag) -> Result<Value> {
        let siblings = self.children_of(parent, tag);
        let mut obj = Map::new();
        for field in schema::fields_for(tag.schema_path()) {
            if !field.required {
                continue;
            }
            match field.name {
                "id" => {
                    obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
                }
                "name" => {
                    obj.insert(
                        "name".into(),
                        Value::String(self.unique_name(parent, tag, &siblings)),
                    );
                }
                "member-vnf-index" => {
                    let next = siblings
                        .iter()
                        .filter_map(|k| self.node(*k).ok())
                        .filter_map(|n| n.fragment.get("member-vnf-index"))
                        .filter_map(Value::as_i64)
                        .max()
                        .unwrap_or(0)
                        + 1;
                    obj.insert("member-vnf-index".into(), json!(next));
                }
                other => {
                    obj.insert(other.into(), Value::String(String::new()));
                }
            }
        }
        if tag == TypeTag::RspConnectionPointRef {
            obj.insert("order".into(), json!(siblings.len() as i64));
        }
        Ok(Value::Object(obj))
    }

    /// Next free "{prefix}-{n}" not used by an existing sibling.
    fn unique_name(&self, _parent: NodeKey, tag: TypeTag, siblings: &[NodeKey]) -> String {
        let taken: Vec<String> = siblings
            .iter()
            .filter_map(|k| self.node(*k).ok())
            .filter_map(|n| n.fragment.get("name").and_then(Value::as_str).map(String::from))
            .collect();
        let mut n = siblings.len() + 1;
        loop {
            let candidate = format!("{}-{}", tag.name_prefix(), n);
            if !taken.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Copy a node's cached fragment into its parent's backing array and
    /// repeat up to the root, so the root fragment stays the source of
    /// truth after any mutation.
    fn write_back(&mut self, key: NodeKey) -> Result<()> {
        let id = self.node(key)?.id.clone();
        self.write_back_as(key, &id)
    }

    fn write_back_as(&mut self, key: NodeKey, match_id: &str) -> Result<()> {
        let mut current = key;
        let mut current_match = match_id.to_string();
        loop {
            let (parent, tag, fragment) = {
                let node = self.node(current)?;
                (node.parent, node.tag, node.fragment.clone())
            };
            let Some(parent) = parent else {
                return Ok(());
            };
            let parent_tag = self.node(parent)?.tag;
            let Some(field) = parent_tag.list_field_for(tag) else {
                return Ok(());
            };
            {
                let pnode = self.node_mut(parent)?;
                if let Some(list) = pnode.fragment.get_mut(field).and_then(Value::as_array_mut) {
                    for item in list.iter_mut() {
                        if tag.logical_id(item).as_deref() == Some(current_match.as_str()) {
                            *item = fragment;
                            break;
                        }
                    }
                }
            }
            current = parent;
            current_match = self.node(parent)?.id.clone();
        }
    }

    fn free_subtree(&mut self, key: NodeKey) {
        let children = match self.node(key) {
            Ok(node) => node.children.clone(),
            Err(_) => return,
        };
        for child in children {
            self.free_subtree(child);
        }
        if let Some(slot) = self.slots.get_mut(key.0) {
            *slot = None;
        }
        self.roots.retain(|k| *k != key);
    }

    fn load_meta(&mut self, doc: &Value) {
        let Some(meta) = doc.get("meta").and_then(Value::as_str) else {
            return;
        };
        if let Ok(map) = serde_json::from_str::<BTreeMap<String, PositionOverride>>(meta) {
            self.overrides.extend(map);
        }
    }

    /// Scoped ids of every node in the subtree rooted at `key`, `key`
    /// included. The override map keys on this form, so meta folding
    /// filters with it.
    pub fn subtree_ids(&self, key: NodeKey) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_ids(key, &mut out);
        out
    }

    fn collect_ids(&self, key: NodeKey, out: &mut Vec<String>) {
        if let (Ok(node), Ok(scoped)) = (self.node(key), self.scoped_id(key)) {
            out.push(scoped);
            for child in node.children.clone() {
                self.collect_ids(child, out);
            }
        }
    }
}
