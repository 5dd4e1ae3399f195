//! Cascading cross-reference cleanup.
//!
//! Removal is a two-pass operation: the tree detaches the node, then this
//! module sweeps every aggregate in the forest for references naming the
//! removed identity and prunes them. The sweep edits root fragments only;
//! the caller refreshes the arena afterwards so stale nodes disappear.

use serde_json::Value;
use tracing::debug;

use super::tag::scalar_string;
use super::tree::DescriptorTree;
use super::TypeTag;
use crate::error::Result;

/// Identity snapshot of a node that has just been detached.
pub(crate) struct RemovedNode {
    pub tag: TypeTag,
    pub id: String,
    /// Id of the aggregate root the node lived under.
    pub root_id: String,
    /// The detached fragment, used to find identities of nested children.
    pub fragment: Value,
}

pub(crate) fn sweep(tree: &mut DescriptorTree, removed: &RemovedNode) -> Result<()> {
    match removed.tag {
        TypeTag::ConstituentVnfd => {
            if let Some(idx) = removed
                .fragment
                .get("member-vnf-index")
                .and_then(scalar_string)
            {
                sweep_member_refs(tree, &idx)?;
            }
        }
        TypeTag::ConnectionPoint => {
            sweep_cp_refs(tree, &removed.root_id, &removed.id)?;
        }
        TypeTag::Rsp => {
            sweep_rsp_refs(tree, &removed.id)?;
        }
        TypeTag::InternalConnectionPoint => {
            sweep_icp_refs(tree, &removed.root_id, std::slice::from_ref(&removed.id))?;
        }
        TypeTag::Vdu => {
            let icps: Vec<String> = removed
                .fragment
                .get("internal-connection-point")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|v| TypeTag::InternalConnectionPoint.logical_id(v))
                        .collect()
                })
                .unwrap_or_default();
            if !icps.is_empty() {
                sweep_icp_refs(tree, &removed.root_id, &icps)?;
            }
        }
        // Remaining kinds have no inbound cross references in the document.
        _ => {}
    }

    prune_overrides(tree, removed);
    Ok(())
}

/// Strip every vld/rsp reference carrying the removed member index, and
/// clear classifiers pointing at it.
fn sweep_member_refs(tree: &mut DescriptorTree, index: &str) -> Result<()> {
    let mut pruned = 0usize;
    for_each_nsd(tree, |doc| {
        for vld in list_mut(doc, "vld") {
            pruned += retain_refs(vld, "vnfd-connection-point-ref", |r| {
                r.get("member-vnf-index-ref").and_then(scalar_string).as_deref() != Some(index)
            });
        }
        for fg in list_mut(doc, "vnffgd") {
            for rsp in list_mut(fg, "rsp") {
                pruned += retain_refs(rsp, "vnfd-connection-point-ref", |r| {
                    r.get("member-vnf-index-ref").and_then(scalar_string).as_deref() != Some(index)
                });
            }
            for classifier in list_mut(fg, "classifier") {
                let hit = classifier
                    .get("member-vnf-index-ref")
                    .and_then(scalar_string)
                    .as_deref()
                    == Some(index);
                if hit {
                    clear_fields(
                        classifier,
                        &[
                            "member-vnf-index-ref",
                            "vnfd-id-ref",
                            "vnfd-connection-point-ref",
                        ],
                    );
                    pruned += 1;
                }
            }
        }
    })?;
    debug!(index, pruned, "swept member references");
    Ok(())
}

/// Strip references to a removed connection point of one vnfd.
fn sweep_cp_refs(tree: &mut DescriptorTree, vnfd_id: &str, cp_name: &str) -> Result<()> {
    let names = |r: &Value| {
        r.get("vnfd-id-ref").and_then(scalar_string).as_deref() == Some(vnfd_id)
            && r.get("vnfd-connection-point-ref")
                .and_then(scalar_string)
                .as_deref()
                == Some(cp_name)
    };
    for_each_nsd(tree, |doc| {
        for vld in list_mut(doc, "vld") {
            retain_refs(vld, "vnfd-connection-point-ref", |r| !names(r));
        }
        for fg in list_mut(doc, "vnffgd") {
            for rsp in list_mut(fg, "rsp") {
                retain_refs(rsp, "vnfd-connection-point-ref", |r| !names(r));
            }
            for classifier in list_mut(fg, "classifier") {
                if names(classifier) {
                    clear_fields(
                        classifier,
                        &[
                            "member-vnf-index-ref",
                            "vnfd-id-ref",
                            "vnfd-connection-point-ref",
                        ],
                    );
                }
            }
        }
    })
}

/// Clear classifier bindings to a removed rendered service path.
fn sweep_rsp_refs(tree: &mut DescriptorTree, rsp_id: &str) -> Result<()> {
    for_each_nsd(tree, |doc| {
        for fg in list_mut(doc, "vnffgd") {
            for classifier in list_mut(fg, "classifier") {
                let hit = classifier
                    .get("rsp-id-ref")
                    .and_then(scalar_string)
                    .as_deref()
                    == Some(rsp_id);
                if hit {
                    clear_fields(classifier, &["rsp-id-ref"]);
                }
            }
        }
    })
}

/// Drop removed internal connection points from internal-vld leaf-lists of
/// their owning vnfd.
fn sweep_icp_refs(tree: &mut DescriptorTree, vnfd_id: &str, icp_ids: &[String]) -> Result<()> {
    for root in tree.roots().to_vec() {
        let node = tree.node_mut(root)?;
        if node.tag != TypeTag::Vnfd || node.id != vnfd_id {
            continue;
        }
        for ivld in list_mut(&mut node.fragment, "internal-vld") {
            if let Some(refs) = ivld
                .get_mut("internal-connection-point-ref")
                .and_then(Value::as_array_mut)
            {
                refs.retain(|v| {
                    v.as_str()
                        .map(|s| !icp_ids.iter().any(|id| id == s))
                        .unwrap_or(true)
                });
            }
        }
    }
    Ok(())
}

/// Drop position overrides for the removed node and everything inside its
/// detached fragment. The override map keys on scoped ids, so the logical
/// ids from the fragment are qualified by the owning root first.
fn prune_overrides(tree: &mut DescriptorTree, removed: &RemovedNode) {
    let mut ids = vec![removed.id.clone()];
    collect_fragment_ids(removed.tag, &removed.fragment, &mut ids);
    let scoped: Vec<String> = ids
        .iter()
        .map(|id| format!("{}/{id}", removed.root_id))
        .collect();
    tree.overrides.retain(|id, _| !scoped.contains(id));
}

fn collect_fragment_ids(tag: TypeTag, fragment: &Value, out: &mut Vec<String>) {
    for (field, child_tag) in tag.child_fields() {
        if let Some(items) = fragment.get(*field).and_then(Value::as_array) {
            for item in items {
                if let Some(id) = child_tag.logical_id(item) {
                    out.push(id.clone());
                }
                collect_fragment_ids(*child_tag, item, out);
            }
        }
    }
}

// ── Fragment helpers ──

fn for_each_nsd(
    tree: &mut DescriptorTree,
    mut f: impl FnMut(&mut Value),
) -> Result<()> {
    for root in tree.roots().to_vec() {
        let node = tree.node_mut(root)?;
        if node.tag == TypeTag::Nsd {
            f(&mut node.fragment);
        }
    }
    Ok(())
}

fn list_mut<'a>(value: &'a mut Value, field: &str) -> impl Iterator<Item = &'a mut Value> {
    value
        .get_mut(field)
        .and_then(Value::as_array_mut)
        .map(|v| v.iter_mut())
        .into_iter()
        .flatten()
}

/// Keep only entries matching `keep`; returns how many were dropped.
fn retain_refs(owner: &mut Value, field: &str, keep: impl Fn(&Value) -> bool) -> usize {
    let Some(list) = owner.get_mut(field).and_then(Value::as_array_mut) else {
        return 0;
    };
    let before = list.len();
    list.retain(|r| keep(r));
    before - list.len()
}

fn clear_fields(owner: &mut Value, fields: &[&str]) {
    if let Some(obj) = owner.as_object_mut() {
        for field in fields {
            obj.remove(*field);
        }
    }
}
