//! Schema-driven serialization back to the canonical document.
//!
//! The projection reads its field whitelist from schema metadata and walks
//! the typed tree through the structural accessors, so serialization sees
//! exactly what reconciliation produced. Transient view-state never reaches
//! the output except the position-override map, folded into the root's
//! opaque `meta` string.

use serde_json::{Map, Value};

use crate::error::{ComposerError, Result};
use crate::model::{DescriptorTree, NodeKey, TypeTag};
use crate::schema::{self, SchemaKind};

/// Serialize the node at `key` (typically an aggregate root) into its
/// canonical fragment. Fails with [`ComposerError::UnsupportedType`] when
/// the type has no registered projection; callers must not persist a
/// document built from a partial result.
pub fn serialize(tree: &mut DescriptorTree, key: NodeKey) -> Result<Value> {
    let tag = tree.node(key)?.tag;
    let def = schema::lookup(tag.schema_path()).ok_or(ComposerError::UnsupportedType(tag))?;

    let mut out = Map::new();
    for field in def.fields {
        match field.kind {
            SchemaKind::Leaf => {
                if field.name == "meta" && tag.is_root() {
                    if let Some(meta) = fold_meta(tree, key) {
                        out.insert("meta".into(), Value::String(meta));
                    }
                    continue;
                }
                let value = tree.node(key)?.fragment.get(field.name).cloned();
                if let Some(value) = value {
                    if !is_blank(&value) {
                        out.insert(field.name.into(), value);
                    }
                }
            }
            SchemaKind::LeafList => {
                let value = tree.node(key)?.fragment.get(field.name).cloned();
                if let Some(Value::Array(items)) = value {
                    out.insert(field.name.into(), Value::Array(items));
                }
            }
            SchemaKind::List => {
                let Some(child_tag) = child_tag_for(tag, field.name) else {
                    continue;
                };
                let children = tree.children(key, child_tag)?;
                let mut items = Vec::with_capacity(children.len());
                for child in children {
                    items.push(serialize(tree, child)?);
                }
                let had_field = tree.node(key)?.fragment.get(field.name).is_some();
                if !items.is_empty() || had_field {
                    out.insert(field.name.into(), Value::Array(items));
                }
            }
            SchemaKind::Container => {
                let value = tree.node(key)?.fragment.get(field.name).cloned();
                if let Some(value) = value {
                    if !is_blank(&value) {
                        out.insert(field.name.into(), value);
                    }
                }
            }
            SchemaKind::Choice => {
                if tag == TypeTag::ConstituentVnfd && field.name == "vnf-configuration" {
                    if let Some(projected) = project_vnf_configuration(&tree.node(key)?.fragment) {
                        out.insert(field.name.into(), projected);
                    }
                    continue;
                }
                let value = tree.node(key)?.fragment.get(field.name).cloned();
                if let Some(value) = value {
                    if !is_blank(&value) {
                        out.insert(field.name.into(), value);
                    }
                }
            }
            // Case arms are emitted by their choice; uses-groups inline as
            // plain leaves and are covered by the Leaf arm above.
            SchemaKind::Case | SchemaKind::Uses => {}
        }
    }

    Ok(Value::Object(out))
}

/// Whitelisted view-state for aggregate roots: the position overrides of
/// every node in this aggregate, as one opaque JSON string.
fn fold_meta(tree: &DescriptorTree, root: NodeKey) -> Option<String> {
    let ids = tree.subtree_ids(root);
    let filtered: std::collections::BTreeMap<_, _> = tree
        .overrides
        .iter()
        .filter(|(id, _)| ids.contains(id))
        .collect();
    if filtered.is_empty() {
        return None;
    }
    serde_json::to_string(&filtered).ok()
}

/// Discriminated projection of `vnf-configuration`: keep `config-type` and
/// the case block it selects; every other case is dropped.
fn project_vnf_configuration(fragment: &Value) -> Option<Value> {
    let config = fragment.get("vnf-configuration")?.as_object()?;
    let selected = config.get("config-type").and_then(Value::as_str)?;
    let mut out = Map::new();
    out.insert("config-type".into(), Value::String(selected.to_string()));
    for (discriminant, case_field) in schema::VNF_CONFIG_CASES {
        if *discriminant == selected {
            if let Some(block) = config.get(*case_field) {
                if !is_blank(block) {
                    out.insert((*case_field).to_string(), block.clone());
                }
            }
        }
    }
    Some(Value::Object(out))
}

/// A value the canonical document drops: null, blank string, empty object.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn child_tag_for(tag: TypeTag, field: &str) -> Option<TypeTag> {
    tag.child_fields()
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, child)| *child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PositionOverride;
    use serde_json::json;

    #[test]
    fn blank_and_empty_fields_are_dropped() {
        let mut tree = DescriptorTree::new();
        let root = tree
            .add_document(
                TypeTag::Nsd,
                json!({
                    "id": "n1",
                    "name": "svc",
                    "description": "   ",
                    "vendor": "",
                    "version": "1.0"
                }),
            )
            .unwrap();
        let out = serialize(&mut tree, root).unwrap();
        assert_eq!(out["version"], json!("1.0"));
        assert!(out.get("description").is_none());
        assert!(out.get("vendor").is_none());
    }

    #[test]
    fn unlisted_fields_never_survive() {
        let mut tree = DescriptorTree::new();
        let root = tree
            .add_document(
                TypeTag::Nsd,
                json!({"id": "n1", "name": "svc", "x-debug": true}),
            )
            .unwrap();
        let out = serialize(&mut tree, root).unwrap();
        assert!(out.get("x-debug").is_none());
    }

    #[test]
    fn config_type_selects_exactly_one_case() {
        let mut tree = DescriptorTree::new();
        let root = tree
            .add_document(
                TypeTag::Nsd,
                json!({
                    "id": "n1", "name": "svc",
                    "constituent-vnfd": [{
                        "member-vnf-index": 1,
                        "vnfd-id-ref": "vnfd-a",
                        "vnf-configuration": {
                            "config-type": "juju",
                            "juju": {"charm": "mycharm"},
                            "script": {"script-type": "bash"}
                        }
                    }]
                }),
            )
            .unwrap();
        let out = serialize(&mut tree, root).unwrap();
        let config = &out["constituent-vnfd"][0]["vnf-configuration"];
        assert_eq!(config["config-type"], json!("juju"));
        assert_eq!(config["juju"]["charm"], json!("mycharm"));
        assert!(config.get("script").is_none());
    }

    #[test]
    fn meta_folds_overrides_for_this_aggregate_only() {
        let mut tree = DescriptorTree::new();
        let root = tree
            .add_document(
                TypeTag::Nsd,
                json!({"id": "n1", "name": "svc", "vld": [{"id": "vld-1", "name": "l"}]}),
            )
            .unwrap();
        tree.overrides.insert(
            "n1/vld-1".into(),
            PositionOverride {
                top: 30.0,
                left: 45.0,
            },
        );
        tree.overrides.insert(
            "other-doc/vld-1".into(),
            PositionOverride { top: 1.0, left: 2.0 },
        );
        let out = serialize(&mut tree, root).unwrap();
        let meta: Value = serde_json::from_str(out["meta"].as_str().unwrap()).unwrap();
        assert_eq!(meta["n1/vld-1"]["top"], json!(30.0));
        assert!(meta.get("other-doc/vld-1").is_none());
    }

    #[test]
    fn same_cp_name_in_two_vnfds_keeps_meta_separate() {
        let mut tree = DescriptorTree::new();
        let vnfd = |id: &str| {
            json!({
                "id": id, "name": id,
                "connection-point": [{"name": "eth0", "type": "VPORT"}]
            })
        };
        let a = tree.add_document(TypeTag::Vnfd, vnfd("vnfd-a")).unwrap();
        let b = tree.add_document(TypeTag::Vnfd, vnfd("vnfd-b")).unwrap();
        // Only vnfd-a's endpoint was dragged.
        tree.overrides.insert(
            "vnfd-a/eth0".into(),
            PositionOverride {
                top: 10.0,
                left: 20.0,
            },
        );

        let out_b = serialize(&mut tree, b).unwrap();
        assert!(out_b.get("meta").is_none());
        let out_a = serialize(&mut tree, a).unwrap();
        let meta: Value = serde_json::from_str(out_a["meta"].as_str().unwrap()).unwrap();
        assert_eq!(meta["vnfd-a/eth0"]["left"], json!(20.0));
    }

    #[test]
    fn meta_round_trips_through_reload() {
        let mut tree = DescriptorTree::new();
        let root = tree
            .add_document(
                TypeTag::Nsd,
                json!({"id": "n1", "name": "svc", "vld": [{"id": "vld-1", "name": "l"}]}),
            )
            .unwrap();
        tree.overrides.insert(
            "n1/vld-1".into(),
            PositionOverride {
                top: 30.0,
                left: 45.0,
            },
        );
        let doc = serialize(&mut tree, root).unwrap();

        let mut reloaded = DescriptorTree::new();
        reloaded.add_document(TypeTag::Nsd, doc).unwrap();
        assert_eq!(
            reloaded.overrides.get("n1/vld-1"),
            Some(&PositionOverride {
                top: 30.0,
                left: 45.0
            })
        );
    }
}
