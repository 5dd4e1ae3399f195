//! Layout and routing over a whole service document: place the shapes,
//! then mount and wire the endpoints.

use anyhow::Result;
use composer_core::{DescriptorTree, TypeTag};
use composer_graph::{ConnectionRouter, EdgeZone, LayoutEngine, MountSide};
use serde_json::{json, Value};

fn two_vnf_nsd() -> Value {
    json!({
        "id": "nsd-1",
        "name": "two-vnf-service",
        "constituent-vnfd": [
            {"member-vnf-index": 1, "vnfd-id-ref": "vnfd-a"},
            {"member-vnf-index": 2, "vnfd-id-ref": "vnfd-b"}
        ],
        "vld": [{
            "id": "vld-1",
            "name": "link",
            "vnfd-connection-point-ref": [
                {"member-vnf-index-ref": 1, "vnfd-id-ref": "vnfd-a",
                 "vnfd-connection-point-ref": "eth0"},
                {"member-vnf-index-ref": 2, "vnfd-id-ref": "vnfd-b",
                 "vnfd-connection-point-ref": "eth0"}
            ]
        }]
    })
}

fn placed_tree(doc: Value) -> DescriptorTree {
    let mut tree = DescriptorTree::new();
    tree.add_document(TypeTag::Nsd, doc).unwrap();
    LayoutEngine::new().layout(&mut tree);
    tree
}

#[test]
fn vld_endpoints_mount_toward_the_link() {
    let tree = placed_tree(two_vnf_nsd());
    let out = ConnectionRouter::new().route(&tree);

    assert_eq!(out.mounts.len(), 2);
    let a = out.mounts.iter().find(|m| m.endpoint == "1/eth0").unwrap();
    let b = out.mounts.iter().find(|m| m.endpoint == "2/eth0").unwrap();

    // The link sits below and between the two members, so the left member
    // looks down-right and the right member looks down-left.
    assert_eq!(a.zone, EdgeZone::BottomRight);
    assert_eq!(b.zone, EdgeZone::BottomLeft);
    assert_eq!(a.side, MountSide::Bottom);
    assert_eq!(b.side, MountSide::Bottom);

    // One spline per endpoint, ending at the link.
    assert_eq!(out.edges.len(), 2);
    for edge in &out.edges {
        assert_eq!(edge.to, "vld-1");
        assert_eq!(edge.points.len(), 4);
    }
}

#[test]
fn mounts_on_one_edge_never_overlap() {
    let mut doc = two_vnf_nsd();
    doc["vld"] = json!([
        {"id": "vld-1", "name": "l1",
         "vnfd-connection-point-ref": [
             {"member-vnf-index-ref": 1, "vnfd-id-ref": "vnfd-a",
              "vnfd-connection-point-ref": "eth0"}
         ]},
        {"id": "vld-2", "name": "l2",
         "vnfd-connection-point-ref": [
             {"member-vnf-index-ref": 1, "vnfd-id-ref": "vnfd-a",
              "vnfd-connection-point-ref": "eth1"}
         ]}
    ]);
    let tree = placed_tree(doc);
    let out = ConnectionRouter::new().route(&tree);

    let on_member: Vec<_> = out.mounts.iter().filter(|m| m.parent == "1").collect();
    assert_eq!(on_member.len(), 2);
    assert_ne!(on_member[0].point, on_member[1].point);
}

#[test]
fn routing_is_deterministic() {
    let tree = placed_tree(two_vnf_nsd());
    let router = ConnectionRouter::new();
    let first = router.route(&tree);
    let second = router.route(&tree);

    assert_eq!(first.mounts.len(), second.mounts.len());
    for (a, b) in first.mounts.iter().zip(&second.mounts) {
        assert_eq!(a.endpoint, b.endpoint);
        assert_eq!(a.point, b.point);
        assert_eq!(a.label, b.label);
    }
    for (a, b) in first.edges.iter().zip(&second.edges) {
        assert_eq!(a.points, b.points);
    }
}

#[test]
fn endpoint_numbering_follows_first_encounter() {
    let tree = placed_tree(two_vnf_nsd());
    let out = ConnectionRouter::new().route(&tree);
    let a = out.mounts.iter().find(|m| m.endpoint == "1/eth0").unwrap();
    let b = out.mounts.iter().find(|m| m.endpoint == "2/eth0").unwrap();
    assert_eq!(a.label, 1);
    assert_eq!(b.label, 2);
}

#[test]
fn service_path_routes_hop_by_hop() {
    let mut doc = two_vnf_nsd();
    doc["vnffgd"] = json!([{
        "id": "fg-1", "name": "graph",
        "rsp": [{
            "id": "rsp-1", "name": "path",
            "vnfd-connection-point-ref": [
                {"member-vnf-index-ref": 1, "order": 0,
                 "vnfd-id-ref": "vnfd-a", "vnfd-connection-point-ref": "eth1"},
                {"member-vnf-index-ref": 2, "order": 1,
                 "vnfd-id-ref": "vnfd-b", "vnfd-connection-point-ref": "eth1"}
            ]
        }]
    }]);
    let tree = placed_tree(doc);
    let out = ConnectionRouter::new().route(&tree);

    let hop = out
        .edges
        .iter()
        .find(|e| e.from == "1/eth1" && e.to == "2/eth1")
        .unwrap();
    assert!(hop.points.len() >= 2 && hop.points.len() <= 4);
}

#[test]
fn removed_member_disappears_from_routing() -> Result<()> {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd())?;
    let member = tree.children(root, TypeTag::ConstituentVnfd)?[0];
    tree.remove_child(root, member)?;
    LayoutEngine::new().layout(&mut tree);

    let out = ConnectionRouter::new().route(&tree);
    assert!(!out.names("1/eth0"));
    assert!(!out.names("1"));
    // The surviving endpoint still routes.
    assert!(out.names("2/eth0"));
    Ok(())
}

#[test]
fn dangling_reference_is_skipped_not_rendered() {
    let mut doc = two_vnf_nsd();
    // A ref naming a member index that has no constituent entry.
    doc["vld"][0]["vnfd-connection-point-ref"]
        .as_array_mut()
        .unwrap()
        .push(json!({
            "member-vnf-index-ref": 9, "vnfd-id-ref": "ghost",
            "vnfd-connection-point-ref": "eth0"
        }));
    let tree = placed_tree(doc);
    let out = ConnectionRouter::new().route(&tree);

    assert!(!out.names("9/eth0"));
    assert_eq!(out.mounts.len(), 2);
}

#[test]
fn layout_and_overrides_commute_with_routing() {
    let mut tree = DescriptorTree::new();
    tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();
    let engine = LayoutEngine::new();
    engine.layout(&mut tree);

    // Drag the link far to the right of both members; the mounts flip to
    // whichever edge now faces it.
    engine.drag_to(&mut tree, "nsd-1/vld-1", 900.0, 90.0);
    engine.layout(&mut tree);
    let out = ConnectionRouter::new().route(&tree);

    for mount in &out.mounts {
        assert!(matches!(
            mount.zone,
            EdgeZone::TopRight | EdgeZone::BottomRight
        ));
    }
}
