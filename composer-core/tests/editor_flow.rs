//! End-to-end editing flows over whole descriptor documents: ingest,
//! edit, serialize, reload.

use anyhow::Result;
use composer_core::{serialize, ComposerError, DescriptorTree, TypeTag};
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn two_vnf_nsd() -> Value {
    json!({
        "id": "nsd-ping-pong",
        "name": "ping-pong",
        "vendor": "acme",
        "version": "1.0",
        "constituent-vnfd": [
            {"member-vnf-index": 1, "vnfd-id-ref": "ping-vnfd"},
            {"member-vnf-index": 2, "vnfd-id-ref": "pong-vnfd"}
        ],
        "vld": [{
            "id": "mgmt-vld",
            "name": "management",
            "type": "ELAN",
            "vnfd-connection-point-ref": [
                {"member-vnf-index-ref": 1, "vnfd-id-ref": "ping-vnfd",
                 "vnfd-connection-point-ref": "eth0"},
                {"member-vnf-index-ref": 2, "vnfd-id-ref": "pong-vnfd",
                 "vnfd-connection-point-ref": "eth0"}
            ]
        }]
    })
}

#[test]
fn document_round_trips_through_the_tree() -> Result<()> {
    init_tracing();
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd())?;
    let out = serialize(&mut tree, root)?;

    assert_eq!(out["id"], json!("nsd-ping-pong"));
    assert_eq!(out["vendor"], json!("acme"));
    assert_eq!(out["constituent-vnfd"].as_array().unwrap().len(), 2);
    let refs = out["vld"][0]["vnfd-connection-point-ref"].as_array().unwrap();
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0]["vnfd-connection-point-ref"], json!("eth0"));
    Ok(())
}

#[test]
fn serialization_is_stable_across_reload() {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();
    let first = serialize(&mut tree, root).unwrap();

    let mut reloaded = DescriptorTree::new();
    let root2 = reloaded.add_document(TypeTag::Nsd, first.clone()).unwrap();
    let second = serialize(&mut reloaded, root2).unwrap();
    assert_eq!(first, second);
}

#[test]
fn node_identity_survives_serialization() {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();
    let vld_before = tree.children(root, TypeTag::Vld).unwrap()[0];
    serialize(&mut tree, root).unwrap();
    let vld_after = tree.children(root, TypeTag::Vld).unwrap()[0];
    assert_eq!(vld_before, vld_after);
}

#[test]
fn forwarding_graph_builds_in_call_order() {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();

    let fg = tree.create_child(root, TypeTag::Vnffgd, None).unwrap();
    let rsp = tree.create_child(fg, TypeTag::Rsp, None).unwrap();
    tree.create_child(
        rsp,
        TypeTag::RspConnectionPointRef,
        Some(json!({
            "member-vnf-index-ref": 1, "order": 0,
            "vnfd-id-ref": "ping-vnfd", "vnfd-connection-point-ref": "eth1"
        })),
    )
    .unwrap();
    tree.create_child(
        rsp,
        TypeTag::RspConnectionPointRef,
        Some(json!({
            "member-vnf-index-ref": 2, "order": 1,
            "vnfd-id-ref": "pong-vnfd", "vnfd-connection-point-ref": "eth1"
        })),
    )
    .unwrap();

    let hops = tree.children(rsp, TypeTag::RspConnectionPointRef).unwrap();
    assert_eq!(hops.len(), 2);
    assert_eq!(tree.node(hops[0]).unwrap().id, "1/eth1");
    assert_eq!(tree.node(hops[1]).unwrap().id, "2/eth1");

    // The path also reached the backing document, nested under the graph.
    let out = serialize(&mut tree, root).unwrap();
    let path = out["vnffgd"][0]["rsp"][0]["vnfd-connection-point-ref"]
        .as_array()
        .unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0]["member-vnf-index-ref"], json!(1));
    assert_eq!(path[1]["member-vnf-index-ref"], json!(2));
}

#[test]
fn removing_a_member_leaves_no_reference_behind() {
    let mut tree = DescriptorTree::new();
    let mut doc = two_vnf_nsd();
    doc["vnffgd"] = json!([{
        "id": "fg-1", "name": "graph",
        "rsp": [{
            "id": "rsp-1", "name": "path",
            "vnfd-connection-point-ref": [
                {"member-vnf-index-ref": 1, "order": 0,
                 "vnfd-id-ref": "ping-vnfd", "vnfd-connection-point-ref": "eth1"},
                {"member-vnf-index-ref": 2, "order": 1,
                 "vnfd-id-ref": "pong-vnfd", "vnfd-connection-point-ref": "eth1"}
            ]
        }],
        "classifier": [{
            "id": "cl-1", "name": "http", "rsp-id-ref": "rsp-1",
            "member-vnf-index-ref": 1, "vnfd-id-ref": "ping-vnfd",
            "vnfd-connection-point-ref": "eth1"
        }]
    }]);
    let root = tree.add_document(TypeTag::Nsd, doc).unwrap();
    let member = tree.children(root, TypeTag::ConstituentVnfd).unwrap()[0];
    tree.remove_child(root, member).unwrap();

    let out = serialize(&mut tree, root).unwrap();
    let text = serde_json::to_string(&out).unwrap();
    assert!(!text.contains("ping-vnfd"));

    let vld_refs = out["vld"][0]["vnfd-connection-point-ref"].as_array().unwrap();
    assert_eq!(vld_refs.len(), 1);
    let rsp_refs = out["vnffgd"][0]["rsp"][0]["vnfd-connection-point-ref"]
        .as_array()
        .unwrap();
    assert_eq!(rsp_refs.len(), 1);
    // The classifier loses its endpoint binding but survives.
    let classifier = &out["vnffgd"][0]["classifier"][0];
    assert_eq!(classifier["id"], json!("cl-1"));
    assert!(classifier.get("member-vnf-index-ref").is_none());
}

#[test]
fn duplicate_vld_identity_is_rejected_whole() {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();
    let err = tree
        .create_child(
            root,
            TypeTag::Vld,
            Some(json!({"id": "mgmt-vld", "name": "dup"})),
        )
        .unwrap_err();
    assert!(matches!(err, ComposerError::DuplicateChild { .. }));
    let out = serialize(&mut tree, root).unwrap();
    assert_eq!(out["vld"].as_array().unwrap().len(), 1);
}

#[test]
fn edits_survive_a_reserialize_reload_cycle() {
    let mut tree = DescriptorTree::new();
    let root = tree.add_document(TypeTag::Nsd, two_vnf_nsd()).unwrap();
    let vld = tree.children(root, TypeTag::Vld).unwrap()[0];
    tree.set_leaf(vld, "description", json!("east-west"))
        .unwrap();
    let doc = serialize(&mut tree, root).unwrap();

    let mut reloaded = DescriptorTree::new();
    let root2 = reloaded.add_document(TypeTag::Nsd, doc).unwrap();
    let vld2 = reloaded.children(root2, TypeTag::Vld).unwrap()[0];
    assert_eq!(
        reloaded.node(vld2).unwrap().fragment["description"],
        json!("east-west")
    );
}
