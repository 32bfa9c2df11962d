use std::fs;
use std::path::PathBuf;

use aci_snapshot::dn::{self, PathKind};
use aci_snapshot::{parse_file, ObjectIndex, Snapshot, SnapshotError};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn loads_json_export_with_nested_children() {
    let snapshot = Snapshot::load_file(&fixture("fixtures/fabric.json")).expect("json fixture");
    assert_eq!(snapshot.len(), 53);
    assert_eq!(snapshot.class_counts().len(), 39);
    assert_eq!(snapshot.get("fabricNode").len(), 3);
    assert_eq!(snapshot.get("l1PhysIf").len(), 4);

    let index = ObjectIndex::new(&snapshot);
    let epg = index.resolve("uni/tn-prod/ap-app/epg-web").expect("web epg");
    assert_eq!(epg.name(), "web");

    let paths = index.children(&epg.dn, "fvRsPathAtt");
    assert_eq!(paths.len(), 1);
    assert_eq!(
        paths[0].dn,
        "uni/tn-prod/ap-app/epg-web/rspathAtt-[topology/pod-1/protpaths-101-102/pathep-[vpc_web]]"
    );
    let path = dn::PathEndpoint::parse(paths[0].attr("tDn").expect("tDn")).expect("path");
    assert_eq!(path.kind, PathKind::Protected);
    assert_eq!(path.nodes, vec![101, 102]);
    assert_eq!(path.interface, "vpc_web");

    let peer = index.descendants("uni/tn-prod/out-wan", "bgpPeerP");
    assert_eq!(peer.len(), 1);
    assert_eq!(dn::tenant(&peer[0].dn), Some("prod"));
    assert_eq!(index.fabric_node(102).map(|n| n.name()), Some("leaf102"));
}

#[test]
fn loads_xml_export_rooted_at_pol_uni() {
    let snapshot = Snapshot::load_file(&fixture("fixtures/fabric.xml")).expect("xml fixture");
    assert_eq!(snapshot.len(), 29);
    let pools: Vec<&str> = snapshot
        .get("fvnsVlanInstP")
        .iter()
        .map(|p| p.dn.as_str())
        .collect();
    assert_eq!(
        pools,
        vec![
            "uni/infra/vlanns-[esx_vlans]-static",
            "uni/infra/vlanns-[bm_vlans]-static"
        ]
    );

    let index = ObjectIndex::new(&snapshot);
    let routes = index.descendants("uni/tn-lab/out-edge", "ipRouteP");
    let route = routes[0];
    assert_eq!(route.attr("ip"), Some("0.0.0.0/0"));
    assert_eq!(
        index.parent(&route.dn).map(|p| p.class.as_str()),
        Some("l3extRsNodeL3OutAtt")
    );
}

#[test]
fn xml_parser_keeps_attributes_and_order() {
    let root = parse_file(&fixture("fixtures/fabric.xml")).expect("parse");
    assert_eq!(root.class, "polUni");
    assert_eq!(root.object_count(), 29);
    let tenant = root.get_child("fvTenant").expect("tenant");
    assert_eq!(tenant.attr("name"), Some("lab"));
    let filters: Vec<&str> = tenant
        .get_children("vzFilter")
        .iter()
        .filter_map(|f| f.attr("name"))
        .collect();
    assert_eq!(filters, vec!["ssh", "icmp"]);
}

#[test]
fn sniffs_format_without_extension() {
    let dir = tempdir().expect("tempdir");
    let json = dir.path().join("export");
    fs::copy(fixture("fixtures/fabric.json"), &json).expect("copy json");
    assert_eq!(Snapshot::load_file(&json).expect("sniffed json").len(), 53);

    let xml = dir.path().join("export.bak");
    fs::copy(fixture("fixtures/fabric.xml"), &xml).expect("copy xml");
    assert_eq!(Snapshot::load_file(&xml).expect("sniffed xml").len(), 29);
}

#[test]
fn rejects_unreadable_and_unknown_inputs() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        Snapshot::load_file(&missing),
        Err(SnapshotError::Io { .. })
    ));

    let text = dir.path().join("notes.txt");
    fs::write(&text, "show running-config").expect("write");
    assert!(matches!(
        Snapshot::load_file(&text),
        Err(SnapshotError::InvalidShape(_))
    ));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{\"imdata\": [").expect("write");
    assert!(matches!(
        Snapshot::load_file(&broken),
        Err(SnapshotError::Json(_))
    ));
}
