#![allow(dead_code)]

use std::path::PathBuf;

use aci_snapshot::{NetworkObject, Snapshot};

pub fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

/// Builds synthetic fabrics object by object.
#[derive(Default)]
pub struct Fabric {
    snapshot: Snapshot,
}

impl Fabric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: NetworkObject) -> Self {
        self.snapshot.push(object);
        self
    }

    pub fn leaf(self, id: u32) -> Self {
        self.object(
            NetworkObject::new("fabricNode", format!("topology/pod-1/node-{id}"))
                .with_attr("id", id.to_string())
                .with_attr("name", format!("leaf{id}"))
                .with_attr("role", "leaf"),
        )
    }

    pub fn leaves(self, ids: impl IntoIterator<Item = u32>) -> Self {
        ids.into_iter().fold(self, Fabric::leaf)
    }

    /// Both operational `vpcDom` halves plus one VPC port-channel per member,
    /// named `po<domain>` with policy group `vpc_<domain>`.
    pub fn vpc_pair(self, domain: u16, a: u32, b: u32) -> Self {
        let mut fabric = self;
        for node in [a, b] {
            fabric = fabric
                .object(
                    NetworkObject::new(
                        "vpcDom",
                        format!("topology/pod-1/node-{node}/sys/vpc/inst/dom-{domain}"),
                    )
                    .with_attr("id", domain.to_string())
                    .with_attr("operSt", "up"),
                )
                .port_channel(node, domain, &format!("vpc_{domain}"));
        }
        fabric
    }

    pub fn port_channel(self, node: u32, po: u16, group: &str) -> Self {
        self.object(
            NetworkObject::new("pcAggrIf", format!("topology/pod-1/node-{node}/sys/aggr-[po{po}]"))
                .with_attr("id", format!("po{po}"))
                .with_attr("name", group)
                .with_attr("pcMode", "active"),
        )
    }

    pub fn dual_homed(self, epg: &str, vlan: u16, a: u32, b: u32, group: &str) -> Self {
        self.path(epg, vlan, &format!("topology/pod-1/protpaths-{a}-{b}/pathep-[{group}]"))
    }

    pub fn single_homed(self, epg: &str, vlan: u16, node: u32, port: &str) -> Self {
        self.path(epg, vlan, &format!("topology/pod-1/paths-{node}/pathep-[{port}]"))
    }

    fn path(self, epg: &str, vlan: u16, tdn: &str) -> Self {
        self.object(
            NetworkObject::new(
                "fvRsPathAtt",
                format!("uni/tn-prod/ap-app/epg-{epg}/rspathAtt-[{tdn}]"),
            )
            .with_attr("tDn", tdn)
            .with_attr("encap", format!("vlan-{vlan}")),
        )
    }

    pub fn vlan_pool(self, name: &str, from: u16, to: u16) -> Self {
        let pool = format!("uni/infra/vlanns-[{name}]-static");
        self.object(
            NetworkObject::new("fvnsVlanInstP", pool.clone())
                .with_attr("name", name)
                .with_attr("allocMode", "static"),
        )
        .object(
            NetworkObject::new(
                "fvnsEncapBlk",
                format!("{pool}/from-[vlan-{from}]-to-[vlan-{to}]"),
            )
            .with_attr("from", format!("vlan-{from}"))
            .with_attr("to", format!("vlan-{to}")),
        )
    }

    /// One filter holding `entries` as `(protocol, destination port)` in order.
    pub fn filter(self, tenant: &str, name: &str, entries: &[(&str, &str)]) -> Self {
        let dn = format!("uni/tn-{tenant}/flt-{name}");
        let mut fabric =
            self.object(NetworkObject::new("vzFilter", dn.clone()).with_attr("name", name));
        for (prot, port) in entries {
            fabric = fabric.object(
                NetworkObject::new("vzEntry", format!("{dn}/e-{prot}{port}"))
                    .with_attr("name", format!("{prot}{port}"))
                    .with_attr("etherT", "ip")
                    .with_attr("prot", *prot)
                    .with_attr("dFromPort", *port)
                    .with_attr("dToPort", *port),
            );
        }
        fabric
    }

    /// Contract with one subject attaching `(filter, action)` pairs in both
    /// directions, in order.
    pub fn contract(self, tenant: &str, name: &str, filters: &[(&str, &str)]) -> Self {
        let dn = format!("uni/tn-{tenant}/brc-{name}");
        let subject = format!("{dn}/subj-main");
        let mut fabric = self
            .object(NetworkObject::new("vzBrCP", dn).with_attr("name", name))
            .object(NetworkObject::new("vzSubj", subject.clone()).with_attr("name", "main"));
        for (filter, action) in filters {
            fabric = fabric.object(
                NetworkObject::new("vzRsSubjFiltAtt", format!("{subject}/rssubjFiltAtt-{filter}"))
                    .with_attr("tnVzFilterName", *filter)
                    .with_attr("action", *action),
            );
        }
        fabric
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

/// Four complete VPC domains over leaves 101-108 with ten port-channels,
/// eight of them VPC-attached, and fifty endpoints, thirty-five dual-homed.
pub fn vpc_scenario(inventory: impl IntoIterator<Item = u32>) -> Snapshot {
    let mut fabric = Fabric::new()
        .leaves(inventory)
        .vpc_pair(1, 101, 102)
        .vpc_pair(2, 103, 104)
        .vpc_pair(3, 105, 106)
        .vpc_pair(4, 107, 108)
        .port_channel(101, 20, "pc_backup")
        .port_channel(103, 21, "pc_storage");
    for i in 0..35u16 {
        let domain = i % 4 + 1;
        let a = 101 + 2 * (u32::from(domain) - 1);
        let group = format!("vpc_{domain}");
        fabric = fabric.dual_homed(&format!("dual{i}"), 100 + i, a, a + 1, &group);
    }
    for i in 0..15u16 {
        let port = format!("eth1/{}", i + 1);
        fabric = fabric.single_homed(&format!("single{i}"), 300 + i, 101, &port);
    }
    fabric.build()
}
