//! LLDP and CDP adjacencies, kept per protocol.

use std::collections::{BTreeMap, BTreeSet};

use aci_snapshot::{dn, NetworkObject, ObjectIndex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborProtocol {
    Lldp,
    Cdp,
}

impl NeighborProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            NeighborProtocol::Lldp => "lldp",
            NeighborProtocol::Cdp => "cdp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub protocol: NeighborProtocol,
    pub node: Option<u32>,
    pub local_interface: String,
    pub remote_device: String,
    pub remote_port: Option<String>,
    pub management_ip: Option<String>,
    pub platform: Option<String>,
    pub external: bool,
}

/// LLDP and CDP disagree on who sits behind one local port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborConflict {
    pub node: Option<u32>,
    pub local_interface: String,
    pub lldp_device: String,
    pub cdp_device: String,
}

/// Lowercased fabric node names, the inventory neighbors are checked against.
pub struct FabricNames(BTreeSet<String>);

impl FabricNames {
    pub fn from_index(index: &ObjectIndex<'_>) -> Self {
        let mut names: BTreeSet<String> = index
            .fabric_nodes()
            .map(|(_, node)| node.name().to_ascii_lowercase())
            .collect();
        names.extend(
            index
                .get("eqptFex")
                .iter()
                .filter_map(|fex| fex.attr("name"))
                .map(str::to_ascii_lowercase),
        );
        Self(names)
    }

    /// Matches the full name or its host part, ignoring a `(serial)` suffix.
    pub fn contains(&self, device: &str) -> bool {
        let device = normalize_device(device);
        if self.0.contains(&device) {
            return true;
        }
        device
            .split_once('.')
            .is_some_and(|(host, _)| self.0.contains(host))
    }
}

fn normalize_device(device: &str) -> String {
    let trimmed = match device.find('(') {
        Some(open) => &device[..open],
        None => device,
    };
    trimmed.trim().to_ascii_lowercase()
}

fn from_adjacency(
    adj: &NetworkObject,
    protocol: NeighborProtocol,
    device_key: &str,
    port_key: &str,
    fabric: &FabricNames,
) -> Option<Neighbor> {
    let remote_device = adj.attr(device_key).filter(|d| !d.is_empty())?.to_string();
    Some(Neighbor {
        protocol,
        node: dn::node_id(&adj.dn),
        local_interface: dn::segment(&adj.dn, "if-").unwrap_or_default().to_string(),
        remote_port: adj.attr(port_key).filter(|p| !p.is_empty()).map(str::to_string),
        management_ip: adj
            .attr("mgmtIp")
            .or_else(|| adj.attr("v4Addr"))
            .filter(|ip| !ip.is_empty() && *ip != "0.0.0.0")
            .map(str::to_string),
        platform: adj.attr("platId").or_else(|| adj.attr("sysDesc")).map(str::to_string),
        external: !fabric.contains(&remote_device),
        remote_device,
    })
}

/// LLDP adjacencies first, then CDP, each in export order.
pub fn collect(index: &ObjectIndex<'_>, fabric: &FabricNames) -> Vec<Neighbor> {
    let lldp = index
        .get("lldpAdjEp")
        .iter()
        .filter_map(|adj| {
            from_adjacency(adj, NeighborProtocol::Lldp, "sysName", "portIdV", fabric)
        });
    let cdp = index
        .get("cdpAdjEp")
        .iter()
        .filter_map(|adj| from_adjacency(adj, NeighborProtocol::Cdp, "devId", "portId", fabric));
    lldp.chain(cdp).collect()
}

pub fn conflicts(neighbors: &[Neighbor]) -> Vec<NeighborConflict> {
    type Port<'a> = (Option<u32>, &'a str);
    let mut lldp: BTreeMap<Port<'_>, &str> = BTreeMap::new();
    let mut cdp: BTreeMap<Port<'_>, &str> = BTreeMap::new();
    for neighbor in neighbors {
        let key = (neighbor.node, neighbor.local_interface.as_str());
        let table = match neighbor.protocol {
            NeighborProtocol::Lldp => &mut lldp,
            NeighborProtocol::Cdp => &mut cdp,
        };
        table.entry(key).or_insert(neighbor.remote_device.as_str());
    }
    lldp.iter()
        .filter_map(|(key, lldp_device)| {
            let cdp_device = cdp.get(key)?;
            let lldp_name = normalize_device(lldp_device);
            let cdp_name = normalize_device(cdp_device);
            let same = lldp_name == cdp_name
                || lldp_name.split('.').next() == cdp_name.split('.').next();
            (!same).then(|| NeighborConflict {
                node: key.0,
                local_interface: key.1.to_string(),
                lldp_device: (*lldp_device).to_string(),
                cdp_device: (*cdp_device).to_string(),
            })
        })
        .collect()
}

/// Distinct external device names, sorted.
pub fn external_devices(neighbors: &[Neighbor]) -> Vec<String> {
    neighbors
        .iter()
        .filter(|n| n.external)
        .map(|n| n.remote_device.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
