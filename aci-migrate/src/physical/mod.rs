//! Physical interface inventory, neighbors and cabling plan.
//!
//! Purely descriptive: the summary carries no readiness score.

pub mod cabling;
pub mod neighbors;
pub mod policy;

use std::collections::{BTreeMap, HashMap};

use aci_snapshot::dn::{self, PathEndpoint, PathKind};
use aci_snapshot::{NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::info;

use crate::issue::{
    warning, AnalyzerError, Finding, Issue, Module, ModuleSummary, Recommendation, Severity,
};
use crate::settings::AssessmentSettings;

pub use cabling::{CablingChange, PortMapping};
pub use neighbors::{Neighbor, NeighborConflict, NeighborProtocol};
pub use policy::PolicyGroupKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Up,
    Down,
    Unused,
}

impl PortStatus {
    /// `up` wins. A down port is unused unless something claims it.
    pub fn classify(oper_state: Option<&str>, usage: Option<&str>) -> Self {
        if oper_state == Some("up") {
            return PortStatus::Up;
        }
        match usage.map(str::trim) {
            None | Some("") => PortStatus::Unused,
            Some(usage) if usage.split(',').all(|u| matches!(u, "discovery" | "unused")) => {
                PortStatus::Unused
            }
            Some(_) => PortStatus::Down,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalInterface {
    pub node: u32,
    pub device: String,
    pub interface: String,
    pub dn: String,
    pub status: PortStatus,
    pub admin_state: Option<String>,
    pub speed: Option<String>,
    pub mtu: Option<String>,
    pub usage: Option<String>,
    pub description: Option<String>,
    pub policy_group: Option<String>,
    pub policy_kind: Option<PolicyGroupKind>,
    pub epg_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub up: usize,
    pub down: usize,
    pub unused: usize,
}

impl StatusCounts {
    fn record(&mut self, status: PortStatus) {
        self.total += 1;
        match status {
            PortStatus::Up => self.up += 1,
            PortStatus::Down => self.down += 1,
            PortStatus::Unused => self.unused += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInterfaces {
    pub node: u32,
    pub name: String,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fex {
    pub id: Option<u32>,
    pub name: String,
    pub model: Option<String>,
    pub parent: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalSummary {
    pub interfaces: Vec<PhysicalInterface>,
    pub counts: StatusCounts,
    pub devices: Vec<DeviceInterfaces>,
    pub speeds: BTreeMap<String, usize>,
    pub policy_groups: BTreeMap<String, usize>,
    pub neighbors: Vec<Neighbor>,
    pub lldp_neighbors: usize,
    pub cdp_neighbors: usize,
    pub external_devices: Vec<String>,
    pub neighbor_conflicts: Vec<NeighborConflict>,
    pub fexes: Vec<Fex>,
    pub port_mapping: Vec<PortMapping>,
    pub cabling_changes: Vec<CablingChange>,
    pub findings: Vec<Finding>,
}

pub fn analyze(
    index: &ObjectIndex<'_>,
    settings: &AssessmentSettings,
) -> Result<PhysicalSummary, AnalyzerError> {
    info!(
        ethpm = index.get("ethpmPhysIf").len(),
        l1 = index.get("l1PhysIf").len(),
        lldp = index.get("lldpAdjEp").len(),
        cdp = index.get("cdpAdjEp").len(),
        fex = index.get("eqptFex").len(),
        "physical analysis"
    );
    let mut findings = Vec::new();
    let policies = policy::resolve(index);
    let epgs = epg_counts(index);

    let mut interfaces = Vec::new();
    for InterfaceRecord { oper: source, config } in interface_records(index) {
        let dn_source = config.unwrap_or(source);
        let (Some(node), Some(port)) =
            (dn::node_id(&dn_source.dn), dn::interface_id(&dn_source.dn))
        else {
            findings.push(warning(
                "interface_unplaced",
                &dn_source.dn,
                "interface DN names no node or port",
            ));
            continue;
        };
        let usage = config.and_then(|c| c.attr("usage")).or_else(|| source.attr("usage"));
        let status = PortStatus::classify(
            source.attr("operSt").or_else(|| config.and_then(|c| c.attr("operSt"))),
            usage,
        );
        let assignment = policies.get(node, port);
        interfaces.push(PhysicalInterface {
            node,
            device: device_name(index, node),
            interface: port.to_string(),
            dn: dn_source.dn.clone(),
            status,
            admin_state: config
                .and_then(|c| c.attr("adminSt"))
                .or_else(|| source.attr("adminSt"))
                .map(str::to_string),
            speed: source
                .attr("operSpeed")
                .or_else(|| config.and_then(|c| c.attr("speed")))
                .filter(|s| !s.is_empty() && *s != "unknown")
                .map(str::to_string),
            mtu: source
                .text("operMtu")
                .or_else(|| config.and_then(|c| c.text("mtu")))
                .map(|m| m.into_owned()),
            usage: usage.filter(|u| !u.is_empty()).map(str::to_string),
            description: config
                .and_then(|c| c.attr("descr"))
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            policy_group: assignment.map(|a| a.policy_group.clone()),
            policy_kind: assignment.map(|a| a.kind),
            epg_count: epgs.get(&(node, port.to_string())).copied().unwrap_or(0),
        });
    }

    let mut counts = StatusCounts::default();
    let mut devices: BTreeMap<u32, DeviceInterfaces> = BTreeMap::new();
    let mut speeds = BTreeMap::new();
    let mut policy_groups = BTreeMap::new();
    for interface in &interfaces {
        counts.record(interface.status);
        devices
            .entry(interface.node)
            .or_insert_with(|| DeviceInterfaces {
                node: interface.node,
                name: interface.device.clone(),
                counts: StatusCounts::default(),
            })
            .counts
            .record(interface.status);
        if let Some(speed) = &interface.speed {
            *speeds.entry(speed.clone()).or_insert(0) += 1;
        }
        if let Some(group) = &interface.policy_group {
            *policy_groups.entry(group.clone()).or_insert(0) += 1;
        }
    }

    let fabric = neighbors::FabricNames::from_index(index);
    let adjacencies = neighbors::collect(index, &fabric);
    let neighbor_conflicts = neighbors::conflicts(&adjacencies);
    for conflict in &neighbor_conflicts {
        findings.push(warning(
            "neighbor_conflict",
            &format!(
                "node-{}/{}",
                conflict.node.map(|n| n.to_string()).unwrap_or_else(|| "?".into()),
                conflict.local_interface
            ),
            format!(
                "LLDP reports {} but CDP reports {}",
                conflict.lldp_device, conflict.cdp_device
            ),
        ));
    }

    let fexes: Vec<Fex> = index
        .get("eqptFex")
        .iter()
        .map(|fex| Fex {
            id: fex.int("id").and_then(|id| u32::try_from(id).ok()),
            name: fex
                .attr("name")
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .or_else(|| fex.int("id").map(|id| format!("FEX-{id}")))
                .unwrap_or_else(|| fex.name().to_string()),
            model: fex.attr("model").map(str::to_string),
            parent: dn::node_id(&fex.dn),
        })
        .collect();

    Ok(PhysicalSummary {
        port_mapping: cabling::port_mapping(&interfaces, &settings.physical.target_port_prefix),
        cabling_changes: cabling::changes(&interfaces, &fexes),
        lldp_neighbors: adjacencies
            .iter()
            .filter(|n| n.protocol == NeighborProtocol::Lldp)
            .count(),
        cdp_neighbors: adjacencies
            .iter()
            .filter(|n| n.protocol == NeighborProtocol::Cdp)
            .count(),
        external_devices: neighbors::external_devices(&adjacencies),
        devices: devices.into_values().collect(),
        interfaces,
        counts,
        speeds,
        policy_groups,
        neighbors: adjacencies,
        neighbor_conflicts,
        fexes,
        findings,
    })
}

struct InterfaceRecord<'a> {
    /// `ethpmPhysIf` when exported, otherwise the `l1PhysIf` itself.
    oper: &'a NetworkObject,
    config: Option<&'a NetworkObject>,
}

/// Every `l1PhysIf` with its operational child, then `ethpmPhysIf` objects
/// whose configuration object is missing from the export.
fn interface_records<'a>(index: &ObjectIndex<'a>) -> Vec<InterfaceRecord<'a>> {
    let mut records = Vec::new();
    for l1 in index.get("l1PhysIf") {
        records.push(InterfaceRecord {
            oper: index.first_child(&l1.dn, "ethpmPhysIf").unwrap_or(l1),
            config: Some(l1),
        });
    }
    for ethpm in index.get("ethpmPhysIf") {
        let configured = index
            .parent(&ethpm.dn)
            .is_some_and(|parent| parent.class == "l1PhysIf");
        if !configured {
            records.push(InterfaceRecord {
                oper: ethpm,
                config: None,
            });
        }
    }
    records
}

fn device_name(index: &ObjectIndex<'_>, node: u32) -> String {
    index
        .fabric_node(node)
        .map(|fabric| fabric.name().to_string())
        .unwrap_or_else(|| format!("node-{node}"))
}

/// EPG attachments per single-homed leaf port.
fn epg_counts(index: &ObjectIndex<'_>) -> HashMap<(u32, String), usize> {
    let mut counts = HashMap::new();
    for att in index.get("fvRsPathAtt") {
        let Some(path) = att.attr("tDn").and_then(PathEndpoint::parse) else {
            continue;
        };
        if path.kind != PathKind::Single || path.fex.is_some() {
            continue;
        }
        if let Some(&node) = path.nodes.first() {
            *counts.entry((node, path.interface)).or_insert(0) += 1;
        }
    }
    counts
}

impl ModuleSummary for PhysicalSummary {
    fn score(&self) -> Option<f64> {
        None
    }

    fn critical_issues(&self) -> Vec<Issue> {
        Vec::new()
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        if !self.fexes.is_empty() {
            let names: Vec<&str> = self.fexes.iter().map(|f| f.name.as_str()).collect();
            out.push(Recommendation::new(
                Module::Physical,
                Severity::High,
                format!(
                    "Review {} FEX device(s) for target platform support: {}",
                    self.fexes.len(),
                    names.join(", ")
                ),
            ));
        }
        let vpc_ports = self
            .cabling_changes
            .iter()
            .filter(|c| c.kind == cabling::ChangeKind::VpcToMultihoming)
            .count();
        if vpc_ports > 0 {
            out.push(Recommendation::new(
                Module::Physical,
                Severity::Medium,
                format!(
                    "Verify dual-homed cabling of {vpc_ports} VPC member port(s) onto the ESI pairs"
                ),
            ));
        }
        if !self.neighbor_conflicts.is_empty() {
            out.push(Recommendation::new(
                Module::Physical,
                Severity::Medium,
                format!(
                    "Resolve {} port(s) where LLDP and CDP report different neighbors",
                    self.neighbor_conflicts.len()
                ),
            ));
        }
        if !self.external_devices.is_empty() {
            out.push(Recommendation::new(
                Module::Physical,
                Severity::Medium,
                format!(
                    "Document cabling to {} external device(s) before recabling",
                    self.external_devices.len()
                ),
            ));
        }
        if self.counts.up > 0 {
            out.push(Recommendation::new(
                Module::Physical,
                Severity::Low,
                format!(
                    "Reserve at least {} ports on the target switches for active links",
                    self.counts.up
                ),
            ));
        }
        if self.counts.down > 0 {
            out.push(Recommendation::new(
                Module::Physical,
                Severity::Low,
                format!(
                    "Check {} configured interface(s) that are down before migration",
                    self.counts.down
                ),
            ));
        }
        out
    }
}
