//! VPC domain, port-channel and dual-homing analysis.
//!
//! Domains are assembled from the operational `vpcDom` objects (one per
//! member leaf) and the configured `fabricExplicitGEp` protection groups.
//! Endpoints are `(EPG, encap)` groups of `fvRsPathAtt` attachments; an
//! endpoint is dual-homed when its attachments cover both leaves of one
//! domain.

pub mod esi;
pub mod templates;

use std::collections::{BTreeMap, BTreeSet};

use aci_snapshot::dn::{self, PathEndpoint};
use aci_snapshot::{NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::issue::{
    clamp_score, info as info_finding, ratio_or_one, warning, AnalyzerError, Finding, Issue,
    Module, ModuleSummary, Recommendation, Severity,
};
use crate::settings::AssessmentSettings;

pub use esi::EsiCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Active,
    Degraded,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcDomain {
    pub id: u16,
    pub members: Vec<u32>,
    pub member_names: Vec<String>,
    pub virtual_ip: Option<String>,
    pub status: PeerStatus,
}

impl VpcDomain {
    /// Both members present and operational.
    pub fn is_healthy(&self) -> bool {
        self.status == PeerStatus::Active
    }

    fn covers(&self, nodes: &BTreeSet<u32>) -> bool {
        self.members.len() == 2 && self.members.iter().all(|m| nodes.contains(m))
    }

    fn pair_label(&self) -> String {
        self.member_names.join(" <-> ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LacpMode {
    Active,
    Passive,
    On,
    Unknown,
}

impl LacpMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(LacpMode::Active),
            "passive" => Some(LacpMode::Passive),
            "off" | "on" | "static" | "static-channel-mode-on" => Some(LacpMode::On),
            "" => None,
            _ => Some(LacpMode::Unknown),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LacpDistribution {
    pub active: usize,
    pub passive: usize,
    pub on: usize,
    pub unknown: usize,
}

impl LacpDistribution {
    fn record(&mut self, mode: LacpMode) {
        match mode {
            LacpMode::Active => self.active += 1,
            LacpMode::Passive => self.passive += 1,
            LacpMode::On => self.on += 1,
            LacpMode::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortChannel {
    pub dn: String,
    pub node: Option<u32>,
    pub interface: String,
    pub policy_group: String,
    pub lacp: LacpMode,
    /// Owning VPC domain when the port-channel is VPC-attached.
    pub vpc_domain: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Homing {
    DualHomed,
    MultiAttached,
    SingleHomed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub epg: String,
    pub encap: String,
    pub paths: Vec<String>,
    pub nodes: Vec<u32>,
    pub homing: Homing,
    pub domain: Option<u16>,
    pub esi: Option<String>,
}

impl Endpoint {
    pub fn key(&self) -> String {
        format!("{}:{}", self.epg, self.encap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPriority {
    pub priority: u8,
    pub endpoint: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcSummary {
    pub domains: Vec<VpcDomain>,
    pub healthy_domains: usize,
    pub port_channels: Vec<PortChannel>,
    pub vpc_port_channels: usize,
    pub standalone_port_channels: usize,
    pub lacp: LacpDistribution,
    pub endpoints: Vec<Endpoint>,
    pub dual_homed: usize,
    pub single_homed: usize,
    pub esi_generated: usize,
    pub esi_candidates: Vec<EsiCandidate>,
    pub migration_priority: Vec<MigrationPriority>,
    pub findings: Vec<Finding>,
    pub score: f64,
}

#[derive(Default)]
struct DomainBuilder<'a> {
    origin: Option<&'a NetworkObject>,
    members: BTreeSet<u32>,
    oper_state: BTreeMap<u32, String>,
    virtual_ip: Option<String>,
}

pub fn analyze(
    index: &ObjectIndex<'_>,
    _settings: &AssessmentSettings,
) -> Result<VpcSummary, AnalyzerError> {
    info!(
        domains = index.get("vpcDom").len(),
        protection_groups = index.get("fabricExplicitGEp").len(),
        port_channels = index.get("pcAggrIf").len(),
        path_attachments = index.get("fvRsPathAtt").len(),
        "vpc analysis"
    );
    let mut findings = Vec::new();

    let domains = collect_domains(index, &mut findings)?;
    let healthy_domains = domains.iter().filter(|d| d.is_healthy()).count();

    let attachments = group_attachments(index, &mut findings);
    let port_channels = collect_port_channels(index, &domains, &attachments);
    let mut lacp = LacpDistribution::default();
    for pc in &port_channels {
        lacp.record(pc.lacp);
    }
    let vpc_port_channels = port_channels
        .iter()
        .filter(|pc| pc.vpc_domain.is_some())
        .count();

    let mut esi_candidates = BTreeSet::new();
    let mut endpoints = Vec::with_capacity(attachments.len());
    for ((epg, encap), paths) in attachments {
        let nodes: BTreeSet<u32> = paths.iter().flat_map(|p| p.nodes.iter().copied()).collect();
        let domain = domains.iter().find(|d| d.covers(&nodes));
        let homing = match domain {
            Some(_) => Homing::DualHomed,
            None if nodes.len() > 1 || paths.len() > 1 => Homing::MultiAttached,
            None => Homing::SingleHomed,
        };

        let mut esi = None;
        if let Some(domain) = domain {
            match resolve_esi(domain, &paths, &port_channels) {
                Some(candidate) => {
                    esi = Some(candidate.esi.clone());
                    esi_candidates.insert(candidate);
                }
                None => findings.push(warning(
                    "esi_unresolved",
                    &format!("{epg}:{encap}"),
                    format!(
                        "epg {} is dual-homed on vpc domain {} but no port-channel matches its policy group",
                        dn::epg(&epg).unwrap_or(&epg),
                        domain.id
                    ),
                )),
            }
        }

        endpoints.push(Endpoint {
            epg,
            encap,
            paths: paths.iter().map(describe_path).collect(),
            nodes: nodes.into_iter().collect(),
            homing,
            domain: domain.map(|d| d.id),
            esi,
        });
    }

    let dual_homed = endpoints
        .iter()
        .filter(|e| e.homing == Homing::DualHomed)
        .count();
    let esi_generated = endpoints
        .iter()
        .filter(|e| e.homing == Homing::DualHomed && e.esi.is_some())
        .count();
    let migration_priority = prioritize(&endpoints);

    let score = clamp_score(
        50.0 * ratio_or_one(healthy_domains, domains.len())
            + 50.0 * ratio_or_one(esi_generated, dual_homed),
    );

    Ok(VpcSummary {
        healthy_domains,
        vpc_port_channels,
        standalone_port_channels: port_channels.len() - vpc_port_channels,
        lacp,
        single_homed: endpoints.len() - dual_homed,
        dual_homed,
        esi_generated,
        esi_candidates: esi_candidates.into_iter().collect(),
        migration_priority,
        findings,
        score,
        domains,
        port_channels,
        endpoints,
    })
}

fn collect_domains(
    index: &ObjectIndex<'_>,
    findings: &mut Vec<Finding>,
) -> Result<Vec<VpcDomain>, AnalyzerError> {
    let mut builders: BTreeMap<u16, DomainBuilder<'_>> = BTreeMap::new();

    for dom in index.get("vpcDom") {
        let id = domain_id(dom)?;
        let builder = builders.entry(id).or_default();
        builder.origin.get_or_insert(dom);
        match dn::node_id(&dom.dn) {
            Some(node) => {
                builder.members.insert(node);
                if let Some(state) = dom.attr("operSt").filter(|s| !s.is_empty()) {
                    builder.oper_state.insert(node, state.to_ascii_lowercase());
                }
            }
            None => findings.push(warning(
                "vpc_member_unknown",
                &dom.dn,
                "vpcDom DN carries no node id",
            )),
        }
        if builder.virtual_ip.is_none() {
            builder.virtual_ip = dom
                .attr("virtualIp")
                .or_else(|| dom.attr("virtIp"))
                .filter(|ip| !ip.is_empty() && *ip != "0.0.0.0")
                .map(str::to_string);
        }
    }

    for group in index.get("fabricExplicitGEp") {
        let id = domain_id(group)?;
        let builder = builders.entry(id).or_default();
        builder.origin.get_or_insert(group);
        for pep in index.children(&group.dn, "fabricNodePEp") {
            let node = pep
                .int("id")
                .and_then(|id| u32::try_from(id).ok())
                .or_else(|| dn::segment(&pep.dn, "nodepep-").and_then(|id| id.parse().ok()));
            match node {
                Some(node) => {
                    builder.members.insert(node);
                }
                None => return Err(AnalyzerError::malformed(pep, "node endpoint without id")),
            }
        }
        if builder.virtual_ip.is_none() {
            builder.virtual_ip = group
                .attr("virtualIp")
                .filter(|ip| !ip.is_empty())
                .map(str::to_string);
        }
    }

    let has_inventory = !index.get("fabricNode").is_empty();
    let mut memberships: BTreeMap<u32, Vec<u16>> = BTreeMap::new();
    let mut domains = Vec::with_capacity(builders.len());
    for (id, builder) in builders {
        if builder.members.len() > 2 {
            let members: Vec<String> = builder.members.iter().map(u32::to_string).collect();
            return Err(match builder.origin {
                Some(origin) => AnalyzerError::malformed(
                    origin,
                    format!(
                        "vpc domain {id} lists {} members ({})",
                        members.len(),
                        members.join(", ")
                    ),
                ),
                None => AnalyzerError::Malformed {
                    class: "vpcDom".to_string(),
                    dn: format!("dom-{id}"),
                    reason: "more than two members".to_string(),
                },
            });
        }

        let mut status = PeerStatus::Active;
        if builder.members.len() < 2 {
            status = PeerStatus::Incomplete;
            findings.push(warning(
                "vpc_domain_incomplete",
                &format!("vpc-{id}"),
                format!("vpc domain {id} has {} member leaf", builder.members.len()),
            ));
        }
        let mut member_names = Vec::with_capacity(builder.members.len());
        for &node in &builder.members {
            memberships.entry(node).or_default().push(id);
            match index.fabric_node(node) {
                Some(fabric) => member_names.push(fabric.name().to_string()),
                None => {
                    member_names.push(format!("node-{node}"));
                    if has_inventory {
                        debug!(domain = id, node, "vpc member missing from fabric inventory");
                        status = PeerStatus::Incomplete;
                        findings.push(warning(
                            "vpc_member_missing",
                            &format!("vpc-{id}"),
                            format!("member leaf {node} is not in the fabric inventory"),
                        ));
                    }
                }
            }
        }
        if status == PeerStatus::Active && builder.oper_state.values().any(|s| s != "up") {
            status = PeerStatus::Degraded;
        }

        domains.push(VpcDomain {
            id,
            members: builder.members.into_iter().collect(),
            member_names,
            virtual_ip: builder.virtual_ip,
            status,
        });
    }

    for (node, ids) in memberships {
        if ids.len() > 1 {
            let ids: Vec<String> = ids.iter().map(u16::to_string).collect();
            findings.push(warning(
                "leaf_in_multiple_domains",
                &format!("node-{node}"),
                format!("leaf {node} belongs to vpc domains {}", ids.join(", ")),
            ));
        }
    }
    Ok(domains)
}

fn domain_id(object: &NetworkObject) -> Result<u16, AnalyzerError> {
    object
        .int("id")
        .or_else(|| dn::segment(&object.dn, "dom-").and_then(|id| id.parse().ok()))
        .and_then(|id| u16::try_from(id).ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| AnalyzerError::malformed(object, "missing or invalid vpc domain id"))
}

type AttachmentGroups = BTreeMap<(String, String), Vec<PathEndpoint>>;

fn group_attachments(index: &ObjectIndex<'_>, findings: &mut Vec<Finding>) -> AttachmentGroups {
    let mut groups = AttachmentGroups::new();
    for att in index.get("fvRsPathAtt") {
        let Some(tdn) = att.attr("tDn") else {
            findings.push(warning("path_without_target", &att.dn, "path attachment has no tDn"));
            continue;
        };
        let Some(path) = PathEndpoint::parse(tdn) else {
            findings.push(info_finding(
                "path_unrecognized",
                &att.dn,
                format!("unrecognized path target {tdn}"),
            ));
            continue;
        };
        let epg = dn::parent_dn(&att.dn).unwrap_or(&att.dn).to_string();
        let encap = att.attr("encap").unwrap_or("unknown").to_string();
        groups.entry((epg, encap)).or_default().push(path);
    }
    groups
}

fn collect_port_channels(
    index: &ObjectIndex<'_>,
    domains: &[VpcDomain],
    attachments: &AttachmentGroups,
) -> Vec<PortChannel> {
    let mut back_refs: BTreeMap<(u32, String), u16> = BTreeMap::new();
    for rs in index.get("vpcRsVpcConf") {
        let (Some(node), Some(domain)) = (
            dn::node_id(&rs.dn),
            dn::segment(&rs.dn, "dom-").and_then(|id| id.parse().ok()),
        ) else {
            continue;
        };
        if let Some(iface) = rs.attr("tDn").and_then(dn::interface_id) {
            back_refs.insert((node, iface.to_string()), domain);
        }
    }

    let protected_groups: BTreeSet<(&str, u32)> = attachments
        .values()
        .flatten()
        .filter(|p| p.kind == dn::PathKind::Protected)
        .flat_map(|p| p.nodes.iter().map(move |n| (p.interface.as_str(), *n)))
        .collect();
    let lacp_modes = LacpModes::new(index);

    index
        .get("pcAggrIf")
        .iter()
        .map(|pc| {
            let node = dn::node_id(&pc.dn);
            let interface = dn::interface_id(&pc.dn)
                .or_else(|| pc.attr("id"))
                .unwrap_or_else(|| dn::rn(&pc.dn))
                .to_string();
            let policy_group = pc.attr("name").unwrap_or_default().to_string();

            let vpc_domain = node.and_then(|node| {
                back_refs.get(&(node, interface.clone())).copied().or_else(|| {
                    protected_groups
                        .contains(&(policy_group.as_str(), node))
                        .then(|| {
                            domains
                                .iter()
                                .find(|d| d.members.contains(&node))
                                .map(|d| d.id)
                        })
                        .flatten()
                })
            });

            PortChannel {
                lacp: lacp_modes.mode(pc, node, &interface),
                dn: pc.dn.clone(),
                node,
                interface,
                policy_group,
                vpc_domain,
            }
        })
        .collect()
}

/// LACP modes found in the snapshot, indexed once per analysis.
///
/// Objects below a port-channel take precedence over a node-level `lacpIf`
/// named after the same interface. The first parseable mode wins.
struct LacpModes<'a> {
    under_pc: BTreeMap<&'a str, LacpMode>,
    on_node: BTreeMap<(u32, &'a str), LacpMode>,
}

impl<'a> LacpModes<'a> {
    fn new(index: &ObjectIndex<'a>) -> Self {
        let port_channels: BTreeSet<&str> =
            index.get("pcAggrIf").iter().map(|pc| pc.dn.as_str()).collect();
        let mut under_pc = BTreeMap::new();
        let mut on_node = BTreeMap::new();

        for class in ["lacpIf", "lacpEntity"] {
            for lacp in index.get(class) {
                let Some(mode) = lacp.attr("mode").and_then(LacpMode::parse) else {
                    continue;
                };
                let mut ancestor = dn::parent_dn(&lacp.dn);
                while let Some(dn) = ancestor {
                    if port_channels.contains(dn) {
                        under_pc.entry(dn).or_insert(mode);
                        break;
                    }
                    ancestor = dn::parent_dn(dn);
                }
                if class == "lacpIf" {
                    if let (Some(node), Some(interface)) =
                        (dn::node_id(&lacp.dn), dn::segment(&lacp.dn, "if-"))
                    {
                        on_node.entry((node, interface)).or_insert(mode);
                    }
                }
            }
        }
        Self { under_pc, on_node }
    }

    fn mode(&self, pc: &NetworkObject, node: Option<u32>, interface: &str) -> LacpMode {
        pc.attr("pcMode")
            .and_then(LacpMode::parse)
            .or_else(|| self.under_pc.get(pc.dn.as_str()).copied())
            .or_else(|| node.and_then(|node| self.on_node.get(&(node, interface)).copied()))
            .unwrap_or(LacpMode::Unknown)
    }
}

fn resolve_esi(
    domain: &VpcDomain,
    paths: &[PathEndpoint],
    port_channels: &[PortChannel],
) -> Option<EsiCandidate> {
    let mut ordered: Vec<&PathEndpoint> = paths.iter().collect();
    ordered.sort_by_key(|p| p.kind != dn::PathKind::Protected);

    ordered.into_iter().find_map(|path| {
        port_channels
            .iter()
            .filter(|pc| pc.policy_group == path.interface || pc.interface == path.interface)
            .filter(|pc| pc.node.is_some_and(|n| domain.members.contains(&n)))
            .find_map(|pc| esi::port_channel_number(&pc.interface))
            .map(|pc_id| {
                EsiCandidate::new(domain.id, pc_id, &path.interface, &domain.members)
            })
    })
}

fn describe_path(path: &PathEndpoint) -> String {
    let nodes: Vec<String> = path.nodes.iter().map(u32::to_string).collect();
    match path.fex {
        Some(fex) => format!("{}:fex-{fex}:{}", nodes.join("-"), path.interface),
        None => format!("{}:{}", nodes.join("-"), path.interface),
    }
}

fn prioritize(endpoints: &[Endpoint]) -> Vec<MigrationPriority> {
    let mut list: Vec<MigrationPriority> = endpoints
        .iter()
        .map(|endpoint| {
            let (priority, reason) = match (endpoint.homing, &endpoint.esi) {
                (Homing::DualHomed, Some(_)) => {
                    (1, "VPC dual-homed, direct ESI mapping available")
                }
                (Homing::DualHomed, None) => (2, "dual-homed without a resolved port-channel"),
                (Homing::MultiAttached, _) => (2, "multiple attachments, needs manual review"),
                (Homing::SingleHomed, _) => (3, "single-homed, no redundancy requirements"),
            };
            MigrationPriority {
                priority,
                endpoint: endpoint.key(),
                reason: reason.to_string(),
            }
        })
        .collect();
    list.sort_by_key(|entry| entry.priority);
    list
}

impl ModuleSummary for VpcSummary {
    fn score(&self) -> Option<f64> {
        Some(self.score)
    }

    fn critical_issues(&self) -> Vec<Issue> {
        self.domains
            .iter()
            .filter(|d| d.status == PeerStatus::Incomplete)
            .map(|d| {
                Issue::new(
                    Module::Vpc,
                    "vpc_domain_incomplete",
                    format!(
                        "VPC domain {} is missing a member leaf ({})",
                        d.id,
                        d.pair_label()
                    ),
                )
            })
            .collect()
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        for domain in self.domains.iter().filter(|d| d.status == PeerStatus::Degraded) {
            out.push(Recommendation::new(
                Module::Vpc,
                Severity::High,
                format!(
                    "Restore peer health of VPC domain {} ({}) before migrating its endpoints",
                    domain.id,
                    domain.pair_label()
                ),
            ));
        }
        let unresolved = self.dual_homed - self.esi_generated;
        if unresolved > 0 {
            out.push(Recommendation::new(
                Module::Vpc,
                Severity::Medium,
                format!(
                    "Map {unresolved} dual-homed endpoint(s) to port-channels manually before assigning ESIs"
                ),
            ));
        }
        if self.lacp.on > 0 {
            out.push(Recommendation::new(
                Module::Vpc,
                Severity::Medium,
                format!(
                    "Convert {} static port-channel(s) to LACP for EVPN all-active multihoming",
                    self.lacp.on
                ),
            ));
        }
        let ready = self.domains.iter().filter(|d| d.is_healthy()).count();
        if ready > 0 {
            out.push(Recommendation::new(
                Module::Vpc,
                Severity::Low,
                format!("{ready} VPC pair(s) are ready for EVPN ESI multihoming"),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use aci_snapshot::{NetworkObject, ObjectIndex, Snapshot};

    use super::*;

    fn node(id: u32) -> NetworkObject {
        NetworkObject::new("fabricNode", format!("topology/pod-1/node-{id}"))
            .with_attr("id", id.to_string())
            .with_attr("name", format!("leaf{id}"))
            .with_attr("role", "leaf")
    }

    fn vpc_dom(node: u32, id: u16, state: &str) -> NetworkObject {
        NetworkObject::new(
            "vpcDom",
            format!("topology/pod-1/node-{node}/sys/vpc/inst/dom-{id}"),
        )
        .with_attr("id", id.to_string())
        .with_attr("operSt", state)
    }

    fn pc(node: u32, po: u16, group: &str) -> NetworkObject {
        NetworkObject::new("pcAggrIf", format!("topology/pod-1/node-{node}/sys/aggr-[po{po}]"))
            .with_attr("id", format!("po{po}"))
            .with_attr("name", group)
            .with_attr("pcMode", "active")
    }

    fn path_att(epg: &str, encap: &str, tdn: &str) -> NetworkObject {
        NetworkObject::new(
            "fvRsPathAtt",
            format!("uni/tn-prod/ap-app/epg-{epg}/rspathAtt-[{tdn}]"),
        )
        .with_attr("encap", encap)
        .with_attr("tDn", tdn)
    }

    fn pair_fabric() -> Snapshot {
        Snapshot::new()
            .with(node(101))
            .with(node(102))
            .with(vpc_dom(101, 10, "up"))
            .with(vpc_dom(102, 10, "up"))
            .with(pc(101, 1, "vpc_web"))
            .with(pc(102, 1, "vpc_web"))
            .with(path_att(
                "web",
                "vlan-100",
                "topology/pod-1/protpaths-101-102/pathep-[vpc_web]",
            ))
            .with(path_att("db", "vlan-200", "topology/pod-1/paths-101/pathep-[eth1/5]"))
    }

    #[test]
    fn pairs_domain_and_generates_esi() {
        let snapshot = pair_fabric();
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");

        assert_eq!(summary.domains.len(), 1);
        assert_eq!(summary.domains[0].members, vec![101, 102]);
        assert_eq!(summary.domains[0].status, PeerStatus::Active);
        assert_eq!(summary.dual_homed, 1);
        assert_eq!(summary.single_homed, 1);
        assert_eq!(summary.vpc_port_channels, 2);
        assert_eq!(summary.lacp.active, 2);
        assert_eq!(summary.esi_candidates.len(), 1);
        assert_eq!(summary.esi_candidates[0].esi, "00:00:00:00:00:00:00:0a:00:01");
        assert_eq!(summary.score, 100.0);
        assert_eq!(summary.migration_priority[0].priority, 1);
    }

    #[test]
    fn lacp_mode_falls_back_to_lacp_objects() {
        let without_mode = |node: u32| {
            NetworkObject::new("pcAggrIf", format!("topology/pod-1/node-{node}/sys/aggr-[po1]"))
                .with_attr("id", "po1")
                .with_attr("name", "vpc_web")
        };
        let snapshot = Snapshot::new()
            .with(without_mode(101))
            .with(without_mode(102))
            .with(without_mode(103))
            .with(
                NetworkObject::new("lacpIf", "topology/pod-1/node-101/sys/aggr-[po1]/lacp")
                    .with_attr("mode", "passive"),
            )
            .with(
                NetworkObject::new("lacpIf", "topology/pod-1/node-101/sys/lacp/inst/if-[po1]")
                    .with_attr("mode", "active"),
            )
            .with(
                NetworkObject::new("lacpIf", "topology/pod-1/node-102/sys/lacp/inst/if-[po1]")
                    .with_attr("mode", "on"),
            );
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        let modes: Vec<(Option<u32>, LacpMode)> =
            summary.port_channels.iter().map(|pc| (pc.node, pc.lacp)).collect();
        assert_eq!(
            modes,
            vec![
                (Some(101), LacpMode::Passive),
                (Some(102), LacpMode::On),
                (Some(103), LacpMode::Unknown),
            ]
        );
        assert_eq!(summary.lacp.passive, 1);
        assert_eq!(summary.lacp.unknown, 1);
    }

    #[test]
    fn empty_snapshot_is_neutral() {
        let snapshot = Snapshot::new();
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        assert_eq!(summary.score, 100.0);
        assert!(summary.critical_issues().is_empty());
    }

    #[test]
    fn single_member_domain_is_incomplete() {
        let snapshot = Snapshot::new().with(node(101)).with(vpc_dom(101, 20, "up"));
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        assert_eq!(summary.domains[0].status, PeerStatus::Incomplete);
        assert_eq!(summary.score, 50.0);
        assert_eq!(summary.critical_issues().len(), 1);
    }

    #[test]
    fn peer_down_degrades_domain() {
        let snapshot = pair_fabric().with(vpc_dom(102, 10, "down"));
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        assert_eq!(summary.domains[0].status, PeerStatus::Degraded);
        assert!(summary
            .recommendations()
            .iter()
            .any(|r| r.severity == Severity::High));
    }

    #[test]
    fn three_member_group_is_malformed() {
        let group = "uni/fabric/protpol/expgep-grp";
        let mut snapshot = Snapshot::new()
            .with(NetworkObject::new("fabricExplicitGEp", group).with_attr("id", "30"));
        for node in ["101", "102", "103"] {
            snapshot.push(
                NetworkObject::new("fabricNodePEp", format!("{group}/nodepep-{node}"))
                    .with_attr("id", node),
            );
        }
        let index = ObjectIndex::new(&snapshot);
        let err = analyze(&index, &AssessmentSettings::default()).expect_err("three members");
        assert!(matches!(err, AnalyzerError::Malformed { .. }));
    }

    #[test]
    fn unresolved_port_channel_fails_esi() {
        let snapshot = Snapshot::new()
            .with(node(101))
            .with(node(102))
            .with(vpc_dom(101, 10, "up"))
            .with(vpc_dom(102, 10, "up"))
            .with(path_att(
                "web",
                "vlan-100",
                "topology/pod-1/protpaths-101-102/pathep-[vpc_missing]",
            ));
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        assert_eq!(summary.dual_homed, 1);
        assert_eq!(summary.esi_generated, 0);
        assert_eq!(summary.score, 50.0);
        assert!(summary
            .findings
            .iter()
            .any(|f| f.code == "esi_unresolved" && f.message.starts_with("epg web is dual-homed")));
    }

    #[test]
    fn leaf_in_two_domains_is_reported() {
        let snapshot = Snapshot::new()
            .with(vpc_dom(101, 10, "up"))
            .with(vpc_dom(102, 10, "up"))
            .with(vpc_dom(101, 11, "up"))
            .with(vpc_dom(103, 11, "up"));
        let index = ObjectIndex::new(&snapshot);
        let summary = analyze(&index, &AssessmentSettings::default()).expect("analyze");
        assert!(summary
            .findings
            .iter()
            .any(|f| f.code == "leaf_in_multiple_domains" && f.subject == "node-101"));
    }
}
