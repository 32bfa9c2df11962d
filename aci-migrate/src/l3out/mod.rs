//! External routing (L3Out) analysis.
//!
//! Every `l3extOut` is classified by the routing protocols below it, its
//! border leaves are taken from the logical node profile, and BGP peers are
//! typed eBGP/iBGP by comparing the remote AS with the local one.

pub mod bgp;
pub mod templates;

use std::collections::{BTreeMap, BTreeSet};

use aci_snapshot::dn::{self, PathEndpoint};
use aci_snapshot::{NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::issue::{
    clamp_score, info as info_finding, warning, AnalyzerError, Finding, Issue, Module,
    ModuleSummary, Recommendation, Severity,
};
use crate::settings::AssessmentSettings;

pub use bgp::{BgpPeer, SessionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Bgp,
    Ospf,
    Static,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Bgp => "bgp",
            Protocol::Ospf => "ospf",
            Protocol::Static => "static",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingComplexity {
    Low,
    Medium,
    High,
}

impl RoutingComplexity {
    pub fn from_points(points: u32) -> Self {
        match points {
            0..=29 => RoutingComplexity::Low,
            30..=59 => RoutingComplexity::Medium,
            _ => RoutingComplexity::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoutingComplexity::Low => "low",
            RoutingComplexity::Medium => "medium",
            RoutingComplexity::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorderLeaf {
    pub node: u32,
    pub name: String,
    pub router_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedInterface {
    pub path: String,
    pub nodes: Vec<u32>,
    pub address: Option<String>,
    pub encap: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticRoute {
    pub prefix: String,
    pub next_hops: Vec<String>,
    pub node: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OspfArea {
    pub id: String,
    pub area_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalEpg {
    pub name: String,
    pub dn: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L3Out {
    pub name: String,
    pub dn: String,
    pub tenant: String,
    pub vrf: Option<String>,
    pub protocols: Vec<Protocol>,
    pub border_leaves: Vec<BorderLeaf>,
    pub interfaces: Vec<RoutedInterface>,
    pub bgp_peers: Vec<BgpPeer>,
    pub ospf: Option<OspfArea>,
    pub ospf_interfaces: usize,
    pub static_routes: Vec<StaticRoute>,
    pub external_epgs: Vec<ExternalEpg>,
    pub complexity_points: u32,
    pub complexity: RoutingComplexity,
}

impl L3Out {
    pub fn has(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }

    pub fn is_static_only(&self) -> bool {
        self.protocols == [Protocol::Static]
    }

    pub fn is_multi_protocol(&self) -> bool {
        self.protocols.len() > 1
    }

    pub fn subnet_count(&self) -> usize {
        self.external_epgs.iter().map(|epg| epg.subnets.len()).sum()
    }

    /// `tenant-vrf`, the VRF name used in rendered configuration.
    pub fn vrf_label(&self) -> String {
        match &self.vrf {
            Some(vrf) => format!("{}-{vrf}", self.tenant),
            None => format!("{}-{}", self.tenant, self.name),
        }
    }
}

/// L3Outs per protocol. A multi-protocol L3Out counts in each bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolCounts {
    pub bgp: usize,
    pub ospf: usize,
    pub static_routes: usize,
    pub multiple: usize,
    pub none: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BgpStats {
    pub fabric_as: Option<u32>,
    pub peers: usize,
    pub ebgp: usize,
    pub ibgp: usize,
    pub unknown: usize,
    pub remote_as_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFactor {
    pub level: Severity,
    pub factor: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L3OutSummary {
    pub l3outs: Vec<L3Out>,
    pub protocols: ProtocolCounts,
    pub bgp: BgpStats,
    pub border_leaves: Vec<u32>,
    pub vrfs: Vec<String>,
    pub ospf_areas: Vec<String>,
    pub static_only: usize,
    pub without_border_leaf: usize,
    pub complexity: ComplexityCounts,
    pub risk_factors: Vec<RiskFactor>,
    pub findings: Vec<Finding>,
    pub score: f64,
}

const EBGP_RISK_THRESHOLD: usize = 10;
const BORDER_LEAF_RISK_THRESHOLD: usize = 4;

pub fn analyze(
    index: &ObjectIndex<'_>,
    settings: &AssessmentSettings,
) -> Result<L3OutSummary, AnalyzerError> {
    info!(
        l3outs = index.get("l3extOut").len(),
        bgp_peers = index.get("bgpPeerP").len(),
        ospf = index.get("ospfExtP").len(),
        static_routes = index.get("ipRouteP").len(),
        "l3out analysis"
    );
    let fabric_as = bgp::fabric_asn(index);
    let mut findings = Vec::new();
    let mut l3outs = Vec::with_capacity(index.get("l3extOut").len());
    for out in index.get("l3extOut") {
        l3outs.push(build(index, out, fabric_as, &mut findings)?);
    }

    let mut protocols = ProtocolCounts::default();
    let mut stats = BgpStats {
        fabric_as,
        ..BgpStats::default()
    };
    let mut complexity = ComplexityCounts::default();
    let mut border_leaves = BTreeSet::new();
    let mut vrfs = BTreeSet::new();
    let mut areas = BTreeSet::new();
    let mut remote_as = BTreeSet::new();

    for out in &l3outs {
        if out.has(Protocol::Bgp) {
            protocols.bgp += 1;
        }
        if out.has(Protocol::Ospf) {
            protocols.ospf += 1;
        }
        if out.has(Protocol::Static) {
            protocols.static_routes += 1;
        }
        if out.is_multi_protocol() {
            protocols.multiple += 1;
        }
        if out.protocols.is_empty() {
            protocols.none += 1;
        }
        match out.complexity {
            RoutingComplexity::Low => complexity.low += 1,
            RoutingComplexity::Medium => complexity.medium += 1,
            RoutingComplexity::High => complexity.high += 1,
        }
        border_leaves.extend(out.border_leaves.iter().map(|leaf| leaf.node));
        if let Some(vrf) = &out.vrf {
            vrfs.insert(format!("{}:{vrf}", out.tenant));
        }
        if let Some(area) = &out.ospf {
            areas.insert(area.id.clone());
        }
        for peer in &out.bgp_peers {
            stats.peers += 1;
            match peer.session {
                SessionType::Ebgp => stats.ebgp += 1,
                SessionType::Ibgp => stats.ibgp += 1,
                SessionType::Unknown => stats.unknown += 1,
            }
            remote_as.extend(peer.remote_as);
        }
    }
    stats.remote_as_numbers = remote_as.into_iter().collect();

    let static_only = l3outs.iter().filter(|out| out.is_static_only()).count();
    let without_border_leaf = l3outs
        .iter()
        .filter(|out| out.border_leaves.is_empty())
        .count();
    let score = clamp_score(
        100.0
            - static_only as f64 * settings.l3out.static_only_penalty
            - without_border_leaf as f64 * settings.l3out.missing_border_leaf_penalty,
    );

    let border_leaves: Vec<u32> = border_leaves.into_iter().collect();
    let risk_factors = risk_factors(&stats, border_leaves.len(), protocols.multiple);

    Ok(L3OutSummary {
        l3outs,
        protocols,
        bgp: stats,
        border_leaves,
        vrfs: vrfs.into_iter().collect(),
        ospf_areas: areas.into_iter().collect(),
        static_only,
        without_border_leaf,
        complexity,
        risk_factors,
        findings,
        score,
    })
}

fn build(
    index: &ObjectIndex<'_>,
    out: &NetworkObject,
    fabric_as: Option<u32>,
    findings: &mut Vec<Finding>,
) -> Result<L3Out, AnalyzerError> {
    let tenant = dn::tenant(&out.dn).unwrap_or("unknown").to_string();
    let vrf = index
        .first_child(&out.dn, "l3extRsEctx")
        .and_then(|rs| rs.attr("tnFvCtxName"))
        .filter(|vrf| !vrf.is_empty())
        .map(str::to_string);

    let border_leaves = border_leaves(index, &out.dn, findings);
    let interfaces = index
        .descendants(&out.dn, "l3extRsPathL3OutAtt")
        .into_iter()
        .filter_map(|rs| {
            let path = rs.attr("tDn")?;
            Some(RoutedInterface {
                path: path.to_string(),
                nodes: PathEndpoint::parse(path).map(|p| p.nodes).unwrap_or_default(),
                address: rs.attr("addr").filter(|a| *a != "0.0.0.0").map(str::to_string),
                encap: rs.attr("encap").filter(|e| *e != "unknown").map(str::to_string),
                mode: rs.attr("ifInstT").map(str::to_string),
            })
        })
        .collect();

    let bgp_peers = bgp::peers(index, &out.dn, fabric_as);
    for peer in bgp_peers.iter().filter(|p| p.session == SessionType::Unknown) {
        debug!(peer = %peer.dn, "bgp session type unresolved");
        findings.push(info_finding(
            "bgp_session_unknown",
            &peer.dn,
            format!("peer {} has no resolvable local or remote AS", peer.address),
        ));
    }

    let ospf = index.first_child(&out.dn, "ospfExtP").map(|ext| OspfArea {
        id: normalize_area(ext.attr("areaId").unwrap_or("backbone")),
        area_type: ext.attr("areaType").map(str::to_string),
    });
    let ospf_interfaces = index.descendants(&out.dn, "ospfIfP").len();

    let mut static_routes = Vec::new();
    for route in index.descendants(&out.dn, "ipRouteP") {
        let prefix = route
            .attr("ip")
            .filter(|ip| !ip.is_empty())
            .ok_or_else(|| AnalyzerError::malformed(route, "static route without prefix"))?;
        static_routes.push(StaticRoute {
            prefix: prefix.to_string(),
            next_hops: index
                .children(&route.dn, "ipNexthopP")
                .into_iter()
                .filter_map(|hop| {
                    hop.attr("nhAddr")
                        .map(str::to_string)
                        .or_else(|| dn::segment(&hop.dn, "nh-").map(str::to_string))
                })
                .collect(),
            node: dn::segment(&route.dn, "rsnodeL3OutAtt-").and_then(dn::node_id),
        });
    }

    let external_epgs = index
        .children(&out.dn, "l3extInstP")
        .into_iter()
        .map(|epg| ExternalEpg {
            name: epg.name().to_string(),
            dn: epg.dn.clone(),
            subnets: index
                .children(&epg.dn, "l3extSubnet")
                .into_iter()
                .filter_map(|subnet| subnet.attr("ip").map(str::to_string))
                .collect(),
        })
        .collect();

    let mut protocols = Vec::new();
    if !bgp_peers.is_empty() || index.first_child(&out.dn, "bgpExtP").is_some() {
        protocols.push(Protocol::Bgp);
    }
    if ospf.is_some() || ospf_interfaces > 0 {
        protocols.push(Protocol::Ospf);
    }
    if !static_routes.is_empty() {
        protocols.push(Protocol::Static);
    }

    let mut l3out = L3Out {
        name: out.name().to_string(),
        dn: out.dn.clone(),
        tenant,
        vrf,
        protocols,
        border_leaves,
        interfaces,
        bgp_peers,
        ospf,
        ospf_interfaces,
        static_routes,
        external_epgs,
        complexity_points: 0,
        complexity: RoutingComplexity::Low,
    };
    l3out.complexity_points = complexity_points(&l3out);
    l3out.complexity = RoutingComplexity::from_points(l3out.complexity_points);
    Ok(l3out)
}

fn border_leaves(
    index: &ObjectIndex<'_>,
    l3out_dn: &str,
    findings: &mut Vec<Finding>,
) -> Vec<BorderLeaf> {
    let mut leaves: BTreeMap<u32, BorderLeaf> = BTreeMap::new();
    for rs in index.descendants(l3out_dn, "l3extRsNodeL3OutAtt") {
        let Some(node) = rs.attr("tDn").and_then(dn::node_id) else {
            findings.push(warning(
                "border_leaf_unresolved",
                &rs.dn,
                "node profile attachment does not name a leaf",
            ));
            continue;
        };
        let router_id = rs
            .attr("rtrId")
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let name = index
            .fabric_node(node)
            .map(|fabric| fabric.name().to_string())
            .unwrap_or_else(|| format!("node-{node}"));
        leaves
            .entry(node)
            .and_modify(|leaf| {
                if leaf.router_id.is_none() {
                    leaf.router_id = router_id.clone();
                }
            })
            .or_insert(BorderLeaf {
                node,
                name,
                router_id,
            });
    }
    leaves.into_values().collect()
}

/// `backbone` and plain integers are written in dotted form.
fn normalize_area(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("backbone") {
        return "0.0.0.0".to_string();
    }
    match raw.parse::<u32>() {
        Ok(id) => std::net::Ipv4Addr::from(id).to_string(),
        Err(_) => raw.to_string(),
    }
}

fn complexity_points(out: &L3Out) -> u32 {
    let mut points = 0;
    if out.is_multi_protocol() {
        points += 30;
    }
    if out.has(Protocol::Bgp) {
        points += 20;
    }
    if out.has(Protocol::Ospf) {
        points += 15;
    }
    points += 5 * out.border_leaves.len() as u32;
    points + out.subnet_count().min(30) as u32
}

fn risk_factors(stats: &BgpStats, border_leaves: usize, multi_protocol: usize) -> Vec<RiskFactor> {
    let mut risks = Vec::new();
    if stats.ebgp > EBGP_RISK_THRESHOLD {
        risks.push(RiskFactor {
            level: Severity::Medium,
            factor: "high eBGP session count".to_string(),
            impact: format!("{} external BGP sessions need coordinated cutover", stats.ebgp),
        });
    }
    if border_leaves > BORDER_LEAF_RISK_THRESHOLD {
        risks.push(RiskFactor {
            level: Severity::High,
            factor: "many border leaves".to_string(),
            impact: format!("{border_leaves} border leaves carry external routing"),
        });
    }
    if multi_protocol > 0 {
        risks.push(RiskFactor {
            level: Severity::Medium,
            factor: "multi-protocol L3Outs".to_string(),
            impact: format!("{multi_protocol} L3Out(s) mix routing protocols"),
        });
    }
    risks
}

impl ModuleSummary for L3OutSummary {
    fn score(&self) -> Option<f64> {
        Some(self.score)
    }

    fn critical_issues(&self) -> Vec<Issue> {
        self.l3outs
            .iter()
            .filter(|out| out.vrf.is_none())
            .map(|out| {
                Issue::new(
                    Module::L3out,
                    "l3out_without_vrf",
                    format!("L3Out {}/{} is not bound to a VRF", out.tenant, out.name),
                )
            })
            .collect()
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        if self.bgp.peers > 0 {
            out.push(Recommendation::new(
                Module::L3out,
                Severity::High,
                format!(
                    "Migrate {} BGP peer session(s) ({} eBGP, {} iBGP) to the EVPN border",
                    self.bgp.peers, self.bgp.ebgp, self.bgp.ibgp
                ),
            ));
        }
        if self.bgp.unknown > 0 {
            out.push(Recommendation::new(
                Module::L3out,
                Severity::Medium,
                format!(
                    "Confirm AS numbers for {} BGP peer(s) whose session type is unknown",
                    self.bgp.unknown
                ),
            ));
        }
        if !self.ospf_areas.is_empty() {
            out.push(Recommendation::new(
                Module::L3out,
                Severity::High,
                format!(
                    "Recreate OSPF adjacencies across {} area(s): {}",
                    self.ospf_areas.len(),
                    self.ospf_areas.join(", ")
                ),
            ));
        }
        if !self.border_leaves.is_empty() {
            out.push(Recommendation::new(
                Module::L3out,
                Severity::High,
                format!(
                    "Migrate {} border leaf switch(es) carrying external routing for {} VRF(s)",
                    self.border_leaves.len(),
                    self.vrfs.len()
                ),
            ));
        }
        for l3out in &self.l3outs {
            if l3out.border_leaves.is_empty() {
                out.push(Recommendation::new(
                    Module::L3out,
                    Severity::Medium,
                    format!(
                        "Complete the node profile of L3Out {}/{}: no border leaf is referenced",
                        l3out.tenant, l3out.name
                    ),
                ));
            }
            if l3out.complexity == RoutingComplexity::High {
                out.push(Recommendation::new(
                    Module::L3out,
                    Severity::Medium,
                    format!(
                        "Plan a dedicated cutover window for L3Out {}/{} (complexity {})",
                        l3out.tenant, l3out.name, l3out.complexity_points
                    ),
                ));
            }
            if l3out.is_static_only() {
                out.push(Recommendation::new(
                    Module::L3out,
                    Severity::Low,
                    format!(
                        "Document {} static route(s) of L3Out {}/{} or move it to dynamic routing",
                        l3out.static_routes.len(),
                        l3out.tenant,
                        l3out.name
                    ),
                ));
            }
        }
        out
    }
}
