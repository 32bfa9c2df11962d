//! VLAN pool allocation, usage and namespace conflicts.

pub mod overlap;
pub mod plan;

use std::collections::{BTreeMap, BTreeSet};

use aci_snapshot::{dn, NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::issue::{
    clamp_score, warning, AnalyzerError, Finding, Issue, Module, ModuleSummary,
    Recommendation, Severity,
};
use crate::settings::AssessmentSettings;

pub use overlap::{BlockRef, ConflictKind, VlanConflict};
pub use plan::{MigrationStrategy, RenumberPlan, Renumbering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocMode {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fragmentation {
    Contiguous,
    Moderate,
    High,
}

impl Fragmentation {
    fn from_blocks(blocks: usize) -> Self {
        match blocks {
            0 | 1 => Fragmentation::Contiguous,
            2..=5 => Fragmentation::Moderate,
            _ => Fragmentation::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolComplexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VlanBlock {
    pub from: u16,
    pub to: u16,
}

impl VlanBlock {
    pub fn size(&self) -> usize {
        usize::from(self.to - self.from) + 1
    }

    pub fn contains(&self, vlan: u16) -> bool {
        (self.from..=self.to).contains(&vlan)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolDomain {
    pub dn: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlanPool {
    pub name: String,
    pub dn: String,
    pub alloc_mode: AllocMode,
    pub blocks: Vec<VlanBlock>,
    pub allocated: usize,
    pub used: usize,
    pub utilization: f64,
    pub fragmentation: Fragmentation,
    pub complexity: PoolComplexity,
    pub domains: Vec<PoolDomain>,
}

impl VlanPool {
    pub fn contains(&self, vlan: u16) -> bool {
        self.blocks.iter().any(|b| b.contains(vlan))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationModes {
    pub static_pools: usize,
    pub dynamic_pools: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentationCounts {
    pub contiguous: usize,
    pub moderate: usize,
    pub high: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlanSummary {
    pub pools: Vec<VlanPool>,
    pub allocated: usize,
    pub used_vlans: Vec<u16>,
    /// Used ids that fall inside at least one pool block.
    pub used_in_pools: usize,
    pub unallocated_in_use: Vec<u16>,
    pub utilization: f64,
    pub allocation_modes: AllocationModes,
    pub fragmentation: FragmentationCounts,
    pub conflicts: Vec<VlanConflict>,
    pub strategy: MigrationStrategy,
    pub consolidation_recommended: bool,
    pub consolidation_candidates: Vec<String>,
    pub renumbering: RenumberPlan,
    pub migration_steps: Vec<String>,
    pub findings: Vec<Finding>,
    pub score: f64,
}

impl VlanSummary {
    pub fn self_conflicts(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::SelfOverlap)
            .count()
    }
}

const CONSOLIDATION_POOL_UTILIZATION: f64 = 30.0;
const CONSOLIDATION_POOL_MIN_SIZE: usize = 50;

pub fn analyze(
    index: &ObjectIndex<'_>,
    settings: &AssessmentSettings,
) -> Result<VlanSummary, AnalyzerError> {
    info!(
        pools = index.get("fvnsVlanInstP").len(),
        blocks = index.get("fvnsEncapBlk").len(),
        path_attachments = index.get("fvRsPathAtt").len() + index.get("l3extRsPathL3OutAtt").len(),
        "vlan analysis"
    );
    let mut findings = Vec::new();
    let used = used_vlans(index, &mut findings);
    let domains = pool_domains(index);

    let mut pools = Vec::with_capacity(index.get("fvnsVlanInstP").len());
    let mut block_refs = Vec::new();
    for pool in index.get("fvnsVlanInstP") {
        let blocks = index
            .children(&pool.dn, "fvnsEncapBlk")
            .into_iter()
            .map(parse_block)
            .collect::<Result<Vec<_>, _>>()?;
        if blocks.is_empty() {
            findings.push(warning("pool_empty", &pool.dn, "VLAN pool has no encap blocks"));
        }
        let name = pool_name(pool);
        block_refs.extend(blocks.iter().map(|b| BlockRef {
            pool: pool.dn.clone(),
            from: b.from,
            to: b.to,
        }));
        let alloc_mode = match pool.attr("allocMode") {
            Some("dynamic") => AllocMode::Dynamic,
            _ => AllocMode::Static,
        };
        let allocated: usize = blocks.iter().map(VlanBlock::size).sum();
        let used_here = used
            .iter()
            .filter(|vlan| blocks.iter().any(|b| b.contains(**vlan)))
            .count();
        pools.push(VlanPool {
            name,
            dn: pool.dn.clone(),
            alloc_mode,
            fragmentation: Fragmentation::from_blocks(blocks.len()),
            complexity: PoolComplexity::Low,
            utilization: plan::utilization(used_here, allocated),
            used: used_here,
            allocated,
            domains: domains.get(pool.dn.as_str()).cloned().unwrap_or_default(),
            blocks,
        });
    }

    let conflicts = overlap::find_conflicts(&block_refs);
    for conflict in &conflicts {
        debug!(
            first = %conflict.first.pool,
            second = %conflict.second.pool,
            from = conflict.overlap_from,
            to = conflict.overlap_to,
            "vlan range overlap"
        );
    }
    for pool in &mut pools {
        let overlaps = conflicts
            .iter()
            .filter(|c| c.first.pool == pool.dn || c.second.pool == pool.dn)
            .count();
        pool.complexity = pool_complexity(pool, overlaps);
    }

    let allocated: usize = pools.iter().map(|p| p.allocated).sum();
    let used_in_pools = used
        .iter()
        .filter(|vlan| pools.iter().any(|p| p.contains(**vlan)))
        .count();
    let unallocated_in_use: Vec<u16> = used
        .iter()
        .copied()
        .filter(|vlan| !pools.iter().any(|p| p.contains(*vlan)))
        .collect();
    for vlan in &unallocated_in_use {
        findings.push(warning(
            "vlan_unallocated",
            &format!("vlan-{vlan}"),
            format!("VLAN {vlan} is in use but not allocated by any pool"),
        ));
    }
    let utilization = plan::utilization(used_in_pools, allocated);

    let vlan_settings = &settings.vlan;
    let consolidation_recommended =
        allocated > 0 && utilization < vlan_settings.low_utilization_threshold;
    let strategy = MigrationStrategy::decide(conflicts.len(), consolidation_recommended);

    let mut taken: BTreeSet<u16> = used.clone();
    for pool in &pools {
        for block in &pool.blocks {
            taken.extend(block.from..=block.to);
        }
    }
    let renumbering = plan::renumber(&conflicts, &taken, vlan_settings.renumber_start);
    if !renumbering.unassigned.is_empty() {
        findings.push(warning(
            "renumber_exhausted",
            "vlan",
            format!(
                "no free VLAN id left for {} conflicting VLAN(s)",
                renumbering.unassigned.len()
            ),
        ));
    }

    let consolidation_candidates = pools
        .iter()
        .filter(|p| {
            p.allocated > CONSOLIDATION_POOL_MIN_SIZE
                && p.utilization < CONSOLIDATION_POOL_UTILIZATION
        })
        .map(|p| p.name.clone())
        .collect();

    let mut allocation_modes = AllocationModes::default();
    let mut fragmentation = FragmentationCounts::default();
    for pool in &pools {
        match pool.alloc_mode {
            AllocMode::Static => allocation_modes.static_pools += 1,
            AllocMode::Dynamic => allocation_modes.dynamic_pools += 1,
        }
        match pool.fragmentation {
            Fragmentation::Contiguous => fragmentation.contiguous += 1,
            Fragmentation::Moderate => fragmentation.moderate += 1,
            Fragmentation::High => fragmentation.high += 1,
        }
    }

    let conflict_penalty = (conflicts.len() as f64 * vlan_settings.conflict_penalty)
        .min(vlan_settings.conflict_penalty_cap);
    let score = clamp_score(
        100.0 - conflict_penalty - (100.0 - utilization) * vlan_settings.utilization_coefficient,
    );

    Ok(VlanSummary {
        allocated,
        used_vlans: used.into_iter().collect(),
        used_in_pools,
        unallocated_in_use,
        utilization,
        allocation_modes,
        fragmentation,
        strategy,
        consolidation_recommended,
        consolidation_candidates,
        renumbering,
        migration_steps: strategy.steps(),
        conflicts,
        pools,
        findings,
        score,
    })
}

fn parse_vlan(block: &NetworkObject, key: &str) -> Result<u16, AnalyzerError> {
    let raw = block
        .text(key)
        .ok_or_else(|| AnalyzerError::malformed(block, format!("missing `{key}`")))?;
    let digits = raw.trim().strip_prefix("vlan-").unwrap_or(raw.trim());
    digits
        .parse::<u16>()
        .ok()
        .filter(|id| (1..=plan::MAX_VLAN).contains(id))
        .ok_or_else(|| AnalyzerError::malformed(block, format!("{key} `{raw}` is not a VLAN id")))
}

fn parse_block(block: &NetworkObject) -> Result<VlanBlock, AnalyzerError> {
    let from = parse_vlan(block, "from")?;
    let to = parse_vlan(block, "to")?;
    if from > to {
        return Err(AnalyzerError::malformed(
            block,
            format!("range starts at {from} after it ends at {to}"),
        ));
    }
    Ok(VlanBlock { from, to })
}

/// `uni/infra/vlanns-[name]-static` names the pool when `name` is absent.
fn pool_name(pool: &NetworkObject) -> String {
    if let Some(name) = pool.attr("name").filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    dn::segment(&pool.dn, "vlanns-")
        .unwrap_or(&pool.dn)
        .to_string()
}

fn encap_vlan(encap: &str) -> Option<u16> {
    encap
        .strip_prefix("vlan-")?
        .parse()
        .ok()
        .filter(|id| (1..=plan::MAX_VLAN).contains(id))
}

fn used_vlans(index: &ObjectIndex<'_>, findings: &mut Vec<Finding>) -> BTreeSet<u16> {
    let mut used = BTreeSet::new();
    for class in ["fvRsPathAtt", "l3extRsPathL3OutAtt"] {
        for att in index.get(class) {
            let Some(encap) = att.attr("encap").filter(|e| !e.is_empty() && *e != "unknown") else {
                continue;
            };
            match encap_vlan(encap) {
                Some(vlan) => {
                    used.insert(vlan);
                }
                None if encap.starts_with("vlan-") => findings.push(warning(
                    "encap_invalid",
                    &att.dn,
                    format!("encap {encap} is outside the VLAN range"),
                )),
                None => {}
            }
        }
    }
    used
}

fn pool_domains<'a>(index: &ObjectIndex<'a>) -> BTreeMap<&'a str, Vec<PoolDomain>> {
    let mut domains: BTreeMap<&str, Vec<PoolDomain>> = BTreeMap::new();
    for class in ["infraRsVlanNs", "vmmRsVlanNs", "l3extRsVlanNs"] {
        for rs in index.get(class) {
            let (Some(pool), Some(domain)) = (rs.attr("tDn"), dn::parent_dn(&rs.dn)) else {
                continue;
            };
            let kind = match index.parent(&rs.dn).map(|p| p.class.as_str()) {
                Some("physDomP") => "physical",
                Some("vmmDomP") => "vmm",
                Some("l3extDomP") => "l3",
                Some(_) | None => match class {
                    "vmmRsVlanNs" => "vmm",
                    "l3extRsVlanNs" => "l3",
                    _ if domain.starts_with("uni/l3dom-") => "l3",
                    _ => "physical",
                },
            };
            domains.entry(pool).or_default().push(PoolDomain {
                dn: domain.to_string(),
                kind: kind.to_string(),
            });
        }
    }
    domains
}

fn pool_complexity(pool: &VlanPool, overlaps: usize) -> PoolComplexity {
    let mut points = 0;
    if pool.alloc_mode == AllocMode::Dynamic {
        points += 30;
    }
    points += match pool.blocks.len() {
        0 | 1 => 0,
        2..=5 => 10,
        _ => 20,
    };
    points += match pool.allocated {
        0..=100 => 0,
        101..=500 => 10,
        _ => 20,
    };
    points += overlaps * 15;
    match points {
        0..=29 => PoolComplexity::Low,
        30..=59 => PoolComplexity::Medium,
        _ => PoolComplexity::High,
    }
}

impl ModuleSummary for VlanSummary {
    fn score(&self) -> Option<f64> {
        Some(self.score)
    }

    fn critical_issues(&self) -> Vec<Issue> {
        self.conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Cross)
            .map(|c| {
                Issue::new(
                    Module::Vlan,
                    "vlan_pool_overlap",
                    format!(
                        "VLANs {}-{} are allocated by both {} and {}",
                        c.overlap_from, c.overlap_to, c.first.pool, c.second.pool
                    ),
                )
            })
            .collect()
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        if !self.conflicts.is_empty() {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::High,
                format!(
                    "Resolve {} overlapping VLAN range(s) using the renumbering map ({} VLAN(s) moved)",
                    self.conflicts.len(),
                    self.renumbering.mapping.len()
                ),
            ));
        }
        let duplicates = self.self_conflicts();
        if duplicates > 0 {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::Medium,
                format!("Remove {duplicates} duplicated range(s) inside a single pool"),
            ));
        }
        if self.allocation_modes.dynamic_pools > 0 {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::Medium,
                format!(
                    "Plan static VLAN assignments for {} dynamic pool(s); the target fabric does not allocate from pools",
                    self.allocation_modes.dynamic_pools
                ),
            ));
        }
        if !self.unallocated_in_use.is_empty() {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::Medium,
                format!(
                    "Allocate {} VLAN(s) that are in use outside every pool",
                    self.unallocated_in_use.len()
                ),
            ));
        }
        if self.consolidation_recommended {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::Low,
                format!(
                    "Consolidate VLAN pools: {:.1}% of {} allocated VLANs are in use",
                    self.utilization, self.allocated
                ),
            ));
        }
        if self.fragmentation.high > 0 {
            out.push(Recommendation::new(
                Module::Vlan,
                Severity::Low,
                format!(
                    "Merge ranges of {} highly fragmented pool(s)",
                    self.fragmentation.high
                ),
            ));
        }
        out
    }
}
