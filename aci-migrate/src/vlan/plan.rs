use std::collections::BTreeSet;

use serde::Serialize;

use super::overlap::VlanConflict;

pub const MAX_VLAN: u16 = 4094;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStrategy {
    DirectMapping,
    RenumberingRequired,
    Consolidation,
}

impl MigrationStrategy {
    /// Conflicts force renumbering. Without conflicts a low utilization
    /// makes consolidation the strategy.
    pub fn decide(conflicts: usize, consolidation_recommended: bool) -> Self {
        if conflicts > 0 {
            MigrationStrategy::RenumberingRequired
        } else if consolidation_recommended {
            MigrationStrategy::Consolidation
        } else {
            MigrationStrategy::DirectMapping
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MigrationStrategy::DirectMapping => "direct mapping",
            MigrationStrategy::RenumberingRequired => "renumbering required",
            MigrationStrategy::Consolidation => "consolidation",
        }
    }

    pub fn steps(self) -> Vec<String> {
        let steps: &[&str] = match self {
            MigrationStrategy::DirectMapping => &[
                "Document current VLAN allocations",
                "Configure the same VLAN ids on the target fabric",
                "Migrate EPG by EPG keeping VLAN ids",
                "Verify VLAN connectivity after each EPG",
            ],
            MigrationStrategy::RenumberingRequired => &[
                "Document all current VLAN assignments",
                "Review the conflict-free renumbering map",
                "Pre-configure the new VLANs on the target fabric",
                "Migrate with VLAN translation in stages",
                "Update documentation and diagrams",
                "Verify end-to-end connectivity",
            ],
            MigrationStrategy::Consolidation => &[
                "Identify unused VLANs in lightly used pools",
                "Design a consolidated VLAN scheme",
                "Map old VLAN ids to the consolidated ranges",
                "Configure the target fabric with the reduced ranges",
                "Migrate and reclaim unused VLAN ids",
            ],
        };
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect()
    }
}

/// `part / whole * 100`, 0 when nothing is allocated.
pub fn utilization(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Renumbering {
    pub old_vlan: u16,
    pub new_vlan: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenumberPlan {
    pub mapping: Vec<Renumbering>,
    /// Conflicting ids left without a free replacement.
    pub unassigned: Vec<u16>,
}

/// New ids for every conflicting VLAN, handed out upward from `start` and
/// skipping ids that are allocated or in use anywhere.
pub fn renumber(conflicts: &[VlanConflict], taken: &BTreeSet<u16>, start: u16) -> RenumberPlan {
    let conflicting: BTreeSet<u16> = conflicts.iter().flat_map(VlanConflict::ids).collect();
    let mut plan = RenumberPlan::default();
    let mut candidates = (start.max(1)..=MAX_VLAN).filter(|id| !taken.contains(id));
    for old_vlan in conflicting {
        match candidates.next() {
            Some(new_vlan) => plan.mapping.push(Renumbering { old_vlan, new_vlan }),
            None => plan.unassigned.push(old_vlan),
        }
    }
    plan
}
