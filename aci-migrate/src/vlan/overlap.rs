//! Closed-interval overlap detection across every encap block.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Both blocks belong to one pool, usually a duplicated range.
    #[serde(rename = "self")]
    SelfOverlap,
    Cross,
}

/// One block as seen by the sweep: the owning pool and its closed range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRef {
    pub pool: String,
    pub from: u16,
    pub to: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanConflict {
    pub kind: ConflictKind,
    pub first: BlockRef,
    pub second: BlockRef,
    pub overlap_from: u16,
    pub overlap_to: u16,
}

impl VlanConflict {
    pub fn vlan_count(&self) -> usize {
        usize::from(self.overlap_to - self.overlap_from) + 1
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> {
        self.overlap_from..=self.overlap_to
    }
}

pub fn overlaps(a: (u16, u16), b: (u16, u16)) -> bool {
    a.0.max(b.0) <= a.1.min(b.1)
}

/// Every overlapping pair of blocks, each pair reported once.
///
/// Blocks are sorted by lower bound and swept with an active set of blocks
/// whose upper bound has not been passed yet, so the cost is
/// `O(n log n + k)` for `k` conflicts.
pub fn find_conflicts(blocks: &[BlockRef]) -> Vec<VlanConflict> {
    let mut order: Vec<&BlockRef> = blocks.iter().collect();
    order.sort_by(|a, b| (a.from, a.to, &a.pool).cmp(&(b.from, b.to, &b.pool)));

    let mut active: Vec<&BlockRef> = Vec::new();
    let mut conflicts = Vec::new();
    for block in order {
        active.retain(|open| open.to >= block.from);
        for open in &active {
            conflicts.push(VlanConflict {
                kind: if open.pool == block.pool {
                    ConflictKind::SelfOverlap
                } else {
                    ConflictKind::Cross
                },
                first: (*open).clone(),
                second: block.clone(),
                overlap_from: block.from,
                overlap_to: open.to.min(block.to),
            });
        }
        active.push(block);
    }
    conflicts
}
