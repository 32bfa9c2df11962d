//! Interface policy groups resolved through the access policy chain.
//!
//! `infraNodeP` selects leaves through `infraLeafS/infraNodeBlk` and binds
//! interface profiles with `infraRsAccPortP`. Each `infraAccPortP` selects
//! ports through `infraHPortS/infraPortBlk` and names the policy group with
//! `infraRsAccBaseGrp`.

use aci_snapshot::{dn, NetworkObject, ObjectIndex};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyGroupKind {
    Access,
    PortChannel,
    Vpc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyAssignment {
    pub policy_group: String,
    pub kind: PolicyGroupKind,
}

type Range = (u32, u32);

fn contains((low, high): Range, value: u32) -> bool {
    (low..=high).contains(&value)
}

/// Ports one selector block covers, kept as ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PortBlock {
    cards: Range,
    ports: Range,
    assignment: PolicyAssignment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeRule {
    leaves: Vec<Range>,
    blocks: Vec<PortBlock>,
}

/// Resolved access policy chain. Lookups test an interface against the
/// selector ranges; the first matching block in profile order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortPolicies {
    rules: Vec<NodeRule>,
}

impl PortPolicies {
    /// Policy group applied to `interface` (`eth<card>/<port>`) on `leaf`.
    pub fn get(&self, leaf: u32, interface: &str) -> Option<&PolicyAssignment> {
        let (card, port) = parse_interface(interface)?;
        self.rules
            .iter()
            .filter(|rule| rule.leaves.iter().any(|&r| contains(r, leaf)))
            .flat_map(|rule| &rule.blocks)
            .find(|block| contains(block.cards, card) && contains(block.ports, port))
            .map(|block| &block.assignment)
    }
}

fn parse_interface(interface: &str) -> Option<(u32, u32)> {
    let (card, port) = interface.strip_prefix("eth")?.split_once('/')?;
    Some((card.parse().ok()?, port.parse().ok()?))
}

fn range(object: &NetworkObject, from: &str, to: &str) -> Option<Range> {
    let low = u32::try_from(object.int(from)?).ok()?;
    let high = object
        .int(to)
        .and_then(|high| u32::try_from(high).ok())
        .unwrap_or(low);
    Some((low.min(high), low.max(high)))
}

fn group_kind(index: &ObjectIndex<'_>, target: &str) -> PolicyGroupKind {
    let lag = index.resolve(target).ok().and_then(|group| group.attr("lagT"));
    match lag {
        Some("node") => PolicyGroupKind::Vpc,
        Some("link") => PolicyGroupKind::PortChannel,
        Some(_) => PolicyGroupKind::Access,
        None if target.contains("/accbundle-") => PolicyGroupKind::PortChannel,
        None => PolicyGroupKind::Access,
    }
}

fn group_name(target: &str) -> String {
    dn::segment(target, "accportgrp-")
        .or_else(|| dn::segment(target, "accbundle-"))
        .unwrap_or_else(|| dn::rn(target))
        .to_string()
}

/// Port blocks of one interface profile with their policy group.
fn profile_blocks(index: &ObjectIndex<'_>, profile: &str) -> Vec<PortBlock> {
    let mut blocks = Vec::new();
    for selector in index.children(profile, "infraHPortS") {
        let Some(target) = index
            .first_child(&selector.dn, "infraRsAccBaseGrp")
            .and_then(|rs| rs.attr("tDn"))
        else {
            continue;
        };
        let assignment = PolicyAssignment {
            policy_group: group_name(target),
            kind: group_kind(index, target),
        };
        for block in index.children(&selector.dn, "infraPortBlk") {
            let (Some(cards), Some(ports)) = (
                range(block, "fromCard", "toCard"),
                range(block, "fromPort", "toPort"),
            ) else {
                continue;
            };
            blocks.push(PortBlock {
                cards,
                ports,
                assignment: assignment.clone(),
            });
        }
    }
    blocks
}

pub fn resolve(index: &ObjectIndex<'_>) -> PortPolicies {
    let mut rules = Vec::new();
    for node_profile in index.get("infraNodeP") {
        let leaves: Vec<Range> = index
            .children(&node_profile.dn, "infraLeafS")
            .iter()
            .flat_map(|selector| index.children(&selector.dn, "infraNodeBlk"))
            .filter_map(|block| range(block, "from_", "to_"))
            .collect();
        let blocks: Vec<PortBlock> = index
            .children(&node_profile.dn, "infraRsAccPortP")
            .iter()
            .filter_map(|rs| rs.attr("tDn"))
            .flat_map(|profile| profile_blocks(index, profile))
            .collect();
        if !leaves.is_empty() && !blocks.is_empty() {
            rules.push(NodeRule { leaves, blocks });
        }
    }
    PortPolicies { rules }
}
