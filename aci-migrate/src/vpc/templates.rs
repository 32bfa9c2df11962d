use std::collections::BTreeSet;

use crate::dialect::Dialect;
use crate::vni::VniMapping;

use super::{EsiCandidate, VpcSummary};

/// ESI configuration for every candidate segment, or `None` for dialects
/// without a fabric multihoming template. Trunks carry the mapped VLANs of
/// the EPGs attached over each segment.
pub fn render(summary: &VpcSummary, mapping: &VniMapping, dialect: Dialect) -> Option<String> {
    let render_one: fn(&EsiCandidate, &[u16]) -> Vec<String> = match dialect {
        Dialect::Nxos => nxos,
        Dialect::Eos => eos,
        Dialect::Junos => junos,
        Dialect::Ios => return None,
    };

    let c = dialect.comment();
    let mut out = vec![format!("{c} {} EVPN ESI configuration", dialect.display_name())];
    if summary.esi_candidates.is_empty() {
        out.push(format!("{c} no dual-homed port-channels found"));
        return Some(out.join("\n"));
    }
    for candidate in &summary.esi_candidates {
        let pair = pair_label(summary, candidate.domain_id);
        out.push(String::new());
        out.push(format!(
            "{c} vpc domain {} policy group {} (apply on {pair})",
            candidate.domain_id, candidate.policy_group
        ));
        out.extend(render_one(candidate, &trunk_vlans(summary, mapping, candidate)));
    }
    Some(out.join("\n"))
}

fn trunk_vlans(
    summary: &VpcSummary,
    mapping: &VniMapping,
    candidate: &EsiCandidate,
) -> Vec<u16> {
    let vlans: BTreeSet<u16> = summary
        .endpoints
        .iter()
        .filter(|endpoint| endpoint.esi.as_deref() == Some(candidate.esi.as_str()))
        .filter_map(|endpoint| mapping.epg(&endpoint.epg)?.vlan)
        .collect();
    vlans.into_iter().collect()
}

fn vlan_list(vlans: &[u16], separator: &str) -> String {
    vlans
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn pair_label(summary: &VpcSummary, domain_id: u16) -> String {
    summary
        .domains
        .iter()
        .find(|d| d.id == domain_id)
        .map(|d| d.pair_label())
        .unwrap_or_else(|| format!("vpc domain {domain_id}"))
}

fn nxos(candidate: &EsiCandidate, vlans: &[u16]) -> Vec<String> {
    let mut lines = vec![
        format!("interface port-channel{}", candidate.port_channel_id),
        "  switchport".to_string(),
    ];
    if !vlans.is_empty() {
        lines.push("  switchport mode trunk".to_string());
        lines.push(format!("  switchport trunk allowed vlan {}", vlan_list(vlans, ",")));
    }
    lines.extend([
        format!("  ethernet-segment {}", candidate.port_channel_id),
        format!("    esi {}", candidate.esi),
        format!("  lacp system-id {}", candidate.lacp_system_id),
    ]);
    lines
}

fn eos(candidate: &EsiCandidate, vlans: &[u16]) -> Vec<String> {
    let mut lines = vec![
        format!("interface Port-Channel{}", candidate.port_channel_id),
        "   switchport".to_string(),
    ];
    if !vlans.is_empty() {
        lines.push("   switchport mode trunk".to_string());
        lines.push(format!("   switchport trunk allowed vlan {}", vlan_list(vlans, ",")));
    }
    lines.extend([
        "   evpn ethernet-segment".to_string(),
        format!("      identifier {}", regroup(&candidate.esi, ":")),
        format!("      route-target import {}", candidate.lacp_system_id),
        format!("   lacp system-id {}", regroup(&candidate.lacp_system_id, ".")),
    ]);
    lines
}

fn junos(candidate: &EsiCandidate, vlans: &[u16]) -> Vec<String> {
    let ae = format!("ae{}", candidate.port_channel_id);
    let mut lines = vec![
        format!("set interfaces {ae} esi {}", candidate.esi),
        format!("set interfaces {ae} esi all-active"),
        format!(
            "set interfaces {ae} aggregated-ether-options lacp system-id {}",
            candidate.lacp_system_id
        ),
        format!("set interfaces {ae} aggregated-ether-options lacp active"),
    ];
    if !vlans.is_empty() {
        let unit = format!("set interfaces {ae} unit 0 family ethernet-switching");
        lines.push(format!("{unit} interface-mode trunk"));
        lines.push(format!("{unit} vlan members [ {} ]", vlan_list(vlans, " ")));
    }
    lines
}

/// EOS writes ESIs and system ids as 16-bit hex groups.
fn regroup(mac: &str, separator: &str) -> String {
    let hex: String = mac.chars().filter(|c| *c != ':').collect();
    hex.as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Finding;
    use crate::vni::EpgVlan;
    use crate::vpc::{Endpoint, Homing, LacpDistribution, PeerStatus, VpcDomain};

    fn summary() -> VpcSummary {
        VpcSummary {
            domains: vec![VpcDomain {
                id: 10,
                members: vec![101, 102],
                member_names: vec!["leaf101".into(), "leaf102".into()],
                virtual_ip: None,
                status: PeerStatus::Active,
            }],
            healthy_domains: 1,
            port_channels: Vec::new(),
            vpc_port_channels: 0,
            standalone_port_channels: 0,
            lacp: LacpDistribution::default(),
            endpoints: Vec::new(),
            dual_homed: 1,
            single_homed: 0,
            esi_generated: 1,
            esi_candidates: vec![EsiCandidate::new(10, 3, "vpc_web", &[101, 102])],
            migration_priority: Vec::new(),
            findings: Vec::<Finding>::new(),
            score: 100.0,
        }
    }

    fn with_endpoint(mut summary: VpcSummary) -> (VpcSummary, VniMapping) {
        let esi = summary.esi_candidates[0].esi.clone();
        summary.endpoints = vec![Endpoint {
            epg: "uni/tn-prod/ap-app/epg-web".into(),
            encap: "vlan-10".into(),
            paths: Vec::new(),
            nodes: vec![101, 102],
            homing: Homing::DualHomed,
            domain: Some(10),
            esi: Some(esi),
        }];
        let mapping = VniMapping {
            epgs: vec![EpgVlan {
                dn: "uni/tn-prod/ap-app/epg-web".into(),
                tenant: "prod".into(),
                epg: "web".into(),
                bd: Some("prod-app".into()),
                vlan: Some(100),
                vni: Some(10000),
            }],
            ..VniMapping::default()
        };
        (summary, mapping)
    }

    #[test]
    fn trunks_carry_mapped_epg_vlans() {
        let (summary, mapping) = with_endpoint(summary());
        let nxos = render(&summary, &mapping, Dialect::Nxos).expect("nxos");
        assert!(nxos.contains("  switchport trunk allowed vlan 100"));
        let eos = render(&summary, &mapping, Dialect::Eos).expect("eos");
        assert!(eos.contains("   switchport trunk allowed vlan 100"));
        let junos = render(&summary, &mapping, Dialect::Junos).expect("junos");
        assert!(junos.contains(
            "set interfaces ae3 unit 0 family ethernet-switching vlan members [ 100 ]"
        ));

        let unmapped = render(&summary, &VniMapping::default(), Dialect::Nxos).expect("nxos");
        assert!(!unmapped.contains("allowed vlan"));
    }

    #[test]
    fn nxos_lists_each_candidate() {
        let text = render(&summary(), &VniMapping::default(), Dialect::Nxos).expect("nxos");
        assert!(text.contains("interface port-channel3"));
        assert!(text.contains("esi 00:00:00:00:00:00:00:0a:00:03"));
        assert!(text.contains("apply on leaf101 <-> leaf102"));
    }

    #[test]
    fn eos_uses_dotted_system_id() {
        let text = render(&summary(), &VniMapping::default(), Dialect::Eos).expect("eos");
        assert!(text.contains("lacp system-id 0200.0000.000a"));
        assert!(text.contains("identifier 0000:0000:0000:000a:0003"));
    }

    #[test]
    fn ios_has_no_fabric_template() {
        let mapping = VniMapping::default();
        assert!(render(&summary(), &mapping, Dialect::Ios).is_none());
        let junos = render(&summary(), &mapping, Dialect::Junos).expect("junos");
        assert!(junos.starts_with("# Junos"));
        assert!(junos.contains("set interfaces ae3 esi all-active"));
    }
}
