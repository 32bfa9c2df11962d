use crate::dialect::Dialect;

use super::{L2Vni, L3Vni, VniMapping};

/// VXLAN overlay configuration for the whole mapping, or `None` for
/// dialects without an EVPN overlay template.
pub fn render(mapping: &VniMapping, dialect: Dialect) -> Option<String> {
    let render_all: fn(&VniMapping) -> Vec<String> = match dialect {
        Dialect::Nxos => nxos,
        Dialect::Eos => eos,
        Dialect::Junos => junos,
        Dialect::Ios => return None,
    };

    let c = dialect.comment();
    let mut out = vec![format!("{c} {} EVPN VXLAN overlay", dialect.display_name())];
    if mapping.l3.is_empty() && mapping.l2.is_empty() {
        out.push(format!("{c} no vrfs or bridge domains found"));
        return Some(out.join("\n"));
    }
    for finding in &mapping.findings {
        out.push(format!("{c} skipped {}: {}", finding.code, finding.message));
    }
    out.push(String::new());
    out.extend(render_all(mapping));
    Some(out.join("\n"))
}

/// Bridge domains that received both a VLAN and a VNI.
fn segments(mapping: &VniMapping) -> impl Iterator<Item = (&L2Vni, u16, u32)> {
    mapping
        .l2
        .iter()
        .filter_map(|bd| Some((bd, bd.vlan?, bd.vni?)))
}

fn nxos(mapping: &VniMapping) -> Vec<String> {
    let mut lines = vec![
        "feature bgp".to_string(),
        "feature interface-vlan".to_string(),
        "feature vn-segment-vlan-based".to_string(),
        "feature nv overlay".to_string(),
        "nv overlay evpn".to_string(),
        "fabric forwarding anycast-gateway-mac 2020.0000.00aa".to_string(),
    ];
    for (bd, vlan, vni) in segments(mapping) {
        lines.push(format!("vlan {vlan}"));
        lines.push(format!("  name {}", bd.label()));
        lines.push(format!("  vn-segment {vni}"));
    }
    for l3 in &mapping.l3 {
        lines.push(format!("vrf context {}", l3.label()));
        lines.push(format!("  vni {}", l3.vni));
        lines.push("  rd auto".to_string());
        lines.push("  address-family ipv4 unicast".to_string());
        lines.push(format!("    route-target both {} evpn", l3.route_target));
    }
    lines.push("interface nve1".to_string());
    lines.push("  no shutdown".to_string());
    lines.push("  host-reachability protocol bgp".to_string());
    lines.push("  source-interface loopback1".to_string());
    for l3 in &mapping.l3 {
        lines.push(format!("  member vni {} associate-vrf", l3.vni));
    }
    for (bd, _, vni) in segments(mapping) {
        lines.push(format!("  member vni {vni}"));
        if bd.arp_suppression {
            lines.push("    suppress-arp".to_string());
        }
        lines.push("    ingress-replication protocol bgp".to_string());
    }
    for (bd, vlan, _) in segments(mapping) {
        let Some(vrf) = &bd.vrf else { continue };
        if bd.subnets.is_empty() {
            continue;
        }
        lines.push(format!("interface Vlan{vlan}"));
        lines.push("  no shutdown".to_string());
        lines.push(format!("  vrf member {vrf}"));
        for subnet in &bd.subnets {
            lines.push(format!("  ip address {}", subnet.ip));
        }
        lines.push("  fabric forwarding mode anycast-gateway".to_string());
    }
    lines
}

fn eos(mapping: &VniMapping) -> Vec<String> {
    let mut lines = Vec::new();
    for (bd, vlan, _) in segments(mapping) {
        lines.push(format!("vlan {vlan}"));
        lines.push(format!("   name {}", bd.label()));
    }
    for l3 in &mapping.l3 {
        lines.push(format!("vrf instance {}", l3.label()));
        lines.push(format!("ip routing vrf {}", l3.label()));
    }
    lines.push("ip virtual-router mac-address 00:1c:73:00:00:99".to_string());
    lines.push("interface Vxlan1".to_string());
    lines.push("   vxlan source-interface Loopback1".to_string());
    lines.push("   vxlan udp-port 4789".to_string());
    for (_, vlan, vni) in segments(mapping) {
        lines.push(format!("   vxlan vlan {vlan} vni {vni}"));
    }
    for l3 in &mapping.l3 {
        lines.push(format!("   vxlan vrf {} vni {}", l3.label(), l3.vni));
    }
    for (bd, vlan, _) in segments(mapping) {
        let Some(vrf) = &bd.vrf else { continue };
        if bd.subnets.is_empty() {
            continue;
        }
        lines.push(format!("interface Vlan{vlan}"));
        lines.push(format!("   vrf {vrf}"));
        for subnet in &bd.subnets {
            lines.push(format!("   ip address virtual {}", subnet.ip));
        }
    }
    lines
}

fn junos(mapping: &VniMapping) -> Vec<String> {
    let mut lines = vec![
        "set protocols evpn encapsulation vxlan".to_string(),
        "set protocols evpn extended-vni-list all".to_string(),
        "set switch-options vtep-source-interface lo0.0".to_string(),
    ];
    for (bd, vlan, vni) in segments(mapping) {
        let name = bd.label();
        lines.push(format!("set vlans {name} vlan-id {vlan}"));
        lines.push(format!("set vlans {name} vxlan vni {vni}"));
        if bd.vrf.is_some() && !bd.subnets.is_empty() {
            lines.push(format!("set vlans {name} l3-interface irb.{vlan}"));
            for subnet in &bd.subnets {
                lines.push(format!(
                    "set interfaces irb unit {vlan} family inet address {}",
                    subnet.ip
                ));
            }
        }
    }
    for l3 in &mapping.l3 {
        lines.extend(junos_vrf(l3, mapping));
    }
    lines
}

fn junos_vrf(l3: &L3Vni, mapping: &VniMapping) -> Vec<String> {
    let ri = format!("set routing-instances {}", l3.label());
    let mut lines = vec![
        format!("{ri} instance-type vrf"),
        format!("{ri} vrf-target target:{}", l3.route_target),
        format!("{ri} protocols evpn ip-prefix-routes encapsulation vxlan"),
        format!("{ri} protocols evpn ip-prefix-routes vni {}", l3.vni),
    ];
    let label = l3.label();
    for (bd, vlan, _) in segments(mapping) {
        if bd.vrf.as_deref() == Some(label.as_str()) && !bd.subnets.is_empty() {
            lines.push(format!("{ri} interface irb.{vlan}"));
        }
    }
    lines
}
