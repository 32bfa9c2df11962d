use crate::dialect::Dialect;
use crate::vni::{L3Vni, VniMapping};

use super::{L3Out, L3OutSummary, SessionType};

const LOCAL_AS_PLACEHOLDER: &str = "<local-as>";
const REMOTE_AS_PLACEHOLDER: &str = "<remote-as>";

/// Border routing configuration for every L3Out, or `None` for dialects
/// without an EVPN border template. VRFs with a mapped L3 VNI are
/// exported into EVPN.
pub fn render(summary: &L3OutSummary, mapping: &VniMapping, dialect: Dialect) -> Option<String> {
    let render_one: fn(&L3Out, Option<u32>, Option<&L3Vni>) -> Vec<String> = match dialect {
        Dialect::Nxos => nxos,
        Dialect::Eos => eos,
        Dialect::Junos => junos,
        Dialect::Ios => return None,
    };

    let c = dialect.comment();
    let mut out = vec![format!("{c} {} border routing configuration", dialect.display_name())];
    if summary.l3outs.is_empty() {
        out.push(format!("{c} no L3Outs found"));
        return Some(out.join("\n"));
    }
    for l3out in &summary.l3outs {
        out.push(String::new());
        let leaves: Vec<&str> = l3out.border_leaves.iter().map(|l| l.name.as_str()).collect();
        out.push(format!(
            "{c} L3Out {}/{} ({}) on {}",
            l3out.tenant,
            l3out.name,
            l3out
                .protocols
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join("+"),
            if leaves.is_empty() {
                "no border leaf".to_string()
            } else {
                leaves.join(", ")
            }
        ));
        let l3_vni = l3out
            .vrf
            .as_deref()
            .and_then(|vrf| mapping.l3_for(&l3out.tenant, vrf));
        out.extend(render_one(l3out, summary.bgp.fabric_as, l3_vni));
    }
    Some(out.join("\n"))
}

fn local_as(l3out: &L3Out, fabric_as: Option<u32>) -> String {
    l3out
        .bgp_peers
        .iter()
        .find_map(|peer| peer.local_as)
        .or(fabric_as)
        .map(|asn| asn.to_string())
        .unwrap_or_else(|| LOCAL_AS_PLACEHOLDER.to_string())
}

fn remote_as(asn: Option<u32>) -> String {
    asn.map(|asn| asn.to_string())
        .unwrap_or_else(|| REMOTE_AS_PLACEHOLDER.to_string())
}

fn nxos(l3out: &L3Out, fabric_as: Option<u32>, l3_vni: Option<&L3Vni>) -> Vec<String> {
    let vrf = l3out.vrf_label();
    let mut lines = vec![format!("vrf context {vrf}")];
    if let Some(l3_vni) = l3_vni {
        lines.push(format!("  vni {}", l3_vni.vni));
        lines.push("  rd auto".to_string());
        lines.push("  address-family ipv4 unicast".to_string());
        lines.push(format!("    route-target both {} evpn", l3_vni.route_target));
    }
    for route in &l3out.static_routes {
        for hop in &route.next_hops {
            lines.push(format!("  ip route {} {hop}", route.prefix));
        }
    }
    if !l3out.bgp_peers.is_empty() {
        lines.push(format!("router bgp {}", local_as(l3out, fabric_as)));
        lines.push(format!("  vrf {vrf}"));
        if l3_vni.is_some() {
            lines.push("    address-family ipv4 unicast".to_string());
            lines.push("      advertise l2vpn evpn".to_string());
        }
        for peer in &l3out.bgp_peers {
            lines.push(format!("    neighbor {}", peer.address));
            lines.push(format!("      remote-as {}", remote_as(peer.remote_as)));
            if peer.session == SessionType::Ebgp {
                lines.push("      ebgp-multihop 2".to_string());
            }
            lines.push("      address-family ipv4 unicast".to_string());
        }
    }
    if let Some(area) = &l3out.ospf {
        lines.push(format!("router ospf {}", l3out.name));
        lines.push(format!("  vrf {vrf}"));
        if let Some(router_id) = l3out.border_leaves.iter().find_map(|l| l.router_id.as_deref()) {
            lines.push(format!("    router-id {router_id}"));
        }
        lines.push(format!("    area {} authentication message-digest", area.id));
    }
    lines
}

fn eos(l3out: &L3Out, fabric_as: Option<u32>, l3_vni: Option<&L3Vni>) -> Vec<String> {
    let vrf = l3out.vrf_label();
    let mut lines = vec![format!("vrf instance {vrf}"), format!("ip routing vrf {vrf}")];
    for route in &l3out.static_routes {
        for hop in &route.next_hops {
            lines.push(format!("ip route vrf {vrf} {} {hop}", route.prefix));
        }
    }
    if !l3out.bgp_peers.is_empty() {
        lines.push(format!("router bgp {}", local_as(l3out, fabric_as)));
        lines.push(format!("   vrf {vrf}"));
        if let Some(l3_vni) = l3_vni {
            lines.push("      rd auto".to_string());
            lines.push(format!("      route-target import evpn {}", l3_vni.route_target));
            lines.push(format!("      route-target export evpn {}", l3_vni.route_target));
        }
        for peer in &l3out.bgp_peers {
            lines.push(format!(
                "      neighbor {} remote-as {}",
                peer.address,
                remote_as(peer.remote_as)
            ));
        }
    }
    if let Some(area) = &l3out.ospf {
        lines.push(format!("router ospf 1 vrf {vrf}"));
        if let Some(router_id) = l3out.border_leaves.iter().find_map(|l| l.router_id.as_deref()) {
            lines.push(format!("   router-id {router_id}"));
        }
        for interface in l3out.interfaces.iter().filter_map(|i| i.address.as_deref()) {
            lines.push(format!("   network {interface} area {}", area.id));
        }
    }
    lines
}

fn junos(l3out: &L3Out, fabric_as: Option<u32>, l3_vni: Option<&L3Vni>) -> Vec<String> {
    let vrf = l3out.vrf_label();
    let ri = format!("set routing-instances {vrf}");
    let mut lines = vec![format!("{ri} instance-type vrf")];
    if let Some(l3_vni) = l3_vni {
        lines.push(format!("{ri} vrf-target target:{}", l3_vni.route_target));
    }
    for route in &l3out.static_routes {
        for hop in &route.next_hops {
            lines.push(format!(
                "{ri} routing-options static route {} next-hop {hop}",
                route.prefix
            ));
        }
    }
    if !l3out.bgp_peers.is_empty() {
        lines.push(format!(
            "{ri} routing-options autonomous-system {}",
            local_as(l3out, fabric_as)
        ));
        for peer in &l3out.bgp_peers {
            let group = match peer.session {
                SessionType::Ibgp => "internal",
                SessionType::Ebgp | SessionType::Unknown => "external",
            };
            let prefix = format!("{ri} protocols bgp group {}-{group}", l3out.name);
            lines.push(format!("{prefix} type {group}"));
            lines.push(format!(
                "{prefix} neighbor {} peer-as {}",
                peer.address,
                remote_as(peer.remote_as)
            ));
        }
    }
    if let Some(area) = &l3out.ospf {
        lines.push(format!("{ri} protocols ospf area {}", area.id));
    }
    lines
}
