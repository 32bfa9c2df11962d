//! Ethernet Segment Identifier derivation for VPC-attached port-channels.
//!
//! ESIs here are type-0 (operator configured) ten-octet values laid out as
//! `00:00:00:00:00:00:DD:DD:PP:PP`, where `DD:DD` is the VPC domain id and
//! `PP:PP` the port-channel id, both big-endian. Leaf pairs share the domain
//! id so the same segment is configured identically on both peers.

use serde::Serialize;

/// ESI for one VPC port-channel.
pub fn esi(domain_id: u16, port_channel_id: u16) -> String {
    let [d_hi, d_lo] = domain_id.to_be_bytes();
    let [p_hi, p_lo] = port_channel_id.to_be_bytes();
    format!("00:00:00:00:00:00:{d_hi:02x}:{d_lo:02x}:{p_hi:02x}:{p_lo:02x}")
}

/// Locally administered LACP system id shared by both peers of a domain.
pub fn lacp_system_id(domain_id: u16) -> String {
    let [hi, lo] = domain_id.to_be_bytes();
    format!("02:00:00:00:{hi:02x}:{lo:02x}")
}

/// Numeric port-channel id from an interface name such as `po12`.
pub fn port_channel_number(id: &str) -> Option<u16> {
    let lower = id.to_ascii_lowercase();
    let digits = lower
        .strip_prefix("port-channel")
        .or_else(|| lower.strip_prefix("po"))?;
    digits.trim().parse().ok()
}

/// One generated segment, shared by every endpoint on the same port-channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EsiCandidate {
    pub domain_id: u16,
    pub port_channel_id: u16,
    pub policy_group: String,
    pub members: Vec<u32>,
    pub esi: String,
    pub lacp_system_id: String,
}

impl EsiCandidate {
    pub fn new(domain_id: u16, port_channel_id: u16, policy_group: &str, members: &[u32]) -> Self {
        Self {
            domain_id,
            port_channel_id,
            policy_group: policy_group.to_string(),
            members: members.to_vec(),
            esi: esi(domain_id, port_channel_id),
            lacp_system_id: lacp_system_id(domain_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esi_encodes_domain_and_port_channel() {
        assert_eq!(esi(10, 3), "00:00:00:00:00:00:00:0a:00:03");
        assert_eq!(esi(300, 4096), "00:00:00:00:00:00:01:2c:10:00");
        assert_eq!(lacp_system_id(10), "02:00:00:00:00:0a");
    }

    #[test]
    fn parses_port_channel_names() {
        assert_eq!(port_channel_number("po12"), Some(12));
        assert_eq!(port_channel_number("Port-Channel7"), Some(7));
        assert_eq!(port_channel_number("eth1/1"), None);
    }
}
