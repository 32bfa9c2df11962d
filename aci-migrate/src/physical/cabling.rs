use std::collections::BTreeMap;

use serde::Serialize;

use crate::issue::Severity;

use super::policy::PolicyGroupKind;
use super::{Fex, PhysicalInterface, PortStatus};

/// Advisory renumbering of one active port onto the target switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub node: u32,
    pub device: String,
    pub old_interface: String,
    pub new_interface: String,
    pub speed: Option<String>,
    pub epg_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    VpcToMultihoming,
    FexMigration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CablingChange {
    pub kind: ChangeKind,
    pub subject: String,
    pub action: String,
    pub priority: Severity,
}

/// Numeric components of an interface name, so `eth1/2` sorts before
/// `eth1/10`.
pub fn natural_key(interface: &str) -> (Vec<u32>, String) {
    let numbers = interface
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect();
    (numbers, interface.to_string())
}

/// Up interfaces of each device, in natural order, renumbered from 1.
pub fn port_mapping(interfaces: &[PhysicalInterface], target_prefix: &str) -> Vec<PortMapping> {
    let mut by_node: BTreeMap<u32, Vec<&PhysicalInterface>> = BTreeMap::new();
    for interface in interfaces.iter().filter(|i| i.status == PortStatus::Up) {
        by_node.entry(interface.node).or_default().push(interface);
    }
    let mut mapping = Vec::new();
    for (node, mut ports) in by_node {
        ports.sort_by_cached_key(|port| natural_key(&port.interface));
        for (position, port) in ports.into_iter().enumerate() {
            mapping.push(PortMapping {
                node,
                device: port.device.clone(),
                old_interface: port.interface.clone(),
                new_interface: format!("{target_prefix}{}", position + 1),
                speed: port.speed.clone(),
                epg_count: port.epg_count,
            });
        }
    }
    mapping
}

pub fn changes(interfaces: &[PhysicalInterface], fexes: &[Fex]) -> Vec<CablingChange> {
    let mut changes: Vec<CablingChange> = interfaces
        .iter()
        .filter(|i| i.policy_kind == Some(PolicyGroupKind::Vpc))
        .map(|i| CablingChange {
            kind: ChangeKind::VpcToMultihoming,
            subject: format!("{} {}", i.device, i.interface),
            action: format!(
                "verify dual-homing of policy group {} onto the ESI pair",
                i.policy_group.as_deref().unwrap_or("unknown")
            ),
            priority: Severity::High,
        })
        .collect();
    changes.extend(fexes.iter().map(|fex| CablingChange {
        kind: ChangeKind::FexMigration,
        subject: fex.name.clone(),
        action: "confirm FEX support on the target platform or plan its replacement".to_string(),
        priority: Severity::High,
    }));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up(node: u32, interface: &str) -> PhysicalInterface {
        PhysicalInterface {
            node,
            device: format!("leaf{node}"),
            interface: interface.to_string(),
            dn: format!("topology/pod-1/node-{node}/sys/phys-[{interface}]"),
            status: PortStatus::Up,
            admin_state: Some("up".into()),
            speed: Some("10G".into()),
            mtu: None,
            usage: Some("epg".into()),
            description: None,
            policy_group: None,
            policy_kind: None,
            epg_count: 0,
        }
    }

    #[test]
    fn renumbers_in_natural_order_per_device() {
        let mut down = up(101, "eth1/3");
        down.status = PortStatus::Down;
        let interfaces = vec![up(101, "eth1/10"), up(101, "eth1/2"), down, up(102, "eth1/7")];
        let mapping = port_mapping(&interfaces, "Ethernet1/");
        let pairs: Vec<(u32, &str, &str)> = mapping
            .iter()
            .map(|m| (m.node, m.old_interface.as_str(), m.new_interface.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (101, "eth1/2", "Ethernet1/1"),
                (101, "eth1/10", "Ethernet1/2"),
                (102, "eth1/7", "Ethernet1/1"),
            ]
        );
    }
}
