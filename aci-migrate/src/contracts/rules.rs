//! Canonical ACL rules derived from `vzEntry` filter entries.

use std::fmt::{self, Display, Formatter};

use aci_snapshot::NetworkObject;
use serde::Serialize;

use crate::issue::AnalyzerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Permit,
    Deny,
}

impl Action {
    /// Relation `action` attribute; anything but `deny` permits.
    pub fn from_relation(relation: &NetworkObject) -> Self {
        match relation.attr("action") {
            Some(action) if action.eq_ignore_ascii_case("deny") => Action::Deny,
            _ => Action::Permit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Permit => "permit",
            Action::Deny => "deny",
        }
    }
}

/// Which side of the contract the ACL is applied on, outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    ConsumerOut,
    ProviderOut,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::ConsumerOut => "consumer-out",
            Direction::ProviderOut => "provider-out",
        }
    }

    pub fn acl_suffix(self) -> &'static str {
        match self {
            Direction::ConsumerOut => "CONSUMER_OUT",
            Direction::ProviderOut => "PROVIDER_OUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PortSpec {
    Any,
    Eq { port: u16 },
    Range { from: u16, to: u16 },
}

impl PortSpec {
    pub fn is_any(self) -> bool {
        self == PortSpec::Any
    }
}

impl Display for PortSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Any => f.write_str("any"),
            PortSpec::Eq { port } => write!(f, "{port}"),
            PortSpec::Range { from, to } => write!(f, "{from}-{to}"),
        }
    }
}

/// One translated rule. The rule list of a contract is its single source of
/// truth; dialect text is rendered from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclRule {
    pub sequence: u32,
    pub action: Action,
    pub direction: Direction,
    pub ether_type: String,
    pub protocol: String,
    pub source_port: PortSpec,
    pub dest_port: PortSpec,
    pub established: bool,
    pub description: String,
}

impl AclRule {
    pub fn is_ip(&self) -> bool {
        matches!(self.ether_type.as_str(), "ip" | "ipv4" | "ipv6")
    }

    pub fn is_ipv6(&self) -> bool {
        self.ether_type == "ipv6"
    }

    /// Whether the protocol carries ports at all.
    pub fn has_ports(&self) -> bool {
        matches!(self.protocol.as_str(), "tcp" | "udp")
    }
}

/// Port numbers for the named ports APIC accepts in filter entries.
pub fn named_port(name: &str) -> Option<u16> {
    Some(match name {
        "http" => 80,
        "https" => 443,
        "dns" => 53,
        "smtp" => 25,
        "ftpData" => 20,
        "pop3" => 110,
        "rtsp" => 554,
        "ssh" => 22,
        _ => return None,
    })
}

fn parse_port(entry: &NetworkObject, key: &str) -> Result<Option<u16>, AnalyzerError> {
    let Some(raw) = entry.text(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw == "unspecified" || raw == "0" {
        return Ok(None);
    }
    if let Some(port) = named_port(raw) {
        return Ok(Some(port));
    }
    raw.parse::<u16>()
        .map(Some)
        .map_err(|_| AnalyzerError::malformed(entry, format!("{key} `{raw}` is not a port")))
}

fn port_range(
    entry: &NetworkObject,
    from_key: &str,
    to_key: &str,
) -> Result<PortSpec, AnalyzerError> {
    let from = parse_port(entry, from_key)?;
    let to = parse_port(entry, to_key)?;
    match (from, to) {
        (None, None) => Ok(PortSpec::Any),
        (Some(port), None) | (None, Some(port)) => Ok(PortSpec::Eq { port }),
        (Some(from), Some(to)) if from == to => Ok(PortSpec::Eq { port: from }),
        (Some(from), Some(to)) if from < to => Ok(PortSpec::Range { from, to }),
        (Some(from), Some(to)) => Err(AnalyzerError::malformed(
            entry,
            format!("{from_key} {from} is above {to_key} {to}"),
        )),
    }
}

/// Match fields of one filter entry, before a direction is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMatch {
    pub ether_type: String,
    pub protocol: String,
    pub source_port: PortSpec,
    pub dest_port: PortSpec,
    pub stateful: bool,
    pub name: String,
}

impl EntryMatch {
    pub fn from_entry(entry: &NetworkObject) -> Result<Self, AnalyzerError> {
        let ether_type = match entry.text("etherT").as_deref() {
            None | Some("unspecified") | Some("ip") => "ip".to_string(),
            Some(other) => other.to_ascii_lowercase(),
        };
        let protocol = match entry.text("prot").as_deref() {
            None | Some("unspecified") => "ip".to_string(),
            Some(other) => other.to_ascii_lowercase(),
        };
        Ok(Self {
            source_port: port_range(entry, "sFromPort", "sToPort")?,
            dest_port: port_range(entry, "dFromPort", "dToPort")?,
            stateful: entry.attr("stateful") == Some("yes"),
            name: entry.name().to_string(),
            ether_type,
            protocol,
        })
    }

    /// Rule for this entry as written, applied on one side.
    pub fn rule(&self, action: Action, direction: Direction, description: String) -> AclRule {
        AclRule {
            sequence: 0,
            action,
            direction,
            ether_type: self.ether_type.clone(),
            protocol: self.protocol.clone(),
            source_port: self.source_port,
            dest_port: self.dest_port,
            established: false,
            description,
        }
    }

    /// Provider-out return traffic of a bidirectional entry: ports swap sides.
    pub fn mirrored(&self, action: Action, description: String) -> AclRule {
        AclRule {
            source_port: self.dest_port,
            dest_port: self.source_port,
            established: self.stateful && self.protocol == "tcp",
            ..self.rule(action, Direction::ProviderOut, description)
        }
    }
}

#[cfg(test)]
mod tests {
    use aci_snapshot::NetworkObject;

    use super::*;

    fn entry() -> NetworkObject {
        NetworkObject::new("vzEntry", "uni/tn-prod/flt-web/e-http")
            .with_attr("name", "http")
            .with_attr("etherT", "ip")
            .with_attr("prot", "tcp")
    }

    #[test]
    fn named_ports_resolve() {
        let e = entry().with_attr("dFromPort", "https").with_attr("dToPort", "https");
        let matched = EntryMatch::from_entry(&e).expect("entry");
        assert_eq!(matched.dest_port, PortSpec::Eq { port: 443 });
        assert_eq!(matched.source_port, PortSpec::Any);
    }

    #[test]
    fn ranges_and_inverted_ranges() {
        let e = entry().with_attr("dFromPort", "8000").with_attr("dToPort", "8080");
        assert_eq!(
            EntryMatch::from_entry(&e).expect("range").dest_port,
            PortSpec::Range { from: 8000, to: 8080 }
        );
        let bad = entry().with_attr("dFromPort", "443").with_attr("dToPort", "80");
        assert!(matches!(
            EntryMatch::from_entry(&bad),
            Err(AnalyzerError::Malformed { .. })
        ));
    }

    #[test]
    fn provider_rule_mirrors_ports() {
        let e = entry()
            .with_attr("dFromPort", "http")
            .with_attr("dToPort", "http")
            .with_attr("stateful", "yes");
        let matched = EntryMatch::from_entry(&e).expect("entry");
        let rule = matched.mirrored(Action::Permit, "web".into());
        assert_eq!(rule.direction, Direction::ProviderOut);
        assert_eq!(rule.source_port, PortSpec::Eq { port: 80 });
        assert!(rule.dest_port.is_any());
        assert!(rule.established);
    }

    #[test]
    fn provider_rule_as_written_keeps_ports() {
        let e = entry()
            .with_attr("sFromPort", "https")
            .with_attr("sToPort", "https")
            .with_attr("stateful", "yes");
        let matched = EntryMatch::from_entry(&e).expect("entry");
        let rule = matched.rule(Action::Permit, Direction::ProviderOut, "web".into());
        assert_eq!(rule.source_port, PortSpec::Eq { port: 443 });
        assert!(rule.dest_port.is_any());
        assert!(!rule.established);
    }

    #[test]
    fn unspecified_fields_default_to_ip() {
        let e = NetworkObject::new("vzEntry", "uni/tn-prod/flt-any/e-any")
            .with_attr("etherT", "unspecified")
            .with_attr("prot", "unspecified");
        let matched = EntryMatch::from_entry(&e).expect("entry");
        assert_eq!(matched.protocol, "ip");
        assert_eq!(matched.ether_type, "ip");
    }
}
