//! Vendor ACL text rendered from the canonical rule list.

use crate::dialect::Dialect;

use super::{Acl, AclRule, Action, ContractTranslation, PortSpec, TranslationSummary};

/// ACL configuration for every non-empty contract.
pub fn render_all(summary: &TranslationSummary, dialect: Dialect) -> String {
    let c = dialect.comment();
    let mut out = vec![format!(
        "{c} {} ACLs translated from {} contract(s)",
        dialect.display_name(),
        summary.translated
    )];
    for contract in summary.contracts.iter().filter(|c| !c.is_empty()) {
        out.push(String::new());
        out.push(render(contract, dialect));
    }
    out.join("\n")
}

pub fn render(contract: &ContractTranslation, dialect: Dialect) -> String {
    let c = dialect.comment();
    let mut out = vec![format!(
        "{c} contract {} (tenant {}, scope {})",
        contract.name, contract.tenant, contract.scope
    )];
    for acl in &contract.acls {
        if !acl.applied_to.is_empty() {
            out.push(format!("{c} apply outbound on: {}", acl.applied_to.join(", ")));
        }
        match dialect {
            Dialect::Ios => out.extend(cisco_acl(acl, "ip access-list extended", " ")),
            Dialect::Nxos => out.extend(cisco_acl(acl, "ip access-list", "  ")),
            Dialect::Eos => out.extend(cisco_acl(acl, "ip access-list", "   ")),
            Dialect::Junos => out.extend(junos_filter(acl)),
        }
    }
    out.join("\n")
}

fn cisco_acl(acl: &Acl, header: &str, indent: &str) -> Vec<String> {
    let mut lines = vec![format!("{header} {}", acl.name)];
    for rule in &acl.rules {
        let body = if rule.is_ip() {
            cisco_rule(rule)
        } else {
            format!("remark non-IP entry {} ({}) not translated", rule.description, rule.ether_type)
        };
        lines.push(format!("{indent}{} {body}", rule.sequence));
    }
    lines
}

fn cisco_rule(rule: &AclRule) -> String {
    let mut parts = vec![
        rule.action.as_str().to_string(),
        rule.protocol.clone(),
        "any".to_string(),
    ];
    if rule.has_ports() {
        parts.extend(cisco_port(rule.source_port));
    }
    parts.push("any".to_string());
    if rule.has_ports() {
        parts.extend(cisco_port(rule.dest_port));
    }
    if rule.established {
        parts.push("established".to_string());
    }
    parts.join(" ")
}

fn cisco_port(port: PortSpec) -> Option<String> {
    match port {
        PortSpec::Any => None,
        PortSpec::Eq { port } => Some(format!("eq {port}")),
        PortSpec::Range { from, to } => Some(format!("range {from} {to}")),
    }
}

fn junos_filter(acl: &Acl) -> Vec<String> {
    let family = if acl.rules.iter().any(AclRule::is_ipv6) {
        "inet6"
    } else {
        "inet"
    };
    let prefix = format!("set firewall family {family} filter {}", acl.name);
    let mut lines = Vec::new();
    for rule in &acl.rules {
        let term = format!("{prefix} term t{}", rule.sequence);
        if !rule.is_ip() {
            lines.push(format!(
                "# t{}: non-IP entry {} ({}) not translated",
                rule.sequence, rule.description, rule.ether_type
            ));
            continue;
        }
        if rule.protocol != "ip" {
            lines.push(format!("{term} from protocol {}", rule.protocol));
        }
        if rule.has_ports() && !rule.source_port.is_any() {
            lines.push(format!("{term} from source-port {}", rule.source_port));
        }
        if rule.has_ports() && !rule.dest_port.is_any() {
            lines.push(format!("{term} from destination-port {}", rule.dest_port));
        }
        if rule.established {
            lines.push(format!("{term} from tcp-established"));
        }
        let then = match rule.action {
            Action::Permit => "accept",
            Action::Deny => "discard",
        };
        lines.push(format!("{term} then {then}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{Complexity, Direction};

    fn rule(sequence: u32, action: Action, protocol: &str, port: u16) -> AclRule {
        AclRule {
            sequence,
            action,
            direction: Direction::ConsumerOut,
            ether_type: "ip".to_string(),
            protocol: protocol.to_string(),
            source_port: PortSpec::Any,
            dest_port: PortSpec::Eq { port },
            established: false,
            description: format!("web:main:f{port}"),
        }
    }

    fn contract() -> ContractTranslation {
        ContractTranslation {
            name: "web".into(),
            dn: "uni/tn-prod/brc-web".into(),
            tenant: "prod".into(),
            scope: "context".into(),
            subject_count: 1,
            entry_count: 3,
            complexity: Complexity::Simple,
            providers: vec!["uni/tn-prod/ap-app/epg-web".into()],
            consumers: Vec::new(),
            acls: vec![Acl {
                name: "ACL_prod_web_CONSUMER_OUT".into(),
                direction: Direction::ConsumerOut,
                applied_to: Vec::new(),
                rules: vec![
                    rule(10, Action::Permit, "tcp", 80),
                    rule(20, Action::Deny, "tcp", 443),
                    rule(30, Action::Permit, "udp", 53),
                ],
            }],
        }
    }

    #[test]
    fn every_dialect_keeps_rule_order() {
        let cisco = [
            "10 permit tcp any any eq 80",
            "20 deny tcp any any eq 443",
            "30 permit udp any any eq 53",
        ];
        let junos = [
            "term t10 from destination-port 80",
            "term t20 then discard",
            "term t30 from protocol udp",
        ];
        for (dialect, needles) in [
            (Dialect::Ios, cisco),
            (Dialect::Nxos, cisco),
            (Dialect::Eos, cisco),
            (Dialect::Junos, junos),
        ] {
            let text = render(&contract(), dialect);
            let positions: Vec<usize> = needles
                .iter()
                .map(|n| {
                    text.find(n)
                        .unwrap_or_else(|| panic!("{dialect}: missing `{n}` in\n{text}"))
                })
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{dialect} reordered rules");
        }
    }

    #[test]
    fn non_ip_entries_become_remarks() {
        let mut c = contract();
        c.acls[0].rules[0].ether_type = "arp".into();
        let ios = render(&c, Dialect::Ios);
        assert!(ios.contains(" 10 remark non-IP entry web:main:f80 (arp) not translated"));
        let junos = render(&c, Dialect::Junos);
        assert!(junos.contains("# t10: non-IP entry"));
    }
}
