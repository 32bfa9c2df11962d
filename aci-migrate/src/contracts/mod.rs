//! Contract-to-ACL translation.
//!
//! Each `vzBrCP` is walked subject by subject: `vzRsSubjFiltAtt` relations
//! apply to both directions, `vzInTerm`/`vzOutTerm` relations to one. Filter
//! entries become rules in declaration order and are never reordered.

pub mod dialects;
pub mod rules;

use std::collections::BTreeMap;

use aci_snapshot::{dn, NetworkObject, ObjectIndex};
use serde::Serialize;
use tracing::{debug, info};

use crate::issue::{
    clamp_score, warning, AnalyzerError, Finding, Issue, Module, ModuleSummary, Recommendation,
    Severity,
};
use crate::settings::AssessmentSettings;

pub use rules::{AclRule, Action, Direction, EntryMatch, PortSpec};

const SIMPLE_MAX_SUBJECTS: usize = 1;
const SIMPLE_MAX_ENTRIES: usize = 3;
const COMPLEX_MIN_SUBJECTS: usize = 4;
const COMPLEX_MIN_ENTRIES: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn classify(subjects: usize, entries: usize) -> Self {
        if subjects >= COMPLEX_MIN_SUBJECTS || entries >= COMPLEX_MIN_ENTRIES {
            Complexity::Complex
        } else if subjects <= SIMPLE_MAX_SUBJECTS && entries <= SIMPLE_MAX_ENTRIES {
            Complexity::Simple
        } else {
            Complexity::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplexityDistribution {
    pub simple: usize,
    pub medium: usize,
    pub complex: usize,
}

/// One ACL, applied outbound on one side of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acl {
    pub name: String,
    pub direction: Direction,
    pub applied_to: Vec<String>,
    pub rules: Vec<AclRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractTranslation {
    pub name: String,
    pub dn: String,
    pub tenant: String,
    pub scope: String,
    pub subject_count: usize,
    pub entry_count: usize,
    pub complexity: Complexity,
    pub providers: Vec<String>,
    pub consumers: Vec<String>,
    /// Empty contracts carry no ACLs.
    pub acls: Vec<Acl>,
}

impl ContractTranslation {
    pub fn is_empty(&self) -> bool {
        self.acls.iter().all(|acl| acl.rules.is_empty())
    }

    pub fn rule_count(&self) -> usize {
        self.acls.iter().map(|acl| acl.rules.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationSummary {
    pub total_contracts: usize,
    pub translated: usize,
    pub empty: Vec<String>,
    pub complexity: ComplexityDistribution,
    pub scopes: BTreeMap<String, usize>,
    pub total_rules: usize,
    pub acls_generated: usize,
    pub contracts: Vec<ContractTranslation>,
    pub findings: Vec<Finding>,
    pub score: f64,
}

/// Translate every contract in the snapshot.
pub fn translate(
    index: &ObjectIndex<'_>,
    settings: &AssessmentSettings,
) -> Result<TranslationSummary, AnalyzerError> {
    info!(
        contracts = index.get("vzBrCP").len(),
        subjects = index.get("vzSubj").len(),
        filters = index.get("vzFilter").len(),
        entries = index.get("vzEntry").len(),
        "contract translation"
    );
    let mut findings = Vec::new();
    let mut contracts = Vec::new();
    let mut complexity = ComplexityDistribution::default();
    let mut scopes: BTreeMap<String, usize> = BTreeMap::new();

    for contract in index.get("vzBrCP") {
        let translation = translate_contract(index, contract, &mut findings)?;
        match translation.complexity {
            Complexity::Simple => complexity.simple += 1,
            Complexity::Medium => complexity.medium += 1,
            Complexity::Complex => complexity.complex += 1,
        }
        *scopes.entry(translation.scope.clone()).or_default() += 1;
        contracts.push(translation);
    }

    let empty: Vec<String> = contracts
        .iter()
        .filter(|c| c.is_empty())
        .map(|c| c.name.clone())
        .collect();
    let total_rules = contracts.iter().map(ContractTranslation::rule_count).sum();
    let acls_generated = contracts.iter().map(|c| c.acls.len()).sum();
    let penalty = settings.contracts.medium_penalty * complexity.medium as f64
        + settings.contracts.complex_penalty * complexity.complex as f64;

    Ok(TranslationSummary {
        total_contracts: contracts.len(),
        translated: contracts.len() - empty.len(),
        empty,
        complexity,
        scopes,
        total_rules,
        acls_generated,
        contracts,
        findings,
        score: clamp_score(100.0 - penalty),
    })
}

fn translate_contract(
    index: &ObjectIndex<'_>,
    contract: &NetworkObject,
    findings: &mut Vec<Finding>,
) -> Result<ContractTranslation, AnalyzerError> {
    let name = contract.name().to_string();
    let tenant = dn::tenant(&contract.dn).unwrap_or("common").to_string();
    let subjects = index.children(&contract.dn, "vzSubj");

    let mut consumer_rules = Vec::new();
    let mut provider_rules = Vec::new();
    let mut entry_count = 0;

    for subject in &subjects {
        let reverse_ports = subject.attr("revFltPorts") != Some("no");
        let label = format!("{name}:{}", subject.name());

        for relation in index.children(&subject.dn, "vzRsSubjFiltAtt") {
            let Some(entries) = filter_entries(index, &tenant, relation, findings)? else {
                continue;
            };
            entry_count += entries.len();
            let action = Action::from_relation(relation);
            for (matched, filter) in &entries {
                let description = format!("{label}:{filter}:{}", matched.name);
                consumer_rules.push(matched.rule(
                    action,
                    Direction::ConsumerOut,
                    description.clone(),
                ));
                if reverse_ports {
                    provider_rules.push(matched.mirrored(action, description));
                }
            }
        }

        for (term_class, direction) in [
            ("vzInTerm", Direction::ConsumerOut),
            ("vzOutTerm", Direction::ProviderOut),
        ] {
            for term in index.children(&subject.dn, term_class) {
                for relation in index.children(&term.dn, "vzRsFiltAtt") {
                    let Some(entries) = filter_entries(index, &tenant, relation, findings)? else {
                        continue;
                    };
                    entry_count += entries.len();
                    let action = Action::from_relation(relation);
                    for (matched, filter) in &entries {
                        let rule = matched.rule(
                            action,
                            direction,
                            format!("{label}:{filter}:{}", matched.name),
                        );
                        match direction {
                            Direction::ConsumerOut => consumer_rules.push(rule),
                            Direction::ProviderOut => provider_rules.push(rule),
                        }
                    }
                }
            }
        }
    }

    let providers = epg_relations(index, &name, &tenant, &["fvRsProv", "vzRsAnyToProv"]);
    let consumers = epg_relations(index, &name, &tenant, &["fvRsCons", "vzRsAnyToCons"]);

    let mut acls = Vec::new();
    if !consumer_rules.is_empty() || !provider_rules.is_empty() {
        for (direction, rules, applied_to) in [
            (Direction::ConsumerOut, consumer_rules, &consumers),
            (Direction::ProviderOut, provider_rules, &providers),
        ] {
            if rules.is_empty() {
                continue;
            }
            acls.push(Acl {
                name: acl_name(&tenant, &name, direction),
                direction,
                applied_to: applied_to.clone(),
                rules: number(rules),
            });
        }
    } else {
        debug!(contract = %contract.dn, "contract has no enforceable rules");
    }

    Ok(ContractTranslation {
        scope: contract.attr("scope").unwrap_or("context").to_string(),
        subject_count: subjects.len(),
        complexity: Complexity::classify(subjects.len(), entry_count),
        dn: contract.dn.clone(),
        name,
        tenant,
        entry_count,
        providers,
        consumers,
        acls,
    })
}

/// Entries of the filter a relation points at, tenant-local first, then `common`.
///
/// A relation that names no filter is malformed. A named filter that does not
/// resolve is a degraded finding and yields `None`.
fn filter_entries(
    index: &ObjectIndex<'_>,
    tenant: &str,
    relation: &NetworkObject,
    findings: &mut Vec<Finding>,
) -> Result<Option<Vec<(EntryMatch, String)>>, AnalyzerError> {
    let filter_name = relation
        .attr("tnVzFilterName")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AnalyzerError::malformed(relation, "filter relation names no filter"))?;

    let filter = index
        .resolve(&format!("uni/tn-{tenant}/flt-{filter_name}"))
        .or_else(|_| index.resolve(&format!("uni/tn-common/flt-{filter_name}")));
    let filter = match filter {
        Ok(filter) => filter,
        Err(missing) => {
            findings.push(warning(
                "filter_missing",
                &relation.dn,
                format!("filter {filter_name} not found ({missing})"),
            ));
            return Ok(None);
        }
    };

    index
        .children(&filter.dn, "vzEntry")
        .into_iter()
        .map(|entry| EntryMatch::from_entry(entry).map(|m| (m, filter_name.to_string())))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn epg_relations(
    index: &ObjectIndex<'_>,
    contract: &str,
    tenant: &str,
    classes: &[&str],
) -> Vec<String> {
    let mut out: Vec<String> = classes
        .iter()
        .flat_map(|class| index.get(class))
        .filter(|rel| rel.attr("tnVzBrCPName") == Some(contract))
        .filter(|rel| tenant == "common" || dn::tenant(&rel.dn) == Some(tenant))
        .filter_map(|rel| dn::parent_dn(&rel.dn).map(str::to_string))
        .collect();
    out.sort();
    out.dedup();
    out
}

fn acl_name(tenant: &str, contract: &str, direction: Direction) -> String {
    let sanitize = |raw: &str| -> String {
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };
    format!(
        "ACL_{}_{}_{}",
        sanitize(tenant),
        sanitize(contract),
        direction.acl_suffix()
    )
}

fn number(mut rules: Vec<AclRule>) -> Vec<AclRule> {
    for (idx, rule) in rules.iter_mut().enumerate() {
        rule.sequence = (idx as u32 + 1) * 10;
    }
    rules
}

impl ModuleSummary for TranslationSummary {
    fn score(&self) -> Option<f64> {
        Some(self.score)
    }

    fn critical_issues(&self) -> Vec<Issue> {
        self.empty
            .iter()
            .map(|name| {
                Issue::new(
                    Module::Contracts,
                    "empty_contract",
                    format!("contract {name} has no enforceable rules"),
                )
            })
            .collect()
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let mut out = Vec::new();
        if self.complexity.complex > 0 {
            out.push(Recommendation::new(
                Module::Contracts,
                Severity::High,
                format!(
                    "Review {} complex contract(s) manually; translated ACLs need validation",
                    self.complexity.complex
                ),
            ));
        }
        if let Some(global) = self.scopes.get("global").filter(|n| **n > 0) {
            out.push(Recommendation::new(
                Module::Contracts,
                Severity::Medium,
                format!(
                    "{global} global-scope contract(s) span VRFs; plan inter-VRF route leaking"
                ),
            ));
        }
        if self.findings.iter().any(|f| f.code == "filter_missing") {
            out.push(Recommendation::new(
                Module::Contracts,
                Severity::Medium,
                "Collect the missing filters from the source fabric and re-run the translation",
            ));
        }
        if self.translated > 0 {
            out.push(Recommendation::new(
                Module::Contracts,
                Severity::Low,
                format!(
                    "Apply the {} generated ACL(s) outbound on the consumer and provider interfaces",
                    self.acls_generated
                ),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use aci_snapshot::{NetworkObject, ObjectIndex, Snapshot};

    use super::*;

    fn base(contract: &str) -> Snapshot {
        Snapshot::new()
            .with(
                NetworkObject::new("vzBrCP", format!("uni/tn-prod/brc-{contract}"))
                    .with_attr("name", contract),
            )
            .with(
                NetworkObject::new("vzSubj", format!("uni/tn-prod/brc-{contract}/subj-main"))
                    .with_attr("name", "main"),
            )
    }

    fn filter(snapshot: Snapshot, name: &str, entries: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = snapshot.with(
            NetworkObject::new("vzFilter", format!("uni/tn-prod/flt-{name}"))
                .with_attr("name", name),
        );
        for (prot, port) in entries {
            snapshot = snapshot.with(
                NetworkObject::new("vzEntry", format!("uni/tn-prod/flt-{name}/e-{prot}{port}"))
                    .with_attr("name", format!("{prot}{port}"))
                    .with_attr("etherT", "ip")
                    .with_attr("prot", *prot)
                    .with_attr("dFromPort", *port)
                    .with_attr("dToPort", *port),
            );
        }
        snapshot
    }

    fn relation(contract: &str, filter: &str, action: &str) -> NetworkObject {
        NetworkObject::new(
            "vzRsSubjFiltAtt",
            format!("uni/tn-prod/brc-{contract}/subj-main/rssubjFiltAtt-{filter}"),
        )
        .with_attr("tnVzFilterName", filter)
        .with_attr("action", action)
    }

    #[test]
    fn preserves_entry_order_and_actions() {
        let snapshot = filter(
            filter(filter(base("web"), "f80", &[("tcp", "80")]), "f443", &[("tcp", "443")]),
            "f53",
            &[("udp", "53")],
        )
        .with(relation("web", "f80", "permit"))
        .with(relation("web", "f443", "deny"))
        .with(relation("web", "f53", "permit"));
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");

        let contract = &summary.contracts[0];
        let consumer = &contract.acls[0];
        assert_eq!(consumer.direction, Direction::ConsumerOut);
        let seen: Vec<(u32, Action, String, PortSpec)> = consumer
            .rules
            .iter()
            .map(|r| (r.sequence, r.action, r.protocol.clone(), r.dest_port))
            .collect();
        assert_eq!(
            seen,
            vec![
                (10, Action::Permit, "tcp".to_string(), PortSpec::Eq { port: 80 }),
                (20, Action::Deny, "tcp".to_string(), PortSpec::Eq { port: 443 }),
                (30, Action::Permit, "udp".to_string(), PortSpec::Eq { port: 53 }),
            ]
        );
        assert_eq!(contract.acls[1].direction, Direction::ProviderOut);
        assert_eq!(contract.complexity, Complexity::Simple);
    }

    fn term_relation(term: &str, filter: &str) -> NetworkObject {
        NetworkObject::new(
            "vzRsFiltAtt",
            format!("uni/tn-prod/brc-web/subj-main/{term}/rsfiltAtt-{filter}"),
        )
        .with_attr("tnVzFilterName", filter)
    }

    // One-way subject: in-term entries go to the consumer side, out-term
    // entries to the provider side, both with ports as written.
    fn one_way_subject() -> Snapshot {
        let snapshot = Snapshot::new()
            .with(NetworkObject::new("vzBrCP", "uni/tn-prod/brc-web").with_attr("name", "web"))
            .with(
                NetworkObject::new("vzSubj", "uni/tn-prod/brc-web/subj-main")
                    .with_attr("name", "main")
                    .with_attr("revFltPorts", "no"),
            )
            .with(NetworkObject::new("vzInTerm", "uni/tn-prod/brc-web/subj-main/intmnl"))
            .with(NetworkObject::new("vzOutTerm", "uni/tn-prod/brc-web/subj-main/outtmnl"))
            .with(term_relation("intmnl", "to-https"))
            .with(term_relation("outtmnl", "from-https"))
            .with(
                NetworkObject::new("vzFilter", "uni/tn-prod/flt-from-https")
                    .with_attr("name", "from-https"),
            )
            .with(
                NetworkObject::new("vzEntry", "uni/tn-prod/flt-from-https/e-src443")
                    .with_attr("name", "src443")
                    .with_attr("etherT", "ip")
                    .with_attr("prot", "tcp")
                    .with_attr("sFromPort", "443")
                    .with_attr("sToPort", "443"),
            );
        filter(snapshot, "to-https", &[("tcp", "443")])
    }

    #[test]
    fn in_term_rules_stay_on_consumer_side() {
        let snapshot = one_way_subject();
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        let contract = &summary.contracts[0];
        let consumer = &contract.acls[0];
        assert_eq!(consumer.direction, Direction::ConsumerOut);
        assert_eq!(consumer.rules.len(), 1);
        assert_eq!(consumer.rules[0].source_port, PortSpec::Any);
        assert_eq!(consumer.rules[0].dest_port, PortSpec::Eq { port: 443 });
    }

    #[test]
    fn out_term_rules_keep_their_ports() {
        let snapshot = one_way_subject();
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        let provider = &summary.contracts[0].acls[1];
        assert_eq!(provider.direction, Direction::ProviderOut);
        assert_eq!(provider.rules.len(), 1);
        let rule = &provider.rules[0];
        assert_eq!(rule.source_port, PortSpec::Eq { port: 443 });
        assert_eq!(rule.dest_port, PortSpec::Any);
        assert_eq!(rule.sequence, 10);
        assert_eq!(summary.contracts[0].entry_count, 2);
    }

    #[test]
    fn bidirectional_subject_mirrors_provider_ports() {
        let snapshot = filter(base("web"), "f80", &[("tcp", "80")])
            .with(relation("web", "f80", "permit"));
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        let provider = &summary.contracts[0].acls[1];
        assert_eq!(provider.rules[0].source_port, PortSpec::Eq { port: 80 });
        assert_eq!(provider.rules[0].dest_port, PortSpec::Any);
    }

    #[test]
    fn empty_contract_is_a_critical_issue() {
        let snapshot = base("void");
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        assert_eq!(summary.empty, vec!["void".to_string()]);
        assert!(summary.contracts[0].acls.is_empty());
        let issues = summary.critical_issues();
        assert_eq!(issues[0].message, "contract void has no enforceable rules");
        assert_eq!(summary.score, 100.0);
    }

    #[test]
    fn relation_without_filter_name_is_malformed() {
        let snapshot = base("web").with(
            NetworkObject::new("vzRsSubjFiltAtt", "uni/tn-prod/brc-web/subj-main/rssubjFiltAtt-")
                .with_attr("tnVzFilterName", ""),
        );
        let index = ObjectIndex::new(&snapshot);
        assert!(translate(&index, &AssessmentSettings::default()).is_err());
    }

    #[test]
    fn falls_back_to_common_filters() {
        let snapshot = base("web")
            .with(
                NetworkObject::new("vzFilter", "uni/tn-common/flt-default")
                    .with_attr("name", "default"),
            )
            .with(
                NetworkObject::new("vzEntry", "uni/tn-common/flt-default/e-any")
                    .with_attr("etherT", "unspecified"),
            )
            .with(relation("web", "default", "permit"));
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        assert_eq!(summary.total_rules, 2);
        assert!(summary.empty.is_empty());
    }

    #[test]
    fn complexity_thresholds() {
        assert_eq!(Complexity::classify(1, 3), Complexity::Simple);
        assert_eq!(Complexity::classify(2, 3), Complexity::Medium);
        assert_eq!(Complexity::classify(1, 4), Complexity::Medium);
        assert_eq!(Complexity::classify(3, 10), Complexity::Medium);
        assert_eq!(Complexity::classify(4, 1), Complexity::Complex);
        assert_eq!(Complexity::classify(1, 11), Complexity::Complex);
    }

    #[test]
    fn score_penalizes_medium_and_complex() {
        let mut snapshot = Snapshot::new();
        for idx in 0..8 {
            snapshot.push(NetworkObject::new("vzBrCP", format!("uni/tn-prod/brc-c{idx}")));
            for subj in 0..4 {
                snapshot.push(NetworkObject::new(
                    "vzSubj",
                    format!("uni/tn-prod/brc-c{idx}/subj-s{subj}"),
                ));
            }
        }
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        assert_eq!(summary.complexity.complex, 8);
        assert_eq!(summary.score, 0.0);
    }

    #[test]
    fn providers_and_consumers_by_name() {
        let snapshot = filter(base("web"), "f80", &[("tcp", "80")])
            .with(relation("web", "f80", "permit"))
            .with(
                NetworkObject::new("fvRsProv", "uni/tn-prod/ap-app/epg-web/rsprov-web")
                    .with_attr("tnVzBrCPName", "web"),
            )
            .with(
                NetworkObject::new("fvRsCons", "uni/tn-prod/ap-app/epg-app/rscons-web")
                    .with_attr("tnVzBrCPName", "web"),
            )
            .with(
                NetworkObject::new("fvRsCons", "uni/tn-other/ap-x/epg-y/rscons-web")
                    .with_attr("tnVzBrCPName", "web"),
            );
        let index = ObjectIndex::new(&snapshot);
        let summary = translate(&index, &AssessmentSettings::default()).expect("translate");
        let contract = &summary.contracts[0];
        assert_eq!(contract.providers, vec!["uni/tn-prod/ap-app/epg-web".to_string()]);
        assert_eq!(contract.consumers, vec!["uni/tn-prod/ap-app/epg-app".to_string()]);
        assert_eq!(contract.acls[0].name, "ACL_prod_web_CONSUMER_OUT");
    }
}
