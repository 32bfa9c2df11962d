use colored::{ColoredString, Colorize};

use crate::assess::{AssessmentResult, ModuleStatus, ReadinessLevel};
use crate::contracts::TranslationSummary;
use crate::issue::{Finding, FindingSeverity, Severity};
use crate::l3out::L3OutSummary;
use crate::physical::PhysicalSummary;
use crate::vlan::VlanSummary;
use crate::vpc::VpcSummary;

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::High => "HIGH".red().bold(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".cyan(),
    }
}

fn level_tag(level: ReadinessLevel) -> ColoredString {
    match level {
        ReadinessLevel::High => level.as_str().green(),
        ReadinessLevel::Medium => level.as_str().yellow(),
        ReadinessLevel::Low => level.as_str().red(),
    }
}

fn score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.1}"))
}

fn append_findings(out: &mut Vec<String>, findings: &[Finding]) {
    if findings.is_empty() {
        return;
    }
    out.push("findings".to_string());
    for finding in findings {
        let tag = match finding.severity {
            FindingSeverity::Warning => "WARN".yellow(),
            FindingSeverity::Info => "INFO".normal(),
        };
        out.push(format!(
            "- [{tag}] {} {}: {}",
            finding.code, finding.subject, finding.message
        ));
    }
}

/// Overall verdict, module breakdown, critical issues and recommendations.
pub fn render_assessment_text(result: &AssessmentResult, verbose: bool) -> String {
    let verdict = if result.ready_for_migration {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    let mut out = vec![format!(
        "[{verdict}] readiness score={:.1} level={} threshold={:.1} objects={}",
        result.overall_score,
        level_tag(result.readiness_level),
        result.threshold,
        result.object_count
    )];

    out.push("modules".to_string());
    for row in &result.modules {
        let status = match &row.status {
            ModuleStatus::Completed => "completed".green().to_string(),
            ModuleStatus::Failed { reason } => format!("{} ({reason})", "failed".red()),
        };
        out.push(format!(
            "- {}: score={} weight={:.2} effective={:.2} status={status}",
            row.module,
            score(row.score),
            row.configured_weight,
            row.effective_weight
        ));
    }

    out.push(format!("critical_issues={}", result.critical_issues.len()));
    for issue in &result.critical_issues {
        out.push(format!(
            "- [{}] {} {}: {}",
            "CRITICAL".red().bold(),
            issue.module,
            issue.code,
            issue.message
        ));
    }

    out.push(format!("recommendations={}", result.recommendations.len()));
    for rec in &result.recommendations {
        out.push(format!("- [{}] {}: {}", severity_tag(rec.severity), rec.module, rec.message));
    }

    if verbose {
        if let Some(vpc) = &result.vpc {
            out.push(String::new());
            out.push(render_vpc_text(vpc));
        }
        if let Some(contracts) = &result.contracts {
            out.push(String::new());
            out.push(render_contracts_text(contracts));
        }
        if let Some(l3out) = &result.l3out {
            out.push(String::new());
            out.push(render_l3out_text(l3out));
        }
        if let Some(vlan) = &result.vlan {
            out.push(String::new());
            out.push(render_vlan_text(vlan));
        }
        if let Some(physical) = &result.physical {
            out.push(String::new());
            out.push(render_physical_text(physical));
        }
    }
    out.join("\n")
}

pub fn render_vpc_text(summary: &VpcSummary) -> String {
    let mut out = vec![format!(
        "vpc score={:.1} domains={} healthy={} port_channels={} vpc_port_channels={} endpoints={} dual_homed={} single_homed={} esi={}",
        summary.score,
        summary.domains.len(),
        summary.healthy_domains,
        summary.port_channels.len(),
        summary.vpc_port_channels,
        summary.endpoints.len(),
        summary.dual_homed,
        summary.single_homed,
        summary.esi_generated
    )];
    out.push(format!(
        "lacp active={} passive={} on={} unknown={}",
        summary.lacp.active, summary.lacp.passive, summary.lacp.on, summary.lacp.unknown
    ));
    out.push("domains".to_string());
    for domain in &summary.domains {
        out.push(format!(
            "- {}: {} status={:?} vip={}",
            domain.id,
            domain.member_names.join(" <-> "),
            domain.status,
            domain.virtual_ip.as_deref().unwrap_or("-")
        ));
    }
    if !summary.esi_candidates.is_empty() {
        out.push("esi_candidates".to_string());
        for candidate in &summary.esi_candidates {
            out.push(format!(
                "- domain={} po{} group={} esi={}",
                candidate.domain_id,
                candidate.port_channel_id,
                candidate.policy_group,
                candidate.esi
            ));
        }
    }
    append_findings(&mut out, &summary.findings);
    out.join("\n")
}

pub fn render_contracts_text(summary: &TranslationSummary) -> String {
    let mut out = vec![format!(
        "contracts score={:.1} total={} translated={} empty={} rules={} acls={}",
        summary.score,
        summary.total_contracts,
        summary.translated,
        summary.empty.len(),
        summary.total_rules,
        summary.acls_generated
    )];
    out.push(format!(
        "complexity simple={} medium={} complex={}",
        summary.complexity.simple, summary.complexity.medium, summary.complexity.complex
    ));
    if !summary.scopes.is_empty() {
        let scopes: Vec<String> = summary
            .scopes
            .iter()
            .map(|(scope, count)| format!("{scope}={count}"))
            .collect();
        out.push(format!("scopes {}", scopes.join(" ")));
    }
    out.push("contracts".to_string());
    for contract in &summary.contracts {
        out.push(format!(
            "- {}/{}: subjects={} entries={} rules={} complexity={:?}",
            contract.tenant,
            contract.name,
            contract.subject_count,
            contract.entry_count,
            contract.rule_count(),
            contract.complexity
        ));
    }
    append_findings(&mut out, &summary.findings);
    out.join("\n")
}

pub fn render_l3out_text(summary: &L3OutSummary) -> String {
    let mut out = vec![format!(
        "l3out score={:.1} total={} bgp={} ospf={} static={} multiple={} border_leaves={}",
        summary.score,
        summary.l3outs.len(),
        summary.protocols.bgp,
        summary.protocols.ospf,
        summary.protocols.static_routes,
        summary.protocols.multiple,
        summary.border_leaves.len()
    )];
    out.push(format!(
        "bgp peers={} ebgp={} ibgp={} unknown={}",
        summary.bgp.peers, summary.bgp.ebgp, summary.bgp.ibgp, summary.bgp.unknown
    ));
    out.push("l3outs".to_string());
    for l3out in &summary.l3outs {
        let protocols: Vec<&str> = l3out.protocols.iter().map(|p| p.as_str()).collect();
        out.push(format!(
            "- {}/{}: vrf={} protocols={} leaves={} peers={} complexity={}",
            l3out.tenant,
            l3out.name,
            l3out.vrf.as_deref().unwrap_or("-"),
            if protocols.is_empty() {
                "none".to_string()
            } else {
                protocols.join("+")
            },
            l3out.border_leaves.len(),
            l3out.bgp_peers.len(),
            l3out.complexity.as_str()
        ));
    }
    for risk in &summary.risk_factors {
        out.push(format!("- [{}] {}: {}", severity_tag(risk.level), risk.factor, risk.impact));
    }
    append_findings(&mut out, &summary.findings);
    out.join("\n")
}

pub fn render_vlan_text(summary: &VlanSummary) -> String {
    let mut out = vec![format!(
        "vlan score={:.1} pools={} allocated={} used={} utilization={:.1}% conflicts={} strategy={}",
        summary.score,
        summary.pools.len(),
        summary.allocated,
        summary.used_in_pools,
        summary.utilization,
        summary.conflicts.len(),
        summary.strategy.as_str()
    )];
    if summary.consolidation_recommended {
        out.push("consolidation recommended".to_string());
    }
    out.push("pools".to_string());
    for pool in &summary.pools {
        let ranges: Vec<String> = pool
            .blocks
            .iter()
            .map(|b| format!("{}-{}", b.from, b.to))
            .collect();
        out.push(format!(
            "- {}: mode={:?} ranges={} allocated={} used={} fragmentation={:?}",
            pool.name,
            pool.alloc_mode,
            ranges.join(","),
            pool.allocated,
            pool.used,
            pool.fragmentation
        ));
    }
    for conflict in &summary.conflicts {
        out.push(format!(
            "- [{}] {} {}-{} vs {} {}-{}",
            "OVERLAP".red(),
            conflict.first.pool,
            conflict.first.from,
            conflict.first.to,
            conflict.second.pool,
            conflict.second.from,
            conflict.second.to
        ));
    }
    out.push("migration_steps".to_string());
    out.extend(summary.migration_steps.iter().map(|step| format!("  {step}")));
    append_findings(&mut out, &summary.findings);
    out.join("\n")
}

pub fn render_physical_text(summary: &PhysicalSummary) -> String {
    let mut out = vec![format!(
        "physical interfaces={} up={} down={} unused={} lldp={} cdp={} external={} fex={}",
        summary.counts.total,
        summary.counts.up,
        summary.counts.down,
        summary.counts.unused,
        summary.lldp_neighbors,
        summary.cdp_neighbors,
        summary.external_devices.len(),
        summary.fexes.len()
    )];
    out.push("devices".to_string());
    for device in &summary.devices {
        out.push(format!(
            "- {} ({}): up={} down={} unused={}",
            device.name, device.node, device.counts.up, device.counts.down, device.counts.unused
        ));
    }
    if !summary.speeds.is_empty() {
        let speeds: Vec<String> = summary
            .speeds
            .iter()
            .map(|(speed, count)| format!("{speed}={count}"))
            .collect();
        out.push(format!("speeds {}", speeds.join(" ")));
    }
    if !summary.port_mapping.is_empty() {
        out.push("port_mapping".to_string());
        for mapping in &summary.port_mapping {
            out.push(format!(
                "- {} {} -> {}",
                mapping.device, mapping.old_interface, mapping.new_interface
            ));
        }
    }
    append_findings(&mut out, &summary.findings);
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use aci_snapshot::Snapshot;

    use super::*;
    use crate::assess::Assessor;
    use crate::settings::AssessmentSettings;

    #[test]
    fn assessment_text_lists_every_module() {
        colored::control::set_override(false);
        let result = Assessor::new(AssessmentSettings::default()).assess(&Snapshot::new());
        let text = render_assessment_text(&result, false);
        assert!(text.starts_with("[PASS] readiness score=95.0 level=high"));
        for module in ["vpc", "contracts", "l3out", "vlan", "physical"] {
            assert!(text.contains(&format!("- {module}: score=")), "{module} missing");
        }
        assert!(text.contains("physical: score=n/a"));
    }

    #[test]
    fn verbose_text_includes_module_sections() {
        colored::control::set_override(false);
        let result = Assessor::new(AssessmentSettings::default()).assess(&Snapshot::new());
        let text = render_assessment_text(&result, true);
        assert!(text.contains("vlan score=80.0 pools=0"));
        assert!(text.contains("physical interfaces=0"));
    }
}
