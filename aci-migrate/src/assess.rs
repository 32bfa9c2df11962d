//! Runs every analyzer over one snapshot and folds the sub-scores into a
//! single readiness verdict.
//!
//! A failing analyzer never aborts the run. Its error becomes a critical
//! issue naming the module and its weight is spread over the modules that
//! completed.

use aci_snapshot::{ObjectIndex, Snapshot, SnapshotError};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::contracts::{self, TranslationSummary};
use crate::issue::{clamp_score, AnalyzerError, Issue, Module, ModuleSummary, Recommendation};
use crate::l3out::{self, L3OutSummary};
use crate::physical::{self, PhysicalSummary};
use crate::settings::AssessmentSettings;
use crate::vlan::{self, VlanSummary};
use crate::vpc::{self, VpcSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessLevel {
    High,
    Medium,
    Low,
}

impl ReadinessLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessLevel::High => "high",
            ReadinessLevel::Medium => "medium",
            ReadinessLevel::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ModuleStatus {
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleBreakdown {
    pub module: Module,
    pub status: ModuleStatus,
    pub score: Option<f64>,
    pub configured_weight: f64,
    /// Share of the overall score after failed modules are redistributed.
    pub effective_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResult {
    pub overall_score: f64,
    pub readiness_level: ReadinessLevel,
    pub ready_for_migration: bool,
    pub threshold: f64,
    pub object_count: usize,
    pub modules: Vec<ModuleBreakdown>,
    pub critical_issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub vpc: Option<VpcSummary>,
    pub contracts: Option<TranslationSummary>,
    pub l3out: Option<L3OutSummary>,
    pub vlan: Option<VlanSummary>,
    pub physical: Option<PhysicalSummary>,
}

impl AssessmentResult {
    pub fn module(&self, module: Module) -> Option<&ModuleBreakdown> {
        self.modules.iter().find(|m| m.module == module)
    }

    pub fn failed_modules(&self) -> Vec<Module> {
        self.modules
            .iter()
            .filter(|m| matches!(m.status, ModuleStatus::Failed { .. }))
            .map(|m| m.module)
            .collect()
    }
}

/// Issues, recommendations and breakdown rows gathered across analyzers.
#[derive(Default)]
struct Collected {
    modules: Vec<ModuleBreakdown>,
    critical_issues: Vec<Issue>,
    recommendations: Vec<Recommendation>,
}

impl Collected {
    fn record<S: ModuleSummary>(
        &mut self,
        module: Module,
        weight: f64,
        outcome: Result<S, AnalyzerError>,
    ) -> Option<S> {
        match outcome {
            Ok(summary) => {
                self.critical_issues.extend(summary.critical_issues());
                self.recommendations.extend(summary.recommendations());
                self.modules.push(ModuleBreakdown {
                    module,
                    status: ModuleStatus::Completed,
                    score: summary.score().map(clamp_score),
                    configured_weight: weight,
                    effective_weight: 0.0,
                });
                Some(summary)
            }
            Err(err) => {
                warn!(module = %module, error = %err, "analyzer failed");
                self.critical_issues.push(Issue::new(
                    module,
                    "analyzer_failed",
                    format!("{module} analysis failed: {err}"),
                ));
                self.modules.push(ModuleBreakdown {
                    module,
                    status: ModuleStatus::Failed {
                        reason: err.to_string(),
                    },
                    score: None,
                    configured_weight: weight,
                    effective_weight: 0.0,
                });
                None
            }
        }
    }

    /// Weighted mean over completed, scored modules. Weights are normalized
    /// over those modules alone; nothing completed scores 0.
    fn overall_score(&mut self) -> f64 {
        let total: f64 = self
            .modules
            .iter()
            .filter(|m| m.score.is_some())
            .map(|m| m.configured_weight)
            .sum();
        if total <= 0.0 {
            return 0.0;
        }
        let mut overall = 0.0;
        for row in &mut self.modules {
            if let Some(score) = row.score {
                row.effective_weight = row.configured_weight / total;
                overall += row.effective_weight * score;
            }
        }
        clamp_score(overall)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessor {
    settings: AssessmentSettings,
}

impl Default for Assessor {
    fn default() -> Self {
        Self::new(AssessmentSettings::embedded())
    }
}

impl Assessor {
    pub fn new(settings: AssessmentSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    pub fn assess(&self, snapshot: &Snapshot) -> AssessmentResult {
        let index = ObjectIndex::new(snapshot);
        info!(objects = snapshot.len(), "assessment started");
        let settings = &self.settings;
        let weights = &settings.weights;
        let mut collected = Collected::default();

        let vpc = collected.record(
            Module::Vpc,
            weights.weight(Module::Vpc),
            vpc::analyze(&index, settings),
        );
        let contracts = collected.record(
            Module::Contracts,
            weights.weight(Module::Contracts),
            contracts::translate(&index, settings),
        );
        let l3out = collected.record(
            Module::L3out,
            weights.weight(Module::L3out),
            l3out::analyze(&index, settings),
        );
        let vlan = collected.record(
            Module::Vlan,
            weights.weight(Module::Vlan),
            vlan::analyze(&index, settings),
        );
        let physical = collected.record(
            Module::Physical,
            weights.weight(Module::Physical),
            physical::analyze(&index, settings),
        );

        let overall_score = collected.overall_score();
        let readiness = &settings.readiness;
        let readiness_level = if overall_score >= readiness.high {
            ReadinessLevel::High
        } else if overall_score >= readiness.medium {
            ReadinessLevel::Medium
        } else {
            ReadinessLevel::Low
        };
        // Stable: analyzer order survives within each severity.
        collected.recommendations.sort_by_key(|r| r.severity);

        info!(
            score = overall_score,
            level = readiness_level.as_str(),
            critical = collected.critical_issues.len(),
            "assessment finished"
        );
        AssessmentResult {
            overall_score,
            readiness_level,
            ready_for_migration: overall_score >= readiness.ready_threshold,
            threshold: readiness.ready_threshold,
            object_count: snapshot.len(),
            modules: collected.modules,
            critical_issues: collected.critical_issues,
            recommendations: collected.recommendations,
            vpc,
            contracts,
            l3out,
            vlan,
            physical,
        }
    }

    /// Parse an export or normalized snapshot and assess it. A value of the
    /// wrong shape is the only error.
    pub fn assess_json(&self, value: &Value) -> Result<AssessmentResult, SnapshotError> {
        let snapshot = Snapshot::from_json_value(value)?;
        Ok(self.assess(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use aci_snapshot::NetworkObject;
    use serde_json::json;

    use super::*;

    fn broken_contract() -> Snapshot {
        Snapshot::new()
            .with(NetworkObject::new("vzBrCP", "uni/tn-prod/brc-web").with_attr("name", "web"))
            .with(NetworkObject::new("vzSubj", "uni/tn-prod/brc-web/subj-main"))
            .with(
                NetworkObject::new(
                    "vzRsSubjFiltAtt",
                    "uni/tn-prod/brc-web/subj-main/rssubjFiltAtt-",
                )
                .with_attr("tnVzFilterName", ""),
            )
    }

    #[test]
    fn empty_snapshot_is_neutral() {
        let result = Assessor::new(AssessmentSettings::default()).assess(&Snapshot::new());
        // vpc 100, contracts 100, l3out 100, vlan 80
        assert!((result.overall_score - 95.0).abs() < 1e-9);
        assert_eq!(result.readiness_level, ReadinessLevel::High);
        assert!(result.ready_for_migration);
        assert!(result.failed_modules().is_empty());
        assert_eq!(result.module(Module::Physical).and_then(|m| m.score), None);
    }

    #[test]
    fn failed_module_weight_is_redistributed() {
        let result = Assessor::new(AssessmentSettings::default()).assess(&broken_contract());
        assert_eq!(result.failed_modules(), vec![Module::Contracts]);
        assert!(result.contracts.is_none());
        assert!(result.vpc.is_some() && result.l3out.is_some());
        assert!(result.vlan.is_some() && result.physical.is_some());

        let failure: Vec<&Issue> = result
            .critical_issues
            .iter()
            .filter(|i| i.code == "analyzer_failed")
            .collect();
        assert_eq!(failure.len(), 1);
        assert!(failure[0].message.contains("contracts"));

        let vpc = result.module(Module::Vpc).expect("vpc row");
        assert!((vpc.effective_weight - 1.0 / 3.0).abs() < 1e-9);
        // (100 + 100 + 80) / 3
        assert!((result.overall_score - 280.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_and_levels_follow_settings() {
        let mut settings = AssessmentSettings::default();
        settings.readiness.ready_threshold = 96.0;
        settings.readiness.high = 99.0;
        let result = Assessor::new(settings).assess(&Snapshot::new());
        assert!(!result.ready_for_migration);
        assert_eq!(result.readiness_level, ReadinessLevel::Medium);
    }

    #[test]
    fn recommendations_are_grouped_by_severity() {
        let result = Assessor::new(AssessmentSettings::default()).assess(&broken_contract());
        let severities: Vec<_> = result.recommendations.iter().map(|r| r.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort();
        assert_eq!(severities, sorted);
    }

    #[test]
    fn wrong_shape_json_is_fatal() {
        let assessor = Assessor::new(AssessmentSettings::default());
        assert!(assessor.assess_json(&json!("not a snapshot")).is_err());
        assert!(assessor.assess_json(&json!({ "imdata": [] })).is_ok());
    }
}
