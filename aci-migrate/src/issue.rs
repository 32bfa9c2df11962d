use std::fmt::{self, Display, Formatter};

use aci_snapshot::NetworkObject;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The five domain analyzers, in the order the aggregator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Vpc,
    Contracts,
    L3out,
    Vlan,
    Physical,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Module::Vpc => "vpc",
            Module::Contracts => "contracts",
            Module::L3out => "l3out",
            Module::Vlan => "vlan",
            Module::Physical => "physical",
        }
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation priority. Ordering is high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A blocking problem that lands in the assessment's critical issue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub module: Module,
    pub code: String,
    pub message: String,
}

impl Issue {
    pub fn new(module: Module, code: &str, message: impl Into<String>) -> Self {
        Self {
            module,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub module: Module,
    pub severity: Severity,
    pub message: String,
}

impl Recommendation {
    pub fn new(module: Module, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            module,
            severity,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingSeverity {
    Warning,
    Info,
}

/// A degraded or incomplete observation local to one analyzer summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: FindingSeverity,
    pub code: String,
    pub subject: String,
    pub message: String,
}

pub fn warning(code: &str, subject: &str, message: impl Into<String>) -> Finding {
    Finding {
        severity: FindingSeverity::Warning,
        code: code.to_string(),
        subject: subject.to_string(),
        message: message.into(),
    }
}

pub fn info(code: &str, subject: &str, message: impl Into<String>) -> Finding {
    Finding {
        severity: FindingSeverity::Info,
        code: code.to_string(),
        subject: subject.to_string(),
        message: message.into(),
    }
}

/// Failure of one analyzer, recovered at the aggregator boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzerError {
    #[error("malformed {class} {dn}: {reason}")]
    Malformed {
        class: String,
        dn: String,
        reason: String,
    },
}

impl AnalyzerError {
    pub fn malformed(object: &NetworkObject, reason: impl Into<String>) -> Self {
        AnalyzerError::Malformed {
            class: object.class.clone(),
            dn: object.dn.clone(),
            reason: reason.into(),
        }
    }
}

/// What the aggregator reads from every analyzer summary.
pub trait ModuleSummary {
    /// Readiness sub-score in `[0, 100]`, or `None` for descriptive modules.
    fn score(&self) -> Option<f64>;
    fn critical_issues(&self) -> Vec<Issue>;
    fn recommendations(&self) -> Vec<Recommendation>;
}

/// Clamp a score into `[0, 100]`, mapping NaN to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// `part / whole`, defined as 1 when there is nothing to measure.
pub fn ratio_or_one(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_high_first() {
        let mut tiers = vec![Severity::Low, Severity::High, Severity::Medium];
        tiers.sort();
        assert_eq!(tiers, vec![Severity::High, Severity::Medium, Severity::Low]);
    }

    #[test]
    fn clamp_handles_nan_and_bounds() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
        assert_eq!(ratio_or_one(0, 0), 1.0);
    }
}
