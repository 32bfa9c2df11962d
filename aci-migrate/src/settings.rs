use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::issue::Module;
use crate::vni::MAX_VNI;

const EMBEDDED_SETTINGS: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/settings/default.toml"));

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Scoring weights of the four scoring modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Weights {
    pub vpc: f64,
    pub contracts: f64,
    pub l3out: f64,
    pub vlan: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            vpc: 0.25,
            contracts: 0.25,
            l3out: 0.25,
            vlan: 0.25,
        }
    }
}

impl Weights {
    /// Configured weight; physical connectivity never carries one.
    pub fn weight(&self, module: Module) -> f64 {
        match module {
            Module::Vpc => self.vpc,
            Module::Contracts => self.contracts,
            Module::L3out => self.l3out,
            Module::Vlan => self.vlan,
            Module::Physical => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessSettings {
    pub ready_threshold: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            ready_threshold: 70.0,
            high: 80.0,
            medium: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractSettings {
    pub medium_penalty: f64,
    pub complex_penalty: f64,
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            medium_penalty: 5.0,
            complex_penalty: 15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct L3OutSettings {
    pub static_only_penalty: f64,
    pub missing_border_leaf_penalty: f64,
}

impl Default for L3OutSettings {
    fn default() -> Self {
        Self {
            static_only_penalty: 5.0,
            missing_border_leaf_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VlanSettings {
    pub conflict_penalty: f64,
    pub conflict_penalty_cap: f64,
    pub utilization_coefficient: f64,
    pub low_utilization_threshold: f64,
    pub renumber_start: u16,
}

impl Default for VlanSettings {
    fn default() -> Self {
        Self {
            conflict_penalty: 20.0,
            conflict_penalty_cap: 60.0,
            utilization_coefficient: 0.2,
            low_utilization_threshold: 25.0,
            renumber_start: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalSettings {
    pub target_port_prefix: String,
}

impl Default for PhysicalSettings {
    fn default() -> Self {
        Self {
            target_port_prefix: "Ethernet1/".to_string(),
        }
    }
}

/// Allocation starts for the EVPN VNI and VLAN mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VniSettings {
    pub l3_start: u32,
    pub l2_start: u32,
    pub vlan_start: u16,
}

impl Default for VniSettings {
    fn default() -> Self {
        Self {
            l3_start: 50000,
            l2_start: 10000,
            vlan_start: 100,
        }
    }
}

/// Every weight, threshold and penalty coefficient used by an assessment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessmentSettings {
    pub weights: Weights,
    pub readiness: ReadinessSettings,
    pub contracts: ContractSettings,
    pub l3out: L3OutSettings,
    pub vlan: VlanSettings,
    pub physical: PhysicalSettings,
    pub vni: VniSettings,
}

impl AssessmentSettings {
    /// Embedded defaults, falling back to the compiled-in values.
    pub fn embedded() -> Self {
        parse_settings(EMBEDDED_SETTINGS).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), SettingsLoadError> {
        let weights = [
            ("vpc", self.weights.vpc),
            ("contracts", self.weights.contracts),
            ("l3out", self.weights.l3out),
            ("vlan", self.weights.vlan),
        ];
        if let Some((name, _)) = weights
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(invalid(format!("weight `{name}` must be a non-negative number")));
        }
        if weights.iter().all(|(_, w)| *w == 0.0) {
            return Err(invalid("at least one module weight must be positive"));
        }

        let percentages = [
            ("readiness.ready_threshold", self.readiness.ready_threshold),
            ("readiness.high", self.readiness.high),
            ("readiness.medium", self.readiness.medium),
            ("vlan.low_utilization_threshold", self.vlan.low_utilization_threshold),
        ];
        if let Some((name, _)) = percentages
            .iter()
            .find(|(_, v)| !(0.0..=100.0).contains(v))
        {
            return Err(invalid(format!("`{name}` must be within 0..=100")));
        }
        if self.readiness.medium > self.readiness.high {
            return Err(invalid("`readiness.medium` must not exceed `readiness.high`"));
        }

        let penalties = [
            self.contracts.medium_penalty,
            self.contracts.complex_penalty,
            self.l3out.static_only_penalty,
            self.l3out.missing_border_leaf_penalty,
            self.vlan.conflict_penalty,
            self.vlan.conflict_penalty_cap,
            self.vlan.utilization_coefficient,
        ];
        if penalties.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(invalid("penalties and coefficients must be non-negative"));
        }
        if !(1..=4094).contains(&self.vlan.renumber_start) {
            return Err(invalid("`vlan.renumber_start` must be a VLAN id in 1..=4094"));
        }
        let vni_starts = [("vni.l3_start", self.vni.l3_start), ("vni.l2_start", self.vni.l2_start)];
        if let Some((name, _)) = vni_starts.iter().find(|(_, v)| !(1..=MAX_VNI).contains(v)) {
            return Err(invalid(format!("`{name}` must be a VNI in 1..={MAX_VNI}")));
        }
        if !(1..=4094).contains(&self.vni.vlan_start) {
            return Err(invalid("`vni.vlan_start` must be a VLAN id in 1..=4094"));
        }
        Ok(())
    }
}

pub fn parse_settings(raw: &str) -> Result<AssessmentSettings, SettingsLoadError> {
    let settings = toml::from_str::<AssessmentSettings>(raw)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings(path: &Path) -> Result<AssessmentSettings, SettingsLoadError> {
    let raw = std::fs::read_to_string(path)?;
    parse_settings(&raw)
}

/// Resolve settings from an optional override file and report where they came from.
pub fn load_settings_with_source(
    path: Option<&Path>,
) -> Result<(AssessmentSettings, String), SettingsLoadError> {
    match path {
        Some(path) => Ok((load_settings(path)?, format!("file:{}", path.display()))),
        None => Ok((AssessmentSettings::embedded(), "embedded".to_string())),
    }
}

fn invalid(reason: impl Into<String>) -> SettingsLoadError {
    SettingsLoadError::Invalid(reason.into())
}
