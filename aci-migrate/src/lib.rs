//! Migration readiness analysis for Cisco ACI fabrics moving to EVPN/VXLAN.
//!
//! The library reads an ACI object snapshot (see `aci-snapshot`) and runs
//! five independent analyzers over it. Four of them produce a readiness
//! sub-score; the aggregator folds those into one verdict.
//!
//! # Analyzers
//!
//! - [`vpc`]: VPC domains and EVPN ESI candidates
//! - [`contracts`]: contracts translated into ordered ACL rules per dialect
//! - [`l3out`]: external routing and border leaves
//! - [`vlan`]: VLAN pool overlap and migration strategy
//! - [`physical`]: interface inventory and cabling plan
//!
//! [`vni`] allocates the EVPN VNIs and VLANs that the rendered templates use.
//!
//! # Aggregation & Reporting
//!
//! - [`assess`]: runs every analyzer and computes the weighted verdict
//! - [`settings`]: weights and thresholds loaded from TOML
//! - [`report`]: colored terminal output
//! - [`inspect`]: snapshot class inventory
//!
//! # Examples
//!
//! ```ignore
//! use aci_migrate::assess::Assessor;
//! use aci_migrate::settings::AssessmentSettings;
//! use aci_snapshot::Snapshot;
//!
//! let snapshot = Snapshot::load_file("fabric.json".as_ref())?;
//! let result = Assessor::new(AssessmentSettings::embedded()).assess(&snapshot);
//! println!("score={:.1} ready={}", result.overall_score, result.ready_for_migration);
//! ```

pub mod assess;
pub mod contracts;
pub mod dialect;
pub mod inspect;
pub mod issue;
pub mod l3out;
pub mod physical;
pub mod report;
pub mod settings;
pub mod vlan;
pub mod vni;
pub mod vpc;
