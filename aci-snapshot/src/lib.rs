//! Managed-object snapshots of Cisco ACI configuration exports.
//!
//! Exports arrive as XML or JSON trees of managed objects (MOs). This crate
//! parses both into [`MoNode`] trees, flattens them into a [`Snapshot`] keyed by
//! class, and builds an [`ObjectIndex`] for DN and parent/child lookups.

pub mod dn;
pub mod index;
pub mod json;
pub mod parser;
pub mod snapshot;
pub mod tree;

pub use index::{MissingReference, ObjectIndex};
pub use json::JsonError;
pub use parser::{parse, parse_file, ParseError};
pub use snapshot::{AttrValue, NetworkObject, ObjectRef, Snapshot, SnapshotError};
pub use tree::MoNode;
