use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::dn;
use crate::snapshot::{NetworkObject, Snapshot};

/// A DN that did not resolve to any object in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing reference: {dn}")]
pub struct MissingReference {
    pub dn: String,
}

/// Lookup maps over one [`Snapshot`], built once and shared by every analyzer.
#[derive(Debug)]
pub struct ObjectIndex<'a> {
    snapshot: &'a Snapshot,
    by_dn: HashMap<&'a str, &'a NetworkObject>,
    children: HashMap<&'a str, Vec<&'a NetworkObject>>,
    fabric_nodes: BTreeMap<u32, &'a NetworkObject>,
}

impl<'a> ObjectIndex<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let mut by_dn = HashMap::with_capacity(snapshot.len());
        let mut children: HashMap<&'a str, Vec<&'a NetworkObject>> = HashMap::new();
        let mut fabric_nodes = BTreeMap::new();

        for (_, objects) in snapshot.classes() {
            for object in objects {
                by_dn.entry(object.dn.as_str()).or_insert(object);
                if let Some(parent) = dn::parent_dn(&object.dn) {
                    children.entry(parent).or_default().push(object);
                }
            }
        }
        for node in snapshot.get("fabricNode") {
            let id = node
                .int("id")
                .and_then(|id| u32::try_from(id).ok())
                .or_else(|| dn::node_id(&node.dn));
            if let Some(id) = id {
                fabric_nodes.insert(id, node);
            }
        }

        Self {
            snapshot,
            by_dn,
            children,
            fabric_nodes,
        }
    }

    /// Every object of one class, in export order.
    pub fn get(&self, class: &str) -> &'a [NetworkObject] {
        self.snapshot.get(class)
    }

    pub fn resolve(&self, dn: &str) -> Result<&'a NetworkObject, MissingReference> {
        self.by_dn.get(dn).copied().ok_or_else(|| MissingReference {
            dn: dn.to_string(),
        })
    }

    /// Direct children of `dn` with the given class, in export order.
    pub fn children(&self, dn: &str, class: &str) -> Vec<&'a NetworkObject> {
        self.children
            .get(dn)
            .map(|objects| {
                objects
                    .iter()
                    .copied()
                    .filter(|object| object.class == class)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first_child(&self, dn: &str, class: &str) -> Option<&'a NetworkObject> {
        self.children.get(dn)?.iter().copied().find(|o| o.class == class)
    }

    /// Objects of `class` anywhere below `dn`, in export order.
    ///
    /// Works on DN prefixes, so intermediate objects missing from a partial
    /// export do not hide deeper ones.
    pub fn descendants(&self, dn: &str, class: &str) -> Vec<&'a NetworkObject> {
        self.get(class)
            .iter()
            .filter(|object| dn::is_descendant(&object.dn, dn))
            .collect()
    }

    pub fn parent(&self, dn: &str) -> Option<&'a NetworkObject> {
        dn::parent_dn(dn).and_then(|parent| self.resolve(parent).ok())
    }

    pub fn fabric_node(&self, id: u32) -> Option<&'a NetworkObject> {
        self.fabric_nodes.get(&id).copied()
    }

    pub fn fabric_nodes(&self) -> impl Iterator<Item = (u32, &'a NetworkObject)> + '_ {
        self.fabric_nodes.iter().map(|(id, node)| (*id, *node))
    }
}
