use std::collections::BTreeMap;

use serde::Serialize;

/// A managed object as it appears in an ACI export tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoNode {
    /// Managed-object class name (`vpcDom`, `fvAEPg`, ...).
    pub class: String,
    /// Object attributes keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Child objects in export order.
    pub children: Vec<MoNode>,
}

impl MoNode {
    /// Create an object with no attributes or children.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: MoNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Return the first child of the provided class.
    pub fn get_child(&self, class: &str) -> Option<&MoNode> {
        self.children.iter().find(|child| child.class == class)
    }

    /// Return all children of the provided class.
    pub fn get_children(&self, class: &str) -> Vec<&MoNode> {
        self.children
            .iter()
            .filter(|child| child.class == class)
            .collect()
    }

    /// Count this object and every descendant.
    pub fn object_count(&self) -> usize {
        1 + self.children.iter().map(MoNode::object_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::MoNode;

    #[test]
    fn builder_collects_attributes_and_children() {
        let tenant = MoNode::new("fvTenant")
            .with_attr("name", "prod")
            .with_child(MoNode::new("fvCtx").with_attr("name", "vrf1"))
            .with_child(MoNode::new("fvBD").with_attr("name", "bd1"));

        assert_eq!(tenant.attr("name"), Some("prod"));
        assert_eq!(tenant.get_children("fvCtx").len(), 1);
        assert_eq!(tenant.object_count(), 3);
    }
}
