//! ACI JSON export decoding.
//!
//! APIC renders every managed object as a single-key JSON object whose key is
//! the class name:
//!
//! ```json
//! {"fvTenant": {"attributes": {"dn": "uni/tn-prod"}, "children": [...]}}
//! ```
//!
//! Query responses wrap a list of these in an `imdata` envelope. Both shapes
//! decode into [`MoNode`] trees here; deciding which shape a document has is
//! left to [`crate::snapshot`].

use serde_json::{Map, Value};
use thiserror::Error;

use crate::tree::MoNode;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("failed to parse JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("failed to read JSON file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed managed object at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Parse raw bytes into a JSON value.
pub fn parse_json(raw: &[u8]) -> Result<Value, JsonError> {
    Ok(serde_json::from_slice(raw)?)
}

/// Decode the objects of an `imdata` array.
pub fn mo_list_from_imdata(items: &[Value]) -> Result<Vec<MoNode>, JsonError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| mo_from_value(item, &format!("imdata[{idx}]")))
        .collect()
}

/// Decode one `{"class": {"attributes": .., "children": ..}}` object.
pub fn mo_from_value(value: &Value, path: &str) -> Result<MoNode, JsonError> {
    let Some(obj) = value.as_object() else {
        return Err(malformed(path, "expected a JSON object"));
    };
    if obj.len() != 1 {
        return Err(malformed(
            path,
            &format!("expected exactly one class key, found {}", obj.len()),
        ));
    }
    let Some((class, body)) = obj.iter().next() else {
        return Err(malformed(path, "empty object"));
    };
    let path = format!("{path}.{class}");
    let Some(body) = body.as_object() else {
        return Err(malformed(&path, "class body must be an object"));
    };

    let mut node = MoNode::new(class.clone());
    if let Some(attributes) = body.get("attributes") {
        let Some(attributes) = attributes.as_object() else {
            return Err(malformed(&path, "attributes must be an object"));
        };
        copy_attributes(&mut node, attributes);
    }
    if let Some(children) = body.get("children") {
        let Some(children) = children.as_array() else {
            return Err(malformed(&path, "children must be an array"));
        };
        for (idx, child) in children.iter().enumerate() {
            node.children
                .push(mo_from_value(child, &format!("{path}.children[{idx}]"))?);
        }
    }
    Ok(node)
}

fn copy_attributes(node: &mut MoNode, attributes: &Map<String, Value>) {
    for (key, value) in attributes {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => if *b { "yes" } else { "no" }.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        node.attributes.insert(key.clone(), text);
    }
}

fn malformed(path: &str, reason: &str) -> JsonError {
    JsonError::Malformed {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
