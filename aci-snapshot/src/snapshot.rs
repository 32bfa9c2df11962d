use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::dn;
use crate::json::{self, JsonError};
use crate::parser::{self, ParseError};
use crate::tree::MoNode;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot shape: {0}")]
    InvalidShape(String),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Xml(#[from] ParseError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reference to another object by DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    #[serde(rename = "ref")]
    pub target: String,
}

/// One attribute value of a [`NetworkObject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Text(String),
    Ref(ObjectRef),
}

impl AttrValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Text(n.to_string()),
            }),
            Value::Bool(b) => Some(Self::Text(if *b { "yes" } else { "no" }.to_string())),
            Value::Object(obj) => obj.get("ref").and_then(Value::as_str).map(|target| {
                Self::Ref(ObjectRef {
                    target: target.to_string(),
                })
            }),
            Value::Null | Value::Array(_) => None,
        }
    }
}

/// A single managed object: class tag, DN and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkObject {
    pub class: String,
    pub dn: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl NetworkObject {
    pub fn new(class: impl Into<String>, dn: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttrValue::Text(value.into()));
        self
    }

    /// String attribute, or the target of a reference attribute.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key)? {
            AttrValue::Text(s) => Some(s.as_str()),
            AttrValue::Ref(r) => Some(r.target.as_str()),
            AttrValue::Int(_) => None,
        }
    }

    /// Any attribute rendered as text; empty strings count as absent.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        let text = match self.attributes.get(key)? {
            AttrValue::Text(s) => Cow::Borrowed(s.as_str()),
            AttrValue::Ref(r) => Cow::Borrowed(r.target.as_str()),
            AttrValue::Int(i) => Cow::Owned(i.to_string()),
        };
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key)? {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::Ref(_) => None,
        }
    }

    /// Display name: the `name` attribute, falling back to the last rn.
    pub fn name(&self) -> &str {
        match self.attr("name") {
            Some(name) if !name.is_empty() => name,
            _ => dn::rn(&self.dn),
        }
    }
}

/// Immutable collection of objects keyed by class, in export order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    objects: BTreeMap<String, Vec<NetworkObject>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: NetworkObject) {
        self.objects
            .entry(object.class.clone())
            .or_default()
            .push(object);
    }

    /// Builder-style [`Snapshot::push`].
    pub fn with(mut self, object: NetworkObject) -> Self {
        self.push(object);
        self
    }

    pub fn get(&self, class: &str) -> &[NetworkObject] {
        self.objects.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &[NetworkObject])> {
        self.objects
            .iter()
            .map(|(class, objects)| (class.as_str(), objects.as_slice()))
    }

    pub fn class_counts(&self) -> BTreeMap<&str, usize> {
        self.classes()
            .map(|(class, objects)| (class, objects.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten an MO tree. An `imdata` wrapper is transparent.
    pub fn from_tree(root: &MoNode) -> Self {
        let mut snapshot = Self::new();
        snapshot.flatten(root, None);
        snapshot
    }

    pub fn from_trees<'a>(roots: impl IntoIterator<Item = &'a MoNode>) -> Self {
        let mut snapshot = Self::new();
        for root in roots {
            snapshot.flatten(root, None);
        }
        snapshot
    }

    fn flatten(&mut self, node: &MoNode, parent: Option<&str>) {
        if node.class == "imdata" {
            for child in &node.children {
                self.flatten(child, parent);
            }
            return;
        }

        let dn = derive_dn(node, parent);
        let mut object = NetworkObject::new(node.class.clone(), dn.clone());
        for (key, value) in &node.attributes {
            if key != "dn" {
                object
                    .attributes
                    .insert(key.clone(), AttrValue::Text(value.clone()));
            }
        }
        self.push(object);

        for child in &node.children {
            self.flatten(child, Some(&dn));
        }
    }

    /// Accept an `imdata` envelope, a bare MO tree, a list of MO trees, or an
    /// already-normalized `{"class": [records]}` snapshot.
    pub fn from_json_value(value: &Value) -> Result<Self, SnapshotError> {
        match value {
            Value::Object(obj) => {
                if let Some(imdata) = obj.get("imdata") {
                    let Some(items) = imdata.as_array() else {
                        return Err(SnapshotError::InvalidShape(
                            "`imdata` must be an array".to_string(),
                        ));
                    };
                    let roots = json::mo_list_from_imdata(items)?;
                    return Ok(Self::from_trees(&roots));
                }
                if is_mo_object(obj) {
                    let root = json::mo_from_value(value, "root")?;
                    return Ok(Self::from_tree(&root));
                }
                if obj.values().all(Value::is_array) {
                    return Self::from_normalized(obj);
                }
                Err(SnapshotError::InvalidShape(
                    "expected an imdata envelope, an MO tree, or a class→records mapping"
                        .to_string(),
                ))
            }
            Value::Array(items) => {
                let roots = json::mo_list_from_imdata(items)?;
                Ok(Self::from_trees(&roots))
            }
            other => Err(SnapshotError::InvalidShape(format!(
                "expected a JSON object, found {}",
                json_kind(other)
            ))),
        }
    }

    fn from_normalized(classes: &Map<String, Value>) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::new();
        for (class, records) in classes {
            let records = records.as_array().map(Vec::as_slice).unwrap_or(&[]);
            for (idx, record) in records.iter().enumerate() {
                let object = normalized_record(class, record).ok_or_else(|| {
                    SnapshotError::InvalidShape(format!(
                        "{class}[{idx}] must be an object with a string `dn`"
                    ))
                })?;
                snapshot.push(object);
            }
        }
        Ok(snapshot)
    }

    pub fn from_json_slice(raw: &[u8]) -> Result<Self, SnapshotError> {
        let value = json::parse_json(raw)?;
        Self::from_json_value(&value)
    }

    pub fn from_xml_slice(raw: &[u8]) -> Result<Self, SnapshotError> {
        let root = parser::parse(raw)?;
        Ok(Self::from_tree(&root))
    }

    /// Load by extension, sniffing the first byte for anything else.
    pub fn load_file(path: &Path) -> Result<Self, SnapshotError> {
        let raw = fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Self::from_json_slice(&raw),
            Some("xml") => Self::from_xml_slice(&raw),
            _ => Self::from_sniffed(&raw),
        }
    }

    pub fn from_sniffed(raw: &[u8]) -> Result<Self, SnapshotError> {
        match raw.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Self::from_xml_slice(raw),
            Some(b'{') | Some(b'[') => Self::from_json_slice(raw),
            _ => Err(SnapshotError::InvalidShape(
                "input is neither JSON nor XML".to_string(),
            )),
        }
    }
}

fn derive_dn(node: &MoNode, parent: Option<&str>) -> String {
    if let Some(dn) = node.attr("dn").filter(|dn| !dn.is_empty()) {
        return dn.to_string();
    }
    let rn = match node.attr("rn").filter(|rn| !rn.is_empty()) {
        Some(rn) => rn.to_string(),
        None if node.class == "polUni" => "uni".to_string(),
        None => {
            debug!(class = %node.class, "object without dn or rn, using class as rn");
            node.class.clone()
        }
    };
    match parent {
        Some(parent) => format!("{parent}/{rn}"),
        None => rn,
    }
}

fn is_mo_object(obj: &Map<String, Value>) -> bool {
    obj.len() == 1
        && obj.values().all(|body| {
            body.as_object()
                .is_some_and(|b| b.contains_key("attributes") || b.contains_key("children"))
        })
}

fn normalized_record(class: &str, record: &Value) -> Option<NetworkObject> {
    let record = record.as_object()?;
    let attributes = match record.get("attributes") {
        Some(Value::Object(attrs)) => attrs,
        _ => record,
    };
    let dn = record
        .get("dn")
        .or_else(|| attributes.get("dn"))
        .and_then(Value::as_str)?;

    let mut object = NetworkObject::new(class, dn);
    for (key, value) in attributes {
        if key == "dn" {
            continue;
        }
        if let Some(value) = AttrValue::from_json(value) {
            object.attributes.insert(key.clone(), value);
        }
    }
    Some(object)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
