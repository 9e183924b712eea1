//! The structured value model shared by input files and target documents.
//!
//! A [`Document`] is a small tagged union: a scalar, a sequence or a mapping.
//! Mappings keep insertion order so a patched file reads like the template it
//! came from. All navigation goes through path accessors that fail with a
//! [`DocumentError`] naming the full dotted path.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

use crate::DocumentError;

/// Order-preserving mapping of string keys to documents.
pub type Mapping = IndexMap<String, Document>;

/// A structured value: scalar, sequence or mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Document {
    /// Explicit null (`~` in YAML).
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered sequence.
    Sequence(Vec<Document>),
    /// Ordered mapping.
    Mapping(Mapping),
}

impl Document {
    /// An empty mapping.
    pub fn mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Human-readable name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string scalar, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the integer scalar, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the boolean scalar, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the sequence, if this is one.
    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the mapping, if this is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Render a scalar as the text a user would have typed.
    ///
    /// Returns `None` for null, sequences and mappings.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Null | Self::Sequence(_) | Self::Mapping(_) => None,
        }
    }

    /// Look up a direct child of a mapping.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_mapping().and_then(|map| map.get(key))
    }

    /// Follow a key path through nested mappings.
    ///
    /// Returns `None` if any segment is missing or a non-mapping is crossed.
    pub fn get_path(&self, path: &[&str]) -> Option<&Document> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Follow a key path, failing with [`DocumentError::MissingPath`].
    pub fn lookup(&self, path: &[&str]) -> Result<&Document, DocumentError> {
        self.get_path(path)
            .ok_or_else(|| DocumentError::missing_path(path))
    }

    /// Mutable access to the mapping at `path`.
    ///
    /// Every segment must exist, and the final node must be a mapping.
    pub fn mapping_at_mut(&mut self, path: &[&str]) -> Result<&mut Mapping, DocumentError> {
        match self.node_at_mut(path)? {
            Self::Mapping(map) => Ok(map),
            other => Err(DocumentError::type_mismatch(path, "mapping", other.kind())),
        }
    }

    /// Mutable access to the sequence at `path`.
    pub fn sequence_at_mut(&mut self, path: &[&str]) -> Result<&mut Vec<Document>, DocumentError> {
        match self.node_at_mut(path)? {
            Self::Sequence(items) => Ok(items),
            other => Err(DocumentError::type_mismatch(path, "sequence", other.kind())),
        }
    }

    /// Insert or replace the leaf at `path`.
    ///
    /// The parent mapping must already exist; only the last segment may be
    /// created. Returns the previous value, if any.
    pub fn set_path(
        &mut self,
        path: &[&str],
        value: impl Into<Document>,
    ) -> Result<Option<Document>, DocumentError> {
        let (leaf, parent) = path
            .split_last()
            .ok_or_else(|| DocumentError::missing_path(path))?;
        let map = self.mapping_at_mut(parent)?;
        Ok(map.insert((*leaf).to_string(), value.into()))
    }

    /// Remove the leaf at `path`, keeping the order of its siblings.
    ///
    /// The parent mapping must exist; a missing leaf is not an error.
    pub fn remove_path(&mut self, path: &[&str]) -> Result<Option<Document>, DocumentError> {
        let (leaf, parent) = path
            .split_last()
            .ok_or_else(|| DocumentError::missing_path(path))?;
        let map = self.mapping_at_mut(parent)?;
        Ok(map.shift_remove(*leaf))
    }

    fn node_at_mut(&mut self, path: &[&str]) -> Result<&mut Document, DocumentError> {
        let mut node = self;
        for (depth, key) in path.iter().enumerate() {
            node = match node {
                Self::Mapping(map) => map
                    .get_mut(*key)
                    .ok_or_else(|| DocumentError::missing_path(&path[..=depth]))?,
                other => {
                    return Err(DocumentError::type_mismatch(
                        &path[..depth],
                        "mapping",
                        other.kind(),
                    ))
                }
            };
        }
        Ok(node)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Mapping(map) => map.serialize(serializer),
        }
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for Document {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Document {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<Document>> for Document {
    fn from(value: Vec<Document>) -> Self {
        Self::Sequence(value)
    }
}

impl From<Mapping> for Document {
    fn from(value: Mapping) -> Self {
        Self::Mapping(value)
    }
}

impl From<serde_yaml::Value> for Document {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int),
            Value::String(s) => Self::String(s),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), v.into()))
                    .collect(),
            ),
            Value::Tagged(tagged) => tagged.value.into(),
        }
    }
}

// YAML allows non-string keys; collectors only ever use their text form.
fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value;

    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<toml::Value> for Document {
    fn from(value: toml::Value) -> Self {
        use toml::Value;

        match value {
            Value::String(s) => Self::String(s),
            Value::Integer(i) => Self::Int(i),
            Value::Float(f) => Self::Float(f),
            Value::Boolean(b) => Self::Bool(b),
            Value::Datetime(dt) => Self::String(dt.to_string()),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Table(table) => {
                Self::Mapping(table.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let yaml = r"
exporters:
  prometheusremotewrite:
    endpoint: https://listener.logz.io:8053
    headers:
      Authorization: Bearer old
service:
  pipelines:
    metrics:
      receivers: [prometheus]
";
        serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap().into()
    }

    #[test]
    fn test_get_path_follows_mappings() {
        let doc = sample();
        let endpoint = doc
            .get_path(&["exporters", "prometheusremotewrite", "endpoint"])
            .and_then(Document::as_str);
        assert_eq!(endpoint, Some("https://listener.logz.io:8053"));
        assert!(doc.get_path(&["exporters", "otlp"]).is_none());
    }

    #[test]
    fn test_lookup_reports_full_path() {
        let doc = sample();
        let err = doc.lookup(&["service", "telemetry", "logs"]).unwrap_err();
        assert!(err.to_string().contains("service.telemetry.logs"));
    }

    #[test]
    fn test_set_path_replaces_leaf() {
        let mut doc = sample();
        let previous = doc
            .set_path(
                &["exporters", "prometheusremotewrite", "headers", "Authorization"],
                "Bearer new",
            )
            .unwrap();
        assert_eq!(previous, Some(Document::from("Bearer old")));
        assert_eq!(
            doc.get_path(&["exporters", "prometheusremotewrite", "headers", "Authorization"]),
            Some(&Document::from("Bearer new"))
        );
    }

    #[test]
    fn test_set_path_creates_leaf_only() {
        let mut doc = sample();
        doc.set_path(&["exporters", "prometheusremotewrite", "timeout"], "120s")
            .unwrap();
        assert_eq!(
            doc.get_path(&["exporters", "prometheusremotewrite", "timeout"]),
            Some(&Document::from("120s"))
        );

        let err = doc
            .set_path(&["exporters", "prometheusremotewrite", "external_labels", "name"], "x")
            .unwrap_err();
        assert!(matches!(err, DocumentError::MissingPath { ref path }
            if path == "exporters.prometheusremotewrite.external_labels"));
    }

    #[test]
    fn test_set_path_through_scalar_is_type_mismatch() {
        let mut doc = sample();
        let err = doc
            .set_path(&["exporters", "prometheusremotewrite", "endpoint", "host"], "x")
            .unwrap_err();
        assert!(matches!(err, DocumentError::TypeMismatch { expected: "mapping", found: "string", .. }));
    }

    #[test]
    fn test_sequence_at_mut() {
        let mut doc = sample();
        let receivers = doc
            .sequence_at_mut(&["service", "pipelines", "metrics", "receivers"])
            .unwrap();
        receivers.push("otlp".into());
        assert_eq!(receivers.len(), 2);

        let err = doc.sequence_at_mut(&["service", "pipelines"]).unwrap_err();
        assert!(matches!(err, DocumentError::TypeMismatch { expected: "sequence", .. }));
    }

    #[test]
    fn test_remove_path_keeps_sibling_order() {
        let mut doc: Document = serde_yaml::from_str::<serde_yaml::Value>("{a: 1, b: 2, c: 3}")
            .unwrap()
            .into();
        doc.remove_path(&["b"]).unwrap();
        let keys: Vec<_> = doc.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_yaml_non_string_keys_become_text() {
        let doc: Document = serde_yaml::from_str::<serde_yaml::Value>("{1: one, true: yes}")
            .unwrap()
            .into();
        assert_eq!(doc.get("1"), Some(&Document::from("one")));
        assert_eq!(doc.get("true"), Some(&Document::from("yes")));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Document::Int(300).scalar_text(), Some("300".to_string()));
        assert_eq!(Document::Bool(true).scalar_text(), Some("true".to_string()));
        assert_eq!(Document::Null.scalar_text(), None);
        assert_eq!(Document::mapping().scalar_text(), None);
    }

    #[test]
    fn test_serialize_preserves_key_order() {
        let doc: Document = serde_yaml::from_str::<serde_yaml::Value>("{zeta: 1, alpha: 2}")
            .unwrap()
            .into();
        let out = serde_yaml::to_string(&doc).unwrap();
        assert!(out.find("zeta").unwrap() < out.find("alpha").unwrap());
    }
}
