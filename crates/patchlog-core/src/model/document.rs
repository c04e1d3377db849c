use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field name that addresses the identifier in filters and updates.
pub const ID_FIELD: &str = "_id";
/// Field name that addresses the version marker in updates.
pub const VERSION_FIELD: &str = "__v";

/// Immutable document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    Text(String),
}

impl DocumentId {
    /// Fresh time-ordered identifier.
    pub fn generate() -> Self {
        DocumentId::Text(Uuid::now_v7().to_string())
    }

    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Int(n) => Value::from(*n),
            DocumentId::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(DocumentId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(DocumentId::Int),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentId::Int(n) => write!(f, "{}", n),
            DocumentId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        DocumentId::Text(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        DocumentId::Text(s)
    }
}

impl From<i64> for DocumentId {
    fn from(n: i64) -> Self {
        DocumentId::Int(n)
    }
}

/// A stored document.
///
/// `fields` is the data view that gets diffed. Bookkeeping (identifier,
/// version marker, timestamps) lives beside it, and `attributes` holds
/// per-instance values that are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub attributes: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId) -> Self {
        Self::with_fields(id, Map::new())
    }

    pub fn with_fields(id: DocumentId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            fields,
            version: 0,
            created_at: None,
            updated_at: None,
            attributes: Map::new(),
        }
    }

    /// Comparison-safe view of the document: its fields only.
    pub fn data(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn replace_fields(&mut self, fields: Map<String, Value>) {
        self.fields = fields;
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look a name up the way included fields are resolved: transient
    /// attributes first, then stored fields, then bookkeeping.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attributes.get(name).or_else(|| self.fields.get(name)) {
            return Some(value.clone());
        }
        match name {
            ID_FIELD => Some(self.id.to_value()),
            VERSION_FIELD => Some(Value::from(self.version)),
            "createdAt" => self.created_at.map(|t| Value::String(t.to_rfc3339())),
            "updatedAt" => self.updated_at.map(|t| Value::String(t.to_rfc3339())),
            _ => None,
        }
    }

    /// Update timestamp when present, else creation timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_value_conversions() {
        assert_eq!(DocumentId::from(7).to_value(), json!(7));
        assert_eq!(DocumentId::from_value(&json!("a")), Some(DocumentId::from("a")));
        assert_eq!(DocumentId::from_value(&json!(3)), Some(DocumentId::Int(3)));
        assert_eq!(DocumentId::from_value(&json!(1.5)), None);
        assert_eq!(DocumentId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }

    #[test]
    fn test_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(DocumentId::from("x")).unwrap(), json!("x"));
        assert_eq!(serde_json::to_value(DocumentId::from(2)).unwrap(), json!(2));
    }

    #[test]
    fn test_data_excludes_bookkeeping() {
        let mut doc = Document::new(DocumentId::from("d1"));
        doc.set("title", json!("foo"));
        doc.version = 3;
        doc.set_attribute("user", json!("u1"));
        assert_eq!(doc.data(), json!({ "title": "foo" }));
    }

    #[test]
    fn test_resolve_order() {
        let mut doc = Document::new(DocumentId::from("d1"));
        doc.set("name", json!("stored"));
        assert_eq!(doc.resolve("name"), Some(json!("stored")));

        doc.set_attribute("name", json!("transient"));
        assert_eq!(doc.resolve("name"), Some(json!("transient")));

        doc.version = 2;
        assert_eq!(doc.resolve(VERSION_FIELD), Some(json!(2)));
        assert_eq!(doc.resolve(ID_FIELD), Some(json!("d1")));
        assert_eq!(doc.resolve("missing"), None);
    }

    #[test]
    fn test_attributes_are_not_serialized() {
        let mut doc = Document::new(DocumentId::from("d1"));
        doc.set_attribute("user", json!("u1"));
        let encoded = serde_json::to_value(&doc).unwrap();
        assert!(encoded.get("attributes").is_none());
        let decoded: Document = serde_json::from_value(encoded).unwrap();
        assert!(decoded.attributes.is_empty());
    }

    #[test]
    fn test_timestamp_prefers_update() {
        let mut doc = Document::new(DocumentId::from("d1"));
        assert_eq!(doc.timestamp(), None);
        let created = Utc::now();
        doc.created_at = Some(created);
        assert_eq!(doc.timestamp(), Some(created));
        let updated = created + chrono::Duration::seconds(5);
        doc.updated_at = Some(updated);
        assert_eq!(doc.timestamp(), Some(updated));
    }
}
