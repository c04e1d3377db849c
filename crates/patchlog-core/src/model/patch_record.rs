use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::{Document, DocumentId};
use crate::errors::PatchLogError;
use crate::json_patch::Operation;

/// Field names a patch record owns. Included fields may not reuse them.
pub const RESERVED_PATCH_FIELDS: [&str; 4] = ["_id", "date", "ops", "ref"];

const DATE_FIELD: &str = "date";
const OPS_FIELD: &str = "ops";
const REF_FIELD: &str = "ref";

/// One immutable entry in a document's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub id: DocumentId,
    #[serde(rename = "ref")]
    pub doc_ref: DocumentId,
    pub date: DateTime<Utc>,
    pub ops: Vec<Operation>,
    #[serde(flatten)]
    pub includes: Map<String, Value>,
}

impl PatchRecord {
    pub fn new(doc_ref: DocumentId, date: DateTime<Utc>, ops: Vec<Operation>) -> Self {
        Self {
            id: DocumentId::generate(),
            doc_ref,
            date,
            ops,
            includes: Map::new(),
        }
    }

    pub fn with_include(mut self, name: impl Into<String>, value: Value) -> Self {
        self.includes.insert(name.into(), value);
        self
    }

    /// Store representation in the patch collection.
    pub fn to_document(&self) -> std::result::Result<Document, PatchLogError> {
        let ops = serde_json::to_value(&self.ops).map_err(|e| {
            PatchLogError::MalformedPatchRecord {
                reason: e.to_string(),
            }
        })?;

        let mut fields = Map::new();
        fields.insert(
            DATE_FIELD.to_string(),
            Value::String(self.date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        fields.insert(OPS_FIELD.to_string(), ops);
        fields.insert(REF_FIELD.to_string(), self.doc_ref.to_value());
        for (name, value) in &self.includes {
            fields.insert(name.clone(), value.clone());
        }

        Ok(Document::with_fields(self.id.clone(), fields))
    }

    /// Rebuild a record from its store representation.
    pub fn from_document(doc: &Document) -> std::result::Result<Self, PatchLogError> {
        let malformed = |reason: String| PatchLogError::MalformedPatchRecord { reason };

        let date = doc
            .get(DATE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("patch {} has no date", doc.id)))?;
        let date = DateTime::parse_from_rfc3339(date)
            .map_err(|e| malformed(format!("patch {} has an invalid date: {}", doc.id, e)))?
            .with_timezone(&Utc);

        let doc_ref = doc
            .get(REF_FIELD)
            .and_then(DocumentId::from_value)
            .ok_or_else(|| malformed(format!("patch {} has no ref", doc.id)))?;

        let ops = doc
            .get(OPS_FIELD)
            .cloned()
            .ok_or_else(|| malformed(format!("patch {} has no ops", doc.id)))?;
        let ops: Vec<Operation> = serde_json::from_value(ops)
            .map_err(|e| malformed(format!("patch {} has invalid ops: {}", doc.id, e)))?;

        let includes = doc
            .fields
            .iter()
            .filter(|(name, _)| !RESERVED_PATCH_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Self {
            id: doc.id.clone(),
            doc_ref,
            date,
            ops,
            includes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_round_trip() {
        let record = PatchRecord::new(
            DocumentId::from("post-1"),
            Utc::now(),
            vec![
                Operation::add("/title", json!("foo")),
                Operation::replace("/n", json!(null)),
            ],
        )
        .with_include("user", json!("u1"));

        let doc = record.to_document().unwrap();
        assert_eq!(doc.id, record.id);
        assert_eq!(doc.get("ref"), Some(&json!("post-1")));
        assert_eq!(doc.get("user"), Some(&json!("u1")));

        let decoded = PatchRecord::from_document(&doc).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_integer_ref_round_trips() {
        let record = PatchRecord::new(DocumentId::from(42), Utc::now(), vec![Operation::remove("/a")]);
        let decoded = PatchRecord::from_document(&record.to_document().unwrap()).unwrap();
        assert_eq!(decoded.doc_ref, DocumentId::Int(42));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let doc = Document::new(DocumentId::from("p1"));
        assert!(matches!(
            PatchRecord::from_document(&doc),
            Err(PatchLogError::MalformedPatchRecord { .. })
        ));

        let mut doc = Document::new(DocumentId::from("p2"));
        doc.set("date", json!("2024-01-01T00:00:00Z"));
        doc.set("ref", json!("d"));
        doc.set("ops", json!([{ "op": "copy", "path": "/a" }]));
        assert!(PatchRecord::from_document(&doc).is_err());
    }

    #[test]
    fn test_serde_shape() {
        let record = PatchRecord::new(DocumentId::from("d"), Utc::now(), vec![])
            .with_include("reason", json!("fix"));
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["ref"], json!("d"));
        assert_eq!(encoded["reason"], json!("fix"));
    }
}
