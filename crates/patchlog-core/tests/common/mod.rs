use patchlog_core::{Document, DocumentId, ExclusionFilter, PatchRecord};
use serde_json::Value;

/// Build a document from a JSON object literal.
#[allow(dead_code)]
pub fn doc(id: &str, fields: Value) -> Document {
    let fields = match fields {
        Value::Object(map) => map,
        other => panic!("document fields must be an object, got {other}"),
    };
    Document::with_fields(DocumentId::from(id), fields)
}

/// Exclusion filter from string literals.
#[allow(dead_code)]
pub fn exclusions(paths: &[&str]) -> ExclusionFilter {
    ExclusionFilter::parse(paths.iter().copied()).unwrap()
}

/// Serialized ops of a patch, for whole-value assertions.
#[allow(dead_code)]
pub fn ops_json(patch: &PatchRecord) -> Value {
    serde_json::to_value(&patch.ops).unwrap()
}
