use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::pointer::split_pointer;

/// Patch operation kind. Only the three kinds a diff can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Replace,
    Remove,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Replace => "replace",
            OpKind::Remove => "remove",
        }
    }
}

/// One JSON Patch operation as stored on a patch record.
///
/// `value` is present for add/replace. `original_value` is only set when
/// original value tracking is enabled, and is serialized as `originalValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: OpKind,
    pub path: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
    #[serde(
        rename = "originalValue",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_value: Option<Value>,
}

// A present `null` must stay `Some(Value::Null)`; only an absent key is `None`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Operation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Add,
            path: path.into(),
            value: Some(value),
            original_value: None,
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Replace,
            path: path.into(),
            value: Some(value),
            original_value: None,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: OpKind::Remove,
            path: path.into(),
            value: None,
            original_value: None,
        }
    }

    pub fn with_original_value(mut self, original: Value) -> Self {
        self.original_value = Some(original);
        self
    }

    /// Unescaped path tokens.
    pub fn segments(&self) -> Vec<String> {
        split_pointer(&self.path)
    }
}
