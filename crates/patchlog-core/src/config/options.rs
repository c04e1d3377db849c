use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::naming::{decamelize, pascalize};
use crate::errors::PatchLogError;
use crate::exclusion::ExclusionFilter;
use crate::model::RESERVED_PATCH_FIELDS;

/// Declared type of an included field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl ValueKind {
    /// `null` is accepted for every kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (ValueKind::Any, _) => true,
            (ValueKind::String, Value::String(_))
            | (ValueKind::Number, Value::Number(_))
            | (ValueKind::Boolean, Value::Bool(_))
            | (ValueKind::Object, Value::Object(_))
            | (ValueKind::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Any => "any",
        }
    }
}

/// Extra field copied onto every patch record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncludeField {
    pub kind: ValueKind,
    /// Source name when it differs from the patch field name
    pub from: Option<String>,
    /// Patch creation fails when no value resolves
    pub required: bool,
}

impl IncludeField {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            from: None,
            required: false,
        }
    }

    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.from = Some(source.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Name to read from the document or update metadata.
    pub fn source_name<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(field_name)
    }
}

pub type NameTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Naming functions applied to the patch collection base name.
#[derive(Clone)]
pub struct Transforms {
    pub model: NameTransform,
    pub collection: NameTransform,
}

impl Transforms {
    pub fn new<M, C>(model: M, collection: C) -> Self
    where
        M: Fn(&str) -> String + Send + Sync + 'static,
        C: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            model: Arc::new(model),
            collection: Arc::new(collection),
        }
    }

    /// Leave the base name untouched for both.
    pub fn identity() -> Self {
        Self::new(str::to_string, str::to_string)
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self::new(pascalize, decamelize)
    }
}

impl std::fmt::Debug for Transforms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transforms").finish_non_exhaustive()
    }
}

/// Options recognized by the patch history plugin.
#[derive(Debug, Clone)]
pub struct PatchHistoryOptions {
    /// Base name of the patch collection
    pub name: String,
    pub includes: BTreeMap<String, IncludeField>,
    pub excludes: Vec<String>,
    /// Delete a document's patches when the document is deleted
    pub remove_patches: bool,
    pub transforms: Transforms,
    /// Annotate every operation with the value it overwrote
    pub track_original_value: bool,
}

impl PatchHistoryOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            includes: BTreeMap::new(),
            excludes: Vec::new(),
            remove_patches: true,
            transforms: Transforms::default(),
            track_original_value: false,
        }
    }

    pub fn model_name(&self) -> String {
        (self.transforms.model)(&self.name)
    }

    pub fn collection_name(&self) -> String {
        (self.transforms.collection)(&self.name)
    }

    /// Check the options and compile the exclusion paths.
    pub fn validate(&self) -> std::result::Result<ValidatedOptions, PatchLogError> {
        if self.name.trim().is_empty() {
            return Err(PatchLogError::MissingName);
        }
        if let Some(name) = self
            .includes
            .keys()
            .find(|name| RESERVED_PATCH_FIELDS.contains(&name.as_str()))
        {
            return Err(PatchLogError::ReservedIncludeName { name: name.clone() });
        }
        let exclusions = ExclusionFilter::parse(&self.excludes)?;

        Ok(ValidatedOptions {
            model_name: self.model_name(),
            collection_name: self.collection_name(),
            includes: self.includes.clone(),
            exclusions,
            remove_patches: self.remove_patches,
            track_original_value: self.track_original_value,
        })
    }
}

/// Options after validation, with derived names and compiled exclusions.
#[derive(Debug, Clone)]
pub struct ValidatedOptions {
    pub model_name: String,
    pub collection_name: String,
    pub includes: BTreeMap<String, IncludeField>,
    pub exclusions: ExclusionFilter,
    pub remove_patches: bool,
    pub track_original_value: bool,
}
