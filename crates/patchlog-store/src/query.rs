//! Filter and update documents.
//!
//! Filters are equality maps with a few operators (`$eq`, `$ne`, `$in`,
//! `$nin`, `$exists`). A scalar condition on an array field matches when the
//! array contains it. Updates accept direct assignments (treated as `$set`)
//! plus `$set`, `$unset`, `$inc`, `$push` and `$pull`. Dotted keys address
//! nested object fields; `_id` addresses the identifier and `__v` the
//! version marker.

use chrono::{DateTime, Utc};
use patchlog_core::model::document::{ID_FIELD, VERSION_FIELD};
use patchlog_core::{Document, DocumentId};
use serde_json::{Map, Number, Value};

use crate::errors::{invalid_update, Result};

/// Query conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Map<String, Value>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &DocumentId) -> Self {
        Self::all().eq(ID_FIELD, id.to_value())
    }

    pub fn from_map(conditions: Map<String, Value>) -> Self {
        Self { conditions }
    }

    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    pub fn any_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        let mut op = Map::new();
        op.insert("$in".to_string(), Value::Array(values));
        self.conditions.insert(field.into(), Value::Object(op));
        self
    }

    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Plain equality conditions, without operator keys or operator objects.
    pub fn equalities(&self) -> Map<String, Value> {
        self.conditions
            .iter()
            .filter(|(key, value)| !key.contains('$') && !is_operator_object(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Identifier pinned by an `_id` equality, if any.
    pub fn id_equality(&self) -> Option<DocumentId> {
        self.conditions
            .get(ID_FIELD)
            .filter(|value| !is_operator_object(value))
            .and_then(DocumentId::from_value)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(key, condition)| {
            let actual = field_value(doc, key);
            condition_matches(actual.as_ref(), condition)
        })
    }
}

fn is_operator_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

fn field_value(doc: &Document, path: &str) -> Option<Value> {
    match path {
        ID_FIELD => return Some(doc.id.to_value()),
        VERSION_FIELD => return Some(Value::from(doc.version)),
        _ => {}
    }
    let mut segments = path.split('.');
    let first = doc.fields.get(segments.next()?)?;
    segments
        .try_fold(first, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .cloned()
}

fn condition_matches(actual: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if is_operator_object(condition) => ops
            .iter()
            .all(|(op, arg)| operator_matches(actual, op, arg)),
        _ => value_matches(actual, condition),
    }
}

fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
    }
}

fn operator_matches(actual: Option<&Value>, op: &str, arg: &Value) -> bool {
    match op {
        "$eq" => value_matches(actual, arg),
        "$ne" => !value_matches(actual, arg),
        "$in" => arg
            .as_array()
            .is_some_and(|candidates| candidates.iter().any(|c| value_matches(actual, c))),
        "$nin" => arg
            .as_array()
            .is_some_and(|candidates| !candidates.iter().any(|c| value_matches(actual, c))),
        "$exists" => arg.as_bool() == Some(actual.is_some()),
        _ => false,
    }
}

/// Field-level modifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    unset: Vec<String>,
    inc: Map<String, Value>,
    push: Map<String, Value>,
    pull: Map<String, Value>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.unset.push(field.into());
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: impl Into<Number>) -> Self {
        self.inc.insert(field.into(), Value::Number(by.into()));
        self
    }

    pub fn push(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push.insert(field.into(), value);
        self
    }

    pub fn pull(mut self, field: impl Into<String>, value: Value) -> Self {
        self.pull.insert(field.into(), value);
        self
    }

    /// Parse a Mongo-style update document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(invalid_update("update must be an object"));
        };

        let mut update = Self::new();
        for (key, arg) in entries {
            if !key.starts_with('$') {
                update.set.insert(key, arg);
                continue;
            }
            let fields = match arg {
                Value::Object(fields) => fields,
                _ => return Err(invalid_update(format!("{} expects an object", key))),
            };
            match key.as_str() {
                "$set" => update.set.extend(fields),
                "$unset" => update.unset.extend(fields.into_iter().map(|(field, _)| field)),
                "$inc" => {
                    for (field, by) in fields {
                        if !by.is_number() {
                            return Err(invalid_update(format!("$inc on {} needs a number", field)));
                        }
                        update.inc.insert(field, by);
                    }
                }
                "$push" => update.push.extend(fields),
                "$pull" => update.pull.extend(fields),
                other => return Err(invalid_update(format!("unsupported operator {}", other))),
            }
        }
        Ok(update)
    }

    /// Direct and `$set` assignments.
    pub fn assignments(&self) -> &Map<String, Value> {
        &self.set
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.push.is_empty()
            && self.pull.is_empty()
    }

    /// Apply to `doc`. Returns whether the data or version changed.
    pub fn apply(&self, doc: &mut Document) -> Result<bool> {
        let before = (doc.fields.clone(), doc.version);

        for (field, value) in &self.set {
            match field.as_str() {
                ID_FIELD => {}
                VERSION_FIELD => {
                    doc.version = value
                        .as_u64()
                        .ok_or_else(|| invalid_update("__v must be a non-negative integer"))?;
                }
                _ => {
                    let (parent, key) = parent_mut(&mut doc.fields, field, true)?;
                    parent.insert(key.to_string(), value.clone());
                }
            }
        }

        for field in &self.unset {
            if let Ok((parent, key)) = parent_mut(&mut doc.fields, field, false) {
                parent.remove(key);
            }
        }

        for (field, by) in &self.inc {
            if field == VERSION_FIELD {
                let by = by
                    .as_u64()
                    .ok_or_else(|| invalid_update("__v must be incremented by a non-negative integer"))?;
                doc.version += by;
                continue;
            }
            let (parent, key) = parent_mut(&mut doc.fields, field, true)?;
            let next = match parent.get(key) {
                None => by.clone(),
                Some(Value::Number(current)) => add_numbers(current, by)?,
                Some(_) => return Err(invalid_update(format!("cannot $inc non-numeric {}", field))),
            };
            parent.insert(key.to_string(), next);
        }

        for (field, value) in &self.push {
            let (parent, key) = parent_mut(&mut doc.fields, field, true)?;
            match parent
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(items) => items.push(value.clone()),
                _ => return Err(invalid_update(format!("cannot $push to non-array {}", field))),
            }
        }

        for (field, condition) in &self.pull {
            if let Ok((parent, key)) = parent_mut(&mut doc.fields, field, false) {
                if let Some(Value::Array(items)) = parent.get_mut(key) {
                    items.retain(|item| !condition_matches(Some(item), condition));
                }
            }
        }

        Ok((doc.fields.clone(), doc.version) != before)
    }
}

fn add_numbers(current: &Number, by: &Value) -> Result<Value> {
    let Value::Number(by) = by else {
        return Err(invalid_update("$inc needs a number"));
    };
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or_default() + by.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| invalid_update("$inc produced a non-finite number"))
}

/// Object that holds the last segment of a dotted path, plus that segment.
fn parent_mut<'a>(
    fields: &'a mut Map<String, Value>,
    path: &'a str,
    create: bool,
) -> Result<(&'a mut Map<String, Value>, &'a str)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid_update(format!("invalid field path {:?}", path)))?;

    let mut current = fields;
    for segment in segments {
        if create && !current.contains_key(segment) {
            current.insert(segment.to_string(), Value::Object(Map::new()));
        }
        current = match current.get_mut(segment) {
            Some(Value::Object(map)) => map,
            _ => return Err(invalid_update(format!("{} does not address an object", path))),
        };
    }
    Ok((current, last))
}

/// Options for `update_one` / `update_many`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Insert a document when nothing matches
    pub upsert: bool,
    /// Maintain `created_at` / `updated_at`
    pub timestamps: bool,
    /// Caller-supplied values for included fields
    pub metadata: Map<String, Value>,
    /// Field defaults for upserted documents
    pub defaults: Map<String, Value>,
}

impl UpdateOptions {
    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(name.into(), value);
        self
    }
}

/// Outcome of an update call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<DocumentId>,
}

impl UpdateResult {
    /// Nothing matched and nothing was inserted.
    pub fn is_noop(&self) -> bool {
        self.matched == 0 && self.upserted_id.is_none()
    }
}

/// Apply `update` to a matched document.
pub fn apply_update(
    doc: &mut Document,
    update: &Update,
    options: &UpdateOptions,
    now: DateTime<Utc>,
) -> Result<bool> {
    let modified = update.apply(doc)?;
    if options.timestamps {
        doc.updated_at = Some(now);
    }
    Ok(modified)
}

/// Build the document an upsert inserts: filter equalities, then the
/// update, then defaults for fields still missing.
pub fn upsert_document(
    filter: &Filter,
    update: &Update,
    options: &UpdateOptions,
    now: DateTime<Utc>,
) -> Result<Document> {
    let id = filter.id_equality().unwrap_or_else(DocumentId::generate);
    let mut doc = Document::new(id);
    for (field, value) in filter.equalities() {
        if field != ID_FIELD && field != VERSION_FIELD && !field.contains('.') {
            doc.set(field, value);
        }
    }
    update.apply(&mut doc)?;
    for (field, value) in &options.defaults {
        if !doc.fields.contains_key(field) {
            doc.set(field.clone(), value.clone());
        }
    }
    if options.timestamps {
        doc.created_at = Some(now);
        doc.updated_at = Some(now);
    }
    Ok(doc)
}
