use serde_json::{Map, Value};

use crate::errors::PatchLogError;
use crate::json_patch::pointer::{is_array_index, unescape_segment};
use crate::json_patch::Operation;

/// One segment of an exclusion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object key or literal array index
    Key(String),
    /// `*`, any non-negative array index
    Wildcard,
}

impl Segment {
    fn matches(&self, actual: &str) -> bool {
        match self {
            Segment::Key(key) => key == actual,
            Segment::Wildcard => is_array_index(actual),
        }
    }
}

/// Outcome of running one operation through an exclusion path.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep the operation, possibly with a redacted value
    Keep(Operation),
    /// Drop the operation
    Reject,
}

/// A parsed exclusion path such as `/object/array/*/hidden`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPath {
    raw: String,
    segments: Vec<Segment>,
}

impl ExclusionPath {
    /// Parse a slash-delimited path. The leading slash is optional.
    pub fn parse(raw: &str) -> std::result::Result<Self, PatchLogError> {
        let invalid = |reason: &str| PatchLogError::InvalidExclusionPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };

        let body = raw.strip_prefix('/').unwrap_or(raw);
        if body.is_empty() {
            return Err(invalid("path must name at least one segment"));
        }

        let segments = body
            .split('/')
            .map(|segment| match segment {
                "" => Err(invalid("empty segment")),
                "*" => Ok(Segment::Wildcard),
                other => Ok(Segment::Key(unescape_segment(other))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when this path is a prefix of (or equal to) `op_path`.
    pub fn covers<S: AsRef<str>>(&self, op_path: &[S]) -> bool {
        self.segments.len() <= op_path.len()
            && self
                .segments
                .iter()
                .zip(op_path)
                .all(|(segment, actual)| segment.matches(actual.as_ref()))
    }

    /// True when `op_path` is a strict prefix of this path, so the excluded
    /// data sits inside the operation's value.
    fn reaches_into<S: AsRef<str>>(&self, op_path: &[S]) -> bool {
        op_path.len() < self.segments.len()
            && op_path
                .iter()
                .zip(&self.segments)
                .all(|(actual, segment)| segment.matches(actual.as_ref()))
    }

    /// Decide whether `op` survives this exclusion path.
    pub fn redact(&self, op: Operation) -> Verdict {
        let op_path = op.segments();
        if self.covers(&op_path) {
            return Verdict::Reject;
        }
        if !self.reaches_into(&op_path) {
            return Verdict::Keep(op);
        }
        let Some(value) = op.value.as_ref() else {
            return Verdict::Keep(op);
        };

        match redact_value(value, &self.segments[op_path.len()..]) {
            None => Verdict::Keep(op),
            Some(pruned) if is_empty_container(&pruned) => Verdict::Reject,
            Some(pruned) => Verdict::Keep(Operation {
                value: Some(pruned),
                ..op
            }),
        }
    }
}

impl ExclusionPath {
    /// Concrete paths this exclusion addresses in `value`, with wildcards
    /// expanded over the arrays present.
    pub fn resolve(&self, value: &Value) -> Vec<Vec<String>> {
        let mut found = Vec::new();
        collect_paths(value, &self.segments, &mut Vec::new(), &mut found);
        found
    }
}

fn collect_paths(
    value: &Value,
    rest: &[Segment],
    prefix: &mut Vec<String>,
    found: &mut Vec<Vec<String>>,
) {
    let Some((head, tail)) = rest.split_first() else {
        found.push(prefix.clone());
        return;
    };

    let children: Vec<(String, &Value)> = match (head, value) {
        (Segment::Wildcard, Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| (idx.to_string(), item))
            .collect(),
        (Segment::Key(key), Value::Array(items)) => key
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx))
            .map(|item| vec![(key.clone(), item)])
            .unwrap_or_default(),
        (Segment::Key(key), Value::Object(map)) => map
            .get(key)
            .map(|child| vec![(key.clone(), child)])
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    for (segment, child) in children {
        prefix.push(segment);
        collect_paths(child, tail, prefix, found);
        prefix.pop();
    }
}

impl std::fmt::Display for ExclusionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Remove the data addressed by `rest` from `value`.
///
/// Returns `None` when nothing under `rest` exists. Only the final key is
/// removed: objects it leaves empty stay in place as `{}`, so later operations
/// under them still replay, and array slots keep their indices.
fn redact_value(value: &Value, rest: &[Segment]) -> Option<Value> {
    let (head, tail) = rest.split_first()?;

    match (head, value) {
        (Segment::Wildcard, Value::Array(items)) => {
            let mut changed = false;
            let redacted: Vec<Value> = items
                .iter()
                .map(|item| match redact_slot(item, tail) {
                    Some(new_item) => {
                        changed = true;
                        new_item
                    }
                    None => item.clone(),
                })
                .collect();
            changed.then_some(Value::Array(redacted))
        }
        (Segment::Key(key), Value::Array(items)) if is_array_index(key) => {
            let idx = key.parse::<usize>().ok()?;
            let new_item = redact_slot(items.get(idx)?, tail)?;
            let mut redacted = items.clone();
            redacted[idx] = new_item;
            Some(Value::Array(redacted))
        }
        (Segment::Key(key), Value::Object(map)) => {
            let child = map.get(key)?;
            if tail.is_empty() {
                return Some(Value::Object(without_key(map, key)));
            }
            let new_child = redact_value(child, tail)?;
            let mut redacted = map.clone();
            redacted.insert(key.clone(), new_child);
            Some(Value::Object(redacted))
        }
        _ => None,
    }
}

// An array slot addressed by the last segment becomes `{}` instead of
// disappearing.
fn redact_slot(item: &Value, tail: &[Segment]) -> Option<Value> {
    if tail.is_empty() {
        return Some(Value::Object(Map::new()));
    }
    redact_value(item, tail)
}

fn without_key(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
