//! Structural diff producing add/replace/remove operations.
//!
//! The walk mirrors the widely deployed JSON Patch comparer:
//! - keys of the old container are visited in reverse, so array removals
//!   are emitted tail first and stay valid when replayed in order
//! - two containers of the same kind are compared recursively, anything
//!   else that differs becomes a `replace`
//! - keys only present in the new container are added in its key order

use serde_json::Value;

use super::model::Operation;
use super::pointer::escape_segment;

/// Operations that turn `old` into `new`. Equal inputs yield no operations.
pub fn compare(old: &Value, new: &Value) -> Vec<Operation> {
    let mut ops = Vec::new();
    if old == new {
        return ops;
    }
    if same_container_kind(old, new) {
        generate(old, new, "", &mut ops);
    } else {
        ops.push(Operation::replace("", new.clone()));
    }
    ops
}

fn generate(old: &Value, new: &Value, path: &str, ops: &mut Vec<Operation>) {
    if old == new {
        return;
    }

    let old_keys = keys(old);
    let new_keys = keys(new);
    let mut deleted = false;

    for key in old_keys.iter().rev() {
        let Some(old_val) = child(old, key) else {
            continue;
        };
        let child_path = format!("{}/{}", path, escape_segment(key));
        match child(new, key) {
            Some(new_val) => {
                if same_container_kind(old_val, new_val) {
                    generate(old_val, new_val, &child_path, ops);
                } else if old_val != new_val {
                    ops.push(Operation::replace(child_path, new_val.clone()));
                }
            }
            None => {
                ops.push(Operation::remove(child_path));
                deleted = true;
            }
        }
    }

    if !deleted && new_keys.len() == old_keys.len() {
        return;
    }

    for key in &new_keys {
        if child(old, key).is_none() {
            if let Some(new_val) = child(new, key) {
                ops.push(Operation::add(
                    format!("{}/{}", path, escape_segment(key)),
                    new_val.clone(),
                ));
            }
        }
    }
}

fn same_container_kind(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

fn keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
