//! Replay of add/replace/remove operations with RFC 6902 validation.

use serde_json::Value;

use super::model::{OpKind, Operation};
use super::pointer::join_pointer;
use crate::errors::PatchLogError;

type ApplyResult<T> = std::result::Result<T, PatchLogError>;

/// Apply `ops` to `doc` in order. Stops at the first operation that fails;
/// `doc` keeps the effect of the operations before it.
pub fn apply(doc: &mut Value, ops: &[Operation]) -> ApplyResult<()> {
    ops.iter().try_for_each(|op| apply_operation(doc, op))
}

/// Apply one operation.
pub fn apply_operation(doc: &mut Value, op: &Operation) -> ApplyResult<()> {
    let path = op.segments();
    match op.op {
        OpKind::Add => apply_add(doc, &path, required_value(op)?),
        OpKind::Replace => apply_replace(doc, &path, required_value(op)?),
        OpKind::Remove => apply_remove(doc, &path),
    }
}

fn required_value(op: &Operation) -> ApplyResult<Value> {
    op.value.clone().ok_or_else(|| PatchLogError::PatchApply {
        path: op.path.clone(),
        reason: format!("`{}` operation without a value", op.op.as_str()),
    })
}

fn failure(path: &[String], reason: &str) -> PatchLogError {
    PatchLogError::PatchApply {
        path: join_pointer(path),
        reason: reason.to_string(),
    }
}

fn parent_mut<'a>(doc: &'a mut Value, path: &'a [String]) -> ApplyResult<(&'a mut Value, &'a str)> {
    let (parent_path, key) = path.split_at(path.len() - 1);
    let pointer = join_pointer(parent_path);
    let parent = doc
        .pointer_mut(&pointer)
        .ok_or_else(|| failure(path, "parent does not exist"))?;
    Ok((parent, key[0].as_str()))
}

fn array_index(path: &[String], key: &str) -> ApplyResult<usize> {
    key.parse::<usize>()
        .map_err(|_| failure(path, "array index is not a non-negative integer"))
}

fn apply_add(doc: &mut Value, path: &[String], value: Value) -> ApplyResult<()> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, key) = parent_mut(doc, path)?;
    match parent {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if key == "-" {
                items.push(value);
                return Ok(());
            }
            let idx = array_index(path, key)?;
            if idx > items.len() {
                return Err(failure(path, "array index out of bounds"));
            }
            items.insert(idx, value);
            Ok(())
        }
        _ => Err(failure(path, "parent is not a container")),
    }
}

fn apply_remove(doc: &mut Value, path: &[String]) -> ApplyResult<()> {
    if path.is_empty() {
        return Err(failure(path, "cannot remove the document root"));
    }
    let (parent, key) = parent_mut(doc, path)?;
    match parent {
        Value::Object(map) => map
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| failure(path, "path does not exist")),
        Value::Array(items) => {
            let idx = array_index(path, key)?;
            if idx >= items.len() {
                return Err(failure(path, "array index out of bounds"));
            }
            items.remove(idx);
            Ok(())
        }
        _ => Err(failure(path, "parent is not a container")),
    }
}

fn apply_replace(doc: &mut Value, path: &[String], value: Value) -> ApplyResult<()> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent, key) = parent_mut(doc, path)?;
    match parent {
        Value::Object(map) => match map.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(failure(path, "path does not exist")),
        },
        Value::Array(items) => {
            let idx = array_index(path, key)?;
            match items.get_mut(idx) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(failure(path, "array index out of bounds")),
            }
        }
        _ => Err(failure(path, "parent is not a container")),
    }
}
