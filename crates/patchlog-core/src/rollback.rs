//! Reconstruction of historical document states.

use serde_json::{Map, Value};

use crate::errors::PatchLogError;
use crate::exclusion::ExclusionFilter;
use crate::json_patch::apply;
use crate::json_patch::pointer::lookup;
use crate::model::{DocumentId, PatchRecord};

type RollbackResult<T> = std::result::Result<T, PatchLogError>;

/// Order patches by date. Equal dates keep their incoming order.
pub fn order_patches(patches: &mut [PatchRecord]) {
    patches.sort_by(|a, b| a.date.cmp(&b.date));
}

/// Patches up to and including `target`, which must not be the newest.
pub fn rollback_prefix<'a>(
    patches: &'a [PatchRecord],
    target: &DocumentId,
) -> RollbackResult<&'a [PatchRecord]> {
    let position = patches
        .iter()
        .position(|p| &p.id == target)
        .ok_or_else(|| PatchLogError::PatchNotFound {
            patch_id: target.to_string(),
        })?;
    if position + 1 == patches.len() {
        return Err(PatchLogError::RollbackToLatest {
            patch_id: target.to_string(),
        });
    }
    Ok(&patches[..=position])
}

/// Fold `patches` onto an empty object.
pub fn reconstruct(patches: &[PatchRecord]) -> RollbackResult<Value> {
    let mut state = Value::Object(Map::new());
    for patch in patches {
        apply(&mut state, &patch.ops)?;
    }
    Ok(state)
}

/// Deep merge `overrides` into `state`. Nested objects merge key by key;
/// every other override value replaces what was there.
pub fn merge_overrides(state: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (state.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_overrides(existing, incoming)
            }
            _ => {
                state.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Copy the values `current` holds at excluded paths into `state`.
///
/// Excluded data never enters a patch, so replay alone would lose it. A
/// value is restored only where its parent exists in `state`.
pub fn restore_excluded(
    state: &mut Map<String, Value>,
    current: &Map<String, Value>,
    exclusions: &ExclusionFilter,
) {
    let current = Value::Object(current.clone());
    let mut root = Value::Object(std::mem::take(state));
    for path in exclusions.paths() {
        for segments in path.resolve(&current) {
            if let Some(value) = lookup(&current, &segments) {
                set_existing_parent(&mut root, &segments, value.clone());
            }
        }
    }
    if let Value::Object(map) = root {
        *state = map;
    }
}

fn set_existing_parent(root: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => match map.get_mut(segment) {
                Some(child) => child,
                None => return,
            },
            Value::Array(items) => {
                let Ok(idx) = segment.parse::<usize>() else {
                    return;
                };
                match items.get_mut(idx) {
                    Some(child) => child,
                    None => return,
                }
            }
            _ => return,
        };
    }
    match node {
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        Value::Array(items) => {
            if let Some(slot) = last.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) {
                *slot = value;
            }
        }
        _ => {}
    }
}

/// Fields a document should hold after rolling back to `target`: the replayed
/// state, the `current` values at excluded paths, then `overrides`.
pub fn plan_rollback(
    patches: &[PatchRecord],
    target: &DocumentId,
    current: &Map<String, Value>,
    exclusions: &ExclusionFilter,
    overrides: &Map<String, Value>,
) -> RollbackResult<Map<String, Value>> {
    let prefix = rollback_prefix(patches, target)?;
    let mut state = match reconstruct(prefix)? {
        Value::Object(map) => map,
        other => {
            return Err(PatchLogError::PatchApply {
                path: String::new(),
                reason: format!("reconstructed state is not an object: {}", other),
            })
        }
    };
    restore_excluded(&mut state, current, exclusions);
    merge_overrides(&mut state, overrides);
    Ok(state)
}
