//! Snapshot change detection.

use serde_json::Value;

use crate::exclusion::ExclusionFilter;
use crate::json_patch::{compare, pointer, Operation};

/// Filtered operations turning `original` into `current`.
///
/// With `track_original_value`, each surviving operation carries the value
/// found at its path in `original`, when there was one.
pub fn detect_changes(
    original: &Value,
    current: &Value,
    exclusions: &ExclusionFilter,
    track_original_value: bool,
) -> Vec<Operation> {
    let ops = exclusions.filter(compare(original, current));
    if !track_original_value {
        return ops;
    }
    ops.into_iter()
        .map(|op| {
            let segments = op.segments();
            match pointer::lookup(original, &segments) {
                Some(previous) if !segments.is_empty() => op.with_original_value(previous.clone()),
                _ => op,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_change_no_ops() {
        let doc = json!({ "title": "foo" });
        assert!(detect_changes(&doc, &doc, &ExclusionFilter::default(), true).is_empty());
    }

    #[test]
    fn test_original_values_are_tracked() {
        let ops = detect_changes(
            &json!({ "comment": "Private 1", "n": [1] }),
            &json!({ "comment": "Private 2", "n": [1, 2] }),
            &ExclusionFilter::default(),
            true,
        );
        assert_eq!(
            ops,
            vec![
                Operation::add("/n/1", json!(2)),
                Operation::replace("/comment", json!("Private 2")).with_original_value(json!("Private 1")),
            ]
        );
    }

    #[test]
    fn test_exclusions_apply_before_tracking() {
        let exclusions = ExclusionFilter::parse(["/secret"]).unwrap();
        let ops = detect_changes(
            &json!({}),
            &json!({ "secret": 1, "shown": 2 }),
            &exclusions,
            false,
        );
        assert_eq!(ops, vec![Operation::add("/shown", json!(2))]);
    }
}
