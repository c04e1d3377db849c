#![allow(clippy::unwrap_used, clippy::expect_used)]

use patchlog_core::json_patch::{apply, compare};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_object() -> impl Strategy<Value = Value> {
    proptest::collection::btree_map("[a-f]", arb_json(), 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn prop_compare_then_apply_reaches_target(old in arb_object(), new in arb_object()) {
        let ops = compare(&old, &new);
        let mut doc = old.clone();
        apply(&mut doc, &ops).unwrap();
        prop_assert_eq!(doc, new);
    }

    #[test]
    fn prop_reverse_diff_restores_original(old in arb_object(), new in arb_object()) {
        let mut doc = old.clone();
        apply(&mut doc, &compare(&old, &new)).unwrap();
        apply(&mut doc, &compare(&new, &old)).unwrap();
        prop_assert_eq!(doc, old);
    }

    #[test]
    fn prop_self_compare_is_empty(doc in arb_object()) {
        prop_assert!(compare(&doc, &doc).is_empty());
    }
}

#[test]
fn test_ops_replay_from_empty_document() {
    let target = json!({ "title": "foo", "tags": ["a", "b"], "meta": { "n": 1 } });
    let mut doc = json!({});
    apply(&mut doc, &compare(&json!({}), &target)).unwrap();
    assert_eq!(doc, target);
}
