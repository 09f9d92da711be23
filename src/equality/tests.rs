use rstest::rstest;
use serde_json::json;

use crate::{is_equal, Value};

fn value(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

#[rstest]
#[case(json!(null), json!(null), true)]
#[case(json!(null), json!(5), false)]
#[case(json!(5), json!(null), false)]
#[case(json!(5), json!(5), true)]
#[case(json!(5), json!(6), false)]
#[case(json!("a"), json!("a"), true)]
#[case(json!(true), json!(true), true)]
#[case(json!(true), json!(1), false)]
#[case(json!([1, 2]), json!([1, 2]), true)]
#[case(json!([1, 2]), json!([1, 3]), false)]
#[case(json!([1, 2]), json!([1, 2, 3]), false)]
#[case(json!([]), json!([]), true)]
#[case(json!({ "a": 1 }), json!({ "a": 1 }), true)]
#[case(json!({ "a": 1 }), json!({ "a": 2 }), false)]
#[case(json!({ "a": 1 }), json!({ "b": 1 }), false)]
#[case(json!({ "a": 1 }), json!({ "a": 1, "b": 2 }), false)]
#[case(json!([1]), json!({ "0": 1 }), false)]
#[case(json!(null), json!({}), false)]
#[case(json!(1), json!([1]), false)]
fn shallow(#[case] prev: serde_json::Value, #[case] next: serde_json::Value, #[case] eq: bool) {
    assert_eq!(is_equal(&value(prev), &value(next)), eq);
}

#[test]
fn undefined() {
    assert!(is_equal(&Value::Undefined, &Value::Undefined));
    assert!(!is_equal(&Value::Undefined, &Value::Null));
}

#[test]
fn missing_key_reads_as_undefined() {
    let a = Value::record([("a", Value::Undefined)]);
    let b = Value::record([("b", Value::Undefined)]);
    assert!(is_equal(&a, &b));
    assert!(is_equal(&b, &a));

    let c = Value::record([("b", Value::Null)]);
    assert!(!is_equal(&a, &c));
}

#[test]
fn nan() {
    let nan = Value::from(f64::NAN);
    assert!(!is_equal(&nan, &nan));
}

#[test]
fn number_is_not_big_int() {
    assert!(!is_equal(&Value::from(1), &Value::BigInt(1)));
}

#[test]
fn nested_containers_compare_by_reference() {
    let inner = value(json!([1]));
    let a = Value::array([inner.clone()]);
    let b = Value::array([inner]);
    assert!(is_equal(&a, &b));

    let c = Value::array([value(json!([1]))]);
    assert!(!is_equal(&a, &c));
}

#[test]
fn nested_records_compare_by_reference() {
    let a = value(json!({ "x": { "y": 1 } }));
    let b = value(json!({ "x": { "y": 1 } }));
    assert!(!is_equal(&a, &b));
    assert!(is_equal(&a, &a.merge(&value(json!({})))));
}
