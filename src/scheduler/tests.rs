use serde_json::json;

use crate::{BoxError, Runtime, StoreError, Value};

use super::{fold, Update, UpdateQueue};

fn value(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

fn add(n: f64) -> Update {
    Update::map(move |v| Value::from(v.as_f64().unwrap_or_default() + n))
}

#[test]
fn fold_left_to_right() {
    let rt = Runtime::new();
    let updates = vec![Update::value(1), add(1.0), add(10.0)];
    let v = rt.run_until(fold(Value::from(0), updates)).unwrap();
    assert_eq!(v.unwrap(), Value::from(12));
}

#[test]
fn fold_literal_replaces_accumulator() {
    let rt = Runtime::new();
    let updates = vec![add(1.0), Update::value(5)];
    let v = rt.run_until(fold(Value::from(0), updates)).unwrap();
    assert_eq!(v.unwrap(), Value::from(5));
}

#[test]
fn fold_awaits_async_in_order() {
    let rt = Runtime::new();
    let updates = vec![
        Update::future(|v| async move {
            Ok::<_, BoxError>(Value::from(v.as_f64().unwrap_or_default() * 2.0))
        }),
        add(1.0),
    ];
    let v = rt.run_until(fold(Value::from(3), updates)).unwrap();
    assert_eq!(v.unwrap(), Value::from(7));
}

#[test]
fn fold_stops_at_error() {
    let rt = Runtime::new();
    let updates = vec![
        add(1.0),
        Update::try_map(|_| Err("failed".into())),
        add(1.0),
    ];
    let e = rt.run_until(fold(Value::from(0), updates)).unwrap();
    assert!(matches!(e, Err(StoreError::Updater(_))));
}

#[test]
fn merged() {
    let rt = Runtime::new();
    let updates = vec![
        Update::value(value(json!({ "b": 2 }))).merged(),
        Update::map(|v| value(json!({ "c": v.get("b") }))).merged(),
    ];
    let v = rt
        .run_until(fold(value(json!({ "a": 1 })), updates))
        .unwrap();
    assert_eq!(v.unwrap(), value(json!({ "a": 1, "b": 2, "c": 2 })));
}

#[test]
fn merged_async() {
    let rt = Runtime::new();
    let update = Update::future(|_| async { Ok::<_, BoxError>(value(json!({ "b": 2 }))) }).merged();
    assert!(update.is_async());
    let v = rt
        .run_until(fold(value(json!({ "a": 1 })), vec![update]))
        .unwrap();
    assert_eq!(v.unwrap(), value(json!({ "a": 1, "b": 2 })));
}

#[test]
fn apply_sync_rejects_async() {
    let update = Update::future(|v| async move { Ok::<_, BoxError>(v) });
    assert!(matches!(
        update.apply_sync(Value::Null),
        Err(StoreError::Configuration(_))
    ));
    assert_eq!(
        Update::value(1).apply_sync(Value::Null).unwrap(),
        Value::from(1)
    );
}

#[test]
fn push_schedules_once() {
    let mut q = UpdateQueue::new(10);
    assert!(q.push(Update::value(1)));
    assert!(!q.push(Update::value(2)));
    assert_eq!(q.len(), 2);
    q.take_schedule();
    assert!(q.push(Update::value(3)));
}

#[test]
fn begin_takes_whole_queue() {
    let mut q = UpdateQueue::new(10);
    q.push(Update::value(1));
    q.push(Update::value(2));
    q.take_schedule();
    let batch = q.begin().unwrap().unwrap();
    assert_eq!(batch.len(), 2);
    assert!(q.is_flushing());
    assert_eq!(q.len(), 0);
    assert!(q.begin().unwrap().is_none());
}

#[test]
fn push_during_flush_defers() {
    let mut q = UpdateQueue::new(10);
    q.push(Update::value(1));
    q.take_schedule();
    q.begin().unwrap();
    assert!(!q.push(Update::value(2)));
    assert!(q.end());
    assert_eq!(q.len(), 1);
}

#[test]
fn end_without_pending() {
    let mut q = UpdateQueue::new(10);
    q.push(Update::value(1));
    q.take_schedule();
    q.begin().unwrap();
    assert!(!q.end());
    assert!(!q.is_flushing());
}

#[test]
fn begin_when_empty() {
    let mut q = UpdateQueue::new(10);
    assert!(q.begin().unwrap().is_none());
    assert!(!q.is_flushing());
}

#[test]
fn overflow() {
    let mut q = UpdateQueue::new(2);
    q.push(Update::value(0));
    q.take_schedule();
    q.set_active(true);
    q.begin().unwrap();
    for i in 0..3 {
        q.push(Update::value(i));
        assert!(q.end());
        q.take_schedule();
        if i < 2 {
            assert!(q.begin().unwrap().is_some());
        } else {
            assert!(matches!(
                q.begin(),
                Err(StoreError::QueueOverflow { limit: 3 })
            ));
        }
    }
    assert_eq!(q.len(), 0);
    assert!(!q.is_flushing());
}

#[test]
fn chain_resets_after_idle() {
    let mut q = UpdateQueue::new(0);
    for _ in 0..3 {
        q.push(Update::value(1));
        q.take_schedule();
        assert!(q.begin().unwrap().is_some());
        assert!(!q.end());
    }
}

#[test]
fn suspended_pushes_start_new_chain() {
    let mut q = UpdateQueue::new(0);
    q.push(Update::value(0));
    q.take_schedule();
    q.begin().unwrap();
    for i in 0..3 {
        q.set_active(false);
        q.push(Update::value(i));
        q.set_active(true);
        assert!(q.end());
        q.take_schedule();
        assert_eq!(q.begin().unwrap().map(|b| b.len()), Some(1));
    }
    q.push(Update::value(3));
    assert!(q.end());
    q.take_schedule();
    assert!(matches!(
        q.begin(),
        Err(StoreError::QueueOverflow { limit: 1 })
    ));
}
