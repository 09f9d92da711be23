use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use serde_json::json;
use storekeeper::*;

fn value(v: serde_json::Value) -> Value {
    serde_json::from_value(v).unwrap()
}

fn add_action() -> Action {
    Action::new(|store, args| {
        let n = args[0].as_f64().unwrap_or_default();
        store.set_state(Update::map(move |s| {
            let total = s.get("total").as_f64().unwrap_or_default();
            s.merge(&Value::record([("total", Value::from(total + n))]))
        }));
    })
}

#[test]
fn rewrite_arguments() {
    let rt = Runtime::new();
    let registry = Registry::new(rt.clone());
    registry.add_middleware(|call, next| {
        let n = call.args[0].as_f64().unwrap_or_default();
        call.args[0] = Value::from(n + 3.0);
        next.run(call);
        Ok(())
    });
    let store = registry.create_store(
        StoreConfig::new()
            .state(value(json!({ "total": 0 })))
            .action("add", add_action()),
    );
    store.dispatch("add", vec![Value::from(2)]).unwrap();
    rt.update();
    assert_eq!(store.get_state().get("total"), Value::from(5));
}

#[test]
fn shared_by_every_store() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    registry.add_middleware(|call, next| {
        call!("{} {}", call.store.id(), call.name);
        next.run(call);
        Ok(())
    });
    let noop = Action::new(|_, _| {});
    let a = registry.create_store(StoreConfig::new().id("a").action("x", noop.clone()));
    let b = registry.create_store(StoreConfig::new().id("b").action("y", noop));
    a.dispatch("x", vec![]).unwrap();
    b.dispatch("y", vec![]).unwrap();
    cr.verify(["a x", "b y"]);
}

#[test]
fn failure_is_reported() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    registry.add_middleware(|_, _| Err("denied".into()));
    let store = registry.create_store(
        StoreConfig::new()
            .action("act", Action::new(|_, _| call!("action")))
            .on_middleware_error(|f| call!("{}", f)),
    );
    store.dispatch("act", vec![]).unwrap();
    cr.verify("middleware #0 failed during action `act`: denied");
}

#[test]
fn failure_after_next_keeps_action_effect() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    registry.add_middleware(|call, next| {
        next.run(call);
        Err("late".into())
    });
    let store = registry.create_store(
        StoreConfig::new()
            .action("act", Action::new(|_, _| call!("action")))
            .on_middleware_error(|f| call!("failed {}", f.middleware)),
    );
    store.dispatch("act", vec![]).unwrap();
    cr.verify(["action", "failed #0"]);
}

#[test]
fn failure_stops_chain() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    registry.add_middleware(|_, _| Err("denied".into()));
    registry.add_middleware(|call, next| {
        call!("second");
        next.run(call);
        Ok(())
    });
    let store = registry.create_store(
        StoreConfig::new().action("act", Action::new(|_, _| call!("action"))),
    );
    store.dispatch("act", vec![]).unwrap();
    cr.verify(());

    let other = registry.create_store(StoreConfig::new());
    assert_eq!(other.get_state(), value(json!({})));
}

#[test]
fn not_calling_next_stalls_action() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    registry.add_middleware(|_, _| Ok(()));
    let store = registry.create_store(
        StoreConfig::new().action("act", Action::new(|_, _| call!("action"))),
    );
    store.dispatch("act", vec![]).unwrap();
    cr.verify(());
}

#[test]
fn deferred_next() {
    let mut cr = CallRecorder::new();
    let registry = Registry::new(Runtime::new());
    let held = Rc::new(RefCell::new(None));
    let held0 = held.clone();
    registry.add_middleware(move |call, next| {
        call!("hold {}", call.name);
        *held0.borrow_mut() = Some((call.clone(), next));
        Ok(())
    });
    let store = registry.create_store(
        StoreConfig::new().action("act", Action::new(|_, args| call!("action {}", args[0]))),
    );
    store.dispatch("act", vec![Value::from(1)]).unwrap();
    cr.verify("hold act");

    let (mut call, next) = held.borrow_mut().take().unwrap();
    assert_eq!(next.remaining(), 0);
    next.run(&mut call);
    cr.verify("action 1");
}
