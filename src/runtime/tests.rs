use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use futures::task::LocalSpawnExt;

use crate::utils::sync::oneshot_broadcast;

use super::Runtime;

#[test]
fn spawn_runs_on_update() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new();
    rt.spawn(async { call!("task") });
    cr.verify(());
    assert!(!rt.is_idle());
    assert!(rt.update());
    cr.verify("task");
    assert!(rt.is_idle());
    assert_eq!(rt.task_count(), 0);
    assert!(!rt.update());
}

#[test]
fn tasks_run_in_spawn_order() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new();
    rt.spawn(async { call!("1") });
    rt.spawn(async { call!("2") });
    rt.update();
    cr.verify(["1", "2"]);
}

#[test]
fn task_spawned_by_task_runs_in_same_update() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new();
    let rt0 = rt.clone();
    rt.spawn(async move {
        call!("outer");
        rt0.spawn(async { call!("inner") });
    });
    rt.update();
    cr.verify(["outer", "inner"]);
}

#[test]
fn wake() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new();
    let (sender, receiver) = oneshot_broadcast::<i32>();
    rt.spawn(async move { call!("recv {}", receiver.recv().await) });
    rt.update();
    cr.verify(());
    assert_eq!(rt.task_count(), 1);

    sender.send(5);
    assert!(!rt.is_idle());
    rt.update();
    cr.verify("recv 5");
    assert_eq!(rt.task_count(), 0);
}

#[test]
fn run_until() {
    let rt = Runtime::new();
    assert_eq!(rt.run_until(async { 10 }), Some(10));

    let (_sender, receiver) = oneshot_broadcast::<i32>();
    assert_eq!(rt.run_until(receiver.recv()), None);
}

#[test]
fn local_spawn() {
    let rt = Runtime::new();
    let done = Rc::new(RefCell::new(false));
    let done0 = done.clone();
    rt.spawn_local(async move { *done0.borrow_mut() = true })
        .unwrap();
    rt.update();
    assert!(*done.borrow());
}
