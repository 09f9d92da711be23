use assert_call::{call, CallRecorder};

use crate::Runtime;

use super::oneshot_broadcast;

#[test]
fn send_to_every_receiver() {
    let mut cr = CallRecorder::new();
    let rt = Runtime::new();
    let (sender, receiver) = oneshot_broadcast::<i32>();
    let r0 = receiver.clone();
    let r1 = sender.receiver();
    rt.spawn(async move { call!("a {}", r0.recv().await) });
    rt.spawn(async move { call!("b {}", r1.recv().await) });
    rt.update();
    cr.verify(());

    sender.send(1);
    rt.update();
    cr.verify(["a 1", "b 1"]);
}

#[test]
fn recv_after_send() {
    let rt = Runtime::new();
    let (sender, receiver) = oneshot_broadcast::<i32>();
    sender.send(3);
    assert_eq!(rt.run_until(receiver.recv()), Some(3));
}

#[test]
fn drop_pending_receiver() {
    let rt = Runtime::new();
    let (sender, receiver) = oneshot_broadcast::<i32>();
    assert_eq!(rt.run_until(receiver.recv()), None);
    drop(rt);
    sender.send(1);
}
