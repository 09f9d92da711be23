use std::{
    cell::RefCell,
    future::poll_fn,
    mem::take,
    rc::Rc,
    task::{Poll, Waker},
};

use derive_ex::Ex;
use slabmap::SlabMap;

#[cfg(test)]
mod tests;

struct OneshotBroadcast<T> {
    value: Option<T>,
    wakers: SlabMap<Waker>,
}

/// Channel that delivers one value to every receiver.
pub fn oneshot_broadcast<T>() -> (Sender<T>, Receiver<T>) {
    let data = Rc::new(RefCell::new(OneshotBroadcast {
        value: None,
        wakers: SlabMap::new(),
    }));
    (Sender(data.clone()), Receiver(data))
}

pub struct Sender<T>(Rc<RefCell<OneshotBroadcast<T>>>);

impl<T> Sender<T> {
    pub fn send(&self, value: T) {
        let wakers = {
            let mut data = self.0.borrow_mut();
            data.value = Some(value);
            take(&mut data.wakers)
        };
        for (_, waker) in wakers {
            waker.wake();
        }
    }
    pub fn receiver(&self) -> Receiver<T> {
        Receiver(self.0.clone())
    }
}

#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct Receiver<T>(Rc<RefCell<OneshotBroadcast<T>>>);

impl<T: Clone> Receiver<T> {
    pub async fn recv(self) -> T {
        let mut key = WakerKeyGuard::new(&self);
        poll_fn(|cx| {
            let mut d = self.0.borrow_mut();
            if let Some(value) = &d.value {
                Poll::Ready(value.clone())
            } else {
                if let Some(key) = key.key {
                    d.wakers[key].clone_from(cx.waker());
                } else {
                    key.key = Some(d.wakers.insert(cx.waker().clone()));
                }
                Poll::Pending
            }
        })
        .await
    }
}
struct WakerKeyGuard<'a, T> {
    receiver: &'a Receiver<T>,
    key: Option<usize>,
}
impl<'a, T> WakerKeyGuard<'a, T> {
    fn new(receiver: &'a Receiver<T>) -> Self {
        Self {
            receiver,
            key: None,
        }
    }
}
impl<T> Drop for WakerKeyGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            if let Ok(mut d) = self.receiver.0.try_borrow_mut() {
                d.wakers.remove(key);
            }
        }
    }
}
