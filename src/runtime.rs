use std::{
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    mem::take,
    pin::Pin,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll, Wake, Waker},
};

use futures::{
    future::LocalBoxFuture,
    task::{LocalFutureObj, LocalSpawn, SpawnError},
    FutureExt,
};
use slabmap::SlabMap;

#[cfg(test)]
mod tests;

/// Single-threaded executor that runs store flushes.
///
/// Spawned tasks do not run until [`update`](Self::update) is called,
/// so the caller decides when a synchronous turn ends.
#[derive(Clone, Default)]
pub struct Runtime(Rc<RefCell<RawRuntime>>);

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.0.borrow_mut().push(future.boxed_local());
    }

    /// Polls ready tasks until none is left.
    ///
    /// Returns `true` if any task was polled.
    pub fn update(&self) -> bool {
        let mut handled = false;
        while let Some((key, mut task)) = self.next_ready() {
            let done = task
                .future
                .as_mut()
                .poll(&mut Context::from_waker(&task.waker))
                .is_ready();
            let mut rt = self.0.borrow_mut();
            if done {
                rt.tasks.remove(key);
            } else {
                rt.tasks[key] = Some(task);
            }
            handled = true;
        }
        handled
    }

    /// Spawns `future` and runs tasks until they stall.
    ///
    /// Returns `None` if `future` did not complete.
    pub fn run_until<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future + 'static,
    {
        let output = Rc::new(RefCell::new(None));
        self.spawn({
            let output = output.clone();
            async move { *output.borrow_mut() = Some(future.await) }
        });
        self.update();
        let value = output.borrow_mut().take();
        value
    }

    /// Returns `true` if no task is waiting to be polled.
    pub fn is_idle(&self) -> bool {
        let mut rt = self.0.borrow_mut();
        rt.apply_wake();
        rt.ready.is_empty()
    }

    /// Number of tasks that have not completed.
    pub fn task_count(&self) -> usize {
        self.0.borrow().tasks.len()
    }

    fn next_ready(&self) -> Option<(usize, Task)> {
        let mut rt = self.0.borrow_mut();
        loop {
            rt.apply_wake();
            let key = rt.ready.pop_front()?;
            if let Some(slot) = rt.tasks.get_mut(key) {
                if let Some(mut task) = slot.take() {
                    task.queued = false;
                    return Some((key, task));
                }
            }
        }
    }
}

impl LocalSpawn for Runtime {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        self.spawn(future);
        Ok(())
    }
}

#[derive(Default)]
struct RawRuntime {
    tasks: SlabMap<Option<Task>>,
    ready: VecDeque<usize>,
    wakes: WakeRequests,
}

impl RawRuntime {
    fn push(&mut self, future: LocalBoxFuture<'static, ()>) {
        let key = self.tasks.insert(None);
        self.tasks[key] = Some(Task {
            future,
            waker: RawWake::new(&self.wakes, key).into(),
            queued: true,
        });
        self.ready.push_back(key);
    }
    fn apply_wake(&mut self) {
        let keys = take(&mut self.wakes.lock().keys);
        for key in keys {
            match self.tasks.get_mut(key) {
                Some(Some(task)) => {
                    if !task.queued {
                        task.queued = true;
                        self.ready.push_back(key);
                    }
                }
                // woken while being polled
                Some(None) => self.ready.push_back(key),
                None => {}
            }
        }
    }
}

struct Task {
    future: LocalBoxFuture<'static, ()>,
    waker: Waker,
    queued: bool,
}

#[derive(Clone, Default)]
struct WakeRequests(Arc<Mutex<RawWakeRequests>>);

impl WakeRequests {
    fn lock(&self) -> MutexGuard<RawWakeRequests> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Default)]
struct RawWakeRequests {
    keys: Vec<usize>,
}

struct RawWake {
    requests: WakeRequests,
    key: usize,
}
impl RawWake {
    fn new(requests: &WakeRequests, key: usize) -> Arc<Self> {
        Arc::new(RawWake {
            requests: requests.clone(),
            key,
        })
    }
}

impl Wake for RawWake {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref()
    }
    fn wake_by_ref(self: &Arc<Self>) {
        self.requests.lock().keys.push(self.key);
    }
}

/// Polls `future` once without a runtime.
pub(crate) fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    let mut cx = Context::from_waker(futures::task::noop_waker_ref());
    Pin::new(future).poll(&mut cx)
}
