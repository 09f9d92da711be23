use std::{collections::VecDeque, fmt, future::Future, mem::take};

use futures::{future::LocalBoxFuture, FutureExt};

use crate::{BoxError, ConfigurationError, StoreError, Value};

#[cfg(test)]
mod tests;

/// Number of extra updates a flush chain may apply beyond the batch that started it.
pub const DEFAULT_QUEUE_MARGIN: usize = 1000;

type SyncUpdater = Box<dyn FnOnce(Value) -> Result<Value, BoxError>>;
type AsyncUpdater = Box<dyn FnOnce(Value) -> LocalBoxFuture<'static, Result<Value, BoxError>>>;

/// Pending mutation of a store's state.
pub enum Update {
    /// Replaces the state.
    Literal(Value),
    /// Computes the next state from the previous one.
    Sync(SyncUpdater),
    /// Computes the next state asynchronously.
    ///
    /// The flush waits for the future before applying the next update.
    Async(AsyncUpdater),
}

impl Update {
    pub fn value(value: impl Into<Value>) -> Self {
        Update::Literal(value.into())
    }
    pub fn map(f: impl FnOnce(Value) -> Value + 'static) -> Self {
        Update::Sync(Box::new(move |state| Ok(f(state))))
    }
    pub fn try_map(f: impl FnOnce(Value) -> Result<Value, BoxError> + 'static) -> Self {
        Update::Sync(Box::new(f))
    }
    pub fn future<Fut>(f: impl FnOnce(Value) -> Fut + 'static) -> Self
    where
        Fut: Future<Output = Result<Value, BoxError>> + 'static,
    {
        Update::Async(Box::new(move |state| f(state).boxed_local()))
    }

    /// Converts this update into one whose result is shallow-merged into the previous state.
    pub fn merged(self) -> Self {
        match self {
            Update::Literal(partial) => Update::map(move |old| old.merge(&partial)),
            Update::Sync(f) => Update::try_map(move |old| {
                let partial = f(old.clone())?;
                Ok(old.merge(&partial))
            }),
            Update::Async(f) => Update::future(move |old| {
                let partial = f(old.clone());
                async move {
                    let partial = partial.await?;
                    Ok::<_, BoxError>(old.merge(&partial))
                }
            }),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Update::Async(_))
    }

    pub async fn apply(self, state: Value) -> Result<Value, BoxError> {
        match self {
            Update::Literal(value) => Ok(value),
            Update::Sync(f) => f(state),
            Update::Async(f) => f(state).await,
        }
    }

    /// Applies this update without suspending.
    pub fn apply_sync(self, state: Value) -> Result<Value, StoreError> {
        match self {
            Update::Literal(value) => Ok(value),
            Update::Sync(f) => f(state).map_err(StoreError::Updater),
            Update::Async(_) => Err(ConfigurationError::AsyncUpdateInSync.into()),
        }
    }
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Update::Literal(value)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Update::Sync(_) => write!(f, "Sync(..)"),
            Update::Async(_) => write!(f, "Async(..)"),
        }
    }
}

/// Applies `updates` from left to right, one at a time.
pub async fn fold(state: Value, updates: Vec<Update>) -> Result<Value, StoreError> {
    let mut acc = state;
    for update in updates {
        acc = update.apply(acc).await.map_err(StoreError::Updater)?;
    }
    Ok(acc)
}

/// FIFO of pending updates and the flags that keep one flush in flight.
pub(crate) struct UpdateQueue {
    pending: VecDeque<Update>,
    /// Pending updates pushed by the flush in flight while it was running.
    reentrant: usize,
    scheduled: bool,
    flushing: bool,
    active: bool,
    margin: usize,
    chain: Option<FlushChain>,
}

/// Flushes that run back to back because each one enqueued updates for the next.
///
/// Only updates pushed while a flush was running count toward `limit`.
/// Updates pushed while a flush was suspended come from outside and start a new chain.
#[derive(Clone, Copy, Debug)]
struct FlushChain {
    limit: usize,
    applied: usize,
}

impl UpdateQueue {
    pub fn new(margin: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            reentrant: 0,
            scheduled: false,
            flushing: false,
            active: false,
            margin,
            chain: None,
        }
    }

    /// Appends an update.
    ///
    /// Returns `true` if the caller must schedule a flush.
    pub fn push(&mut self, update: Update) -> bool {
        self.pending.push_back(update);
        if self.flushing && self.active {
            self.reentrant += 1;
        }
        if self.scheduled || self.flushing {
            false
        } else {
            self.scheduled = true;
            true
        }
    }
    pub fn len(&self) -> usize {
        self.pending.len()
    }
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Marks whether the flush in flight is being polled.
    ///
    /// Updates pushed while it is not are not counted toward its chain.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Called by a scheduled flush task before it drains.
    pub fn take_schedule(&mut self) {
        self.scheduled = false;
    }

    /// Takes the pending updates as the batch of a new flush.
    ///
    /// Returns `Ok(None)` if a flush is already in flight or nothing is pending.
    pub fn begin(&mut self) -> Result<Option<Vec<Update>>, StoreError> {
        if self.flushing || self.pending.is_empty() {
            return Ok(None);
        }
        let batch: Vec<_> = take(&mut self.pending).into();
        let reentrant = take(&mut self.reentrant);
        let chain = match self.chain.take() {
            Some(mut chain) if reentrant != 0 => {
                chain.applied += reentrant;
                chain
            }
            _ => FlushChain {
                limit: batch.len() + self.margin,
                applied: batch.len(),
            },
        };
        if chain.applied > chain.limit {
            return Err(StoreError::QueueOverflow { limit: chain.limit });
        }
        self.chain = Some(chain);
        self.flushing = true;
        Ok(Some(batch))
    }

    /// Ends the flush in flight.
    ///
    /// Returns `true` if updates arrived during the flush and the caller must schedule another one.
    pub fn end(&mut self) -> bool {
        self.flushing = false;
        if self.pending.is_empty() {
            self.chain = None;
            return false;
        }
        if self.scheduled {
            false
        } else {
            self.scheduled = true;
            true
        }
    }
}
