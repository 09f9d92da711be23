use std::{
    any::{Any, TypeId},
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    future::Future,
    rc::{Rc, Weak},
};

use futures::{future::poll_fn, task::LocalSpawnExt, FutureExt};
use tracing::{debug, error, warn};

use crate::{
    config::{ExceptionFn, MiddlewareErrorFn},
    fold,
    runtime::poll_once,
    scheduler::UpdateQueue,
    utils::sync::{oneshot_broadcast, Sender},
    Action, Emitter, EventType, HandlerId, MiddlewareFailure, PreventableEvent, Registry,
    StoreConfig, StoreError, Subscriber, Subscription, Update, Value,
};

/// Event emitted by a store; `target` is the store itself.
pub type StoreEvent = PreventableEvent<Store, EventData>;

/// Payload of a [`StoreEvent`].
#[derive(Clone, Debug, Default)]
pub enum EventData {
    #[default]
    None,
    State(Value),
    Update {
        prev: Value,
        next: Value,
    },
    Error(Rc<StoreError>),
}

impl EventData {
    /// The state carried by `State`, or the next state carried by `Update`.
    pub fn state(&self) -> Option<&Value> {
        match self {
            EventData::State(state) | EventData::Update { next: state, .. } => Some(state),
            _ => None,
        }
    }
    pub fn prev(&self) -> Option<&Value> {
        match self {
            EventData::Update { prev, .. } => Some(prev),
            _ => None,
        }
    }
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            EventData::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Handle to a reactive state container.
///
/// Cloning the handle does not clone the store.
#[derive(Clone)]
pub struct Store(Rc<StoreNode>);

pub(crate) struct StoreNode {
    id: Rc<str>,
    idx: usize,
    registry: Registry,
    initial: Value,
    auto_reset: bool,
    state: RefCell<Value>,
    options: RefCell<Value>,
    queue: RefCell<UpdateQueue>,
    subscribers: RefCell<Vec<Subscriber>>,
    used_count: Cell<usize>,
    initial_state_emitted: Cell<bool>,
    reset_queued: Cell<bool>,
    next_state: RefCell<Option<Sender<Value>>>,
    events: Emitter<Store, EventData>,
    actions: RefCell<HashMap<Rc<str>, Action>>,
    extensions: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    on_exception: Option<ExceptionFn>,
    on_middleware_error: Option<MiddlewareErrorFn>,
}

impl Store {
    pub(crate) fn new(config: StoreConfig, idx: usize, registry: Registry) -> Self {
        let id = config.id.unwrap_or_else(|| format!("store-{idx}").into());
        let store = Self(Rc::new(StoreNode {
            id,
            idx,
            registry,
            initial: config.state.clone(),
            auto_reset: config.auto_reset,
            state: RefCell::new(config.state),
            options: RefCell::new(config.options),
            queue: RefCell::new(UpdateQueue::new(config.queue_margin)),
            subscribers: RefCell::new(Vec::new()),
            used_count: Cell::new(0),
            initial_state_emitted: Cell::new(false),
            reset_queued: Cell::new(false),
            next_state: RefCell::new(None),
            events: Emitter::new(),
            actions: RefCell::new(HashMap::new()),
            extensions: RefCell::new(HashMap::new()),
            on_exception: config.on_exception,
            on_middleware_error: config.on_middleware_error,
        }));
        store.add_actions(config.actions);
        store
    }
    pub(crate) fn from_node(node: Rc<StoreNode>) -> Self {
        Self(node)
    }
    pub(crate) fn downgrade(&self) -> Weak<StoreNode> {
        Rc::downgrade(&self.0)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }
    pub fn idx(&self) -> usize {
        self.0.idx
    }
    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }
    pub fn is_same(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the last committed state.
    pub fn get_state(&self) -> Value {
        self.0.state.borrow().clone()
    }

    /// Queues an update for the next flush.
    pub fn set_state(&self, update: impl Into<Update>) {
        self.enqueue(update.into());
    }

    /// Queues an update and flushes immediately.
    ///
    /// Returns `true` if the flush completed without suspending.
    pub fn set_state_now(&self, update: impl Into<Update>) -> bool {
        self.enqueue(update.into());
        self.flush_now()
    }

    /// Queues an update whose result is shallow-merged into the state.
    pub fn merge_state(&self, update: impl Into<Update>) {
        self.enqueue(update.into().merged());
    }
    pub fn merge_state_now(&self, update: impl Into<Update>) -> bool {
        self.enqueue(update.into().merged());
        self.flush_now()
    }

    /// Replaces the state immediately, without events or notification.
    ///
    /// Intended for seeding state before the first subscriber renders.
    pub fn set_sync(&self, update: impl Into<Update>) -> Result<(), StoreError> {
        let next = update.into().apply_sync(self.get_state())?;
        *self.0.state.borrow_mut() = next;
        Ok(())
    }
    pub fn merge_sync(&self, update: impl Into<Update>) -> Result<(), StoreError> {
        self.set_sync(update.into().merged())
    }

    /// Queues the construction-time state.
    ///
    /// `AfterReset` is emitted once the flush that applies it commits.
    /// A flush cancelled by `BeforeSet` or `BeforeUpdate`, or one that fails, drops it.
    ///
    /// Returns `false` if a `BeforeReset` handler prevented it.
    pub fn reset(&self) -> bool {
        let event = self.emit(EventType::BeforeReset, EventData::State(self.get_state()));
        if event.default_prevented() {
            return false;
        }
        self.set_state(self.0.initial.clone());
        self.0.reset_queued.set(true);
        true
    }

    /// Returns a future that resolves with the state committed by the next flush.
    ///
    /// The future is registered when this method is called, not when it is first polled.
    /// A flush that fails or is cancelled does not resolve it.
    pub fn next_state(&self) -> impl Future<Output = Value> + 'static {
        let receiver = self
            .0
            .next_state
            .borrow_mut()
            .get_or_insert_with(|| oneshot_broadcast().0)
            .receiver();
        receiver.recv()
    }

    /// Drains the queue now instead of waiting for the scheduled flush.
    ///
    /// If an asynchronous update suspends the flush, the rest of it runs on the registry's spawner.
    /// Returns `true` if the flush completed.
    pub fn flush_now(&self) -> bool {
        if self.0.queue.borrow().is_flushing() {
            return false;
        }
        let mut flush = self.clone().flush().boxed_local();
        if poll_once(&mut flush).is_ready() {
            return true;
        }
        if let Err(e) = self.0.registry.spawner().spawn_local(flush) {
            self.0.queue.borrow_mut().end();
            self.report(StoreError::Spawn(e));
        }
        false
    }

    /// Number of updates waiting for a flush.
    pub fn pending_count(&self) -> usize {
        self.0.queue.borrow().len()
    }

    fn enqueue(&self, update: Update) {
        let schedule = self.0.queue.borrow_mut().push(update);
        if schedule {
            self.schedule_flush();
        }
    }
    fn schedule_flush(&self) {
        let store = self.clone();
        let task = async move {
            store.0.queue.borrow_mut().take_schedule();
            store.flush().await
        };
        if let Err(e) = self.0.registry.spawner().spawn_local(task) {
            self.0.queue.borrow_mut().take_schedule();
            self.report(StoreError::Spawn(e));
        }
    }

    /// Drains the queue, marking the queue active only while the drain is being polled.
    fn flush(self) -> impl Future<Output = ()> + 'static {
        let store = self.clone();
        let mut drain = self.drain().boxed_local();
        poll_fn(move |cx| {
            store.0.queue.borrow_mut().set_active(true);
            let poll = drain.as_mut().poll(cx);
            store.0.queue.borrow_mut().set_active(false);
            poll
        })
    }
    async fn drain(self) {
        let begun = self.0.queue.borrow_mut().begin();
        let batch = match begun {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                self.0.reset_queued.set(false);
                self.report(e);
                return;
            }
        };
        let reset = self.0.reset_queued.replace(false);
        debug!(store = %self.0.id, updates = batch.len(), "flush");
        if let Err(e) = self.flush_batch(batch, reset).await {
            self.report(e);
        }
        let reschedule = self.0.queue.borrow_mut().end();
        if reschedule {
            self.schedule_flush();
        }
    }
    async fn flush_batch(&self, batch: Vec<Update>, reset: bool) -> Result<(), StoreError> {
        let prev = self.get_state();
        if self
            .emit(EventType::BeforeSet, EventData::State(prev.clone()))
            .default_prevented()
        {
            debug!(store = %self.0.id, "flush cancelled by BeforeSet");
            return Ok(());
        }
        let next = fold(prev.clone(), batch).await?;
        if self
            .emit(EventType::BeforeUpdate, EventData::State(next.clone()))
            .default_prevented()
        {
            debug!(store = %self.0.id, "flush cancelled by BeforeUpdate");
            return Ok(());
        }
        self.commit(prev, next.clone());
        if reset {
            self.emit(EventType::AfterReset, EventData::State(next));
        }
        Ok(())
    }
    fn commit(&self, prev: Value, next: Value) {
        *self.0.state.borrow_mut() = next.clone();
        let subscribers = self.0.subscribers.borrow().clone();
        let mut notified = 0;
        for subscriber in &subscribers {
            if subscriber.notify(&prev, &next) {
                notified += 1;
            }
        }
        debug!(store = %self.0.id, notified, "commit");
        let sender = self.0.next_state.borrow_mut().take();
        if let Some(sender) = sender {
            sender.send(next.clone());
        }
        self.emit(EventType::AfterUpdate, EventData::Update { prev, next });
    }
    fn report(&self, error: StoreError) {
        warn!(store = %self.0.id, %error, "flush failed");
        let error = Rc::new(error);
        self.emit(EventType::SetterException, EventData::Error(error.clone()));
        if let Some(f) = &self.0.on_exception {
            f(&error);
        }
    }
    pub(crate) fn report_middleware_failure(&self, failure: MiddlewareFailure) {
        error!(store = %self.0.id, %failure, "middleware failed");
        if let Some(f) = &self.0.on_middleware_error {
            f(&failure);
        }
    }

    /// Returns the state for a first render.
    ///
    /// The first call in the store's life emits `BeforeInitialState`,
    /// which lets plugins seed the state with [`set_sync`](Self::set_sync).
    pub fn initial_state(&self) -> Value {
        if !self.0.initial_state_emitted.replace(true) {
            self.emit(
                EventType::BeforeInitialState,
                EventData::State(self.get_state()),
            );
        }
        self.get_state()
    }

    /// Registers a subscriber.
    ///
    /// Returns `false` if it was already registered.
    pub fn subscribe(&self, subscriber: &Subscriber) -> bool {
        if self.is_subscribed(subscriber) {
            return false;
        }
        self.initial_state();
        let used_count = self.0.used_count.get();
        self.0.used_count.set(used_count + 1);
        if used_count == 0 {
            self.emit(EventType::AfterFirstUse, EventData::State(self.get_state()));
        }
        if self.mount_count() == 0 {
            self.emit(EventType::AfterFirstMount, EventData::State(self.get_state()));
        }
        if !self.is_subscribed(subscriber) {
            self.0.subscribers.borrow_mut().push(subscriber.clone());
        }
        self.emit(EventType::AfterMount, EventData::State(self.get_state()));
        true
    }

    /// Removes a subscriber.
    ///
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        let removed = {
            let mut subscribers = self.0.subscribers.borrow_mut();
            let len = subscribers.len();
            subscribers.retain(|s| !s.is_same(subscriber));
            len != subscribers.len()
        };
        if !removed {
            return false;
        }
        self.emit(EventType::AfterUnmount, EventData::State(self.get_state()));
        if self.mount_count() == 0 {
            if self.0.auto_reset {
                self.reset();
            }
            self.emit(EventType::AfterLastUnmount, EventData::State(self.get_state()));
        }
        true
    }

    /// Subscribes and returns a guard that unsubscribes when dropped.
    pub fn mount(&self, subscriber: &Subscriber) -> Subscription {
        self.subscribe(subscriber);
        let store = self.clone();
        let subscriber = subscriber.clone();
        Subscription::from_fn(move || {
            store.unsubscribe(&subscriber);
        })
    }

    pub fn is_subscribed(&self, subscriber: &Subscriber) -> bool {
        self.0
            .subscribers
            .borrow()
            .iter()
            .any(|s| s.is_same(subscriber))
    }

    /// Number of active subscribers.
    pub fn mount_count(&self) -> usize {
        self.0.subscribers.borrow().len()
    }

    /// Number of subscriptions ever made.
    pub fn used_count(&self) -> usize {
        self.0.used_count.get()
    }

    /// Runs `initializer` unless a `BeforePlugin` handler prevents it.
    pub fn plugin(&self, initializer: impl FnOnce(&Store)) -> bool {
        if self
            .emit(EventType::BeforePlugin, EventData::None)
            .default_prevented()
        {
            return false;
        }
        initializer(self);
        self.emit(EventType::AfterPlugin, EventData::None);
        true
    }

    pub fn on(
        &self,
        event_type: EventType,
        handler: impl Fn(&mut StoreEvent) + 'static,
    ) -> HandlerId {
        self.0.events.on(event_type, handler)
    }
    pub fn once(
        &self,
        event_type: EventType,
        handler: impl FnOnce(&mut StoreEvent) + 'static,
    ) -> HandlerId {
        self.0.events.once(event_type, handler)
    }
    pub fn off(&self, event_type: EventType, id: HandlerId) -> bool {
        self.0.events.off(&event_type, id)
    }
    pub fn emit(&self, event_type: EventType, data: EventData) -> StoreEvent {
        self.0.events.emit(self.clone(), event_type, data)
    }

    pub fn get_options(&self) -> Value {
        self.0.options.borrow().clone()
    }

    /// Shallow-merges `options` into the current options.
    pub fn set_options(&self, options: impl Into<Value>) -> &Self {
        let merged = self.get_options().merge(&options.into());
        *self.0.options.borrow_mut() = merged;
        self
    }

    pub fn add_actions<N: Into<Rc<str>>>(&self, actions: impl IntoIterator<Item = (N, Action)>) {
        let mut this = self.0.actions.borrow_mut();
        for (name, action) in actions {
            this.insert(name.into(), action);
        }
    }
    pub fn action(&self, name: &str) -> Option<Action> {
        self.0.actions.borrow().get(name).cloned()
    }

    /// Runs the named action through the registry's middleware chain.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<(), StoreError> {
        let action = self
            .action(name)
            .ok_or_else(|| StoreError::UnknownAction(name.into()))?;
        self.0.registry.dispatch(self, name, action, args);
        Ok(())
    }

    /// Attaches a value that plugins and bindings can look up by type.
    pub fn set_extension<T: Any>(&self, value: T) {
        self.0
            .extensions
            .borrow_mut()
            .insert(TypeId::of::<T>(), Rc::new(value));
    }
    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        let e = self.0.extensions.borrow().get(&TypeId::of::<T>())?.clone();
        e.downcast().ok()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Store");
        d.field("id", &self.0.id);
        match self.0.state.try_borrow() {
            Ok(state) => d.field("state", &*state),
            Err(_) => d.field("state", &"<borrowed>"),
        };
        d.finish()
    }
}
