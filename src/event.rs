use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use derive_ex::Ex;
use parse_display::Display;


/// Lifecycle signals emitted by a store.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum EventType {
    BeforeInitialState,
    BeforeSet,
    BeforeUpdate,
    AfterUpdate,
    AfterFirstUse,
    AfterFirstMount,
    AfterMount,
    AfterUnmount,
    AfterLastUnmount,
    SetterException,
    BeforePlugin,
    AfterPlugin,
    BeforeReset,
    AfterReset,
    /// Event defined by a plugin.
    #[display("{0}")]
    Custom(Rc<str>),
}

/// Event object shared by every handler of one `emit` call.
pub struct PreventableEvent<T, D> {
    pub target: T,
    pub event_type: EventType,
    pub data: D,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<T, D> PreventableEvent<T, D> {
    pub fn new(target: T, event_type: EventType, data: D) -> Self {
        Self {
            target,
            event_type,
            data,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Marks the default action as cancelled.
    ///
    /// Remaining handlers still run.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Prevents the remaining handlers from running.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
    }
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display)]
#[display("#{0}")]
pub struct HandlerId(usize);

type Handler<T, D> = Rc<dyn Fn(&mut PreventableEvent<T, D>)>;

#[derive(Ex)]
#[derive_ex(Clone(bound()))]
struct HandlerEntry<T, D> {
    id: HandlerId,
    once: bool,
    handler: Handler<T, D>,
}

/// Named-event pub/sub with cancellable events.
pub struct Emitter<T: 'static, D: 'static> {
    handlers: RefCell<HashMap<EventType, Vec<HandlerEntry<T, D>>>>,
    id_next: Cell<usize>,
}

impl<T: 'static, D: 'static> Emitter<T, D> {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            id_next: Cell::new(0),
        }
    }

    pub fn on(
        &self,
        event_type: EventType,
        handler: impl Fn(&mut PreventableEvent<T, D>) + 'static,
    ) -> HandlerId {
        self.insert(event_type, false, Rc::new(handler))
    }

    /// Registers a handler that is removed before its first invocation.
    pub fn once(
        &self,
        event_type: EventType,
        handler: impl FnOnce(&mut PreventableEvent<T, D>) + 'static,
    ) -> HandlerId {
        let handler = RefCell::new(Some(handler));
        self.insert(
            event_type,
            true,
            Rc::new(move |e: &mut PreventableEvent<T, D>| {
                let f = handler.borrow_mut().take();
                if let Some(f) = f {
                    f(e)
                }
            }),
        )
    }

    /// Removes a handler.
    ///
    /// Returns `false` if it was not registered for `event_type`.
    pub fn off(&self, event_type: &EventType, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(entries) = handlers.get_mut(event_type) else {
            return false;
        };
        let len = entries.len();
        entries.retain(|e| e.id != id);
        len != entries.len()
    }

    pub fn handler_count(&self, event_type: &EventType) -> usize {
        self.handlers
            .borrow()
            .get(event_type)
            .map_or(0, |entries| entries.len())
    }

    /// Calls the handlers registered for `event_type` in registration order.
    ///
    /// Handlers registered or removed while emitting take effect on the next `emit`.
    pub fn emit(&self, target: T, event_type: EventType, data: D) -> PreventableEvent<T, D> {
        let handlers = self.snapshot(&event_type);
        let mut event = PreventableEvent::new(target, event_type, data);
        for h in handlers {
            if h.once {
                self.off(&event.event_type, h.id);
            }
            (h.handler)(&mut event);
            if event.propagation_stopped {
                break;
            }
        }
        event
    }

    fn insert(&self, event_type: EventType, once: bool, handler: Handler<T, D>) -> HandlerId {
        let id = HandlerId(self.id_next.get());
        self.id_next.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .push(HandlerEntry { id, once, handler });
        id
    }
    fn snapshot(&self, event_type: &EventType) -> Vec<HandlerEntry<T, D>> {
        self.handlers
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}
impl<T: 'static, D: 'static> Default for Emitter<T, D> {
    fn default() -> Self {
        Self::new()
    }
}
