use std::rc::Rc;

use derive_ex::Ex;

use crate::{Action, MiddlewareFailure, Record, StoreError, Value, DEFAULT_QUEUE_MARGIN};

pub type ExceptionFn = Rc<dyn Fn(&StoreError)>;
pub type MiddlewareErrorFn = Rc<dyn Fn(&MiddlewareFailure)>;

/// Settings of a store, given to [`Registry::create_store`](crate::Registry::create_store).
#[derive(Clone, Ex)]
#[derive_ex(Default)]
#[default(Self::new())]
pub struct StoreConfig {
    /// Initial state, also the target of [`Store::reset`](crate::Store::reset).
    pub state: Value,
    /// Defaults to `store-{idx}`.
    pub id: Option<Rc<str>>,
    /// Record of settings that never trigger notification.
    pub options: Value,
    /// Reset the state when the last subscriber leaves.
    pub auto_reset: bool,
    pub actions: Vec<(Rc<str>, Action)>,
    /// See [`DEFAULT_QUEUE_MARGIN`].
    pub queue_margin: usize,
    pub on_exception: Option<ExceptionFn>,
    pub on_middleware_error: Option<MiddlewareErrorFn>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            state: Value::from(Record::new()),
            id: None,
            options: Value::from(Record::new()),
            auto_reset: false,
            actions: Vec::new(),
            queue_margin: DEFAULT_QUEUE_MARGIN,
            on_exception: None,
            on_middleware_error: None,
        }
    }

    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = state.into();
        self
    }
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.into());
        self
    }
    pub fn options(mut self, options: impl Into<Value>) -> Self {
        self.options = options.into();
        self
    }
    pub fn auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }
    pub fn action(mut self, name: &str, action: Action) -> Self {
        self.actions.push((name.into(), action));
        self
    }
    pub fn queue_margin(mut self, queue_margin: usize) -> Self {
        self.queue_margin = queue_margin;
        self
    }
    pub fn on_exception(mut self, f: impl Fn(&StoreError) + 'static) -> Self {
        self.on_exception = Some(Rc::new(f));
        self
    }
    pub fn on_middleware_error(mut self, f: impl Fn(&MiddlewareFailure) + 'static) -> Self {
        self.on_middleware_error = Some(Rc::new(f));
        self
    }
}
