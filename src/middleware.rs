use std::{fmt, rc::Rc};

use parse_display::Display;

use crate::{BoxError, MiddlewareFailure, Store, Value};

/// Named function that mutates a store.
#[derive(Clone)]
pub struct Action(Rc<dyn Fn(&Store, &[Value])>);

impl Action {
    pub fn new(f: impl Fn(&Store, &[Value]) + 'static) -> Self {
        Self(Rc::new(f))
    }
    pub fn call(&self, store: &Store, args: &[Value]) {
        (self.0)(store, args)
    }
}
impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action")
    }
}

/// One dispatch of an action, as seen by middleware.
///
/// Middleware may rewrite `args` before calling [`Next::run`].
#[derive(Clone, Debug)]
pub struct ActionCall {
    pub store: Store,
    pub name: Rc<str>,
    pub action: Action,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display)]
#[display("#{0}")]
pub struct MiddlewareId(pub(crate) usize);

pub(crate) type MiddlewareFn = Rc<dyn Fn(&mut ActionCall, Next) -> Result<(), BoxError>>;

#[derive(Clone)]
pub(crate) struct MiddlewareEntry {
    pub id: MiddlewareId,
    pub f: MiddlewareFn,
}

/// Continuation that runs the rest of a middleware chain, then the action.
///
/// A middleware that drops its `Next` without running it stops the action.
pub struct Next {
    chain: Rc<[MiddlewareEntry]>,
    index: usize,
}

impl Next {
    pub(crate) fn new(chain: Rc<[MiddlewareEntry]>) -> Self {
        Self { chain, index: 0 }
    }

    /// Number of middleware left before the action runs.
    pub fn remaining(&self) -> usize {
        self.chain.len() - self.index
    }

    pub fn run(self, call: &mut ActionCall) {
        let Some(entry) = self.chain.get(self.index).cloned() else {
            call.action.call(&call.store, &call.args);
            return;
        };
        let next = Next {
            chain: self.chain,
            index: self.index + 1,
        };
        if let Err(error) = (entry.f)(call, next) {
            call.store.report_middleware_failure(MiddlewareFailure {
                error,
                middleware: entry.id,
                call: call.clone(),
            });
        }
    }
}
