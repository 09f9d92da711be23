use std::{cell::RefCell, fmt, rc::Rc};

use crate::{default_equality, ConfigurationError, EqualityFn, Selector, SelectorSpec, Value};

/// Notification callback registered with a store.
///
/// Identity is the allocation: clones of a `Subscriber` are the same subscriber.
#[derive(Clone)]
pub struct Subscriber(Rc<RawSubscriber>);

struct RawSubscriber {
    callback: Box<dyn Fn(&Value)>,
    selector: RefCell<Option<Selector>>,
    equality: RefCell<Option<EqualityFn>>,
}

impl Subscriber {
    pub fn new(callback: impl Fn(&Value) + 'static) -> Self {
        Self(Rc::new(RawSubscriber {
            callback: Box::new(callback),
            selector: RefCell::new(None),
            equality: RefCell::new(None),
        }))
    }

    pub fn with_selector(self, spec: impl Into<SelectorSpec>) -> Self {
        self.set_selector(spec);
        self
    }
    pub fn with_equality(self, equality: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.set_equality(Rc::new(equality));
        self
    }
    pub fn with_default_equality(self) -> Self {
        self.set_equality(default_equality());
        self
    }

    /// Attaches a selector, resolved now.
    ///
    /// Takes effect from the next flush.
    pub fn set_selector(&self, spec: impl Into<SelectorSpec>) {
        *self.0.selector.borrow_mut() = Some(Selector::resolve(spec));
    }

    /// Attaches a selector read from a dynamic description.
    pub fn set_selector_value(&self, spec: &Value) -> Result<(), ConfigurationError> {
        *self.0.selector.borrow_mut() = Some(Selector::resolve_value(spec)?);
        Ok(())
    }
    pub fn set_equality(&self, equality: EqualityFn) {
        *self.0.equality.borrow_mut() = Some(equality);
    }

    pub fn has_selector(&self) -> bool {
        self.0.selector.borrow().is_some()
    }
    pub fn has_equality(&self) -> bool {
        self.0.equality.borrow().is_some()
    }

    pub fn is_same(&self, other: &Subscriber) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Calls the callback if the observed slice changed between `prev` and `next`.
    ///
    /// Returns `true` if the callback was called.
    pub(crate) fn notify(&self, prev: &Value, next: &Value) -> bool {
        let selector = self.0.selector.borrow().clone();
        let equality = self.0.equality.borrow().clone();
        match (selector, equality) {
            (Some(selector), Some(equality)) => {
                let prev = selector.select(prev);
                let next = selector.select(next);
                if equality(&prev, &next) {
                    return false;
                }
                (self.0.callback)(&next);
            }
            (None, Some(equality)) => {
                if equality(prev, next) {
                    return false;
                }
                (self.0.callback)(next);
            }
            _ => (self.0.callback)(next),
        }
        true
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("selector", &self.has_selector())
            .field("equality", &self.has_equality())
            .finish()
    }
}
