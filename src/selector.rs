use std::{fmt, rc::Rc};

use crate::{ConfigurationError, Record, Value};


/// Description of the slice of state a subscriber cares about.
#[derive(Clone, Default)]
pub enum SelectorSpec {
    /// The whole state.
    #[default]
    Whole,
    /// `state[key]`.
    Field(Rc<str>),
    /// A new record holding only the listed keys, in list order.
    Fields(Vec<Rc<str>>),
    /// A mapping function, which must not change over the subscriber's lifetime.
    Fn(Selector),
}

impl SelectorSpec {
    /// Reads a selector from a dynamic description.
    ///
    /// Accepts a string, an array of strings, `null` or `undefined`.
    pub fn from_value(spec: &Value) -> Result<Self, ConfigurationError> {
        match spec {
            Value::Null | Value::Undefined => Ok(SelectorSpec::Whole),
            Value::String(key) => Ok(SelectorSpec::Field(key.clone())),
            Value::Array(keys) => keys
                .iter()
                .map(|key| match key {
                    Value::String(key) => Ok(key.clone()),
                    other => Err(ConfigurationError::InvalidSelector(other.to_string())),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(SelectorSpec::Fields),
            other => Err(ConfigurationError::InvalidSelector(other.to_string())),
        }
    }
}

impl From<&str> for SelectorSpec {
    fn from(key: &str) -> Self {
        SelectorSpec::Field(key.into())
    }
}
impl From<String> for SelectorSpec {
    fn from(key: String) -> Self {
        SelectorSpec::Field(key.into())
    }
}
impl From<Vec<&str>> for SelectorSpec {
    fn from(keys: Vec<&str>) -> Self {
        SelectorSpec::Fields(keys.into_iter().map(Rc::from).collect())
    }
}
impl<const N: usize> From<[&str; N]> for SelectorSpec {
    fn from(keys: [&str; N]) -> Self {
        SelectorSpec::Fields(keys.into_iter().map(Rc::from).collect())
    }
}
impl From<Selector> for SelectorSpec {
    fn from(selector: Selector) -> Self {
        SelectorSpec::Fn(selector)
    }
}
impl<T: Into<SelectorSpec>> From<Option<T>> for SelectorSpec {
    fn from(spec: Option<T>) -> Self {
        spec.map_or(SelectorSpec::Whole, Into::into)
    }
}

/// Normalized mapping from the full state to a slice of it.
#[derive(Clone)]
pub struct Selector(Rc<dyn Fn(&Value) -> Value>);

impl Selector {
    pub fn new(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }
    pub fn identity() -> Self {
        Self::new(Value::clone)
    }

    pub fn resolve(spec: impl Into<SelectorSpec>) -> Self {
        match spec.into() {
            SelectorSpec::Whole => Self::identity(),
            SelectorSpec::Field(key) => Self::new(move |state| state.get(&key)),
            SelectorSpec::Fields(keys) => Self::new(move |state| {
                Value::from(
                    keys.iter()
                        .map(|key| (key.clone(), state.get(key)))
                        .collect::<Record>(),
                )
            }),
            SelectorSpec::Fn(selector) => selector,
        }
    }

    /// Resolves a dynamic description, see [`SelectorSpec::from_value`].
    pub fn resolve_value(spec: &Value) -> Result<Self, ConfigurationError> {
        Ok(Self::resolve(SelectorSpec::from_value(spec)?))
    }

    pub fn select(&self, state: &Value) -> Value {
        (self.0)(state)
    }
}
impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector")
    }
}
