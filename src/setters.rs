//! Actions that merge a single field (or a fixed list of fields) into the state.

use std::rc::Rc;

use crate::{Action, BoxError, Record, Selector, SelectorSpec, Update, Value};

/// Sets `key` to the first argument.
pub fn field_setter(key: &str) -> Action {
    let key: Rc<str> = key.into();
    Action::new(move |store, args| {
        let value = args.first().cloned().unwrap_or_default();
        store.merge_state(Value::record([(key.clone(), value)]));
    })
}

/// Sets each key to the argument at the same position.
///
/// Keys without an argument become `Undefined`.
pub fn field_list_setter(keys: &[&str]) -> Action {
    let keys: Vec<Rc<str>> = keys.iter().map(|&key| key.into()).collect();
    Action::new(move |store, args| {
        let partial: Record = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), args.get(i).cloned().unwrap_or_default()))
            .collect();
        store.merge_state(Value::from(partial));
    })
}

/// Negates the truthiness of `key`.
pub fn field_toggler(key: &str) -> Action {
    let key: Rc<str> = key.into();
    Action::new(move |store, _| {
        let key = key.clone();
        store.merge_state(Update::map(move |old| {
            let value = !is_truthy(&old.get(&key));
            Value::record([(key, Value::from(value))])
        }));
    })
}

/// Adds the first argument (default `1`) to the numeric field `key`.
///
/// Fails the flush if the field and the amount are not both numbers or both big integers.
pub fn field_adder(key: &str) -> Action {
    let key: Rc<str> = key.into();
    Action::new(move |store, args| {
        let key = key.clone();
        let amount = args.first().cloned().unwrap_or(Value::Number(1.0));
        store.merge_state(Update::try_map(move |old| {
            let sum = match (old.get(&key), &amount) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::BigInt(a), Value::BigInt(b)) => Value::BigInt(a.wrapping_add(*b)),
                (value, amount) => {
                    return Err(BoxError::from(format!(
                        "cannot add {amount} to field `{key}` holding {value}"
                    )));
                }
            };
            Ok(Value::record([(key, sum)]))
        }));
    })
}

/// Appends the arguments to the array field `key`.
///
/// A missing field reads as an empty array.
pub fn field_appender(key: &str) -> Action {
    let key: Rc<str> = key.into();
    Action::new(move |store, args| {
        let key = key.clone();
        let items = args.to_vec();
        store.merge_state(Update::map(move |old| {
            let field = old.get(&key);
            let old_items = field.as_array().unwrap_or_default();
            let items = old_items.iter().chain(&items).cloned();
            Value::record([(key, Value::array(items))])
        }));
    })
}

/// Removes the items identical to any argument from the array field `key`.
pub fn field_remover(key: &str) -> Action {
    let key: Rc<str> = key.into();
    Action::new(move |store, args| {
        let key = key.clone();
        let removed = args.to_vec();
        store.merge_state(Update::map(move |old| {
            let field = old.get(&key);
            let items = field
                .as_array()
                .unwrap_or_default()
                .iter()
                .filter(|item| !removed.iter().any(|r| r.is_identical(item)))
                .cloned();
            Value::record([(key, Value::array(items))])
        }));
    })
}

/// Replaces every item of the array field `key` with `mapper` applied to it.
///
/// `mapper` resolves like a subscriber's selector, so a key plucks that field from each item.
/// A missing field reads as an empty array.
pub fn field_mapper(key: &str, mapper: impl Into<SelectorSpec>) -> Action {
    let key: Rc<str> = key.into();
    let mapper = Selector::resolve(mapper);
    Action::new(move |store, _| {
        let key = key.clone();
        let mapper = mapper.clone();
        store.merge_state(Update::map(move |old| {
            let field = old.get(&key);
            let items = field.as_array().unwrap_or_default();
            let items = items.iter().map(|item| mapper.select(item));
            Value::record([(key, Value::array(items))])
        }));
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::BigInt(n) => *n != 0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Record(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::is_truthy;
    use crate::Value;

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Undefined));
        assert!(!is_truthy(&Value::from(0)));
        assert!(!is_truthy(&Value::from("")));
        assert!(is_truthy(&Value::from("a")));
        assert!(is_truthy(&Value::array([])));
    }
}
