use std::rc::Rc;

use crate::Value;

#[cfg(test)]
mod tests;

/// Function that decides whether two slices of state are equal.
pub type EqualityFn = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Shallow comparison used to decide whether a slice of state changed.
///
/// Scalars are compared by value.
/// Arrays and records are equal when they have the same length (or key count)
/// and every element is [identical](Value::is_identical) to its counterpart.
/// A key missing from a record reads as `Undefined`.
/// Nested containers are compared by reference only.
pub fn is_equal(prev: &Value, next: &Value) -> bool {
    match (prev, next) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (prev, next) if prev.is_primitive() || next.is_primitive() => prev.is_identical(next),
        (Value::Array(prev), Value::Array(next)) => {
            prev.len() == next.len() && prev.iter().zip(next.iter()).all(|(a, b)| a.is_identical(b))
        }
        (Value::Record(prev), Value::Record(next)) => {
            prev.len() == next.len()
                && prev.iter().all(|(key, a)| {
                    let b = next.get(key);
                    b.map_or(a.is_undefined(), |b| a.is_identical(b))
                })
                && next
                    .iter()
                    .all(|(key, b)| b.is_undefined() || prev.contains_key(key))
        }
        _ => false,
    }
}

/// Returns [`is_equal`] as an [`EqualityFn`].
pub fn default_equality() -> EqualityFn {
    Rc::new(is_equal)
}
