use crate::core::error_mediator::MediatorError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::type_name;

/// Rewrites `value` so that object keys are sorted at every level. Arrays
/// keep their order. Scalars are returned as they are.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(object) => {
            // `Map` is only sorted while serde_json's `preserve_order` feature
            // is off, and any crate in the build can turn it on.
            let mut entries: Vec<(&String, &Value)> = object.iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), normalize(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        scalar => scalar.clone(),
    }
}

/// Canonical string for a request: structurally equal requests map to the
/// same key regardless of field order.
pub fn cache_key<T: Serialize>(request: &T) -> Result<String, MediatorError> {
    let value = serde_json::to_value(request)
        .map_err(|err| MediatorError::CacheKey(type_name::<T>().to_string(), err.to_string()))?;
    serde_json::to_string(&normalize(&value))
        .map_err(|err| MediatorError::CacheKey(type_name::<T>().to_string(), err.to_string()))
}
