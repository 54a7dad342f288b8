//! Payload augmentation for tool `invoke` calls.
//!
//! The payload handed to a tool is the JSON the caller supplied, augmented
//! with two optional host-injected keys, `_secrets` and `_context`. Both
//! are reserved: a plugin must not rely on a caller supplying them, and a
//! caller-supplied value under either key is overwritten, never merged.

use serde_json::{Map, Value};

/// Augments `payload` with `_secrets` (when `secrets` is `Some`) and
/// `_context` (when `working_directory` is `Some`). Neither key is added
/// when its source has nothing to contribute. If `payload` is not a JSON
/// object, it is returned unchanged — injection only applies to the
/// object-shaped arguments every tool call's `parameters` schema describes.
pub fn augment_payload(
    payload: Value,
    secrets: Option<Value>,
    working_directory: Option<&str>,
) -> Value {
    let Value::Object(mut map) = payload else {
        return payload;
    };
    if let Some(secrets) = secrets {
        map.insert("_secrets".to_string(), secrets);
    }
    if let Some(dir) = working_directory {
        let mut context = Map::new();
        context.insert("working_directory".to_string(), Value::String(dir.to_string()));
        map.insert("_context".to_string(), Value::Object(context));
    }
    Value::Object(map)
}
