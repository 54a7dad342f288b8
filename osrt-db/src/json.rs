//! JSON parameter binding and JSON result-cell encoding for the sandboxed
//! SQLite surface.

use rusqlite::types::ValueRef;
use serde_json::Value;

/// Convert a JSON array of parameters into rusqlite-bindable values, in
/// order, for 1-based positional placeholders (`?1`, `?2`, …).
pub fn bind_values(params: Option<&Value>) -> Result<Vec<rusqlite::types::Value>, String> {
    let Some(params) = params else {
        return Ok(Vec::new());
    };
    let array = params
        .as_array()
        .ok_or_else(|| "params must be a JSON array".to_string())?;

    array.iter().map(json_to_sql_value).collect()
}

fn json_to_sql_value(v: &Value) -> Result<rusqlite::types::Value, String> {
    use rusqlite::types::Value as SqlValue;
    Ok(match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                return Err(format!("unrepresentable number: {n}"));
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            SqlValue::Text(serde_json::to_string(v).map_err(|e| e.to_string())?)
        }
    })
}

/// Encode one result column cell per the wire contract:
/// NULL -> null, INTEGER -> bare decimal, FLOAT -> bare decimal with a
/// point, TEXT/BLOB -> a JSON string whose *contents* are the JSON-escaped
/// (quoted) form of the value — i.e. the cell is itself a string carrying
/// an already-quoted representation, not the raw text.
pub fn encode_cell(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            Value::String(serde_json::to_string(text.as_ref()).expect("string always encodes"))
        }
        ValueRef::Blob(bytes) => {
            let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
            Value::String(serde_json::to_string(&encoded).expect("string always encodes"))
        }
    }
}
