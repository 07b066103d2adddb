//! Firestore typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type:
//!
//! ```text
//! "x"          <-> {"stringValue": "x"}
//! 12           <-> {"integerValue": "12"}        (int64 travels as a string)
//! 1.5          <-> {"doubleValue": 1.5}
//! [..]         <-> {"arrayValue": {"values": [..]}}
//! {..}         <-> {"mapValue": {"fields": {..}}}
//! ```
//!
//! Timestamps decode to their RFC 3339 string.

use serde_json::{Map, Value, json};

use super::{ClientError, Fields};

pub fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect();
    Value::Object(encoded)
}

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Decode a document's `fields` object. A missing object means no fields.
pub fn decode_fields(raw: Option<&Value>) -> Result<Fields, ClientError> {
    let Some(raw) = raw else {
        return Ok(Fields::new());
    };
    let obj = raw
        .as_object()
        .ok_or_else(|| ClientError::Decode(format!("fields must be an object, got {raw}")))?;
    obj.iter()
        .map(|(k, v)| decode(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}

pub fn decode(raw: &Value) -> Result<Value, ClientError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ClientError::Decode(format!("typed value must be an object, got {raw}")))?;
    let Some((kind, inner)) = obj.iter().next() else {
        return Ok(Value::Null);
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "bytesValue" => Ok(inner.clone()),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| ClientError::Decode(format!("bad integerValue '{s}': {e}"))),
            Value::Number(_) => Ok(inner.clone()),
            other => Err(ClientError::Decode(format!("bad integerValue {other}"))),
        },
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map(|vs| vs.iter().map(decode).collect::<Result<Vec<_>, _>>())
                .transpose()
                .map(|vs| Value::Array(vs.unwrap_or_default()))
        }
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        "geoPointValue" => Ok(inner.clone()),
        other => Err(ClientError::Decode(format!("unsupported value type '{other}'"))),
    }
}
