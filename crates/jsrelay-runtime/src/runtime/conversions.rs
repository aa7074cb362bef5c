//! JSON <-> JavaScript value conversions
//!
//! Marshaling functions use [`json_to_js_value`] to turn native JSON payloads
//! into arguments, and call receipts use [`js_value_to_json`] to hand a
//! callback's return value back to the native thread.
//!
//! # Type Mapping
//!
//! | JSON Type | JavaScript Type |
//! |-----------|-----------------|
//! | null | null |
//! | boolean | Boolean |
//! | number | Number |
//! | string | String |
//! | array | Array |
//! | object | Object |
//!
//! `undefined`, symbols and functions have no JSON form and come back as
//! `null`; symbol-keyed properties are skipped.

use boa_engine::{
    object::{builtins::JsArray, JsObject},
    property::PropertyKey,
    value::JsValue,
    Context, JsString,
};
use jsrelay_common::{RelayError, Result};
use serde_json::Value as JsonValue;

/// Largest integer a JavaScript number holds exactly (2^53 - 1).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Deepest array/object nesting converted back to JSON.
pub const MAX_JSON_DEPTH: usize = 128;

/// Convert serde_json::Value to Boa JsValue.
///
/// # Errors
///
/// Returns `RelayError::Marshal` if a number cannot be represented or an
/// element/property cannot be defined.
pub fn json_to_js_value(json: JsonValue, ctx: &mut Context) -> Result<JsValue> {
    match json {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(b) => Ok(JsValue::new(b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                return Ok(JsValue::new(i));
            }
            n.as_f64()
                .map(JsValue::new)
                .ok_or_else(|| RelayError::Marshal(format!("Number out of range: {n}")))
        }
        JsonValue::String(s) => Ok(JsValue::from(JsString::from(s.as_str()))),
        JsonValue::Array(arr) => {
            let js_array = JsArray::new(ctx);
            for (i, v) in arr.into_iter().enumerate() {
                let js_value = json_to_js_value(v, ctx)?;
                js_array.push(js_value, ctx).map_err(|e| {
                    RelayError::Marshal(format!("Failed to push array element {i}: {e}"))
                })?;
            }
            Ok(js_array.into())
        }
        JsonValue::Object(obj) => {
            let js_obj = JsObject::with_object_proto(ctx.intrinsics());
            for (key, value) in obj {
                let js_value = json_to_js_value(value, ctx)?;
                js_obj
                    .create_data_property_or_throw(JsString::from(key.as_str()), js_value, ctx)
                    .map_err(|e| {
                        RelayError::Marshal(format!("Failed to set property '{key}': {e}"))
                    })?;
            }
            Ok(js_obj.into())
        }
    }
}

/// Convert Boa JsValue to serde_json::Value.
///
/// # Errors
///
/// Returns `RelayError::JavaScriptExecution` if a property getter throws and
/// `RelayError::Marshal` for non-finite numbers, cyclic values and values
/// nested deeper than [`MAX_JSON_DEPTH`].
pub fn js_value_to_json(value: JsValue, ctx: &mut Context) -> Result<JsonValue> {
    let mut path = Vec::new();
    to_json(value, ctx, &mut path)
}

/// `path` holds the arrays and objects currently being converted.
fn to_json(value: JsValue, ctx: &mut Context, path: &mut Vec<JsObject>) -> Result<JsonValue> {
    if value.is_undefined() || value.is_null() || value.is_symbol() || value.is_callable() {
        return Ok(JsonValue::Null);
    }

    if let Some(b) = value.as_boolean() {
        return Ok(JsonValue::Bool(b));
    }

    if let Some(n) = value.as_number() {
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            return Ok(JsonValue::Number((n as i64).into()));
        }
        return serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| RelayError::Marshal(format!("Non-finite number {n}")));
    }

    if let Some(s) = value.as_string() {
        return Ok(JsonValue::String(s.to_std_string_escaped()));
    }

    let Some(obj) = value.as_object().map(|o| o.clone()) else {
        return Ok(JsonValue::Null);
    };

    if path.iter().any(|seen| JsObject::equals(seen, &obj)) {
        return Err(RelayError::Marshal("cyclic value".into()));
    }
    if path.len() >= MAX_JSON_DEPTH {
        return Err(RelayError::Marshal(format!(
            "Value nested deeper than {MAX_JSON_DEPTH} levels"
        )));
    }

    path.push(obj.clone());
    let converted = object_to_json(obj, ctx, path);
    path.pop();
    converted
}

fn object_to_json(obj: JsObject, ctx: &mut Context, path: &mut Vec<JsObject>) -> Result<JsonValue> {
    if obj.is_array() {
        let array = JsArray::from_object(obj)
            .map_err(|e| RelayError::Marshal(format!("Object is not a valid array: {e}")))?;
        let length: usize = array
            .length(ctx)
            .map_err(|e| RelayError::JavaScriptExecution(format!("Failed to get array length: {e}")))?
            .try_into()
            .map_err(|_| RelayError::Marshal("Array length overflow".into()))?;

        let mut result = Vec::with_capacity(length);
        for i in 0..length {
            let elem = array.get(i, ctx).map_err(|e| {
                RelayError::JavaScriptExecution(format!("Failed to get array element {i}: {e}"))
            })?;
            result.push(to_json(elem, ctx, path)?);
        }
        return Ok(JsonValue::Array(result));
    }

    let keys = obj
        .own_property_keys(ctx)
        .map_err(|e| RelayError::JavaScriptExecution(format!("Failed to get object keys: {e}")))?;

    let mut result = serde_json::Map::new();
    for key in keys {
        let key_str = match &key {
            PropertyKey::String(s) => s.to_std_string_escaped(),
            PropertyKey::Index(i) => i.get().to_string(),
            PropertyKey::Symbol(_) => continue,
        };

        let prop_value = obj.get(key.clone(), ctx).map_err(|e| {
            RelayError::JavaScriptExecution(format!("Failed to get property '{key_str}': {e}"))
        })?;
        result.insert(key_str, to_json(prop_value, ctx, path)?);
    }

    Ok(JsonValue::Object(result))
}
