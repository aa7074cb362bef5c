//! Marshaling contract between native threads and the owning thread.
//!
//! A marshaling function is a `Send` closure captured on the native thread and
//! run once on the owning thread. It receives a [`MarshalContext`], the only
//! place where JavaScript values may be created, and returns the argument
//! list for the callback. Arity is whatever the function returns.
//!
//! Native values that know how to become JavaScript values implement
//! [`IntoJsValue`]; tuples and vectors of them implement [`IntoJsArgs`].

use boa_engine::{
    object::builtins::JsArray, Context, JsNativeError, JsResult, JsString, JsValue,
};
use jsrelay_common::RelayError;
use serde_json::Value as JsonValue;

use crate::runtime::conversions::json_to_js_value;
use crate::runtime::{Owner, Pinned};

/// Scope in which argument values are created, valid only during a drain step.
pub struct MarshalContext<'a> {
    context: &'a mut Context,
    owner: &'a Owner,
}

impl<'a> MarshalContext<'a> {
    pub(crate) fn new(context: &'a mut Context, owner: &'a Owner) -> Self {
        Self { context, owner }
    }

    /// Raw access to the Boa context for values the helpers don't cover.
    pub fn context(&mut self) -> &mut Context {
        self.context
    }

    pub fn undefined(&self) -> JsValue {
        JsValue::undefined()
    }

    pub fn null(&self) -> JsValue {
        JsValue::null()
    }

    pub fn string(&self, value: &str) -> JsValue {
        JsValue::from(JsString::from(value))
    }

    /// Creates a genuine `Error` object carrying `message`.
    pub fn error(&mut self, message: impl Into<String>) -> JsValue {
        JsNativeError::error()
            .with_message(message.into())
            .to_opaque(self.context)
            .into()
    }

    /// Converts a JSON document into plain objects, arrays and primitives.
    pub fn json(&mut self, value: JsonValue) -> JsResult<JsValue> {
        json_to_js_value(value, self.context)
            .map_err(|e| JsNativeError::typ().with_message(e.to_string()).into())
    }

    /// Resolves a pinned token to the exact value that was pinned.
    pub fn pinned(&self, pin: &Pinned) -> JsResult<JsValue> {
        self.owner.pinned(pin.id()).ok_or_else(|| {
            JsNativeError::typ()
                .with_message(RelayError::UnknownPin(pin.id()).to_string())
                .into()
        })
    }
}

/// Argument list for the error-first success shape: `(undefined, value)`.
pub fn error_first_success(value: JsValue) -> Vec<JsValue> {
    vec![JsValue::undefined(), value]
}

/// Argument list for the error-first failure shape: `(error)` alone.
pub fn error_first_failure(cx: &mut MarshalContext<'_>, message: impl Into<String>) -> Vec<JsValue> {
    vec![cx.error(message)]
}

/// A native value that can be turned into a JavaScript value on the owning thread.
pub trait IntoJsValue: Send + 'static {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue>;
}

/// Marker for `undefined`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Undefined;

/// Marker for `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Null;

impl IntoJsValue for Undefined {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::undefined())
    }
}

impl IntoJsValue for Null {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::null())
    }
}

impl IntoJsValue for bool {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::new(self))
    }
}

impl IntoJsValue for i32 {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::new(self))
    }
}

impl IntoJsValue for u32 {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::new(self))
    }
}

impl IntoJsValue for f64 {
    fn into_js(self, _cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(JsValue::new(self))
    }
}

impl IntoJsValue for String {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(cx.string(&self))
    }
}

impl IntoJsValue for &'static str {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        Ok(cx.string(self))
    }
}

impl IntoJsValue for JsonValue {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        cx.json(self)
    }
}

impl IntoJsValue for Pinned {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        cx.pinned(&self)
    }
}

/// `None` becomes `null`.
impl<T: IntoJsValue> IntoJsValue for Option<T> {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        match self {
            Some(value) => value.into_js(cx),
            None => Ok(JsValue::null()),
        }
    }
}

/// A vector becomes an `Array`.
impl<T: IntoJsValue> IntoJsValue for Vec<T> {
    fn into_js(self, cx: &mut MarshalContext<'_>) -> JsResult<JsValue> {
        let mut elements = Vec::with_capacity(self.len());
        for value in self {
            elements.push(value.into_js(cx)?);
        }
        Ok(JsArray::from_iter(elements, cx.context()).into())
    }
}

/// A full argument list.
pub trait IntoJsArgs: Send + 'static {
    fn into_js_args(self, cx: &mut MarshalContext<'_>) -> JsResult<Vec<JsValue>>;
}

impl IntoJsArgs for () {
    fn into_js_args(self, _cx: &mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> {
        Ok(Vec::new())
    }
}

/// Each element becomes one argument.
impl<T: IntoJsValue> IntoJsArgs for Vec<T> {
    fn into_js_args(self, cx: &mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> {
        self.into_iter().map(|value| value.into_js(cx)).collect()
    }
}

macro_rules! impl_into_js_args {
    ($($name:ident),+) => {
        impl<$($name: IntoJsValue),+> IntoJsArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_js_args(self, cx: &mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> {
                let ($($name,)+) = self;
                Ok(vec![$($name.into_js(cx)?),+])
            }
        }
    };
}

impl_into_js_args!(A);
impl_into_js_args!(A, B);
impl_into_js_args!(A, B, C);
impl_into_js_args!(A, B, C, D);
