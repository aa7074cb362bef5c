//! The thread-safe invocation channel.
//!
//! A [`ThreadSafeCallback`] is created on the owning thread from a JavaScript
//! function (and optionally a receiver). The handle itself is `Send + Sync +
//! Clone` and can be moved to any number of native threads, which use it to
//! request invocations. Requests are queued to the owning thread and drained
//! by the [`EventLoop`](crate::EventLoop) in FIFO order.
//!
//! # Reference counting
//!
//! Every live handle holds one reference and every queued call holds one
//! more. Only the decrement that takes the count from one to zero schedules
//! the release, and it does so through the same queue as the calls, so the
//! owning thread never tears a channel down while a call is pending. Because
//! enqueueing requires a live handle, a released channel can never receive a
//! call.

use boa_engine::{JsObject, JsResult, JsValue};
use jsrelay_common::{RelayError, Result};
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::callback::marshal::{
    error_first_failure, error_first_success, IntoJsArgs, IntoJsValue, MarshalContext,
};
use crate::callback::request::{CallReceipt, CallRequest, Envelope, MarshalFn};
use crate::runtime::owner::StoredCallback;
use crate::runtime::{ChannelId, Owner};

/// Half of a channel that native threads may touch.
pub(crate) struct ChannelShared {
    id: ChannelId,
    outstanding: AtomicUsize,
    queue: UnboundedSender<Envelope>,
}

impl ChannelShared {
    pub(crate) fn id(&self) -> ChannelId {
        self.id
    }

    fn acquire_ref(&self) {
        self.outstanding.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops one reference; the last one schedules the release on the owning thread.
    pub(crate) fn release_ref(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            // A closed queue means the loop already dropped the table.
            let _ = self.queue.send(Envelope::Release(self.id));
        }
    }
}

/// Thread-safe handle to a JavaScript callback.
pub struct ThreadSafeCallback {
    shared: Arc<ChannelShared>,
}

fn callable(value: &JsValue) -> Option<JsObject> {
    value.as_callable().map(|function| function.clone())
}

impl ThreadSafeCallback {
    /// Creates a channel for `callback`, invoked with an `undefined` receiver.
    ///
    /// Fails with [`RelayError::CallbackNotFunction`] if `callback` is not
    /// callable. Nothing is registered on failure.
    pub fn new(owner: &Owner, callback: &JsValue) -> Result<Self> {
        let callback = callable(callback).ok_or(RelayError::CallbackNotFunction)?;
        Ok(Self::register(owner, callback, JsValue::undefined()))
    }

    /// Creates a channel whose callback runs with `receiver` as `this`.
    ///
    /// The receiver is checked first: it must be an object or a function,
    /// otherwise [`RelayError::InvalidReceiver`] is returned even when the
    /// callback is invalid too.
    pub fn with_receiver(owner: &Owner, receiver: &JsValue, callback: &JsValue) -> Result<Self> {
        if !receiver.is_object() {
            return Err(RelayError::InvalidReceiver);
        }
        let callback = callable(callback).ok_or(RelayError::CallbackNotFunction)?;
        Ok(Self::register(owner, callback, receiver.clone()))
    }

    fn register(owner: &Owner, callback: JsObject, receiver: JsValue) -> Self {
        let id = owner.register_channel(StoredCallback { callback, receiver });
        tracing::debug!(channel = %id, "Thread-safe callback created");

        Self {
            shared: Arc::new(ChannelShared {
                id,
                outstanding: AtomicUsize::new(1),
                queue: owner.queue().clone(),
            }),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    /// Handles plus queued calls currently holding the channel open.
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    fn submit(&self, request: CallRequest) -> Result<()> {
        self.shared.acquire_ref();
        let envelope = Envelope::Call {
            channel: Arc::clone(&self.shared),
            request,
        };

        if self.shared.queue.send(envelope).is_err() {
            self.shared.release_ref();
            return Err(RelayError::LoopClosed);
        }
        Ok(())
    }

    /// Requests `callback.apply(receiver, marshal(cx))` on the owning thread.
    ///
    /// Returns as soon as the request is queued. An error returned by
    /// `marshal` is treated as a defect in the caller and surfaces as an
    /// uncaught condition on the owning thread; the callback is not called.
    pub fn call<F>(&self, marshal: F) -> Result<()>
    where
        F: FnOnce(&mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> + Send + 'static,
    {
        let marshal: MarshalFn = Box::new(marshal);
        self.submit(CallRequest::new(marshal))
    }

    /// Requests a call with no arguments.
    pub fn call_empty(&self) -> Result<()> {
        self.call(|_| Ok(Vec::new()))
    }

    /// Requests a call with arguments built from native values.
    pub fn call_args<A: IntoJsArgs>(&self, args: A) -> Result<()> {
        self.call(move |cx| args.into_js_args(cx))
    }

    /// Requests a call whose single argument is an `Error` with `message`.
    pub fn call_error(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.call(move |cx| Ok(vec![cx.error(message)]))
    }

    /// Reports the outcome of native work with the error-first convention.
    ///
    /// `Ok(value)` calls back with `(undefined, value)`, `Err(e)` with a
    /// single `Error` whose message is `e.to_string()`.
    pub fn call_async_result<T, E>(&self, result: std::result::Result<T, E>) -> Result<()>
    where
        T: IntoJsValue,
        E: Display,
    {
        match result {
            Ok(value) => self.call(move |cx| Ok(error_first_success(value.into_js(cx)?))),
            Err(err) => {
                let message = err.to_string();
                self.call(move |cx| Ok(error_first_failure(cx, message)))
            }
        }
    }

    /// Like [`call`](Self::call), but returns a receipt that resolves once
    /// the callback has run.
    pub fn call_with_receipt<F>(&self, marshal: F) -> Result<CallReceipt>
    where
        F: FnOnce(&mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> + Send + 'static,
    {
        let marshal: MarshalFn = Box::new(marshal);
        let (request, receipt) = CallRequest::with_completion(marshal);
        self.submit(request)?;
        Ok(receipt)
    }
}

impl Clone for ThreadSafeCallback {
    fn clone(&self) -> Self {
        self.shared.acquire_ref();
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for ThreadSafeCallback {
    fn drop(&mut self) {
        self.shared.release_ref();
    }
}

impl fmt::Debug for ThreadSafeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSafeCallback")
            .field("id", &self.shared.id)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
