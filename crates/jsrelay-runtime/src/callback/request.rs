//! Call requests and the envelopes that carry them to the owning thread.

use boa_engine::{JsResult, JsValue};
use jsrelay_common::{RelayError, Result};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::callback::marshal::MarshalContext;
use crate::callback::threadsafe::ChannelShared;
use crate::runtime::ChannelId;

/// Builds the argument list on the owning thread, right before the call.
pub(crate) type MarshalFn =
    Box<dyn FnOnce(&mut MarshalContext<'_>) -> JsResult<Vec<JsValue>> + Send>;

pub(crate) type Completion = oneshot::Sender<Result<JsonValue>>;

/// One requested invocation. Consumed exactly once by the drain step.
pub(crate) struct CallRequest {
    pub(crate) marshal: MarshalFn,
    pub(crate) completion: Option<Completion>,
}

impl CallRequest {
    pub(crate) fn new(marshal: MarshalFn) -> Self {
        Self {
            marshal,
            completion: None,
        }
    }

    pub(crate) fn with_completion(marshal: MarshalFn) -> (Self, CallReceipt) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            marshal,
            completion: Some(tx),
        };
        (request, CallReceipt { rx })
    }
}

/// Everything that crosses into the owning thread's queue.
pub(crate) enum Envelope {
    /// Invoke the channel's callback. The channel's reference count was
    /// incremented for this request before it was queued.
    Call {
        channel: Arc<ChannelShared>,
        request: CallRequest,
    },
    /// The channel's count reached zero; drop its table entry.
    Release(ChannelId),
    /// A `Pinned` token was dropped.
    Unpin(u64),
}

/// Completion handle for a request made with
/// [`ThreadSafeCallback::call_with_receipt`](crate::ThreadSafeCallback::call_with_receipt).
///
/// Resolves to the callback's return value converted to JSON, or to the
/// failure that prevented the call.
#[derive(Debug)]
pub struct CallReceipt {
    rx: oneshot::Receiver<Result<JsonValue>>,
}

impl CallReceipt {
    /// Blocks the current native thread until the call has run.
    ///
    /// Must not be called on the owning thread or inside an async context:
    /// the owning thread is the one that has to drain the request.
    pub fn wait(self) -> Result<JsonValue> {
        self.rx
            .blocking_recv()
            .unwrap_or_else(|_| Err(RelayError::CallAbandoned))
    }

    /// Waits for the call asynchronously.
    pub async fn recv(self) -> Result<JsonValue> {
        self.rx.await.unwrap_or_else(|_| Err(RelayError::CallAbandoned))
    }
}
