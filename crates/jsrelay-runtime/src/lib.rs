//! jsrelay runtime
//!
//! Lets native threads invoke JavaScript callbacks that live in a Boa
//! `Context` owned by a single thread.
//!
//! - [`EventLoop`] owns the context on the owning thread and drains requests
//! - [`ThreadSafeCallback`] is the `Send + Sync` handle native threads call through
//! - [`MarshalContext`] is where argument values are created, on the owning thread
//!
//! # Example
//!
//! ```no_run
//! use jsrelay_runtime::{EventLoop, ThreadSafeCallback};
//!
//! let mut event_loop = EventLoop::new()?;
//! let callback = event_loop.eval("(function (err, value) { globalThis.result = value; })")?;
//! let handle = ThreadSafeCallback::new(event_loop.owner(), &callback)?;
//!
//! std::thread::spawn(move || {
//!     let sum: i32 = (1..=10).sum();
//!     handle.call_async_result(Ok::<_, String>(sum)).unwrap();
//! });
//!
//! event_loop.run()?;
//! # Ok::<(), jsrelay_runtime::RelayError>(())
//! ```

pub mod callback;
pub mod runtime;

pub use callback::{
    error_first_failure, error_first_success, CallReceipt, IntoJsArgs, IntoJsValue,
    MarshalContext, Null, ThreadSafeCallback, Undefined,
};
pub use jsrelay_common::{LoopConfig, RelayError, Result, UncaughtPolicy};
pub use runtime::{ChannelId, EventLoop, LoopStats, Owner, Pinned};
