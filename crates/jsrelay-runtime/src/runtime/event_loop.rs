//! Owning-thread event loop.
//!
//! The [`EventLoop`] owns the Boa `Context` and the receiving end of the
//! cross-thread queue. Whatever thread creates it becomes the owning thread:
//! the loop is `!Send`, so the type system keeps it there.
//!
//! # Drain step
//!
//! For every queued call, in FIFO order:
//!
//! 1. Marshal the arguments inside a [`MarshalContext`]
//! 2. Invoke the callback with its receiver as `this`
//! 3. Run the microtask checkpoint
//! 4. Drop the call's reference on the channel
//!
//! Marshal failures and callback exceptions are uncaught conditions and are
//! handled according to [`UncaughtPolicy`].

use boa_engine::{job::JobExecutor, Context, JsValue, Source};
use jsrelay_common::{LoopConfig, RelayError, Result, UncaughtPolicy};
use std::path::Path;
use std::rc::Rc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::callback::marshal::MarshalContext;
use crate::callback::request::{CallRequest, Envelope};
use crate::runtime::conversions::js_value_to_json;
use crate::runtime::job_executor::MicrotaskQueue;
use crate::runtime::{ChannelId, Owner};

/// Counters describing the owning thread's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    /// Channels created and not yet released
    pub live_channels: usize,
    /// Channels released so far
    pub released_channels: u64,
    /// Callback invocations performed
    pub invoked_calls: u64,
    /// Values currently pinned for native threads
    pub pinned_values: usize,
}

/// Event loop driving thread-safe callbacks on the owning thread.
pub struct EventLoop {
    context: Context,
    owner: Owner,
    receiver: UnboundedReceiver<Envelope>,
    jobs: Rc<MicrotaskQueue>,
    config: LoopConfig,
}

impl EventLoop {
    /// Creates a loop with the default configuration on the current thread.
    pub fn new() -> Result<Self> {
        Self::with_config(LoopConfig::default())
    }

    pub fn with_config(config: LoopConfig) -> Result<Self> {
        let jobs = Rc::new(MicrotaskQueue::new());
        let context = Context::builder()
            .job_executor(jobs.clone())
            .build()
            .map_err(|e| RelayError::JavaScriptExecution(format!("Failed to build context: {e}")))?;

        let (sender, receiver) = mpsc::unbounded_channel();

        Ok(Self {
            context,
            owner: Owner::new(sender),
            receiver,
            jobs,
            config,
        })
    }

    /// Owning-thread handle used to construct channels and pin values.
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn context(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn stats(&self) -> LoopStats {
        LoopStats {
            live_channels: self.owner.live_channels(),
            released_channels: self.owner.released_channels(),
            invoked_calls: self.owner.invoked_calls(),
            pinned_values: self.owner.pinned_values(),
        }
    }

    /// Evaluates a script on the owning thread, then runs a microtask checkpoint.
    pub fn eval(&mut self, source: &str) -> Result<JsValue> {
        let value = self
            .context
            .eval(Source::from_bytes(source))
            .map_err(|e| RelayError::JavaScriptExecution(format!("Script evaluation error: {e}")))?;
        self.run_microtasks();
        Ok(value)
    }

    /// Loads and evaluates a script file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<JsValue> {
        let source = std::fs::read_to_string(path)?;
        self.eval(&source)
    }

    /// Drains calls until no channel is live, blocking the thread while idle.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`run_async`](Self::run_async) there.
    pub fn run(&mut self) -> Result<()> {
        while self.owner.live_channels() > 0 {
            let Some(envelope) = self.receiver.blocking_recv() else {
                break;
            };
            self.dispatch(envelope)?;
        }
        self.run_until_idle().map(|_| ())
    }

    /// Async version of [`run`](Self::run), yielding between calls.
    pub async fn run_async(&mut self) -> Result<()> {
        while self.owner.live_channels() > 0 {
            let Some(envelope) = self.receiver.recv().await else {
                break;
            };
            self.dispatch(envelope)?;
            tokio::task::yield_now().await;
        }
        self.run_until_idle().map(|_| ())
    }

    /// Handles whatever is already queued without waiting for more.
    ///
    /// Returns the number of envelopes handled, capped by
    /// `LoopConfig::idle_poll`.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let limit = self.config.idle_poll.unwrap_or(usize::MAX);
        let mut handled = 0;

        while handled < limit {
            let Ok(envelope) = self.receiver.try_recv() else {
                break;
            };
            self.dispatch(envelope)?;
            handled += 1;
        }
        Ok(handled)
    }

    fn dispatch(&mut self, envelope: Envelope) -> Result<()> {
        match envelope {
            Envelope::Call { channel, request } => {
                let outcome = self.invoke(channel.id(), request);
                channel.release_ref();
                outcome
            }
            Envelope::Release(id) => {
                self.owner.release_channel(id);
                Ok(())
            }
            Envelope::Unpin(id) => {
                self.owner.unpin(id);
                Ok(())
            }
        }
    }

    fn invoke(&mut self, id: ChannelId, request: CallRequest) -> Result<()> {
        let CallRequest { marshal, completion } = request;

        let Some((callback, receiver)) = self.owner.channel(id) else {
            tracing::error!(channel = %id, "Call for unknown channel dropped");
            return Ok(());
        };

        let args = {
            let mut cx = MarshalContext::new(&mut self.context, &self.owner);
            marshal(&mut cx)
        };

        let outcome = match args {
            Err(err) => Err(Failure::Marshal(err.to_string())),
            Ok(args) => {
                tracing::debug!(channel = %id, argc = args.len(), "Invoking callback");
                let result = callback.call(&receiver, &args, &mut self.context);
                self.owner.record_invocation();
                result.map_err(|err| Failure::Thrown(err.to_string()))
            }
        };

        self.run_microtasks();

        if let Some(completion) = completion {
            let reply = match &outcome {
                Ok(value) => js_value_to_json(value.clone(), &mut self.context),
                Err(failure) => Err(failure.to_error()),
            };
            if let Err(err) = &reply {
                tracing::debug!(channel = %id, "Receipt completed with error: {err}");
            }
            // The native thread may have stopped waiting.
            let _ = completion.send(reply);
        }

        match outcome {
            Ok(_) => Ok(()),
            Err(failure) => self.report_uncaught(failure.to_error()),
        }
    }

    fn run_microtasks(&mut self) {
        if !self.config.run_microtasks {
            return;
        }
        if let Err(err) = self.jobs.clone().run_jobs(&mut self.context) {
            tracing::error!("Microtask checkpoint failed: {err}");
        }
    }

    fn report_uncaught(&self, err: RelayError) -> Result<()> {
        match self.config.uncaught {
            UncaughtPolicy::Fatal => Err(err),
            UncaughtPolicy::Log => {
                tracing::error!("{err}");
                Ok(())
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let leaked = self.owner.clear();
        if leaked > 0 {
            tracing::warn!("{leaked} thread-safe callbacks not released before the event loop closed");
        }
    }
}

/// Why a drained call did not produce a return value.
enum Failure {
    Marshal(String),
    Thrown(String),
}

impl Failure {
    fn to_error(&self) -> RelayError {
        match self {
            Failure::Marshal(message) => RelayError::Marshal(message.clone()),
            Failure::Thrown(message) => RelayError::UncaughtException(message.clone()),
        }
    }
}
