//! Configuration for the owning-thread event loop.
//!
//! The loop has very few knobs. Everything defaults to the behaviour of an
//! embedding JavaScript host: uncaught callback exceptions are fatal and the
//! microtask queue is drained after every callback.

/// What the event loop does when a callback throws or a marshaling
/// function fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncaughtPolicy {
    /// Stop draining and return the error from `run`.
    #[default]
    Fatal,
    /// Log the error and keep draining.
    Log,
}

/// Configuration for an `EventLoop`.
///
/// # Example
///
/// ```
/// use jsrelay_common::{LoopConfig, UncaughtPolicy};
///
/// let config = LoopConfig::new()
///     .with_uncaught(UncaughtPolicy::Log)
///     .with_idle_poll(64);
/// assert_eq!(config.idle_poll, Some(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Handling of callback exceptions and marshal failures
    pub uncaught: UncaughtPolicy,
    /// Run pending promise jobs after every callback invocation
    pub run_microtasks: bool,
    /// Upper bound on envelopes handled by a single `run_until_idle`
    pub idle_poll: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            uncaught: UncaughtPolicy::Fatal,
            run_microtasks: true,
            idle_poll: None,
        }
    }
}

impl LoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy for uncaught callback exceptions.
    pub fn with_uncaught(mut self, policy: UncaughtPolicy) -> Self {
        self.uncaught = policy;
        self
    }

    /// Enables or disables the microtask checkpoint after each callback.
    pub fn with_microtasks(mut self, enabled: bool) -> Self {
        self.run_microtasks = enabled;
        self
    }

    /// Caps how many queued envelopes one `run_until_idle` call handles.
    pub fn with_idle_poll(mut self, max: usize) -> Self {
        self.idle_poll = Some(max);
        self
    }
}
