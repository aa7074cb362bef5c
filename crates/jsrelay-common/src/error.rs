use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The value handed to a channel constructor is not callable.
    #[error("Callback must be a function")]
    CallbackNotFunction,

    /// The receiver handed to a channel constructor is neither an object nor a function.
    #[error("Callback receiver must be an object or function")]
    InvalidReceiver,

    /// The owning event loop has been dropped; nothing will drain the request.
    #[error("Event loop is closed")]
    LoopClosed,

    /// The request was dropped before the owning thread finished it.
    #[error("Call was abandoned before completion")]
    CallAbandoned,

    #[error("Argument marshaling failed: {0}")]
    Marshal(String),

    #[error("Uncaught exception in callback: {0}")]
    UncaughtException(String),

    #[error("JavaScript execution error: {0}")]
    JavaScriptExecution(String),

    #[error("Pinned value {0} is not registered")]
    UnknownPin(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Returns true for the synchronous errors raised while constructing a channel.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, RelayError::CallbackNotFunction | RelayError::InvalidReceiver)
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
