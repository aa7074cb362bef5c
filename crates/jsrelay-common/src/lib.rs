//! jsrelay common types
//!
//! Error taxonomy and loop configuration shared by the jsrelay crates.
//!
//! - [`error`] - `RelayError` and the crate-wide `Result` alias
//! - [`config`] - `LoopConfig` and `UncaughtPolicy`

pub mod config;
pub mod error;

pub use config::{LoopConfig, UncaughtPolicy};
pub use error::{RelayError, Result};
