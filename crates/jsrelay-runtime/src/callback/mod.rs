//! Thread-safe callback channel, call requests and the marshaling contract.

pub mod marshal;
pub(crate) mod request;
pub mod threadsafe;

pub use marshal::{
    error_first_failure, error_first_success, IntoJsArgs, IntoJsValue, MarshalContext, Null,
    Undefined,
};
pub use request::CallReceipt;
pub use threadsafe::ThreadSafeCallback;
