pub mod conversions;
pub mod event_loop;
pub mod job_executor;
pub mod owner;


pub use event_loop::{EventLoop, LoopStats};
pub use job_executor::MicrotaskQueue;
pub use owner::{ChannelId, Owner, Pinned};
