//! Playout RT - Real-time consumer scheduling
//!
//! Pulls frames from a producer and keeps a sink fed at frame rate:
//! - `Consumer`: the façade that dispatches on the `real_time` mode
//! - `ReadAhead`: single decode thread with adaptive frame dropping
//! - `WorkerPool`: N decode threads behind an adaptive process head
//! - `FrameQueue`: the shared ordered queue all modes feed from

pub mod config;
pub mod consumer;
pub mod events;
pub mod queue;
pub mod read_ahead;
pub mod worker;

pub use config::{ConsumerConfig, SchedulingMode};
pub use consumer::Consumer;
pub use events::{EventSink, NullSink};
pub use queue::{DoneSignal, FrameQueue};
pub use read_ahead::ReadAhead;
pub use worker::WorkerPool;
