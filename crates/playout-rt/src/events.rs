//! Lifecycle event notifications.
//!
//! Fire-and-forget hooks for logging and UI layers. None of these are
//! required for scheduling correctness; the default implementations do
//! nothing.

use playout_core::Frame;

/// Receiver of consumer lifecycle events. Called from scheduler threads, so
/// implementations must be cheap and must not block.
pub trait EventSink: Send + Sync {
    /// A scheduler thread has started.
    fn thread_started(&self) {}
    /// A scheduler thread is exiting.
    fn thread_stopped(&self) {}
    /// A frame's image is about to be rendered.
    fn frame_render(&self, _frame: &Frame) {}
    /// A frame has been presented by the sink.
    fn frame_show(&self, _frame: &Frame) {}
    /// The consumer is beginning its stop sequence.
    fn stopping(&self) {}
    /// The consumer has fully stopped.
    fn stopped(&self) {}
}

/// The default sink: ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts every event, for assertions in scheduler tests.
    #[derive(Debug, Default)]
    pub struct CountingSink {
        pub threads_started: AtomicUsize,
        pub threads_stopped: AtomicUsize,
        pub frames_rendered: AtomicUsize,
        pub frames_shown: AtomicUsize,
    }

    impl EventSink for CountingSink {
        fn thread_started(&self) {
            self.threads_started.fetch_add(1, Ordering::Relaxed);
        }

        fn thread_stopped(&self) {
            self.threads_stopped.fetch_add(1, Ordering::Relaxed);
        }

        fn frame_render(&self, _frame: &Frame) {
            self.frames_rendered.fetch_add(1, Ordering::Relaxed);
        }

        fn frame_show(&self, _frame: &Frame) {
            self.frames_shown.fetch_add(1, Ordering::Relaxed);
        }
    }
}
