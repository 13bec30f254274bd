//! Worker-pool scheduling, `real_time` magnitude above 1.
//!
//! N worker threads render frames from a shared queue while the caller's
//! thread feeds it and pops presentation-ordered frames off the front.
//! Workers scan for work starting at an adaptive `process_head`: as drops
//! accumulate the head moves deeper into the queue, giving workers more lead
//! time before playout; as the system keeps up it moves back toward the
//! front. The head moves one step per pop and never leaves
//! `[threads, buffer - threads]` once prefill completes.

use crate::config::ConsumerConfig;
use crate::events::EventSink;
use crate::queue::{DoneSignal, FrameQueue, WAIT_CEILING};
use playout_core::{ImageRequest, PlayoutError, Producer, Result, SharedFrame};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// How long an idle worker parks before re-scanning the queue.
const WORKER_PARK: Duration = Duration::from_millis(100);

struct PoolShared {
    queue: FrameQueue,
    done: DoneSignal,
    running: AtomicBool,
    purging: AtomicBool,
    /// Index workers start their claim scan from; 0 until prefill completes.
    process_head: AtomicUsize,
    config: ConsumerConfig,
    events: Arc<dyn EventSink>,
}

/// The worker-pool scheduler.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
    producer: Option<Box<dyn Producer>>,
    /// Current queue depth target; may auto-grow under sustained overload.
    buffer: usize,
    prefill: usize,
    prefilled: bool,
    consecutive_dropped: u32,
    consecutive_rendered: u32,
}

impl WorkerPool {
    pub fn new(config: ConsumerConfig, events: Arc<dyn EventSink>) -> Self {
        let threads = config.threads();
        // Enough independent frames for the workers to parallelize without
        // starving each other.
        let headroom = if config.drops_allowed() {
            2 + threads * threads
        } else {
            threads
        };
        let buffer = config.buffer.max(headroom);
        let prefill = match config.prefill {
            Some(p) if p > 0 && p < buffer => p,
            _ => buffer,
        };
        Self {
            shared: Arc::new(PoolShared {
                queue: FrameQueue::new(),
                done: DoneSignal::new(),
                running: AtomicBool::new(false),
                purging: AtomicBool::new(false),
                process_head: AtomicUsize::new(0),
                config,
                events,
            }),
            workers: Vec::new(),
            producer: None,
            buffer,
            prefill,
            prefilled: false,
            consecutive_dropped: 0,
            consecutive_rendered: 0,
        }
    }

    /// Spawn the worker threads over `producer`.
    pub fn start(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        if !self.workers.is_empty() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::Release);
        self.producer = Some(producer);
        for i in 0..self.shared.config.threads() {
            let shared = Arc::clone(&self.shared);
            let handle = std::thread::Builder::new()
                .name(format!("playout-worker-{i}"))
                .spawn(move || worker_loop(shared))
                .map_err(|e| PlayoutError::Thread(e.to_string()))?;
            self.workers.push(handle);
        }
        Ok(())
    }

    /// The next frame in presentation order.
    ///
    /// Tops the queue up from the producer, waits out prefill on first use,
    /// then pops the front frame and adapts the process head to whether it
    /// was rendered in time. Returns `None` on a transient producer stall or
    /// when stopped; callers retry.
    pub fn frame(&mut self) -> Option<SharedFrame> {
        let shared = Arc::clone(&self.shared);
        let threads = shared.config.threads();

        // Feed the work queue.
        while shared.running.load(Ordering::Acquire) && shared.queue.len() < self.buffer {
            let frame = self.producer.as_mut()?.get_frame()?;
            if shared.purging.swap(false, Ordering::AcqRel) {
                continue;
            }
            shared.queue.push(frame);
        }
        if !shared.running.load(Ordering::Acquire) {
            return None;
        }

        // Hold the first frame back until the workers have dug through the
        // prefill depth, so initial playback does not immediately stall.
        if !self.prefilled {
            while shared.running.load(Ordering::Acquire)
                && shared.queue.first_unclaimed() < self.prefill.min(shared.queue.len())
            {
                shared.done.wait(WAIT_CEILING);
            }
            shared.process_head.store(threads, Ordering::Release);
            self.prefilled = true;
        }

        // Strict mode never presents an unrendered frame.
        while shared.running.load(Ordering::Acquire)
            && !shared.config.drops_allowed()
            && !shared.queue.head_rendered()
            && !shared.queue.is_empty()
        {
            shared.done.wait(WAIT_CEILING);
        }

        let frame = shared.queue.pop()?;
        if shared.config.drops_allowed() {
            self.adapt(&frame);
        }
        Some(frame)
    }

    /// One step of the process-head controller plus the overload escape
    /// valve, applied to the frame just popped.
    fn adapt(&mut self, frame: &SharedFrame) {
        let shared = &self.shared;
        let threads = shared.config.threads();
        let head = shared.process_head.load(Ordering::Acquire);

        if frame.is_rendered() {
            self.consecutive_dropped = 0;
            if head > threads && self.consecutive_rendered >= head as u32 {
                shared.process_head.store(head - 1, Ordering::Release);
            } else {
                self.consecutive_rendered += 1;
            }
        } else {
            self.consecutive_rendered = 0;
            if head < self.buffer - threads && self.consecutive_dropped > threads as u32 {
                shared.process_head.store(head + 1, Ordering::Release);
            } else {
                self.consecutive_dropped += 1;
            }
        }

        if self.consecutive_dropped > shared.config.drop_max {
            let low_latency =
                shared.config.buffer == 1 || shared.config.prefill == Some(1);
            if low_latency && self.buffer < (threads + 1) * 10 {
                self.buffer += threads;
                // Half a second of grace before the valve can trip again.
                self.consecutive_dropped = (shared.config.fps.fps() / 2.0) as u32;
                warn!(buffer = self.buffer, "too many frames dropped, growing buffer");
            } else {
                frame.set_rendered(true);
                self.consecutive_dropped = 0;
                warn!(position = frame.position(), "too many frames dropped, forcing frame");
            }
        }
    }

    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// The current process head, for observability.
    pub fn process_head(&self) -> usize {
        self.shared.process_head.load(Ordering::Acquire)
    }

    /// Drop all queued frames and wake the workers so they abandon their
    /// scans; the feeder's next in-flight frame is discarded too.
    pub fn purge(&self) {
        self.shared.purging.store(true, Ordering::Release);
        let dropped = self.shared.queue.clear();
        self.shared.done.notify();
        debug!(dropped, "worker pool purge");
    }

    /// Stop and join all workers, then drain the queue.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.queue.wake_all();
        self.shared.done.notify();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        self.shared.queue.clear();
        self.producer = None;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: Arc<PoolShared>) {
    shared.events.thread_started();
    let config = &shared.config;
    let strict = !config.drops_allowed();
    let request = ImageRequest::new(config.image_format, config.width, config.height);

    while shared.running.load(Ordering::Acquire) {
        let from = if strict {
            0
        } else {
            shared.process_head.load(Ordering::Acquire)
        };
        if let Some(frame) = shared.queue.claim_next_or_wait(from, WORKER_PARK) {
            if !frame.is_rendered() {
                shared.events.frame_render(&frame);
                frame.get_image(&request);
                frame.set_rendered(true);
            }
            shared.done.notify();
        }
    }
    shared.events.thread_stopped();
}
