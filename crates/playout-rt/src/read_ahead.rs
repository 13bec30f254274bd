//! Single-thread read-ahead scheduling.
//!
//! One thread pulls frames from the producer, renders their images, and
//! pushes them into a bounded queue ahead of the caller. A moving average of
//! per-frame render cost decides when to skip rendering to keep up; skipping
//! is bounded so latency never grows without limit.

use crate::config::ConsumerConfig;
use crate::events::EventSink;
use crate::queue::FrameQueue;
use playout_core::{
    sample_count, AudioRequest, ImageRequest, PlayoutError, Producer, Result, SharedFrame,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A render-cost sample this many times the current average is discarded as
/// an outlier, one-off stalls must not corrupt the estimate.
const COST_OUTLIER_FACTOR: u64 = 20;

/// Outlier rejection only kicks in once the average rests on this many
/// samples.
const COST_MIN_SAMPLES: u64 = 5;

/// How long to back off when the producer reports a transient stall.
const STALL_BACKOFF: Duration = Duration::from_millis(1);

struct Shared {
    queue: FrameQueue,
    running: AtomicBool,
    purging: AtomicBool,
    config: ConsumerConfig,
    events: Arc<dyn EventSink>,
}

/// The read-ahead scheduler, `real_time` 1 or -1.
pub struct ReadAhead {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl ReadAhead {
    pub fn new(config: ConsumerConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: FrameQueue::new(),
                running: AtomicBool::new(false),
                purging: AtomicBool::new(false),
                config,
                events,
            }),
            handle: None,
        }
    }

    /// Spawn the read-ahead thread over `producer`.
    pub fn start(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("playout-read-ahead".into())
            .spawn(move || read_ahead_loop(shared, producer))
            .map_err(|e| PlayoutError::Thread(e.to_string()))?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Pop the next frame in presentation order, blocking until one is
    /// available or the scheduler stops.
    pub fn frame(&self) -> Option<SharedFrame> {
        self.shared.queue.pop_wait(&self.shared.running)
    }

    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Drop all queued frames and make the thread discard its in-flight one.
    pub fn purge(&self) {
        self.shared.purging.store(true, Ordering::Release);
        let dropped = self.shared.queue.clear();
        debug!(dropped, "read-ahead purge");
    }

    /// Stop the thread and drain the queue.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.queue.wake_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.shared.queue.clear();
    }
}

impl Drop for ReadAhead {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_ahead_loop(shared: Arc<Shared>, mut producer: Box<dyn Producer>) {
    shared.events.thread_started();
    let config = &shared.config;
    let buffer = config.buffer.max(1);
    let drop_allowed = config.drops_allowed();
    let frame_duration = config.fps.frame_duration_us().max(0) as u64;
    let request = ImageRequest::new(config.image_format, config.width, config.height);

    // Moving-average render cost in microseconds.
    let mut time_process: u64 = 0;
    let mut count: u64 = 0;
    let mut skipped: u32 = 0;
    let mut last_position: Option<i64> = None;
    let mut start_position: i64 = 0;

    while shared.running.load(Ordering::Acquire) {
        let Some(frame) = producer.get_frame() else {
            std::thread::sleep(STALL_BACKOFF);
            continue;
        };
        let position = frame.position();
        let speed = frame.speed();

        // A seek, speed change, or start is a discontinuity; the cost model
        // no longer describes what comes next.
        if speed != 1.0 || last_position.map_or(true, |p| position != p + 1) {
            time_process = 0;
            count = 0;
            skipped = 0;
            start_position = position;
        }
        last_position = Some(position);

        let average = if count > 0 { time_process / count } else { 0 };
        let behind = frame_duration > 0 && average > frame_duration;
        let queue_low = shared.queue.len() <= buffer / 5 + 1;
        let skip = drop_allowed && behind && queue_low && speed == 1.0 && skipped < config.drop_max;

        if config.video_off {
            frame.set_rendered(true);
        } else if skip {
            skipped += 1;
            trace!(position, average, "skipping render to catch up");
        } else {
            skipped = 0;
            shared.events.frame_render(&frame);
            let started = Instant::now();
            frame.get_image(&request);
            frame.set_rendered(true);
            let sample = started.elapsed().as_micros() as u64;
            if count >= COST_MIN_SAMPLES && average > 0 && sample > COST_OUTLIER_FACTOR * average {
                trace!(position, sample, average, "discarding outlier cost sample");
            } else {
                time_process += sample;
                count += 1;
            }
        }

        // Audio is never dropped; the sample calculator keeps the per-frame
        // counts drift-free against the frame rate.
        if !config.audio_off {
            let samples = sample_count(config.fps.fps(), config.frequency, position);
            frame.get_audio(&AudioRequest::new(
                config.audio_format,
                config.frequency,
                config.channels,
                samples,
            ));
        }

        // The first fifth of the buffer after a start, seek, or speed change
        // is warm-up; samples taken there would poison the estimate.
        if position - start_position <= (buffer / 5 + 1) as i64 {
            time_process = 0;
            count = 0;
        }

        if shared.purging.swap(false, Ordering::AcqRel) {
            continue;
        }
        if !shared.queue.push_bounded(frame, buffer, &shared.running) {
            break;
        }
    }

    let dropped = shared.queue.clear();
    if dropped > 0 {
        debug!(dropped, "read-ahead drained on stop");
    }
    shared.events.thread_stopped();
}
