//! The consumer façade.
//!
//! Owns mode dispatch on `real_time`, the start/stop/purge lifecycle, and
//! the put/get rendezvous used when an application pushes frames instead of
//! connecting a producer.

use crate::config::{ConsumerConfig, SchedulingMode};
use crate::events::{EventSink, NullSink};
use crate::read_ahead::ReadAhead;
use crate::worker::WorkerPool;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use playout_core::{Frame, PlayoutError, Producer, Result, SharedFrame};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Safety-net ceiling on put/get handoff waits.
const HANDOFF_WAIT: Duration = Duration::from_secs(1);

enum Mode {
    Stopped,
    Sync(Box<dyn Producer>),
    ReadAhead(ReadAhead),
    Workers(WorkerPool),
}

/// A real-time frame consumer.
///
/// Configure once, `connect` a producer (or push frames with `put_frame`),
/// `start`, then call `rt_frame` per output frame. `real_time` selects how
/// decoding is scheduled; see [`ConsumerConfig`].
pub struct Consumer {
    config: ConsumerConfig,
    events: Arc<dyn EventSink>,
    mode: Mode,
    producer: Option<Box<dyn Producer>>,
    put_tx: Sender<SharedFrame>,
    put_rx: Receiver<SharedFrame>,
    running: Arc<AtomicBool>,
    position: AtomicI64,
}

impl Consumer {
    pub fn new(config: ConsumerConfig) -> Self {
        Self::with_events(config, Arc::new(NullSink))
    }

    pub fn with_events(config: ConsumerConfig, events: Arc<dyn EventSink>) -> Self {
        // Capacity-1 rendezvous for push-mode applications.
        let (put_tx, put_rx) = bounded(1);
        Self {
            config,
            events,
            mode: Mode::Stopped,
            producer: None,
            put_tx,
            put_rx,
            running: Arc::new(AtomicBool::new(false)),
            position: AtomicI64::new(0),
        }
    }

    /// Connect the producer to pull frames from. Without one, the consumer
    /// feeds from frames pushed via [`put_frame`](Self::put_frame).
    pub fn connect(&mut self, producer: Box<dyn Producer>) {
        self.producer = Some(producer);
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Start the scheduler selected by `real_time`.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        self.config.validate()?;
        if let Some(priority) = self.config.priority {
            debug!(priority, "requested thread priority is advisory only");
        }

        let producer = match self.producer.take() {
            Some(producer) => producer,
            None => Box::new(PutProducer {
                rx: self.put_rx.clone(),
                running: Arc::clone(&self.running),
            }),
        };
        self.running.store(true, Ordering::Release);
        self.mode = match self.config.mode() {
            SchedulingMode::Sync => Mode::Sync(producer),
            SchedulingMode::ReadAhead => {
                let mut scheduler = ReadAhead::new(self.config.clone(), Arc::clone(&self.events));
                scheduler.start(producer)?;
                Mode::ReadAhead(scheduler)
            }
            SchedulingMode::WorkerPool => {
                let mut pool = WorkerPool::new(self.config.clone(), Arc::clone(&self.events));
                pool.start(producer)?;
                Mode::Workers(pool)
            }
        };
        info!(
            real_time = self.config.real_time,
            buffer = self.config.buffer,
            "consumer started"
        );
        Ok(())
    }

    /// Stop the scheduler and drain everything in flight. The producer is
    /// consumed by the scheduler; reconnect before restarting.
    pub fn stop(&mut self) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        self.events.stopping();
        self.running.store(false, Ordering::Release);
        while self.put_rx.try_recv().is_ok() {}
        match std::mem::replace(&mut self.mode, Mode::Stopped) {
            Mode::ReadAhead(mut scheduler) => scheduler.stop(),
            Mode::Workers(mut pool) => pool.stop(),
            Mode::Sync(_) | Mode::Stopped => {}
        }
        self.events.stopped();
        info!("consumer stopped");
    }

    pub fn is_stopped(&self) -> bool {
        !self.running.load(Ordering::Acquire)
    }

    /// The next frame in presentation order, scheduled per the mode.
    /// `None` means a transient stall or a stopped consumer; callers retry
    /// or check [`is_stopped`](Self::is_stopped).
    pub fn rt_frame(&mut self) -> Option<SharedFrame> {
        match &mut self.mode {
            Mode::Stopped => None,
            Mode::Sync(producer) => {
                let frame = producer.get_frame()?;
                frame.set_rendered(true);
                Some(frame)
            }
            Mode::ReadAhead(scheduler) => scheduler.frame(),
            Mode::Workers(pool) => pool.frame(),
        }
    }

    /// Discard all frames in flight without changing run state. Used for
    /// seeks: the next `rt_frame` reflects the producer's new position
    /// rather than stale queued output.
    pub fn purge(&mut self) {
        while self.put_rx.try_recv().is_ok() {}
        match &mut self.mode {
            Mode::ReadAhead(scheduler) => scheduler.purge(),
            Mode::Workers(pool) => pool.purge(),
            Mode::Sync(_) | Mode::Stopped => {}
        }
        debug!("consumer purged");
    }

    /// Pull one frame directly, bypassing any scheduling. Synchronous mode
    /// uses this under the hood; in threaded modes the scheduler owns the
    /// producer, so this only serves frames pushed via
    /// [`put_frame`](Self::put_frame). Frames without real content synthesize
    /// test media downstream in `get_image`/`get_audio`.
    pub fn get_frame(&mut self) -> Option<SharedFrame> {
        if let Mode::Sync(producer) = &mut self.mode {
            return producer.get_frame();
        }
        if let Some(producer) = self.producer.as_mut() {
            return producer.get_frame();
        }
        self.put_rx.recv_timeout(HANDOFF_WAIT).ok()
    }

    /// Push a frame into an unconnected consumer. Blocks while the one-slot
    /// handoff is occupied, re-checking for stop every second.
    pub fn put_frame(&self, frame: SharedFrame) -> Result<()> {
        let mut frame = frame;
        loop {
            if !self.running.load(Ordering::Acquire) {
                return Err(PlayoutError::NotRunning);
            }
            match self.put_tx.send_timeout(frame, HANDOFF_WAIT) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => frame = returned,
                Err(SendTimeoutError::Disconnected(_)) => return Err(PlayoutError::NotRunning),
            }
        }
    }

    /// Record that the sink presented `frame`; updates the consumer position
    /// and notifies the event sink.
    pub fn frame_shown(&self, frame: &Frame) {
        self.position.store(frame.position(), Ordering::Release);
        self.events.frame_show(frame);
    }

    /// Position of the most recently shown frame.
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Adapter that feeds the schedulers from the put/get handoff.
struct PutProducer {
    rx: Receiver<SharedFrame>,
    running: Arc<AtomicBool>,
}

impl Producer for PutProducer {
    fn get_frame(&mut self) -> Option<SharedFrame> {
        if !self.running.load(Ordering::Acquire) {
            return None;
        }
        self.rx.recv_timeout(HANDOFF_WAIT).ok()
    }
}
