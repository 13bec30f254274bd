//! Integration tests for the consumer scheduling stack.
//!
//! Exercises the ordering, claim, and purge guarantees across
//! playout-core and playout-rt.

use playout_core::{Frame, Producer, SharedFrame};
use playout_rt::{Consumer, ConsumerConfig, FrameQueue, WorkerPool, NullSink};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Helpers ────────────────────────────────────────────────────

/// Producer that exposes its pull count and position to the test thread.
struct ObservedProducer {
    pulls: Arc<AtomicU64>,
    position: Arc<AtomicI64>,
    decode_cost: Duration,
}

impl ObservedProducer {
    fn new() -> (Self, Arc<AtomicU64>, Arc<AtomicI64>) {
        let pulls = Arc::new(AtomicU64::new(0));
        let position = Arc::new(AtomicI64::new(0));
        (
            Self {
                pulls: Arc::clone(&pulls),
                position: Arc::clone(&position),
                decode_cost: Duration::ZERO,
            },
            pulls,
            position,
        )
    }
}

impl Producer for ObservedProducer {
    fn get_frame(&mut self) -> Option<SharedFrame> {
        self.pulls.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::shared(self.position.fetch_add(1, Ordering::Relaxed));
        let cost = self.decode_cost;
        if !cost.is_zero() {
            frame.push_image_stage(Box::new(move |_, req| {
                std::thread::sleep(cost);
                Some(playout_core::ImageBuffer::new(req.format, 16, 16))
            }));
        }
        Some(frame)
    }
}

fn config(real_time: i32, buffer: usize) -> ConsumerConfig {
    ConsumerConfig {
        real_time,
        buffer,
        ..ConsumerConfig::default()
    }
}

// ── Presentation order ─────────────────────────────────────────

#[test]
fn worker_pool_preserves_presentation_order() {
    for threads in [2, 4] {
        let (mut producer, _, _) = ObservedProducer::new();
        producer.decode_cost = Duration::from_micros(300);
        let mut consumer = Consumer::new(config(threads, 16));
        consumer.connect(Box::new(producer));
        consumer.start().unwrap();

        let mut expected = 0;
        while expected < 200 {
            if let Some(frame) = consumer.rt_frame() {
                assert_eq!(frame.position(), expected, "threads={threads}");
                expected += 1;
            }
        }
        consumer.stop();
    }
}

#[test]
fn strict_worker_pool_orders_and_renders() {
    let (mut producer, _, _) = ObservedProducer::new();
    producer.decode_cost = Duration::from_micros(500);
    let mut consumer = Consumer::new(config(-3, 12));
    consumer.connect(Box::new(producer));
    consumer.start().unwrap();

    let mut expected = 0;
    while expected < 50 {
        if let Some(frame) = consumer.rt_frame() {
            assert_eq!(frame.position(), expected);
            assert!(frame.is_rendered());
            expected += 1;
        }
    }
    consumer.stop();
}

// ── Claim exclusivity ──────────────────────────────────────────

#[test]
fn each_frame_is_claimed_at_most_once() {
    let queue = Arc::new(FrameQueue::new());
    for i in 0..1000 {
        queue.push(Frame::shared(i));
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = Arc::clone(&queue);
        handles.push(std::thread::spawn(move || {
            let mut claimed = Vec::new();
            while let Some(frame) = queue.claim_next(0) {
                claimed.push(frame.position());
            }
            claimed
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for position in handle.join().unwrap() {
            assert!(seen.insert(position), "frame {position} claimed twice");
            total += 1;
        }
    }
    assert_eq!(total, 1000);
}

// ── Process head ───────────────────────────────────────────────

#[test]
fn process_head_never_leaves_its_bounds() {
    let (mut producer, _, _) = ObservedProducer::new();
    producer.decode_cost = Duration::from_millis(8);
    let mut pool = WorkerPool::new(config(3, 15), Arc::new(NullSink));
    pool.start(Box::new(producer)).unwrap();

    let threads = 3;
    for _ in 0..80 {
        if pool.frame().is_none() {
            continue;
        }
        let head = pool.process_head();
        assert!(head >= threads, "process head {head} below {threads}");
        assert!(head + threads <= 15, "process head {head} above bound");
    }
    pool.stop();
}

// ── Synchronous mode ───────────────────────────────────────────

#[test]
fn sync_consumer_pulls_exactly_once_per_call() {
    let (producer, pulls, _) = ObservedProducer::new();
    let mut consumer = Consumer::new(config(0, 25));
    consumer.connect(Box::new(producer));
    consumer.start().unwrap();

    for _ in 0..10 {
        let frame = consumer.rt_frame().unwrap();
        assert!(frame.is_rendered());
    }
    // No prefetching: ten calls, ten pulls.
    assert_eq!(pulls.load(Ordering::Relaxed), 10);
    consumer.stop();
}

// ── Purge ──────────────────────────────────────────────────────

#[test]
fn purge_discards_stale_queued_frames() {
    let (producer, _, position) = ObservedProducer::new();
    let mut consumer = Consumer::new(config(2, 8));
    consumer.connect(Box::new(producer));
    consumer.start().unwrap();

    for _ in 0..5 {
        consumer.rt_frame().unwrap();
    }
    let produced_at_purge = position.load(Ordering::Relaxed);
    consumer.purge();

    // The next frame comes from the producer's current position, not from
    // what had been sitting in the queue.
    let next = loop {
        if let Some(frame) = consumer.rt_frame() {
            break frame;
        }
    };
    assert!(
        next.position() >= produced_at_purge,
        "got stale frame {} after purge at {}",
        next.position(),
        produced_at_purge
    );
    consumer.stop();
}

// ── Lifecycle ──────────────────────────────────────────────────

#[test]
fn stop_is_prompt_and_final() {
    let (mut producer, _, _) = ObservedProducer::new();
    producer.decode_cost = Duration::from_millis(2);
    let mut consumer = Consumer::new(config(4, 20));
    consumer.connect(Box::new(producer));
    consumer.start().unwrap();
    consumer.rt_frame().unwrap();

    consumer.stop();
    assert!(consumer.is_stopped());
    assert!(consumer.rt_frame().is_none());
}

#[test]
fn position_follows_shown_frames() {
    let (producer, _, _) = ObservedProducer::new();
    let mut consumer = Consumer::new(config(1, 4));
    consumer.connect(Box::new(producer));
    consumer.start().unwrap();

    for _ in 0..5 {
        let frame = consumer.rt_frame().unwrap();
        consumer.frame_shown(&frame);
        assert_eq!(consumer.position(), frame.position());
    }
    consumer.stop();
}
