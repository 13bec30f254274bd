//! The shared frame queue and worker-done signal.
//!
//! One mutex/condvar pair guards the queue; the condvar is notified on every
//! push, pop, and drain so blocked waiters re-evaluate promptly. All waits
//! use a one second ceiling as a safety net against a missed wakeup, with a
//! running flag re-checked after every wake.

use parking_lot::{Condvar, Mutex};
use playout_core::SharedFrame;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on any single blocking wait.
pub(crate) const WAIT_CEILING: Duration = Duration::from_secs(1);

/// An ordered queue of frames awaiting presentation.
///
/// Presentation order is always the push order. Workers may render frames
/// out of order, but only `pop` removes them, from the front.
#[derive(Default)]
pub struct FrameQueue {
    frames: Mutex<VecDeque<SharedFrame>>,
    cond: Condvar,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Append a frame and wake all waiters.
    pub fn push(&self, frame: SharedFrame) {
        self.frames.lock().push_back(frame);
        self.cond.notify_all();
    }

    /// Append a frame, blocking while the queue holds `cap` or more frames.
    /// Returns false if `running` went false before space opened up.
    pub fn push_bounded(&self, frame: SharedFrame, cap: usize, running: &AtomicBool) -> bool {
        let mut frames = self.frames.lock();
        while frames.len() >= cap && running.load(Ordering::Acquire) {
            self.cond.wait_for(&mut frames, WAIT_CEILING);
        }
        if !running.load(Ordering::Acquire) {
            return false;
        }
        frames.push_back(frame);
        self.cond.notify_all();
        true
    }

    /// Remove and return the front frame, if any.
    pub fn pop(&self) -> Option<SharedFrame> {
        let frame = self.frames.lock().pop_front();
        if frame.is_some() {
            self.cond.notify_all();
        }
        frame
    }

    /// Remove the front frame, blocking while the queue is empty. Returns
    /// `None` if `running` went false first.
    pub fn pop_wait(&self, running: &AtomicBool) -> Option<SharedFrame> {
        let mut frames = self.frames.lock();
        while frames.is_empty() && running.load(Ordering::Acquire) {
            self.cond.wait_for(&mut frames, WAIT_CEILING);
        }
        let frame = frames.pop_front();
        if frame.is_some() {
            self.cond.notify_all();
        }
        frame
    }

    /// Whether the front frame exists and has been rendered.
    pub fn head_rendered(&self) -> bool {
        self.frames
            .lock()
            .front()
            .is_some_and(|frame| frame.is_rendered())
    }

    /// Claim the first unclaimed frame at or after index `from`. The claim
    /// uses the frame's own atomic flag, so at most one caller wins each
    /// frame. Returns `None` when every eligible frame is already claimed.
    pub fn claim_next(&self, from: usize) -> Option<SharedFrame> {
        let frames = self.frames.lock();
        frames.iter().skip(from).find(|f| f.try_claim()).cloned()
    }

    /// Like [`claim_next`](Self::claim_next), but parks on the queue condvar
    /// for up to `timeout` when nothing is claimable.
    pub fn claim_next_or_wait(&self, from: usize, timeout: Duration) -> Option<SharedFrame> {
        let mut frames = self.frames.lock();
        if let Some(frame) = frames.iter().skip(from).find(|f| f.try_claim()).cloned() {
            return Some(frame);
        }
        self.cond.wait_for(&mut frames, timeout);
        None
    }

    /// Index of the first frame no worker has claimed, or the queue length
    /// when all frames are claimed.
    pub fn first_unclaimed(&self) -> usize {
        let frames = self.frames.lock();
        frames
            .iter()
            .position(|f| !f.is_processing())
            .unwrap_or(frames.len())
    }

    /// Drop every queued frame; returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        self.cond.notify_all();
        dropped
    }

    /// Wake all waiters without changing the queue, e.g. on stop.
    pub fn wake_all(&self) {
        let _guard = self.frames.lock();
        self.cond.notify_all();
    }
}

/// Signal fired by workers each time a frame finishes, consumed by the
/// feeder to re-evaluate prefill and overload conditions.
#[derive(Default)]
pub struct DoneSignal {
    lock: Mutex<()>,
    cond: Condvar,
}

impl DoneSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    pub fn wait(&self, timeout: Duration) {
        let mut guard = self.lock.lock();
        self.cond.wait_for(&mut guard, timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playout_core::Frame;
    use std::sync::Arc;

    #[test]
    fn test_push_pop_order() {
        let queue = FrameQueue::new();
        for i in 0..5 {
            queue.push(Frame::shared(i));
        }
        assert_eq!(queue.len(), 5);
        for i in 0..5 {
            assert_eq!(queue.pop().unwrap().position(), i);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_claim_skips_claimed_frames() {
        let queue = FrameQueue::new();
        for i in 0..3 {
            queue.push(Frame::shared(i));
        }
        let first = queue.claim_next(0).unwrap();
        let second = queue.claim_next(0).unwrap();
        assert_eq!(first.position(), 0);
        assert_eq!(second.position(), 1);
        assert_eq!(queue.first_unclaimed(), 2);
    }

    #[test]
    fn test_claim_respects_start_index() {
        let queue = FrameQueue::new();
        for i in 0..4 {
            queue.push(Frame::shared(i));
        }
        let frame = queue.claim_next(2).unwrap();
        assert_eq!(frame.position(), 2);
        assert_eq!(queue.first_unclaimed(), 0);
    }

    #[test]
    fn test_push_bounded_blocks_until_pop() {
        let queue = Arc::new(FrameQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        queue.push(Frame::shared(0));

        let q = Arc::clone(&queue);
        let r = Arc::clone(&running);
        let pusher = std::thread::spawn(move || q.push_bounded(Frame::shared(1), 1, &r));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);
        queue.pop();
        assert!(pusher.join().unwrap());
        assert_eq!(queue.pop().unwrap().position(), 1);
    }

    #[test]
    fn test_push_bounded_aborts_on_stop() {
        let queue = Arc::new(FrameQueue::new());
        let running = Arc::new(AtomicBool::new(true));
        queue.push(Frame::shared(0));

        let q = Arc::clone(&queue);
        let r = Arc::clone(&running);
        let pusher = std::thread::spawn(move || q.push_bounded(Frame::shared(1), 1, &r));

        std::thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Release);
        queue.wake_all();
        assert!(!pusher.join().unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_head_rendered() {
        let queue = FrameQueue::new();
        let frame = Frame::shared(0);
        queue.push(Arc::clone(&frame));
        assert!(!queue.head_rendered());
        frame.set_rendered(true);
        assert!(queue.head_rendered());
    }

    #[test]
    fn test_clear_reports_count() {
        let queue = FrameQueue::new();
        for i in 0..3 {
            queue.push(Frame::shared(i));
        }
        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
    }
}
