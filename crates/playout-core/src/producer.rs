//! The producer pull contract and test producers.
//!
//! A producer is anything that yields frames on demand. The schedulers pull
//! from exactly one thread at a time, so implementations only need `Send`,
//! not `Sync`. Returning `None` means a transient stall rather than end of
//! stream; callers retry.

use crate::frame::{Frame, SharedFrame};
use crate::image::ImageBuffer;
use std::time::Duration;

/// Pull interface into the service graph.
pub trait Producer: Send {
    /// Pull the next frame. `None` means "temporarily stalled, retry".
    fn get_frame(&mut self) -> Option<SharedFrame>;
}

impl<P: Producer + ?Sized> Producer for Box<P> {
    fn get_frame(&mut self) -> Option<SharedFrame> {
        (**self).get_frame()
    }
}

/// A producer that yields frames at consecutive positions with a synthetic
/// decode stage. Used by scheduler tests to simulate decode cost.
pub struct CounterProducer {
    position: i64,
    width: u32,
    height: u32,
    /// Simulated per-frame decode time; zero means instantaneous.
    pub decode_cost: Duration,
    /// Yield `None` every n-th pull to simulate a stalling source.
    pub stall_every: Option<u64>,
    pulls: u64,
}

impl CounterProducer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: 0,
            width,
            height,
            decode_cost: Duration::ZERO,
            stall_every: None,
            pulls: 0,
        }
    }

    /// Number of frames pulled so far (including stalled pulls).
    pub fn pulls(&self) -> u64 {
        self.pulls
    }

    /// The position the next pulled frame will have.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Reposition the producer, as a seek would.
    pub fn seek(&mut self, position: i64) {
        self.position = position;
    }
}

impl Producer for CounterProducer {
    fn get_frame(&mut self) -> Option<SharedFrame> {
        self.pulls += 1;
        if let Some(n) = self.stall_every {
            if n > 0 && self.pulls % n == 0 {
                return None;
            }
        }
        let frame = Frame::shared(self.position);
        self.position += 1;

        let cost = self.decode_cost;
        let (width, height) = (self.width, self.height);
        frame.push_image_stage(Box::new(move |_, req| {
            if !cost.is_zero() {
                std::thread::sleep(cost);
            }
            let w = if req.width == 0 { width } else { req.width };
            let h = if req.height == 0 { height } else { req.height };
            Some(ImageBuffer::new(req.format, w, h))
        }));
        Some(frame)
    }
}
