//! Frame rate representation.
//!
//! Uses rational numbers so that NTSC rates (30000/1001 and friends) stay
//! exact; the frame duration in microseconds feeds the frame-dropping
//! heuristic in the schedulers.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub num: u32,
    /// Denominator (e.g., 1001)
    pub den: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Frames per second as f64.
    #[inline]
    pub fn fps(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Duration of one frame in seconds, as an exact rational.
    #[inline]
    pub fn frame_duration(self) -> Rational64 {
        Rational64::new(self.den as i64, self.num as i64)
    }

    /// Duration of one frame in microseconds, truncated.
    ///
    /// Zero when the rate is degenerate; the drop heuristic treats a zero
    /// duration as "never skip".
    pub fn frame_duration_us(self) -> i64 {
        if self.num == 0 {
            return 0;
        }
        let micros = self.frame_duration() * 1_000_000;
        micros.to_integer()
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.fps();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
