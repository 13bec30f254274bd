//! Audio formats, buffers, and the per-frame sample calculator.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fallback sample rate when a zero frequency is requested.
pub const DEFAULT_FREQUENCY: u32 = 48_000;
/// Fallback channel count.
pub const DEFAULT_CHANNELS: u32 = 2;
/// Fallback samples per frame (one PAL frame at 48 kHz).
pub const DEFAULT_SAMPLES: u32 = 1920;

/// Audio sample format enumeration. Samples are interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    /// No audio requested.
    None,
    /// Signed 16-bit integer
    #[default]
    S16,
    /// Signed 32-bit integer
    S32,
    /// 32-bit float
    F32,
}

impl AudioFormat {
    /// Bytes per sample per channel.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::None => 0,
            Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
        }
    }

    /// Map a configuration name to a format; unrecognized names fall back
    /// to s16.
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "s32" => Self::S32,
            "float" | "f32" => Self::F32,
            _ => Self::S16,
        }
    }

    /// The canonical configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "float",
        }
    }
}

/// What a caller wants back from [`crate::Frame::get_audio`].
#[derive(Debug, Clone, Copy)]
pub struct AudioRequest {
    pub format: AudioFormat,
    pub frequency: u32,
    pub channels: u32,
    pub samples: u32,
}

impl AudioRequest {
    pub fn new(format: AudioFormat, frequency: u32, channels: u32, samples: u32) -> Self {
        Self {
            format,
            frequency,
            channels,
            samples,
        }
    }
}

/// An interleaved audio buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub format: AudioFormat,
    pub frequency: u32,
    pub channels: u32,
    pub samples: u32,
    pub data: Vec<u8>,
}

impl AudioBuffer {
    /// Allocate a silent buffer. Zero parameters take the defaults.
    pub fn silence(format: AudioFormat, frequency: u32, channels: u32, samples: u32) -> Self {
        let frequency = if frequency == 0 {
            DEFAULT_FREQUENCY
        } else {
            frequency
        };
        let channels = if channels == 0 { DEFAULT_CHANNELS } else { channels };
        let samples = if samples == 0 { DEFAULT_SAMPLES } else { samples };
        let size = samples as usize * channels as usize * format.bytes_per_sample();
        Self {
            format,
            frequency,
            channels,
            samples,
            data: vec![0u8; size],
        }
    }

    /// Scale S16 samples in place by a linear gain.
    ///
    /// A zero gain zeroes the buffer. Non-S16 formats are untouched.
    pub fn apply_volume(&mut self, gain: f64) {
        if self.format != AudioFormat::S16 {
            return;
        }
        if gain == 0.0 {
            self.data.fill(0);
        } else if gain != 1.0 {
            for chunk in self.data.chunks_exact_mut(2) {
                let sample = i16::from_ne_bytes([chunk[0], chunk[1]]);
                let scaled = (sample as f64 * gain)
                    .round()
                    .clamp(i16::MIN as f64, i16::MAX as f64) as i16;
                chunk.copy_from_slice(&scaled.to_ne_bytes());
            }
        }
    }
}

/// Arc-wrapped audio buffer for shared ownership.
pub type SharedAudio = Arc<AudioBuffer>;

/// Cumulative number of samples up to the start of `position`.
fn samples_to_position(fps: f64, frequency: u32, position: i64) -> i64 {
    if fps == 0.0 {
        return 0;
    }
    let exact = position as f64 * frequency as f64 / fps;
    (exact + if position < 0 { -0.5 } else { 0.5 }) as i64
}

/// Number of audio samples belonging to the frame at `position`.
///
/// Computed as the difference of cumulative rounded sample counts so that
/// rounding never accumulates into A/V drift over long runs.
pub fn sample_count(fps: f64, frequency: u32, position: i64) -> u32 {
    (samples_to_position(fps, frequency, position + 1) - samples_to_position(fps, frequency, position))
        .max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_pal() {
        // 48000 / 25 divides evenly
        for pos in 0..100 {
            assert_eq!(sample_count(25.0, 48_000, pos), 1920);
        }
    }

    #[test]
    fn test_sample_count_ntsc_no_drift() {
        // 48000 / 29.97 does not divide evenly; totals must still be exact
        let fps = 30000.0 / 1001.0;
        let total: i64 = (0..30000).map(|p| sample_count(fps, 48_000, p) as i64).sum();
        // 30000 frames = 1001 seconds exactly
        assert_eq!(total, 48_000 * 1001);
    }

    #[test]
    fn test_silence_defaults() {
        let buf = AudioBuffer::silence(AudioFormat::S16, 0, 0, 0);
        assert_eq!(buf.frequency, DEFAULT_FREQUENCY);
        assert_eq!(buf.channels, DEFAULT_CHANNELS);
        assert_eq!(buf.samples, DEFAULT_SAMPLES);
        assert_eq!(buf.data.len(), 1920 * 2 * 2);
        assert!(buf.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_apply_volume_halves_samples() {
        let mut buf = AudioBuffer::silence(AudioFormat::S16, 48_000, 1, 4);
        let samples: [i16; 4] = [1000, -1000, 30000, -30000];
        buf.data = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
        buf.apply_volume(0.5);
        let out: Vec<i16> = buf
            .data
            .chunks_exact(2)
            .map(|c| i16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(out, vec![500, -500, 15000, -15000]);
    }

    #[test]
    fn test_apply_volume_zero_silences() {
        let mut buf = AudioBuffer::silence(AudioFormat::S16, 48_000, 1, 4);
        buf.data = vec![1u8; 8];
        buf.apply_volume(0.0);
        assert!(buf.data.iter().all(|&b| b == 0));
    }
}
