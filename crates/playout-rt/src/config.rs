//! Consumer configuration.

use playout_core::{AudioFormat, FrameRate, ImageFormat, PlayoutError, Result};
use serde::{Deserialize, Serialize};

/// The scheduling mode selected by `real_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    /// Pull and decode inline on the caller's thread.
    Sync,
    /// One decode thread ahead of the caller.
    ReadAhead,
    /// N decode threads behind an adaptive process head.
    WorkerPool,
}

/// Options read once at consumer start.
///
/// `real_time` selects the mode: 0 is synchronous, 1 or -1 a single
/// read-ahead thread, larger magnitudes a pool of that many workers. A
/// negative value disables frame dropping; frames are always rendered even
/// when that means falling behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub real_time: i32,
    /// Target queue depth in frames.
    pub buffer: usize,
    /// Frames to render before the first output; defaults to `buffer`.
    pub prefill: Option<usize>,
    /// Consecutive-drop ceiling before the scheduler intervenes.
    pub drop_max: u32,
    pub fps: FrameRate,
    pub width: u32,
    pub height: u32,
    pub image_format: ImageFormat,
    pub frequency: u32,
    pub channels: u32,
    pub audio_format: AudioFormat,
    /// Skip image processing entirely; frames pass through rendered.
    pub video_off: bool,
    /// Skip the audio pull in the read-ahead thread.
    pub audio_off: bool,
    /// Requested OS thread priority; advisory, logged and otherwise ignored.
    pub priority: Option<i32>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            real_time: 1,
            buffer: 25,
            prefill: None,
            drop_max: 5,
            fps: FrameRate::default(),
            width: 720,
            height: 576,
            image_format: ImageFormat::Yuv422,
            frequency: 48_000,
            channels: 2,
            audio_format: AudioFormat::S16,
            video_off: false,
            audio_off: false,
            priority: None,
        }
    }
}

impl ConsumerConfig {
    /// A worker-pool configuration sized to the machine's CPU count.
    pub fn auto() -> Self {
        Self {
            real_time: num_cpus::get() as i32,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer == 0 {
            return Err(PlayoutError::InvalidParameter(
                "buffer must be at least 1".into(),
            ));
        }
        if let Some(prefill) = self.prefill {
            if prefill > self.buffer {
                return Err(PlayoutError::InvalidParameter(format!(
                    "prefill {} exceeds buffer {}",
                    prefill, self.buffer
                )));
            }
        }
        if self.fps.fps() <= 0.0 {
            return Err(PlayoutError::InvalidParameter(
                "frame rate must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> SchedulingMode {
        match self.real_time {
            0 => SchedulingMode::Sync,
            -1 | 1 => SchedulingMode::ReadAhead,
            _ => SchedulingMode::WorkerPool,
        }
    }

    /// Number of decode threads the mode implies.
    pub fn threads(&self) -> usize {
        (self.real_time.unsigned_abs() as usize).max(1)
    }

    /// Whether the scheduler may leave frames unrendered to keep up.
    pub fn drops_allowed(&self) -> bool {
        self.real_time > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let mut config = ConsumerConfig::default();
        for (real_time, mode) in [
            (0, SchedulingMode::Sync),
            (1, SchedulingMode::ReadAhead),
            (-1, SchedulingMode::ReadAhead),
            (4, SchedulingMode::WorkerPool),
            (-4, SchedulingMode::WorkerPool),
        ] {
            config.real_time = real_time;
            assert_eq!(config.mode(), mode);
        }
    }

    #[test]
    fn test_threads_and_dropping() {
        let mut config = ConsumerConfig::default();
        config.real_time = -4;
        assert_eq!(config.threads(), 4);
        assert!(!config.drops_allowed());
        config.real_time = 4;
        assert!(config.drops_allowed());
        config.real_time = 0;
        assert_eq!(config.threads(), 1);
    }

    #[test]
    fn test_validation() {
        let mut config = ConsumerConfig::default();
        assert!(config.validate().is_ok());
        config.buffer = 0;
        assert!(config.validate().is_err());
        config.buffer = 10;
        config.prefill = Some(11);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auto_uses_worker_threads() {
        let config = ConsumerConfig::auto();
        assert!(config.real_time >= 1);
    }
}
