//! Playout Core - Foundation types for the playout framework
//!
//! This crate provides the fundamental types used throughout playout:
//! - Frame rate and duration arithmetic (FrameRate)
//! - Image and audio formats and buffers
//! - The pull-model Frame with its staged image/audio pipelines
//! - The Producer trait that the schedulers pull from

pub mod audio;
pub mod error;
pub mod frame;
pub mod image;
pub mod producer;
pub mod time;

pub use audio::{sample_count, AudioBuffer, AudioFormat, AudioRequest, SharedAudio};
pub use error::{PlayoutError, Result};
pub use frame::{Frame, SharedFrame};
pub use image::{ImageBuffer, ImageFormat, ImageRequest, SharedImage};
pub use producer::{CounterProducer, Producer};
pub use time::FrameRate;
