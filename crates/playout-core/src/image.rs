//! Image formats and buffers.
//!
//! Buffers are packed single-allocation layouts sized by format, matching
//! what the render stages exchange. A frame that reaches the consumer with
//! no real content synthesizes a test pattern instead of failing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fallback width when a zero width is requested.
pub const DEFAULT_WIDTH: u32 = 720;
/// Fallback height when a zero height is requested.
pub const DEFAULT_HEIGHT: u32 = 576;

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// No image requested.
    None,
    /// 8-bit RGB packed (24 bits per pixel)
    Rgb24,
    /// 8-bit RGBA packed (32 bits per pixel)
    Rgb24a,
    /// YUV 4:2:2 packed
    #[default]
    Yuv422,
    /// YUV 4:2:0 planar
    Yuv420p,
}

impl ImageFormat {
    /// Total bytes for a frame of this format.
    pub fn bytes_for(self, width: u32, height: u32) -> usize {
        let pixels = (width as usize) * (height as usize);
        match self {
            Self::None => 0,
            Self::Rgb24 => pixels * 3,
            Self::Rgb24a => pixels * 4,
            Self::Yuv422 => pixels * 2,
            Self::Yuv420p => pixels * 3 / 2,
        }
    }

    /// Map a configuration name to a format.
    ///
    /// Unrecognized names fall back to yuv422, the working format of the
    /// render pipeline.
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "rgb24" => Self::Rgb24,
            "rgb24a" => Self::Rgb24a,
            "yuv420p" => Self::Yuv420p,
            _ => Self::Yuv422,
        }
    }

    /// The canonical configuration name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rgb24 => "rgb24",
            Self::Rgb24a => "rgb24a",
            Self::Yuv422 => "yuv422",
            Self::Yuv420p => "yuv420p",
        }
    }
}

/// What a caller wants back from [`crate::Frame::get_image`].
#[derive(Debug, Clone, Copy)]
pub struct ImageRequest {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Whether the caller needs to write to the returned buffer.
    pub writable: bool,
}

impl ImageRequest {
    pub fn new(format: ImageFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            writable: false,
        }
    }
}

/// A packed image buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    /// Allocate a zeroed buffer sized for the format.
    pub fn new(format: ImageFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            data: vec![0u8; format.bytes_for(width, height)],
        }
    }

    /// Synthesize a solid test pattern sized to the request.
    ///
    /// yuv422 fills alternating 235/128 bytes (black-level luma with neutral
    /// chroma); all other formats fill white. Zero dimensions take the SD
    /// defaults.
    pub fn test_pattern(format: ImageFormat, width: u32, height: u32) -> Self {
        let width = if width == 0 { DEFAULT_WIDTH } else { width };
        let height = if height == 0 { DEFAULT_HEIGHT } else { height };
        let size = format.bytes_for(width, height);
        let data = match format {
            ImageFormat::None => Vec::new(),
            ImageFormat::Yuv422 => {
                let mut data = Vec::with_capacity(size);
                for _ in 0..size / 2 {
                    data.push(235);
                    data.push(128);
                }
                data
            }
            _ => vec![255u8; size],
        };
        Self {
            format,
            width,
            height,
            data,
        }
    }

    /// Total memory usage in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}

/// Arc-wrapped image buffer for shared ownership between the frame cache
/// and its consumers.
pub type SharedImage = Arc<ImageBuffer>;
