//! The pull-model frame.
//!
//! A `Frame` is one discrete unit of media at a given position. Image and
//! audio content is produced lazily: producers and filters push stage
//! closures onto the frame, and the consumer side invokes them on demand.
//! Stages are kept in an ordered vector and consumed newest-first, so a
//! filter pushed after a decoder wraps it. A frame with no stages left never
//! fails; it degrades to a synthesized test pattern or silence and records
//! that fact in its metadata.
//!
//! The `rendered` and `is_processing` flags are per-frame atomics. Workers
//! claim a frame by winning the `is_processing` compare-exchange; the claim
//! is never released, which is what makes the at-most-one-render guarantee
//! trivial to uphold.

use crate::audio::{AudioBuffer, AudioFormat, AudioRequest, SharedAudio};
use crate::image::{ImageBuffer, ImageRequest, SharedImage};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// A stage that can produce an image for a frame. Returning `None` means the
/// stage has nothing to contribute and the next fallback applies.
pub type ImageStage = Box<dyn FnMut(&Frame, &ImageRequest) -> Option<ImageBuffer> + Send>;

/// A stage that can produce audio for a frame.
pub type AudioStage = Box<dyn FnMut(&Frame, &AudioRequest) -> Option<AudioBuffer> + Send>;

/// Metadata recorded on a frame as content is produced.
#[derive(Debug)]
pub struct FrameMeta {
    /// Dimensions and format of the last produced image.
    pub width: u32,
    pub height: u32,
    pub format: crate::image::ImageFormat,
    /// Cached image, set by the first `get_image`.
    pub image: Option<SharedImage>,
    /// Cached audio, set by the first `get_audio`.
    pub audio: Option<SharedAudio>,
    /// Set when the image was synthesized rather than produced.
    pub test_image: bool,
    /// Set when the audio was synthesized rather than produced.
    pub test_audio: bool,
    /// One-shot gain applied to the next S16 `get_audio` and then cleared.
    pub volume: Option<f64>,
    /// Playback speed recorded by the producer; 1.0 is normal playback.
    pub speed: f64,
}

impl Default for FrameMeta {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: crate::image::ImageFormat::default(),
            image: None,
            audio: None,
            test_image: false,
            test_audio: false,
            volume: None,
            speed: 1.0,
        }
    }
}

/// One discrete unit of pulled media.
pub struct Frame {
    position: i64,
    meta: Mutex<FrameMeta>,
    image_stages: Mutex<SmallVec<[ImageStage; 4]>>,
    audio_stages: Mutex<SmallVec<[AudioStage; 4]>>,
    /// Optional designated fallback producer, consulted before the solid
    /// test pattern.
    test_card: Mutex<Option<ImageStage>>,
    rendered: AtomicBool,
    processing: AtomicBool,
}

/// Shared ownership of a frame across the queue, workers, and the consumer.
pub type SharedFrame = Arc<Frame>;

impl Frame {
    /// Create a frame at the given position.
    pub fn new(position: i64) -> Self {
        Self {
            position,
            meta: Mutex::new(FrameMeta::default()),
            image_stages: Mutex::new(SmallVec::new()),
            audio_stages: Mutex::new(SmallVec::new()),
            test_card: Mutex::new(None),
            rendered: AtomicBool::new(false),
            processing: AtomicBool::new(false),
        }
    }

    /// Create a shared frame at the given position.
    pub fn shared(position: i64) -> SharedFrame {
        Arc::new(Self::new(position))
    }

    /// The frame's position in the producer's timeline.
    #[inline]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Push an image stage. The most recently pushed stage runs first.
    pub fn push_image_stage(&self, stage: ImageStage) {
        self.image_stages.lock().push(stage);
    }

    /// Push an audio stage. The most recently pushed stage runs first.
    pub fn push_audio_stage(&self, stage: AudioStage) {
        self.audio_stages.lock().push(stage);
    }

    /// Install the designated test-card fallback.
    pub fn set_test_card(&self, stage: ImageStage) {
        *self.test_card.lock() = Some(stage);
    }

    /// Whether this frame will produce a test-card image.
    pub fn is_test_card(&self) -> bool {
        self.image_stages.lock().is_empty() || self.meta.lock().test_image
    }

    /// Whether this frame will produce test audio.
    pub fn is_test_audio(&self) -> bool {
        self.audio_stages.lock().is_empty() || self.meta.lock().test_audio
    }

    /// Produce the frame's image.
    ///
    /// Runs the next unconsumed stage; a stage that declines falls through to
    /// the one below it. With no stages left the cached buffer is returned,
    /// then the test card, then a synthesized pattern sized to the request.
    /// Records width/height/format in the frame metadata. Never fails.
    pub fn get_image(&self, request: &ImageRequest) -> SharedImage {
        loop {
            // Take the stage out before running it: stages may recurse into
            // get_image to pull from the stage below them.
            let stage = self.image_stages.lock().pop();
            let Some(mut stage) = stage else { break };
            if let Some(buffer) = stage(self, request) {
                return self.cache_image(buffer, false);
            }
        }

        if let Some(image) = self.meta.lock().image.clone() {
            return image;
        }

        let test_card = self.test_card.lock().take();
        if let Some(mut stage) = test_card {
            if let Some(buffer) = stage(self, request) {
                return self.cache_image(buffer, true);
            }
        }

        trace!(position = self.position, "no image content, synthesizing test pattern");
        let buffer = ImageBuffer::test_pattern(request.format, request.width, request.height);
        self.cache_image(buffer, true)
    }

    fn cache_image(&self, buffer: ImageBuffer, test: bool) -> SharedImage {
        let shared = Arc::new(buffer);
        let mut meta = self.meta.lock();
        meta.width = shared.width;
        meta.height = shared.height;
        meta.format = shared.format;
        meta.test_image |= test;
        meta.image = Some(shared.clone());
        shared
    }

    /// Produce the frame's audio.
    ///
    /// Same pop-and-fallback pattern as `get_image`, degrading to silence.
    /// A pending one-shot `volume` is applied to S16 output and cleared, so
    /// a second call does not reapply it.
    pub fn get_audio(&self, request: &AudioRequest) -> SharedAudio {
        let mut produced = None;
        if !self.meta.lock().test_audio {
            loop {
                let stage = self.audio_stages.lock().pop();
                let Some(mut stage) = stage else { break };
                if let Some(buffer) = stage(self, request) {
                    produced = Some(buffer);
                    break;
                }
            }
        }

        let mut shared = match produced {
            Some(buffer) => {
                let shared = Arc::new(buffer);
                let mut meta = self.meta.lock();
                meta.test_audio = false;
                meta.audio = Some(shared.clone());
                shared
            }
            None => {
                let cached = self.meta.lock().audio.clone();
                match cached {
                    Some(audio) => audio,
                    None => {
                        let silence = Arc::new(AudioBuffer::silence(
                            request.format,
                            request.frequency,
                            request.channels,
                            request.samples,
                        ));
                        let mut meta = self.meta.lock();
                        meta.test_audio = true;
                        meta.audio = Some(silence.clone());
                        silence
                    }
                }
            }
        };

        let volume = self.meta.lock().volume.take();
        if let Some(gain) = volume {
            if shared.format == AudioFormat::S16 {
                Arc::make_mut(&mut shared).apply_volume(gain);
                self.meta.lock().audio = Some(shared.clone());
            }
        }

        shared
    }

    /// Set the one-shot volume applied by the next `get_audio`.
    pub fn set_volume(&self, gain: f64) {
        self.meta.lock().volume = Some(gain);
    }

    /// Record the playback speed this frame was pulled at.
    pub fn set_speed(&self, speed: f64) {
        self.meta.lock().speed = speed;
    }

    /// The playback speed this frame was pulled at.
    pub fn speed(&self) -> f64 {
        self.meta.lock().speed
    }

    /// Run `f` with the frame metadata locked.
    pub fn with_meta<R>(&self, f: impl FnOnce(&FrameMeta) -> R) -> R {
        f(&self.meta.lock())
    }

    /// Mark the frame's image decode as complete.
    pub fn set_rendered(&self, rendered: bool) {
        self.rendered.store(rendered, Ordering::Release);
    }

    /// Whether the frame's image decode has completed.
    pub fn is_rendered(&self) -> bool {
        self.rendered.load(Ordering::Acquire)
    }

    /// Atomically claim the frame for processing. Returns true exactly once
    /// per frame: the winning worker owns the render.
    pub fn try_claim(&self) -> bool {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether any worker has claimed this frame.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("position", &self.position)
            .field("rendered", &self.is_rendered())
            .field("processing", &self.is_processing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFormat;

    fn image_request() -> ImageRequest {
        ImageRequest::new(ImageFormat::Yuv422, 8, 8)
    }

    fn audio_request() -> AudioRequest {
        AudioRequest::new(AudioFormat::S16, 48_000, 2, 4)
    }

    #[test]
    fn test_stages_run_newest_first() {
        let frame = Frame::new(0);
        frame.push_image_stage(Box::new(|_, req| {
            let mut buf = ImageBuffer::new(req.format, req.width, req.height);
            buf.data.fill(1);
            Some(buf)
        }));
        frame.push_image_stage(Box::new(|_, req| {
            let mut buf = ImageBuffer::new(req.format, req.width, req.height);
            buf.data.fill(2);
            Some(buf)
        }));
        let img = frame.get_image(&image_request());
        assert_eq!(img.data[0], 2);
    }

    #[test]
    fn test_declining_stage_falls_through() {
        let frame = Frame::new(0);
        frame.push_image_stage(Box::new(|_, req| {
            let mut buf = ImageBuffer::new(req.format, req.width, req.height);
            buf.data.fill(7);
            Some(buf)
        }));
        frame.push_image_stage(Box::new(|_, _| None));
        let img = frame.get_image(&image_request());
        assert_eq!(img.data[0], 7);
        assert!(!frame.with_meta(|m| m.test_image));
    }

    #[test]
    fn test_no_stages_synthesizes_test_pattern() {
        let frame = Frame::new(0);
        let img = frame.get_image(&image_request());
        assert_eq!(&img.data[..2], &[235, 128]);
        assert!(frame.with_meta(|m| m.test_image));
        assert!(frame.is_test_card());
    }

    #[test]
    fn test_second_get_image_returns_cache() {
        let frame = Frame::new(0);
        frame.push_image_stage(Box::new(|_, req| {
            let mut buf = ImageBuffer::new(req.format, req.width, req.height);
            buf.data.fill(9);
            Some(buf)
        }));
        let first = frame.get_image(&image_request());
        let second = frame.get_image(&image_request());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_meta_records_dimensions() {
        let frame = Frame::new(0);
        frame.get_image(&image_request());
        assert_eq!(frame.with_meta(|m| (m.width, m.height)), (8, 8));
        assert_eq!(frame.with_meta(|m| m.format), ImageFormat::Yuv422);
    }

    #[test]
    fn test_no_audio_stage_yields_silence() {
        let frame = Frame::new(0);
        let audio = frame.get_audio(&audio_request());
        assert!(audio.data.iter().all(|&b| b == 0));
        assert!(frame.with_meta(|m| m.test_audio));
    }

    #[test]
    fn test_volume_is_one_shot() {
        let frame = Frame::new(0);
        frame.push_audio_stage(Box::new(|_, req| {
            let mut buf = AudioBuffer::silence(req.format, req.frequency, req.channels, req.samples);
            let samples: Vec<i16> = vec![100; (req.samples * req.channels) as usize];
            buf.data = samples.iter().flat_map(|s| s.to_ne_bytes()).collect();
            Some(buf)
        }));
        frame.set_volume(0.5);
        let audio = frame.get_audio(&audio_request());
        let first = i16::from_ne_bytes([audio.data[0], audio.data[1]]);
        assert_eq!(first, 50);

        // Second call serves the cached buffer without reapplying the gain.
        let audio = frame.get_audio(&audio_request());
        let first = i16::from_ne_bytes([audio.data[0], audio.data[1]]);
        assert_eq!(first, 50);
    }

    #[test]
    fn test_claim_is_exclusive() {
        let frame = Frame::new(0);
        assert!(frame.try_claim());
        assert!(!frame.try_claim());
        assert!(frame.is_processing());
    }

    #[test]
    fn test_stage_can_recurse_into_frame() {
        // A "filter" stage that pulls the image below it and modifies it.
        let frame = Frame::new(0);
        frame.push_image_stage(Box::new(|_, req| {
            let mut buf = ImageBuffer::new(req.format, req.width, req.height);
            buf.data.fill(10);
            Some(buf)
        }));
        frame.push_image_stage(Box::new(|frame, req| {
            let upstream = frame.get_image(req);
            let mut buf = (*upstream).clone();
            for b in &mut buf.data {
                *b += 1;
            }
            Some(buf)
        }));
        let img = frame.get_image(&image_request());
        assert_eq!(img.data[0], 11);
    }
}
