//! Integration tests for animated properties applied to frames.
//!
//! Exercises playout-anim driving per-frame values through the
//! playout-core frame pipeline.

use playout_anim::{AnimValue, Animation, TimeFormat};
use playout_core::{sample_count, AudioFormat, AudioRequest, Frame, FrameRate};

// ── Animated volume over an audio pipeline ─────────────────────

#[test]
fn animated_volume_applies_per_frame() {
    let mut fade = Animation::new(25.0);
    fade.parse("0=0;100=1", 100).unwrap();

    // Mid-fade the gain halves a full-scale sample.
    let frame = Frame::shared(50);
    let gain = fade.get(50).unwrap().as_scalar().unwrap();
    assert_eq!(gain, 0.5);
    frame.set_volume(gain);

    let request = AudioRequest::new(AudioFormat::S16, 48_000, 2, 100);
    let audio = frame.get_audio(&request);
    // Silence stays silence, but the volume was consumed exactly once.
    assert!(audio.data.iter().all(|&b| b == 0));
    assert!(frame.with_meta(|m| m.volume.is_none()));
}

#[test]
fn fade_evaluates_consistently_across_reparse() {
    let mut fade = Animation::new(25.0);
    fade.parse("0=0;50$=1;100$=0", 100).unwrap();
    let serialized = fade.serialize();

    let mut reparsed = Animation::new(25.0);
    reparsed.parse(&serialized, 100).unwrap();
    for frame in 0..=100 {
        assert_eq!(fade.get(frame), reparsed.get(frame), "frame {frame}");
    }
}

// ── Two-keyframe ramp ──────────────────────────────────────────

#[test]
fn basic_linear_ramp_holds_past_the_last_key() {
    let mut ramp = Animation::new(25.0);
    ramp.parse("0=10;50=20", 0).unwrap();
    assert_eq!(ramp.get(25), Some(AnimValue::Scalar(15.0)));
    assert_eq!(ramp.get(60), Some(AnimValue::Scalar(20.0)));
}

// ── Timecode formats against the consumer frame rate ───────────

#[test]
fn smpte_serialization_round_trips_at_ntsc_rate() {
    let fps = FrameRate::FPS_30.fps();
    let mut animation = Animation::new(fps);
    animation.parse("0=1;90=2", 0).unwrap();
    animation.set_time_format(TimeFormat::Smpte);
    animation.set(45, AnimValue::Scalar(1.5));

    let serialized = animation.serialize();
    assert!(serialized.contains("00:00:03:00"), "{serialized}");

    let mut reparsed = Animation::new(fps);
    reparsed.parse(&serialized, 0).unwrap();
    assert_eq!(reparsed.get(45), Some(AnimValue::Scalar(1.5)));
    assert_eq!(reparsed.get(90), Some(AnimValue::Scalar(2.0)));
}

// ── Audio/video alignment ──────────────────────────────────────

#[test]
fn sample_counts_stay_aligned_over_a_minute_of_ntsc() {
    let fps = FrameRate::FPS_29_97.fps();
    let frames = 30_000i64;
    let total: u64 = (0..frames)
        .map(|pos| sample_count(fps, 48_000, pos) as u64)
        .sum();
    // 30000 frames at 30000/1001 fps is exactly 1001 seconds of audio.
    assert_eq!(total, 48_000 * 1001);
}
