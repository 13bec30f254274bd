//! Keyframe string parsing and time formatting.
//!
//! The serialized form is a `;`-delimited list of items, each
//! `[time][glyph]=value`. Times are raw frame numbers or formatted
//! timecodes; values containing `;` or `=` are wrapped in double quotes,
//! and the tokenizer honors those quotes.

use crate::spline::KeyframeType;
use crate::value::AnimValue;
use playout_core::{PlayoutError, Result};

/// How keyframe times are rendered when serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// Raw frame numbers.
    #[default]
    Frames,
    /// Wall-clock `hh:mm:ss.mmm`.
    Clock,
    /// Non-drop timecode `hh:mm:ss:ff`.
    Smpte,
}

/// One parsed keyframe item, before it is placed in an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub frame: i64,
    pub keyframe_type: Option<KeyframeType>,
    pub value: AnimValue,
}

/// Split a keyframe string on `;`, honoring double-quoted values.
pub fn split_items(data: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in data.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                items.push(&data[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&data[start..]);
    items.retain(|item| !item.trim().is_empty());
    items
}

/// Parse one `[time][glyph]=value` item.
///
/// A bare value without `=` gets frame 0. A negative time is resolved
/// against `length`. A missing glyph leaves `keyframe_type` as `None` so the
/// caller can apply its default.
pub fn parse_item(item: &str, fps: f64, length: i64) -> Result<ParsedItem> {
    let item = item.trim();
    let (time_part, value_part) = match item.find('=') {
        Some(eq) => (&item[..eq], &item[eq + 1..]),
        None => ("", item),
    };

    let (time_part, keyframe_type) = match time_part
        .chars()
        .next_back()
        .and_then(KeyframeType::from_glyph)
    {
        // "-5" is a negative frame number, not a tight-smooth glyph.
        Some(kind) if time_part.len() > 1 || kind != KeyframeType::SmoothTight => {
            let glyph_len = time_part.chars().next_back().map_or(0, char::len_utf8);
            (&time_part[..time_part.len() - glyph_len], Some(kind))
        }
        _ => (time_part, None),
    };

    let mut frame = if time_part.is_empty() {
        0
    } else {
        parse_time(time_part, fps)?
    };
    if frame < 0 {
        frame += length;
    }

    let value = AnimValue::parse(unquote(value_part));
    Ok(ParsedItem {
        frame,
        keyframe_type,
        value,
    })
}

/// Parse a time string: a frame number, `hh:mm:ss.mmm` clock time, or
/// `hh:mm:ss:ff` timecode. Clock is distinguished from timecode by a `.` or
/// `,` in the final field.
pub fn parse_time(time: &str, fps: f64) -> Result<i64> {
    let time = time.trim();
    if !time.contains(':') {
        return time
            .parse::<i64>()
            .or_else(|_| time.parse::<f64>().map(|f| f as i64))
            .map_err(|_| PlayoutError::Parse(format!("invalid time {time:?}")));
    }

    let fields: Vec<&str> = time.split(':').collect();
    if fields.len() > 4 {
        return Err(PlayoutError::Parse(format!("invalid time {time:?}")));
    }
    let last = fields[fields.len() - 1];
    let err = || PlayoutError::Parse(format!("invalid time {time:?}"));

    if last.contains('.') || last.contains(',') {
        // Clock: leading fields are hours/minutes, last is fractional seconds.
        let mut seconds = 0.0f64;
        for field in &fields[..fields.len() - 1] {
            seconds = seconds * 60.0 + field.parse::<f64>().map_err(|_| err())?;
        }
        seconds = seconds * 60.0 + last.replace(',', ".").parse::<f64>().map_err(|_| err())?;
        Ok((seconds * fps).round() as i64)
    } else {
        // Timecode: last field is a frame count within the second.
        let mut seconds = 0.0f64;
        for field in &fields[..fields.len() - 1] {
            seconds = seconds * 60.0 + field.parse::<f64>().map_err(|_| err())?;
        }
        let frames = last.parse::<i64>().map_err(|_| err())?;
        Ok((seconds * fps).round() as i64 + frames)
    }
}

/// Render a frame position in the given format.
pub fn format_time(frame: i64, fps: f64, format: TimeFormat) -> String {
    match format {
        TimeFormat::Frames => frame.to_string(),
        TimeFormat::Clock => {
            let seconds = frame as f64 / fps;
            let hours = (seconds / 3600.0) as i64;
            let minutes = ((seconds / 60.0) as i64) % 60;
            let secs = seconds - (hours * 3600 + minutes * 60) as f64;
            format!("{hours:02}:{minutes:02}:{secs:06.3}")
        }
        TimeFormat::Smpte => {
            let rfps = fps.round().max(1.0) as i64;
            let total_seconds = frame / rfps;
            let frames = frame % rfps;
            let hours = total_seconds / 3600;
            let minutes = (total_seconds / 60) % 60;
            let secs = total_seconds % 60;
            format!("{hours:02}:{minutes:02}:{secs:02}:{frames:02}")
        }
    }
}

/// Quote a serialized value if it contains a delimiter.
pub fn quote_value(value: &str) -> String {
    if value.contains(';') || value.contains('=') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
