//! Animatable value types.
//!
//! A value parsed from a keyframe string is one of: a scalar, a color, a
//! rect, or opaque text. Text never interpolates; any interpolation request
//! on it degrades to discrete pass-through.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB`, `#AARRGGBB`, or `0xRRGGBBAA` forms.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#') {
            match hex.len() {
                6 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8, 255))
                }
                8 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(Self::new(
                        (v >> 16) as u8,
                        (v >> 8) as u8,
                        v as u8,
                        (v >> 24) as u8,
                    ))
                }
                _ => None,
            }
        } else if let Some(hex) = s.strip_prefix("0x") {
            if hex.len() != 8 {
                return None;
            }
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(Self::new(
                (v >> 24) as u8,
                (v >> 16) as u8,
                (v >> 8) as u8,
                v as u8,
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }
}

/// Animatable rectangle: position, size, and an opacity/extra field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub o: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, w: f64, h: f64, o: f64) -> Self {
        Self { x, y, w, h, o }
    }

    /// Parse 2 to 5 delimited numbers as x y w h o; missing fields are zero.
    pub fn parse(s: &str) -> Option<Self> {
        let fields: Vec<&str> = s
            .split(|c: char| c.is_whitespace() || c == '/' || c == ',' || c == ':')
            .filter(|t| !t.is_empty())
            .collect();
        if fields.len() < 2 || fields.len() > 5 {
            return None;
        }
        let mut values = [0.0f64; 5];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field.parse().ok()?;
        }
        Some(Self::new(values[0], values[1], values[2], values[3], values[4]))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {} {}", self.x, self.y, self.w, self.h, self.o)
    }
}

/// A typed animatable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnimValue {
    Scalar(f64),
    Color(Color),
    Rect(Rect),
    Text(String),
}

impl AnimValue {
    /// Parse a keyframe value string into its natural type.
    ///
    /// Precedence: hex color, then a delimited rect, then a bare number,
    /// otherwise opaque text.
    pub fn parse(s: &str) -> Self {
        if let Some(color) = Color::parse(s) {
            return Self::Color(color);
        }
        if s.contains(|c: char| c.is_whitespace() || c == '/' || c == ',' || c == ':') {
            if let Some(rect) = Rect::parse(s) {
                return Self::Rect(rect);
            }
        }
        if let Ok(scalar) = s.trim().parse::<f64>() {
            if !s.trim().is_empty() {
                return Self::Scalar(scalar);
            }
        }
        Self::Text(s.to_string())
    }

    /// Whether this value can be interpolated at all.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    /// The scalar view of this value, when it has one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Interpolate channel-wise between typed values using `kernel`, which
    /// receives the four control values for each channel.
    ///
    /// Color channels are clamped to 0..=255 after interpolation; rect fields
    /// are not clamped. Mismatched or text values pass `p1` through.
    pub fn interpolate_with(
        points: [&AnimValue; 4],
        kernel: impl Fn([f64; 4]) -> f64,
    ) -> AnimValue {
        use AnimValue::*;
        match points {
            [Scalar(y0), Scalar(y1), Scalar(y2), Scalar(y3)] => {
                Scalar(kernel([*y0, *y1, *y2, *y3]))
            }
            [Color(c0), Color(c1), Color(c2), Color(c3)] => {
                let channel = |f: fn(&self::Color) -> u8| {
                    kernel([
                        f(c0) as f64,
                        f(c1) as f64,
                        f(c2) as f64,
                        f(c3) as f64,
                    ])
                    .round()
                    .clamp(0.0, 255.0) as u8
                };
                Color(self::Color::new(
                    channel(|c| c.r),
                    channel(|c| c.g),
                    channel(|c| c.b),
                    channel(|c| c.a),
                ))
            }
            [Rect(r0), Rect(r1), Rect(r2), Rect(r3)] => {
                let field = |f: fn(&self::Rect) -> f64| kernel([f(r0), f(r1), f(r2), f(r3)]);
                Rect(self::Rect::new(
                    field(|r| r.x),
                    field(|r| r.y),
                    field(|r| r.w),
                    field(|r| r.h),
                    field(|r| r.o),
                ))
            }
            [_, p1, _, _] => (*p1).clone(),
        }
    }
}

impl fmt::Display for AnimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Color(c) => write!(f, "{}", c),
            Self::Rect(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}
