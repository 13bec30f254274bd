//! Interpolation kernels.
//!
//! Besides discrete and linear, three Catmull-Rom flavors are provided,
//! distinguished by the distance-parameterization exponent `alpha` and a
//! `tension` applied to the tangents:
//!
//! - loose:   alpha 0.0 (uniform), tension 1.0, flat tangents at keys
//! - natural: alpha 0.5 (centripetal), tension -1.0, emphasized tangents
//!   that are flattened at local peaks so values never overshoot an extreme
//! - tight:   alpha 0.5 (centripetal), tension 0.0, plain centripetal
//!
//! At sequence boundaries the duplicated endpoint is pushed
//! [`BOUNDARY_PUSH`] frame units away along the time axis before the spline
//! math runs, which yields a near-horizontal tangent instead of a degenerate
//! zero-length segment.

use serde::{Deserialize, Serialize};

/// How far a duplicated boundary control point is pushed along the time axis.
pub const BOUNDARY_PUSH: f64 = 10_000.0;

/// How to interpolate from a keyframe to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyframeType {
    /// Value changes instantaneously at the keyframe (step function).
    Discrete,
    /// Constant pace to the next keyframe.
    #[default]
    Linear,
    /// Uniform Catmull-Rom with flat key tangents.
    SmoothLoose,
    /// Centripetal Catmull-Rom, overshoot-free at extremes.
    SmoothNatural,
    /// Centripetal Catmull-Rom.
    SmoothTight,
}

impl KeyframeType {
    /// The glyph that precedes `=` in the serialized form.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Discrete => "|",
            Self::Linear => "",
            Self::SmoothLoose => "~",
            Self::SmoothNatural => "$",
            Self::SmoothTight => "-",
        }
    }

    /// Map a glyph character to a keyframe type.
    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '|' | '!' => Some(Self::Discrete),
            '~' => Some(Self::SmoothLoose),
            '$' => Some(Self::SmoothNatural),
            '-' => Some(Self::SmoothTight),
            _ => None,
        }
    }

    /// Distance-parameterization exponent for the smooth kernels.
    fn alpha(self) -> f64 {
        match self {
            Self::SmoothLoose => 0.0,
            _ => 0.5,
        }
    }

    /// Tangent tension for the smooth kernels. Negative means "emphasize,
    /// but flatten at local extremes".
    fn tension(self) -> f64 {
        match self {
            Self::SmoothLoose => 1.0,
            Self::SmoothNatural => -1.0,
            _ => 0.0,
        }
    }

    /// Whether this type uses the Catmull-Rom kernel.
    pub fn is_smooth(self) -> bool {
        matches!(
            self,
            Self::SmoothLoose | Self::SmoothNatural | Self::SmoothTight
        )
    }
}

/// A control point on the time/value plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

impl ControlPoint {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Linear interpolation between y1 and y2.
#[inline]
pub fn linear_interpolate(y1: f64, y2: f64, t: f64) -> f64 {
    y1 + (y2 - y1) * t
}

/// Evaluate a tension/alpha-parameterized Catmull-Rom segment.
///
/// `p1` and `p2` straddle the query; `p0`/`p3` are the outer neighbors. `t`
/// is the normalized position in [0, 1] between p1 and p2. Callers are
/// responsible for the boundary push; duplicated x positions here degrade to
/// linear.
pub fn catmull_rom_interpolate(
    p0: ControlPoint,
    p1: ControlPoint,
    p2: ControlPoint,
    p3: ControlPoint,
    t: f64,
    kind: KeyframeType,
) -> f64 {
    let span = p2.x - p1.x;
    if span <= 0.0 {
        return p1.y;
    }

    let alpha = kind.alpha();
    let tension = kind.tension();

    // Time-axis distances raised to alpha; alpha 0 gives the uniform spline.
    let t01 = (p1.x - p0.x).abs().max(f64::EPSILON).powf(alpha);
    let t12 = span.powf(alpha);
    let t23 = (p3.x - p2.x).abs().max(f64::EPSILON).powf(alpha);

    let dy = p2.y - p1.y;
    let scale = 1.0 - tension;

    let mut m1 = scale
        * (dy + t12 * ((p1.y - p0.y) / t01 - (p2.y - p0.y) / (t01 + t12)));
    let mut m2 = scale
        * (dy + t12 * ((p3.y - p2.y) / t23 - (p3.y - p1.y) / (t12 + t23)));

    if tension < 0.0 {
        // Flatten the tangent at a local peak or trough so the curve never
        // overshoots the keyframe value.
        if (p1.y - p0.y) * (p2.y - p1.y) < 0.0 {
            m1 = 0.0;
        }
        if (p2.y - p1.y) * (p3.y - p2.y) < 0.0 {
            m2 = 0.0;
        }
    }

    // Cubic Hermite in t.
    let a = 2.0 * (p1.y - p2.y) + m1 + m2;
    let b = -3.0 * (p1.y - p2.y) - 2.0 * m1 - m2;
    a * t * t * t + b * t * t + m1 * t + p1.y
}
