//! Playout Anim - Keyframe animation engine
//!
//! Time-varying parameter values for filters and transitions:
//! - Typed animatable values (scalar, color, rect, text)
//! - Interpolation kernels (discrete, linear, three Catmull-Rom flavors)
//! - The `Animation` keyframe store with string parse/serialize

pub mod animation;
pub mod parse;
pub mod spline;
pub mod value;

pub use animation::{AnimItem, Animation};
pub use parse::TimeFormat;
pub use spline::KeyframeType;
pub use value::{AnimValue, Color, Rect};
