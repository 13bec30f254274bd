//! The keyframe store.
//!
//! Nodes live in a vector kept strictly sorted by frame with no duplicate
//! frames. The first node is always treated as a keyframe so a value is
//! defined at and before position 0. Non-key nodes are re-interpolated from
//! the surrounding keyframes on every mutation.

use crate::parse::{self, ParsedItem, TimeFormat};
use crate::spline::{
    catmull_rom_interpolate, linear_interpolate, ControlPoint, KeyframeType, BOUNDARY_PUSH,
};
use crate::value::AnimValue;
use playout_core::{PlayoutError, Result};
use tracing::warn;

/// One node of an animation: an explicit keyframe or an interpolated value
/// pinned at a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimItem {
    pub frame: i64,
    pub is_key: bool,
    pub keyframe_type: KeyframeType,
    pub value: AnimValue,
}

impl AnimItem {
    /// A keyframe with the default (linear) interpolation.
    pub fn key(frame: i64, value: AnimValue) -> Self {
        Self {
            frame,
            is_key: true,
            keyframe_type: KeyframeType::Linear,
            value,
        }
    }

    /// A keyframe with an explicit interpolation type.
    pub fn key_typed(frame: i64, value: AnimValue, keyframe_type: KeyframeType) -> Self {
        Self {
            frame,
            is_key: true,
            keyframe_type,
            value,
        }
    }
}

/// A keyframe animation over one property.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    nodes: Vec<AnimItem>,
    length: i64,
    fps: f64,
    time_format: TimeFormat,
    serialized: Option<String>,
}

impl Animation {
    pub fn new(fps: f64) -> Self {
        Self {
            nodes: Vec::new(),
            length: 0,
            fps,
            time_format: TimeFormat::Frames,
            serialized: None,
        }
    }

    /// Parse a serialized keyframe string, replacing any existing nodes.
    ///
    /// Malformed items are skipped with a warning rather than failing the
    /// whole parse; hand-edited data is common. The input string becomes the
    /// cached serialization until the next mutation.
    pub fn parse(&mut self, data: &str, length: i64) -> Result<()> {
        self.length = length;
        self.nodes.clear();
        for raw in parse::split_items(data) {
            match parse::parse_item(raw, self.fps, length) {
                Ok(item) => self.place(node_from(item)),
                Err(err) => warn!(item = raw, %err, "skipping malformed keyframe item"),
            }
        }
        self.force_head_key();
        self.refresh();
        self.serialized = Some(data.to_string());
        Ok(())
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn set_time_format(&mut self, format: TimeFormat) {
        if format != self.time_format {
            self.time_format = format;
            self.serialized = None;
        }
    }

    /// The configured length, or the last node's frame when unset.
    pub fn length(&self) -> i64 {
        if self.length > 0 {
            self.length
        } else {
            self.nodes.last().map_or(0, |n| n.frame)
        }
    }

    /// Change the length; shrinking discards nodes beyond the new length.
    pub fn set_length(&mut self, length: i64) {
        if length < self.length {
            self.nodes.retain(|n| n.frame <= length);
            self.force_head_key();
            self.refresh();
        }
        self.length = length;
        self.serialized = None;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate the animation at `frame`.
    ///
    /// Positions outside the keyframe range hold the nearest endpoint value
    /// without extrapolation. Returns `None` only when there are no nodes.
    pub fn get_item(&self, frame: i64) -> Option<AnimItem> {
        let keys: Vec<&AnimItem> = self.nodes.iter().filter(|n| n.is_key).collect();
        let (first, last) = (keys.first()?, keys.last()?);

        if frame <= first.frame {
            return Some(AnimItem {
                frame,
                is_key: frame == first.frame,
                keyframe_type: first.keyframe_type,
                value: first.value.clone(),
            });
        }
        if frame >= last.frame {
            return Some(AnimItem {
                frame,
                is_key: frame == last.frame,
                keyframe_type: last.keyframe_type,
                value: last.value.clone(),
            });
        }

        // keys[i] <= frame < keys[i + 1]
        let i = keys.partition_point(|k| k.frame <= frame) - 1;
        let (p1, p2) = (keys[i], keys[i + 1]);
        if p1.frame == frame {
            return Some(AnimItem {
                frame,
                is_key: true,
                keyframe_type: p1.keyframe_type,
                value: p1.value.clone(),
            });
        }

        // Non-numeric values never interpolate, whatever type was requested.
        let kind = if p1.value.is_numeric() && p2.value.is_numeric() {
            p1.keyframe_type
        } else {
            KeyframeType::Discrete
        };
        let value = match kind {
            KeyframeType::Discrete => p1.value.clone(),
            KeyframeType::Linear => {
                let t = (frame - p1.frame) as f64 / (p2.frame - p1.frame) as f64;
                AnimValue::interpolate_with([&p1.value, &p1.value, &p2.value, &p2.value], |y| {
                    linear_interpolate(y[1], y[2], t)
                })
            }
            _ => {
                // Duplicate the endpoints at sequence boundaries, pushed out
                // along the time axis so the tangent stays near horizontal.
                let p0 = i.checked_sub(1).map(|j| keys[j]).unwrap_or(p1);
                let p3 = keys.get(i + 2).copied().unwrap_or(p2);
                let x0 = if p0.frame == p1.frame {
                    p1.frame as f64 - BOUNDARY_PUSH
                } else {
                    p0.frame as f64
                };
                let x3 = if p3.frame == p2.frame {
                    p2.frame as f64 + BOUNDARY_PUSH
                } else {
                    p3.frame as f64
                };
                let (x1, x2) = (p1.frame as f64, p2.frame as f64);
                let t = (frame as f64 - x1) / (x2 - x1);
                AnimValue::interpolate_with(
                    [&p0.value, &p1.value, &p2.value, &p3.value],
                    |y| {
                        catmull_rom_interpolate(
                            ControlPoint::new(x0, y[0]),
                            ControlPoint::new(x1, y[1]),
                            ControlPoint::new(x2, y[2]),
                            ControlPoint::new(x3, y[3]),
                            t,
                            kind,
                        )
                    },
                )
            }
        };
        Some(AnimItem {
            frame,
            is_key: false,
            keyframe_type: kind,
            value,
        })
    }

    /// Shorthand for the evaluated value at `frame`.
    pub fn get(&self, frame: i64) -> Option<AnimValue> {
        self.get_item(frame).map(|item| item.value)
    }

    /// Insert a node, overwriting any node already at the same frame.
    pub fn insert(&mut self, item: AnimItem) {
        self.place(item);
        self.force_head_key();
        self.refresh();
        self.serialized = None;
    }

    /// Insert a linear keyframe.
    pub fn set(&mut self, frame: i64, value: AnimValue) {
        self.insert(AnimItem::key(frame, value));
    }

    /// Remove the node at exactly `frame`.
    pub fn remove(&mut self, frame: i64) -> Result<()> {
        match self.nodes.binary_search_by_key(&frame, |n| n.frame) {
            Ok(i) => {
                self.nodes.remove(i);
                self.force_head_key();
                self.refresh();
                self.serialized = None;
                Ok(())
            }
            Err(_) => Err(PlayoutError::InvalidParameter(format!(
                "no keyframe at frame {frame}"
            ))),
        }
    }

    /// Whether an explicit keyframe exists at `frame`.
    pub fn is_key(&self, frame: i64) -> bool {
        matches!(
            self.nodes.binary_search_by_key(&frame, |n| n.frame),
            Ok(i) if self.nodes[i].is_key
        )
    }

    /// The first keyframe at or after `frame`.
    pub fn next_key(&self, frame: i64) -> Option<&AnimItem> {
        self.nodes.iter().find(|n| n.is_key && n.frame >= frame)
    }

    /// The last keyframe at or before `frame`.
    pub fn previous_key(&self, frame: i64) -> Option<&AnimItem> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.is_key && n.frame <= frame)
    }

    pub fn key_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_key).count()
    }

    /// The `index`-th keyframe in frame order.
    pub fn key_get(&self, index: usize) -> Option<&AnimItem> {
        self.nodes.iter().filter(|n| n.is_key).nth(index)
    }

    /// Change the interpolation type of the `index`-th keyframe.
    pub fn key_set_type(&mut self, index: usize, keyframe_type: KeyframeType) -> Result<()> {
        let i = self
            .key_node_index(index)
            .ok_or_else(|| PlayoutError::InvalidParameter(format!("no keyframe {index}")))?;
        self.nodes[i].keyframe_type = keyframe_type;
        self.refresh();
        self.serialized = None;
        Ok(())
    }

    /// Move the `index`-th keyframe to a new frame. Fails if another node
    /// already occupies that frame.
    pub fn key_set_frame(&mut self, index: usize, frame: i64) -> Result<()> {
        let i = self
            .key_node_index(index)
            .ok_or_else(|| PlayoutError::InvalidParameter(format!("no keyframe {index}")))?;
        if self.nodes[i].frame == frame {
            return Ok(());
        }
        if self
            .nodes
            .binary_search_by_key(&frame, |n| n.frame)
            .is_ok()
        {
            return Err(PlayoutError::InvalidParameter(format!(
                "a node already exists at frame {frame}"
            )));
        }
        self.nodes[i].frame = frame;
        self.nodes.sort_by_key(|n| n.frame);
        self.force_head_key();
        self.refresh();
        self.serialized = None;
        Ok(())
    }

    /// Shift every node by `delta` frames.
    pub fn shift_frames(&mut self, delta: i64) {
        for node in &mut self.nodes {
            node.frame += delta;
        }
        self.serialized = None;
    }

    /// Serialize the whole animation. The result is cached until the next
    /// mutation; a string set by `parse` is returned verbatim.
    pub fn serialize(&mut self) -> String {
        if self.serialized.is_none() {
            let mut out = String::new();
            for key in self.nodes.iter().filter(|n| n.is_key) {
                self.emit_item(&mut out, key, key.frame);
            }
            self.serialized = Some(out);
        }
        self.serialized.clone().unwrap_or_default()
    }

    /// Serialize the subrange `[in_frame, out_frame]` with times rebased to
    /// zero. Boundary positions that are not explicit keyframes are emitted
    /// as interpolated keyframes so the cut stands alone.
    pub fn serialize_cut(&self, in_frame: i64, out_frame: i64) -> String {
        let in_frame = if in_frame < 0 { 0 } else { in_frame };
        let out_frame = if out_frame < 0 {
            self.length()
        } else {
            out_frame
        };
        let mut out = String::new();

        if let Some(item) = self.get_item(in_frame) {
            if !item.is_key {
                self.emit_item(&mut out, &item, 0);
            }
        }
        for key in self
            .nodes
            .iter()
            .filter(|n| n.is_key && n.frame >= in_frame && n.frame <= out_frame)
        {
            self.emit_item(&mut out, key, key.frame - in_frame);
        }
        if out_frame > in_frame {
            if let Some(item) = self.get_item(out_frame) {
                if !item.is_key {
                    self.emit_item(&mut out, &item, out_frame - in_frame);
                }
            }
        }
        out
    }

    /// Recompute the values of all non-key nodes from the keyframes around
    /// them.
    pub fn refresh(&mut self) {
        let updates: Vec<(usize, AnimValue)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_key)
            .filter_map(|(i, n)| self.get(n.frame).map(|v| (i, v)))
            .collect();
        for (i, value) in updates {
            self.nodes[i].value = value;
        }
    }

    fn emit_item(&self, out: &mut String, item: &AnimItem, frame: i64) {
        if !out.is_empty() {
            out.push(';');
        }
        out.push_str(&parse::format_time(frame, self.fps, self.time_format));
        out.push_str(item.keyframe_type.glyph());
        out.push('=');
        out.push_str(&parse::quote_value(&item.value.to_string()));
    }

    /// Place a node in sorted position without refreshing.
    fn place(&mut self, item: AnimItem) {
        match self.nodes.binary_search_by_key(&item.frame, |n| n.frame) {
            Ok(i) => self.nodes[i] = item,
            Err(i) => self.nodes.insert(i, item),
        }
    }

    fn force_head_key(&mut self) {
        if let Some(head) = self.nodes.first_mut() {
            head.is_key = true;
        }
    }

    fn key_node_index(&self, index: usize) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_key)
            .nth(index)
            .map(|(i, _)| i)
    }
}

fn node_from(item: ParsedItem) -> AnimItem {
    AnimItem {
        frame: item.frame,
        is_key: true,
        keyframe_type: item.keyframe_type.unwrap_or_default(),
        value: item.value,
    }
}
