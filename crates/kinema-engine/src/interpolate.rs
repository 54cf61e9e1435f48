//! Keyframe interpolation for position, rotation and visibility tracks.
//!
//! Positions are linear between keyframes, clamped before the first key and
//! held after the last. Fragment positions accumulate: each key's value is a
//! delta on top of the creation anchor and every earlier delta.

use kinema_core::{KinemaError, KinemaResult, Lerp, TrackKind, Vec3};
use kinema_ir::{Placement, PositionKey, RotationKey, Segment, Track, VisibilityKey};

/// How a position track's values are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionMode {
    /// Key values are absolute placements.
    Absolute,
    /// Key values are deltas accumulated on top of `anchor`.
    OffsetAccumulating { anchor: Placement },
}

/// Position of a track at `frame`.
pub fn position_at(
    entity: &str,
    track: &Track<PositionKey>,
    frame: u64,
    mode: &PositionMode,
) -> KinemaResult<Placement> {
    match mode {
        PositionMode::Absolute => absolute_at(entity, track, frame),
        PositionMode::OffsetAccumulating { anchor } => {
            OffsetCursor::new(*anchor).position_at(entity, track, frame)
        }
    }
}

fn absolute_at(entity: &str, track: &Track<PositionKey>, frame: u64) -> KinemaResult<Placement> {
    let keys = track.keys();
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(empty_track(entity)),
    };
    match track.locate(frame) {
        Segment::Before => Ok(first.value),
        Segment::After => Ok(last.value),
        Segment::Within(k) => {
            let (a, b) = (&keys[k - 1], &keys[k]);
            if frame == b.frame {
                return Ok(b.value);
            }
            let t = fraction(entity, TrackKind::Position, a.frame, b.frame, frame)?;
            Ok(a.value.lerp(&b.value, t))
        }
    }
}

/// Running total of a fragment's offset deltas.
///
/// The sum of the deltas before the current segment is kept between queries
/// and only extended when a later segment is entered. A query for an earlier
/// segment than the cached one restarts the sum from the anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetCursor {
    anchor: Placement,
    summed: usize,
    total: Placement,
}

impl OffsetCursor {
    pub fn new(anchor: Placement) -> Self {
        Self {
            anchor,
            summed: 0,
            total: anchor,
        }
    }

    pub fn anchor(&self) -> Placement {
        self.anchor
    }

    /// Accumulated position once the first `count` deltas are applied.
    fn accumulate(&mut self, keys: &[PositionKey], count: usize) -> Placement {
        if count < self.summed {
            self.summed = 0;
            self.total = self.anchor;
        }
        for key in &keys[self.summed..count.min(keys.len())] {
            self.total = self.total.offset_by(&key.value);
        }
        self.summed = count.min(keys.len());
        self.total
    }

    pub fn position_at(
        &mut self,
        entity: &str,
        track: &Track<PositionKey>,
        frame: u64,
    ) -> KinemaResult<Placement> {
        let keys = track.keys();
        if keys.is_empty() {
            return Err(empty_track(entity));
        }
        match track.locate(frame) {
            Segment::Before => Ok(self.accumulate(keys, 1)),
            Segment::After => Ok(self.accumulate(keys, keys.len())),
            Segment::Within(k) => {
                let (a, b) = (&keys[k - 1], &keys[k]);
                let start = self.accumulate(keys, k);
                if frame == b.frame {
                    return Ok(start.offset_by(&b.value));
                }
                let t = fraction(entity, TrackKind::Position, a.frame, b.frame, frame)?;
                let step = b.value.zero_like().lerp(&b.value, t);
                Ok(start.offset_by(&step))
            }
        }
    }
}

/// A per-frame rotation step: the angles turned each frame are `axis ⊙ per_frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationStep {
    pub axis: Vec3,
    pub per_frame: Vec3,
}

impl RotationStep {
    /// Effective X/Y/Z angles of one frame.
    pub fn angles(&self) -> Vec3 {
        self.axis.component_mul(&self.per_frame)
    }
}

/// Rotation increment applied at `frame`, if `frame` falls inside a segment.
///
/// A segment `(f0, f1]` spreads its declared angle evenly over `f1 - f0` frames.
pub fn rotation_increment_at(
    entity: &str,
    track: &Track<RotationKey>,
    frame: u64,
) -> KinemaResult<Option<RotationStep>> {
    match track.locate(frame) {
        Segment::Before | Segment::After => Ok(None),
        Segment::Within(k) => {
            let keys = track.keys();
            let (a, b) = (&keys[k - 1], &keys[k]);
            if b.frame <= a.frame {
                return Err(KinemaError::zero_length(entity, TrackKind::Rotation, b.frame));
            }
            Ok(Some(RotationStep {
                axis: b.axis,
                per_frame: b.angle.per((b.frame - a.frame) as f64),
            }))
        }
    }
}

/// Visibility at `frame`: the latest key at or before `frame`, else the first key.
/// A missing or empty track means visible.
pub fn visibility_at(track: Option<&Track<VisibilityKey>>, frame: u64) -> bool {
    let Some(keys) = track.map(|t| t.keys()).filter(|k| !k.is_empty()) else {
        return true;
    };
    let idx = keys.partition_point(|k| k.frame <= frame);
    keys[idx.saturating_sub(1)].visible
}

fn fraction(entity: &str, kind: TrackKind, f0: u64, f1: u64, frame: u64) -> KinemaResult<f64> {
    if f1 <= f0 {
        return Err(KinemaError::zero_length(entity, kind, f1));
    }
    Ok((frame - f0) as f64 / (f1 - f0) as f64)
}

fn empty_track(entity: &str) -> KinemaError {
    KinemaError::Validation(format!("entity '{}' has an empty position track", entity))
}
