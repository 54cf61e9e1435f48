use serde::{Deserialize, Serialize};

use kinema_core::{CameraPose, Lerp, Vec3};

/// Anything stored at a specific frame of a track.
pub trait Keyframe {
    fn frame(&self) -> u64;
}

/// The value of a position keyframe: a point, or an eye/look-at pair for cameras.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Placement {
    Point(Vec3),
    Camera(CameraPose),
}

impl Placement {
    pub fn point(&self) -> Option<Vec3> {
        match self {
            Placement::Point(p) => Some(*p),
            Placement::Camera(_) => None,
        }
    }

    pub fn camera(&self) -> Option<CameraPose> {
        match self {
            Placement::Camera(c) => Some(*c),
            Placement::Point(_) => None,
        }
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, Placement::Camera(_))
    }

    /// Zero placement of the same shape.
    pub fn zero_like(&self) -> Placement {
        match self {
            Placement::Point(_) => Placement::Point(Vec3::zero()),
            Placement::Camera(_) => Placement::Camera(CameraPose::new(Vec3::zero(), Vec3::zero())),
        }
    }

    /// Treat `delta` as an offset and add it to this placement.
    ///
    /// A point delta applied to a camera moves eye and target together.
    /// A camera delta applied to a point moves it by the eye component.
    pub fn offset_by(&self, delta: &Placement) -> Placement {
        match (self, delta) {
            (Placement::Point(p), Placement::Point(d)) => Placement::Point(*p + *d),
            (Placement::Point(p), Placement::Camera(d)) => Placement::Point(*p + d.eye),
            (Placement::Camera(c), Placement::Point(d)) => {
                Placement::Camera(CameraPose::new(c.eye + *d, c.look_at + *d))
            }
            (Placement::Camera(c), Placement::Camera(d)) => {
                Placement::Camera(CameraPose::new(c.eye + d.eye, c.look_at + d.look_at))
            }
        }
    }
}

impl Lerp for Placement {
    fn lerp(&self, other: &Placement, t: f64) -> Placement {
        match (self, other) {
            (Placement::Point(a), Placement::Point(b)) => Placement::Point(a.lerp(b, t)),
            (Placement::Camera(a), Placement::Camera(b)) => Placement::Camera(a.lerp(b, t)),
            // Mixed shapes are rejected by validation; hold the start value.
            _ => *self,
        }
    }
}

impl From<Vec3> for Placement {
    fn from(p: Vec3) -> Self {
        Placement::Point(p)
    }
}

impl From<CameraPose> for Placement {
    fn from(c: CameraPose) -> Self {
        Placement::Camera(c)
    }
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Point(p) => write!(f, "{}", p),
            Placement::Camera(c) => write!(f, "eye {} look_at {}", c.eye, c.look_at),
        }
    }
}

/// A position keyframe, optionally carrying join events that fire at its frame.
///
/// For fragments `value` is an offset accumulated on top of all earlier keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionKey {
    pub frame: u64,
    pub value: Placement,
    /// Entities absorbed into the owning entity once this frame is reached.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<String>,
}

impl PositionKey {
    pub fn new(frame: u64, value: impl Into<Placement>) -> Self {
        Self {
            frame,
            value: value.into(),
            joins: Vec::new(),
        }
    }

    pub fn with_join(mut self, absorbed: impl Into<String>) -> Self {
        self.joins.push(absorbed.into());
        self
    }
}

impl Keyframe for PositionKey {
    fn frame(&self) -> u64 {
        self.frame
    }
}

/// A rotation keyframe. The segment ending here turns by `axis ⊙ angle` in total,
/// spread evenly over the frames of the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationKey {
    pub frame: u64,
    pub axis: Vec3,
    pub angle: Vec3,
}

impl RotationKey {
    pub fn new(frame: u64, axis: Vec3, angle: Vec3) -> Self {
        Self { frame, axis, angle }
    }
}

impl Keyframe for RotationKey {
    fn frame(&self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityKey {
    pub frame: u64,
    pub visible: bool,
}

impl VisibilityKey {
    pub fn new(frame: u64, visible: bool) -> Self {
        Self { frame, visible }
    }
}

impl Keyframe for VisibilityKey {
    fn frame(&self) -> u64 {
        self.frame
    }
}

/// Where a frame falls relative to a track's keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// At or before the first keyframe (or the track is empty).
    Before,
    /// Inside the segment ending at key `k` (k >= 1): `frame` is in `(f[k-1], f[k]]`.
    Within(usize),
    /// After the last keyframe.
    After,
}

/// An ordered sequence of keyframes for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track<K> {
    keys: Vec<K>,
}

impl<K> Default for Track<K> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<K: Keyframe> Track<K> {
    /// Create a track from keys; frames are expected to be strictly increasing.
    pub fn new(keys: Vec<K>) -> Self {
        Self { keys }
    }

    pub fn push(&mut self, key: K) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut [K] {
        &mut self.keys
    }

    pub fn get(&self, index: usize) -> Option<&K> {
        self.keys.get(index)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first_frame(&self) -> Option<u64> {
        self.keys.first().map(Keyframe::frame)
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.keys.last().map(Keyframe::frame)
    }

    /// Locate the segment bracketing `frame`.
    pub fn locate(&self, frame: u64) -> Segment {
        match (self.first_frame(), self.last_frame()) {
            (Some(first), _) if frame <= first => Segment::Before,
            (_, Some(last)) if frame > last => Segment::After,
            (Some(_), Some(_)) => {
                Segment::Within(self.keys.partition_point(|k| k.frame() < frame))
            }
            _ => Segment::Before,
        }
    }

    /// The first pair of neighbouring keys whose frames are not strictly increasing.
    pub fn first_disorder(&self) -> Option<(usize, u64, u64)> {
        self.keys
            .windows(2)
            .enumerate()
            .find(|(_, pair)| pair[1].frame() <= pair[0].frame())
            .map(|(i, pair)| (i + 1, pair[0].frame(), pair[1].frame()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(frames: &[u64]) -> Track<VisibilityKey> {
        Track::new(frames.iter().map(|f| VisibilityKey::new(*f, true)).collect())
    }

    #[test]
    fn test_locate_brackets() {
        let t = track(&[10, 20, 40]);
        assert_eq!(t.locate(0), Segment::Before);
        assert_eq!(t.locate(10), Segment::Before);
        assert_eq!(t.locate(11), Segment::Within(1));
        assert_eq!(t.locate(20), Segment::Within(1));
        assert_eq!(t.locate(21), Segment::Within(2));
        assert_eq!(t.locate(40), Segment::Within(2));
        assert_eq!(t.locate(41), Segment::After);
    }

    #[test]
    fn test_locate_empty_and_single() {
        assert_eq!(track(&[]).locate(5), Segment::Before);
        let single = track(&[7]);
        assert_eq!(single.locate(7), Segment::Before);
        assert_eq!(single.locate(8), Segment::After);
    }

    #[test]
    fn test_first_disorder() {
        assert_eq!(track(&[0, 5, 9]).first_disorder(), None);
        assert_eq!(track(&[0, 5, 5]).first_disorder(), Some((2, 5, 5)));
        assert_eq!(track(&[0, 8, 3]).first_disorder(), Some((2, 8, 3)));
    }

    #[test]
    fn test_placement_json_shapes() {
        let p: Placement = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(p, Placement::Point(Vec3::new(1.0, 2.0, 3.0)));
        let c: Placement =
            serde_json::from_str(r#"{"eye": [0, 0, 100], "look_at": [0, 0, 0]}"#).unwrap();
        assert!(c.is_camera());
    }

    #[test]
    fn test_position_key_joins_default_empty() {
        let k: PositionKey = serde_json::from_str(r#"{"frame": 4, "value": [0, 0, 0]}"#).unwrap();
        assert!(k.joins.is_empty());
        let k: PositionKey =
            serde_json::from_str(r#"{"frame": 90, "value": [30, 0, 0], "joins": ["h1"]}"#)
                .unwrap();
        assert_eq!(k.joins, vec!["h1".to_string()]);
    }

    #[test]
    fn test_offset_by_moves_camera_pair() {
        let cam = Placement::Camera(CameraPose::new(Vec3::new(0.0, 0.0, 10.0), Vec3::zero()));
        let moved = cam.offset_by(&Placement::Point(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(
            moved,
            Placement::Camera(CameraPose::new(
                Vec3::new(1.0, 0.0, 10.0),
                Vec3::new(1.0, 0.0, 0.0)
            ))
        );
    }
}
