use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use kinema_core::Primitive;

use crate::track::{PositionKey, RotationKey, Track, VisibilityKey};

/// Geometry of a static primitive entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticGeometry {
    /// Shapes positioned relative to the entity's placement.
    Shapes(Vec<Primitive>),
    /// A camera: its "geometry" is the eye/look-at pair of its position track.
    Camera,
}

/// What kind of entity this is and how its geometry comes into existence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Geometry fixed at load time.
    StaticPrimitive { geometry: StaticGeometry },
    /// A rigid assembly loaded from a structure file.
    FileDefinedBody { source: PathBuf },
    /// Created by detaching `selector` elements from `parent` once its first keyframe is reached.
    SplitFragment { parent: String, selector: Vec<usize> },
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::StaticPrimitive {
                geometry: StaticGeometry::Camera,
            } => write!(f, "camera"),
            EntityKind::StaticPrimitive { .. } => write!(f, "static primitive"),
            EntityKind::FileDefinedBody { .. } => write!(f, "body"),
            EntityKind::SplitFragment { .. } => write!(f, "fragment"),
        }
    }
}

/// One animatable entity of the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Unique entity name.
    pub name: String,
    pub kind: EntityKind,
    /// Absolute placements, or offsets for fragments.
    pub position_track: Track<PositionKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_track: Option<Track<RotationKey>>,
    /// Missing track means visible whenever active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_track: Option<Track<VisibilityKey>>,
    /// Render a name label next to the entity.
    #[serde(default)]
    pub display_label: bool,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            position_track: Track::default(),
            rotation_track: None,
            visibility_track: None,
            display_label: false,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.kind, EntityKind::SplitFragment { .. })
    }

    pub fn is_camera(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::StaticPrimitive {
                geometry: StaticGeometry::Camera
            }
        )
    }

    /// Name of the entity this fragment splits from.
    pub fn parent(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::SplitFragment { parent, .. } => Some(parent),
            _ => None,
        }
    }

    pub fn selector(&self) -> Option<&[usize]> {
        match &self.kind {
            EntityKind::SplitFragment { selector, .. } => Some(selector),
            _ => None,
        }
    }

    /// Ordering key among siblings of the same parent: the highest selected index.
    pub fn split_index(&self) -> Option<usize> {
        self.selector().and_then(|s| s.iter().copied().max())
    }

    /// First frame of the position track (0 when the track is empty).
    pub fn earliest_frame(&self) -> u64 {
        self.position_track.first_frame().unwrap_or(0)
    }

    /// Every join event as `(key index, frame, absorbed entity)`.
    pub fn join_events(&self) -> impl Iterator<Item = (usize, u64, &str)> + '_ {
        self.position_track
            .keys()
            .iter()
            .enumerate()
            .flat_map(|(i, key)| key.joins.iter().map(move |j| (i, key.frame, j.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::Vec3;

    #[test]
    fn test_fragment_accessors() {
        let def = EntityDefinition::new(
            "hNAD1",
            EntityKind::SplitFragment {
                parent: "ethanol1".into(),
                selector: vec![8, 2],
            },
        );
        assert!(def.is_fragment());
        assert_eq!(def.parent(), Some("ethanol1"));
        assert_eq!(def.split_index(), Some(8));
        assert_eq!(def.kind.to_string(), "fragment");
    }

    #[test]
    fn test_join_events_listed_in_key_order() {
        let mut def = EntityDefinition::new(
            "ethanol1",
            EntityKind::FileDefinedBody {
                source: "ethanol.json".into(),
            },
        );
        def.position_track
            .push(PositionKey::new(30, Vec3::new(70.0, 0.0, 0.0)));
        def.position_track.push(
            PositionKey::new(90, Vec3::new(30.0, 0.0, 0.0))
                .with_join("h1")
                .with_join("h2"),
        );
        let events: Vec<_> = def.join_events().collect();
        assert_eq!(events, vec![(1, 90, "h1"), (1, 90, "h2")]);
        assert_eq!(def.earliest_frame(), 30);
    }

    #[test]
    fn test_kind_json_tagging() {
        let kind: EntityKind =
            serde_json::from_str(r#"{"type": "split_fragment", "parent": "a", "selector": [3]}"#)
                .unwrap();
        assert_eq!(kind.to_string(), "fragment");
        let cam: EntityKind =
            serde_json::from_str(r#"{"type": "static_primitive", "geometry": "camera"}"#).unwrap();
        assert_eq!(cam.to_string(), "camera");
    }
}
