use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kinema_core::{CameraPose, FrameRange, KinemaError, KinemaResult, Light};

use crate::entity::EntityDefinition;

/// Scene-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSettings {
    /// First frame of the sequence.
    #[serde(default)]
    pub frame_start: u64,
    /// End of the sequence (exclusive). Derived from the tracks when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_end: Option<u64>,
    /// Camera used when no camera entity exists.
    #[serde(default)]
    pub default_camera: CameraPose,
    #[serde(default = "default_lights")]
    pub lights: Vec<Light>,
}

fn default_lights() -> Vec<Light> {
    vec![Light::default()]
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            frame_start: 0,
            frame_end: None,
            default_camera: CameraPose::default(),
            lights: default_lights(),
        }
    }
}

fn new_scene_id() -> String {
    Uuid::new_v4().to_string()
}

/// The root of the scene description: settings plus entities in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescriptor {
    /// Unique scene identifier.
    #[serde(default = "new_scene_id")]
    pub id: String,
    #[serde(default)]
    pub settings: SceneSettings,
    /// Entity definitions; declaration order is significant.
    #[serde(default)]
    pub entities: Vec<EntityDefinition>,
}

impl SceneDescriptor {
    /// Create an empty scene with the given settings.
    pub fn new(settings: SceneSettings) -> Self {
        Self {
            id: new_scene_id(),
            settings,
            entities: Vec::new(),
        }
    }

    /// Add an entity at the end of the declaration order.
    pub fn add_entity(&mut self, entity: EntityDefinition) {
        self.entities.push(entity);
    }

    /// Get an entity by name.
    pub fn get(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Declaration index of an entity.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The minimum frame: frame production starts here.
    pub fn min_frame(&self) -> u64 {
        self.settings.frame_start
    }

    /// Last keyframe of any track in the scene.
    pub fn latest_keyframe(&self) -> Option<u64> {
        self.entities
            .iter()
            .flat_map(|e| {
                [
                    e.position_track.last_frame(),
                    e.rotation_track.as_ref().and_then(|t| t.last_frame()),
                    e.visibility_track.as_ref().and_then(|t| t.last_frame()),
                ]
            })
            .flatten()
            .max()
    }

    /// Frames to produce: the configured range, or up to and including the last keyframe.
    pub fn frame_range(&self) -> FrameRange {
        let start = self.settings.frame_start;
        let end = self
            .settings
            .frame_end
            .unwrap_or_else(|| self.latest_keyframe().map_or(start, |f| f + 1).max(start));
        FrameRange::new(start, end)
    }

    /// Append another scene's entities, rejecting name clashes.
    pub fn merge(&mut self, other: SceneDescriptor) -> KinemaResult<()> {
        if let Some(clash) = other
            .entities
            .iter()
            .find(|e| self.get(&e.name).is_some())
        {
            return Err(KinemaError::Validation(format!(
                "cannot merge scenes: entity '{}' defined twice",
                clash.name
            )));
        }
        self.entities.extend(other.entities);
        Ok(())
    }

    pub fn from_json_str(json: &str) -> KinemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &std::path::Path) -> KinemaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> KinemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for SceneDescriptor {
    fn default() -> Self {
        Self::new(SceneSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, StaticGeometry};
    use crate::track::PositionKey;
    use kinema_core::Vec3;

    fn body(name: &str, frames: &[u64]) -> EntityDefinition {
        let mut def = EntityDefinition::new(
            name,
            EntityKind::FileDefinedBody {
                source: format!("{name}.json").into(),
            },
        );
        for f in frames {
            def.position_track.push(PositionKey::new(*f, Vec3::zero()));
        }
        def
    }

    #[test]
    fn test_scene_lookup() {
        let mut scene = SceneDescriptor::default();
        scene.add_entity(body("a", &[0]));
        scene.add_entity(body("b", &[0]));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.index_of("b"), Some(1));
        assert!(scene.get("c").is_none());
    }

    #[test]
    fn test_frame_range_from_tracks() {
        let mut scene = SceneDescriptor::default();
        scene.add_entity(body("a", &[0, 30, 90]));
        scene.add_entity(body("b", &[10, 250]));
        assert_eq!(scene.frame_range(), FrameRange::new(0, 251));

        scene.settings.frame_end = Some(100);
        assert_eq!(scene.frame_range(), FrameRange::new(0, 100));
    }

    #[test]
    fn test_merge_rejects_clash() {
        let mut a = SceneDescriptor::default();
        a.add_entity(body("water", &[0]));
        let mut b = SceneDescriptor::default();
        b.add_entity(body("water", &[0]));
        assert!(a.merge(b).is_err());

        let mut c = SceneDescriptor::default();
        c.add_entity(body("nad", &[0]));
        a.merge(c).unwrap();
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_scene_from_json() {
        let json = r#"{
            "settings": { "frame_start": 0, "frame_end": 280 },
            "entities": [
                {
                    "name": "camera",
                    "kind": { "type": "static_primitive", "geometry": "camera" },
                    "position_track": [
                        { "frame": 0, "value": { "eye": [0, 0, 100], "look_at": [0, 0, 0] } },
                        { "frame": 30, "value": { "eye": [30, 0, 50], "look_at": [30, 0, -10] } }
                    ]
                },
                {
                    "name": "ethanol1",
                    "kind": { "type": "file_defined_body", "source": "ethanol.json" },
                    "position_track": [
                        { "frame": 30, "value": [70, 0, 0] },
                        { "frame": 90, "value": [30, 0, 0], "joins": ["h_movement1"] }
                    ],
                    "display_label": true
                }
            ]
        }"#;
        let scene = SceneDescriptor::from_json_str(json).unwrap();
        assert!(!scene.id.is_empty());
        assert_eq!(scene.settings.lights.len(), 1);
        assert_eq!(scene.entities.len(), 2);
        assert!(matches!(
            scene.entities[0].kind,
            EntityKind::StaticPrimitive {
                geometry: StaticGeometry::Camera
            }
        ));
        assert!(scene.entities[1].display_label);
        assert_eq!(scene.entities[1].join_events().count(), 1);
    }
}
