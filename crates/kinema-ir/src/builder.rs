use std::path::PathBuf;

use kinema_core::{CameraPose, Light, Primitive, Vec3};

use crate::entity::{EntityDefinition, EntityKind, StaticGeometry};
use crate::scene::{SceneDescriptor, SceneSettings};
use crate::track::{PositionKey, RotationKey, Track, VisibilityKey};

/// A builder for constructing a scene descriptor programmatically.
/// Useful for SDK-style authoring, generated scenes, and unit testing.
pub struct SceneBuilder {
    scene: SceneDescriptor,
    explicit_lights: bool,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self {
            scene: SceneDescriptor::new(SceneSettings::default()),
            explicit_lights: false,
        }
    }

    /// Set the frame range `start..end`.
    pub fn frames(mut self, start: u64, end: u64) -> Self {
        self.scene.settings.frame_start = start;
        self.scene.settings.frame_end = Some(end);
        self
    }

    pub fn default_camera(mut self, eye: [f64; 3], look_at: [f64; 3]) -> Self {
        self.scene.settings.default_camera = CameraPose::new(eye.into(), look_at.into());
        self
    }

    /// Replace the default light set with explicit lights, one call per light.
    pub fn light(mut self, position: [f64; 3], intensity: f64) -> Self {
        if !self.explicit_lights {
            self.scene.settings.lights.clear();
            self.explicit_lights = true;
        }
        self.scene.settings.lights.push(Light {
            position: position.into(),
            intensity,
        });
        self
    }

    /// Add an entity. First added is processed first.
    pub fn entity(mut self, entity: EntityDefinition) -> Self {
        self.scene.add_entity(entity);
        self
    }

    /// Build and return the scene.
    pub fn build(self) -> SceneDescriptor {
        self.scene
    }
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder for a single entity definition and its tracks.
pub struct EntityBuilder {
    entity: EntityDefinition,
}

impl EntityBuilder {
    /// A rigid body loaded from `source`.
    pub fn body(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self::with_kind(
            name,
            EntityKind::FileDefinedBody {
                source: source.into(),
            },
        )
    }

    /// A fragment carved out of `parent`.
    pub fn fragment(name: impl Into<String>, parent: impl Into<String>, selector: &[usize]) -> Self {
        Self::with_kind(
            name,
            EntityKind::SplitFragment {
                parent: parent.into(),
                selector: selector.to_vec(),
            },
        )
    }

    /// Static shapes placed relative to the entity position.
    pub fn primitive(name: impl Into<String>, shapes: Vec<Primitive>) -> Self {
        Self::with_kind(
            name,
            EntityKind::StaticPrimitive {
                geometry: StaticGeometry::Shapes(shapes),
            },
        )
    }

    pub fn camera(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            EntityKind::StaticPrimitive {
                geometry: StaticGeometry::Camera,
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            entity: EntityDefinition::new(name, kind),
        }
    }

    /// Add a position keyframe (an offset for fragments).
    pub fn key(mut self, frame: u64, value: [f64; 3]) -> Self {
        self.entity
            .position_track
            .push(PositionKey::new(frame, Vec3::from(value)));
        self
    }

    /// Add a camera keyframe.
    pub fn camera_key(mut self, frame: u64, eye: [f64; 3], look_at: [f64; 3]) -> Self {
        self.entity.position_track.push(PositionKey::new(
            frame,
            CameraPose::new(eye.into(), look_at.into()),
        ));
        self
    }

    /// Add a position keyframe that absorbs `absorbed` once reached.
    pub fn join(mut self, frame: u64, value: [f64; 3], absorbed: &[&str]) -> Self {
        let mut key = PositionKey::new(frame, Vec3::from(value));
        key.joins = absorbed.iter().map(|s| s.to_string()).collect();
        self.entity.position_track.push(key);
        self
    }

    pub fn rotation(mut self, frame: u64, axis: [f64; 3], angle: [f64; 3]) -> Self {
        self.entity
            .rotation_track
            .get_or_insert_with(Track::default)
            .push(RotationKey::new(frame, axis.into(), angle.into()));
        self
    }

    pub fn visible(mut self, frame: u64, visible: bool) -> Self {
        self.entity
            .visibility_track
            .get_or_insert_with(Track::default)
            .push(VisibilityKey::new(frame, visible));
        self
    }

    pub fn labeled(mut self) -> Self {
        self.entity.display_label = true;
        self
    }

    pub fn build(self) -> EntityDefinition {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder_tracks() {
        let def = EntityBuilder::body("water1", "water.json")
            .key(30, [-30.0, -70.0, 0.0])
            .join(90, [30.0, -7.5, 0.0], &["waterstof1"])
            .rotation(30, [0.0; 3], [0.0; 3])
            .rotation(75, [1.0, 1.0, 1.0], [6.28, 6.28, 6.28])
            .visible(0, true)
            .labeled()
            .build();
        assert_eq!(def.position_track.len(), 2);
        assert_eq!(def.rotation_track.as_ref().map(|t| t.len()), Some(2));
        assert_eq!(def.visibility_track.as_ref().map(|t| t.len()), Some(1));
        assert!(def.display_label);
        assert_eq!(def.join_events().count(), 1);
    }

    #[test]
    fn test_scene_builder_lights() {
        let scene = SceneBuilder::new()
            .frames(0, 280)
            .light([0.0, 0.0, 100.0], 1.0)
            .light([50.0, 50.0, 50.0], 0.5)
            .build();
        assert_eq!(scene.settings.lights.len(), 2);
        assert_eq!(scene.settings.frame_end, Some(280));
    }

    #[test]
    fn test_scene_builder_keeps_light_equal_to_default() {
        let default = Light::default();
        let scene = SceneBuilder::new()
            .light(default.position.into(), default.intensity)
            .light([10.0, 0.0, 0.0], 0.25)
            .build();
        assert_eq!(scene.settings.lights.len(), 2);
        assert_eq!(scene.settings.lights[0], default);
    }
}
