//! # kinema-ir
//!
//! The Kinema scene descriptor: an immutable, declarative table of entity
//! definitions with their keyframe tracks and split/join metadata.
//!
//! Every authoring path (JSON files, the builders, template instancing) ends
//! up as a [`SceneDescriptor`] before the engine sees it.

pub mod builder;
pub mod entity;
pub mod scene;
pub mod template;
pub mod track;
pub mod validate;

pub use builder::{EntityBuilder, SceneBuilder};
pub use entity::{EntityDefinition, EntityKind, StaticGeometry};
pub use scene::{SceneDescriptor, SceneSettings};
pub use track::{Keyframe, Placement, PositionKey, RotationKey, Segment, Track, VisibilityKey};
pub use validate::validate_scene;
