//! Time-shifted template instancing.
//!
//! A reaction authored once can be replayed several times in the same scene:
//! every copy gets its own name suffix and starts a number of frames later.

use crate::entity::{EntityDefinition, EntityKind};
use crate::scene::SceneDescriptor;

/// A copy of `scene` with every keyframe of every track moved later by `offset` frames.
pub fn shifted(scene: &SceneDescriptor, offset: u64) -> SceneDescriptor {
    let mut out = scene.clone();
    for entity in &mut out.entities {
        shift_entity(entity, offset);
    }
    if let Some(end) = out.settings.frame_end.as_mut() {
        *end += offset;
    }
    out
}

/// A shifted copy of `scene` with every entity renamed to `<name><suffix>`.
///
/// Parent and join references are rewritten so the copy is self-contained;
/// merging it into the source scene does not clash.
pub fn instantiate(scene: &SceneDescriptor, suffix: &str, offset: u64) -> SceneDescriptor {
    let mut out = shifted(scene, offset);
    out.id = format!("{}{}", scene.id, suffix);
    for entity in &mut out.entities {
        entity.name.push_str(suffix);
        if let EntityKind::SplitFragment { parent, .. } = &mut entity.kind {
            parent.push_str(suffix);
        }
        for key in entity.position_track.keys_mut() {
            for absorbed in &mut key.joins {
                absorbed.push_str(suffix);
            }
        }
    }
    out
}

fn shift_entity(entity: &mut EntityDefinition, offset: u64) {
    for key in entity.position_track.keys_mut() {
        key.frame += offset;
    }
    if let Some(track) = entity.rotation_track.as_mut() {
        for key in track.keys_mut() {
            key.frame += offset;
        }
    }
    if let Some(track) = entity.visibility_track.as_mut() {
        for key in track.keys_mut() {
            key.frame += offset;
        }
    }
}
