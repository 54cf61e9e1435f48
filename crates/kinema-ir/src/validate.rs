use std::collections::{HashMap, HashSet};

use kinema_core::{KinemaError, TrackKind};

use crate::entity::{EntityDefinition, EntityKind};
use crate::scene::SceneDescriptor;
use crate::track::{Keyframe, Track};

/// Validate a scene descriptor for structural correctness.
///
/// Collects every problem instead of stopping at the first one, so authors
/// see the full list before any frame is produced.
pub fn validate_scene(scene: &SceneDescriptor) -> Result<(), Vec<KinemaError>> {
    let mut errors = Vec::new();

    if let Some(end) = scene.settings.frame_end {
        if end <= scene.settings.frame_start {
            errors.push(KinemaError::Validation(format!(
                "frame_end {} must be after frame_start {}",
                end, scene.settings.frame_start
            )));
        }
    }

    // Check for duplicate entity names
    let mut names = HashSet::new();
    for entity in &scene.entities {
        if !names.insert(entity.name.as_str()) {
            errors.push(KinemaError::Validation(format!(
                "duplicate entity name '{}'",
                entity.name
            )));
        }
    }

    let mut absorbed_by = HashMap::new();
    for entity in &scene.entities {
        validate_tracks(entity, &mut errors);
        validate_placements(entity, &mut errors);
        validate_split(entity, scene, &mut errors);
        validate_joins(entity, scene, &mut absorbed_by, &mut errors);
    }
    validate_merge_timing(scene, &absorbed_by, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tracks(entity: &EntityDefinition, errors: &mut Vec<KinemaError>) {
    if entity.position_track.is_empty() {
        errors.push(KinemaError::Validation(format!(
            "entity '{}' has an empty position track",
            entity.name
        )));
    }
    check_order(&entity.name, TrackKind::Position, &entity.position_track, errors);
    if let Some(track) = &entity.rotation_track {
        check_order(&entity.name, TrackKind::Rotation, track, errors);
    }
    if let Some(track) = &entity.visibility_track {
        check_order(&entity.name, TrackKind::Visibility, track, errors);
    }
}

fn check_order<K: Keyframe>(
    entity: &str,
    kind: TrackKind,
    track: &Track<K>,
    errors: &mut Vec<KinemaError>,
) {
    if let Some((_, prev, next)) = track.first_disorder() {
        if prev == next {
            errors.push(KinemaError::zero_length(entity, kind, next));
        } else {
            errors.push(KinemaError::Validation(format!(
                "{} track of '{}' goes back from frame {} to {}",
                kind, entity, prev, next
            )));
        }
    }
}

fn validate_placements(entity: &EntityDefinition, errors: &mut Vec<KinemaError>) {
    let wants_camera = entity.is_camera();
    if let Some(key) = entity
        .position_track
        .keys()
        .iter()
        .find(|k| k.value.is_camera() != wants_camera)
    {
        let expected = if wants_camera {
            "an eye/look_at pair"
        } else {
            "a point"
        };
        errors.push(KinemaError::Validation(format!(
            "position key at frame {} of '{}' must be {}",
            key.frame, entity.name, expected
        )));
    }
}

fn validate_split(
    entity: &EntityDefinition,
    scene: &SceneDescriptor,
    errors: &mut Vec<KinemaError>,
) {
    let (Some(parent), Some(selector)) = (entity.parent(), entity.selector()) else {
        return;
    };
    if parent == entity.name {
        errors.push(KinemaError::CyclicDependency {
            cycle: vec![entity.name.clone(), entity.name.clone()],
        });
    }
    match scene.get(parent) {
        None => errors.push(KinemaError::UnknownParent {
            entity: entity.name.clone(),
            parent: parent.to_string(),
        }),
        Some(p) => {
            if let Some(root) = split_root(scene, p) {
                if !is_body(root) {
                    errors.push(KinemaError::Validation(format!(
                        "fragment '{}' must descend from a body, '{}' is a {}",
                        entity.name, root.name, root.kind
                    )));
                }
            }
            if p.is_fragment() && p.earliest_frame() > entity.earliest_frame() {
                errors.push(KinemaError::Validation(format!(
                    "fragment '{}' splits at frame {} before its parent '{}' exists (frame {})",
                    entity.name,
                    entity.earliest_frame(),
                    parent,
                    p.earliest_frame()
                )));
            }
        }
    }
    if selector.is_empty() {
        errors.push(KinemaError::Validation(format!(
            "fragment '{}' selects no elements",
            entity.name
        )));
    }
}

/// Follow parent links from `start` to the entity it is ultimately carved from.
///
/// Returns `None` on a broken or cyclic chain; those are reported elsewhere.
fn split_root<'a>(
    scene: &'a SceneDescriptor,
    start: &'a EntityDefinition,
) -> Option<&'a EntityDefinition> {
    let mut seen = HashSet::new();
    let mut current = start;
    while let Some(parent) = current.parent() {
        if !seen.insert(current.name.as_str()) {
            return None;
        }
        current = scene.get(parent)?;
    }
    Some(current)
}

/// Loaded bodies and fragments carved from them carry elements.
fn is_body(entity: &EntityDefinition) -> bool {
    matches!(
        entity.kind,
        EntityKind::FileDefinedBody { .. } | EntityKind::SplitFragment { .. }
    )
}

fn validate_joins<'a>(
    entity: &'a EntityDefinition,
    scene: &'a SceneDescriptor,
    absorbed_by: &mut HashMap<&'a str, (&'a str, u64)>,
    errors: &mut Vec<KinemaError>,
) {
    for (_, frame, target) in entity.join_events() {
        if target == entity.name {
            errors.push(KinemaError::invalid_join(
                &entity.name,
                target,
                format!("entity joins itself at frame {}", frame),
            ));
            continue;
        }
        match scene.get(target) {
            None => errors.push(KinemaError::invalid_join(
                &entity.name,
                target,
                format!("unknown entity at frame {}", frame),
            )),
            Some(_) if !is_body(entity) => errors.push(KinemaError::invalid_join(
                &entity.name,
                target,
                format!("only bodies can absorb, '{}' is a {}", entity.name, entity.kind),
            )),
            Some(t) if !is_body(t) => errors.push(KinemaError::invalid_join(
                &entity.name,
                target,
                format!("only bodies can be absorbed, '{}' is a {}", t.name, t.kind),
            )),
            Some(t) if t.is_fragment() && frame < t.earliest_frame() => {
                errors.push(KinemaError::invalid_join(
                    &entity.name,
                    target,
                    format!(
                        "joined at frame {} before it splits off at frame {}",
                        frame,
                        t.earliest_frame()
                    ),
                ))
            }
            Some(_) => {}
        }
        if let Some((other, _)) = absorbed_by.insert(target, (entity.name.as_str(), frame)) {
            errors.push(KinemaError::invalid_join(
                &entity.name,
                target,
                format!("already absorbed by '{}'", other),
            ));
        }
    }
}

/// Once absorbed, an entity schedules no further joins and no fragment splits from it.
fn validate_merge_timing(
    scene: &SceneDescriptor,
    absorbed_by: &HashMap<&str, (&str, u64)>,
    errors: &mut Vec<KinemaError>,
) {
    for entity in &scene.entities {
        if let Some(parent) = entity.parent() {
            if let Some(&(absorber, merged_at)) = absorbed_by.get(parent) {
                if merged_at < entity.earliest_frame() {
                    errors.push(KinemaError::Validation(format!(
                        "fragment '{}' splits at frame {} from '{}', absorbed into '{}' at frame {}",
                        entity.name,
                        entity.earliest_frame(),
                        parent,
                        absorber,
                        merged_at
                    )));
                }
            }
        }

        let Some(&(absorber, merged_at)) = absorbed_by.get(entity.name.as_str()) else {
            continue;
        };
        // Joins of one frame run in declaration order.
        let absorbed_first = scene.index_of(absorber) < scene.index_of(&entity.name);
        for (_, frame, target) in entity.join_events() {
            if frame > merged_at || (frame == merged_at && absorbed_first) {
                errors.push(KinemaError::invalid_join(
                    &entity.name,
                    target,
                    format!(
                        "scheduled at frame {} after '{}' is absorbed into '{}' at frame {}",
                        frame, entity.name, absorber, merged_at
                    ),
                ));
            }
        }
    }
}
