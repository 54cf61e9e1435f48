//! Runtime entity table: materialization, posing, splitting and joining.
//!
//! The manager is the only owner of entity geometry. Entities move from
//! `NotMaterialized` to `Active` once, and from `Active` to `Merged` once;
//! neither transition is ever undone.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use kinema_core::{CameraPose, KinemaError, KinemaResult, Primitive, RigidBody, Vec3};
use kinema_ir::{EntityDefinition, EntityKind, Placement, SceneDescriptor, StaticGeometry};

use crate::divider::Divider;
use crate::interpolate::{self, OffsetCursor, PositionMode};
use crate::loader::GeometryLoader;

/// Existence state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    NotMaterialized,
    Active,
    /// Absorbed into another entity. Terminal.
    Merged,
}

impl std::fmt::Display for Existence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Existence::NotMaterialized => write!(f, "not materialized"),
            Existence::Active => write!(f, "active"),
            Existence::Merged => write!(f, "merged"),
        }
    }
}

/// Geometry owned by an active entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Body(RigidBody),
    /// Shapes relative to `origin`, turned by every rotation applied so far.
    Shapes {
        origin: Vec3,
        shapes: Vec<Primitive>,
    },
    Camera(CameraPose),
}

impl Geometry {
    /// Number of elements, or of shapes for primitive entities.
    pub fn element_count(&self) -> usize {
        match self {
            Geometry::Body(body) => body.len(),
            Geometry::Shapes { shapes, .. } => shapes.len(),
            Geometry::Camera(_) => 0,
        }
    }

    fn place(&mut self, placement: &Placement) {
        match (self, placement) {
            (Geometry::Body(body), Placement::Point(p)) => body.move_to(*p),
            (Geometry::Shapes { origin, .. }, Placement::Point(p)) => *origin = *p,
            (Geometry::Camera(pose), Placement::Camera(c)) => *pose = *c,
            // Mismatched placements are rejected by scene validation.
            _ => {}
        }
    }

    fn rotate(&mut self, angles: &Vec3) {
        match self {
            Geometry::Body(body) => body.rotate(angles),
            Geometry::Shapes { shapes, .. } => {
                for shape in shapes.iter_mut() {
                    *shape = shape.rotated(angles);
                }
            }
            Geometry::Camera(_) => {}
        }
    }
}

/// Mutable runtime state of one entity.
#[derive(Debug, Clone)]
pub struct EntityRuntime {
    pub existence: Existence,
    pub geometry: Option<Geometry>,
    /// Position captured when the entity materialized.
    pub origin_anchor: Option<Placement>,
    /// Join events already applied, as `(position key index, absorbed entity)`.
    pub consumed_joins: BTreeSet<(usize, String)>,
    /// Placement from the last pose update.
    pub placement: Option<Placement>,
    /// Next frame whose rotation increment has not been applied.
    rotation_cursor: u64,
    offset: Option<OffsetCursor>,
}

impl EntityRuntime {
    fn new() -> Self {
        Self {
            existence: Existence::NotMaterialized,
            geometry: None,
            origin_anchor: None,
            consumed_joins: BTreeSet::new(),
            placement: None,
            rotation_cursor: 0,
            offset: None,
        }
    }
}

/// Owns every entity's runtime state and the geometry collaborators.
pub struct LifecycleManager {
    scene: SceneDescriptor,
    runtimes: Vec<EntityRuntime>,
    index: HashMap<String, usize>,
    loader: Box<dyn GeometryLoader>,
    divider: Box<dyn Divider>,
}

impl LifecycleManager {
    pub fn new(
        scene: SceneDescriptor,
        loader: Box<dyn GeometryLoader>,
        divider: Box<dyn Divider>,
    ) -> Self {
        let index = scene
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        let runtimes = scene.entities.iter().map(|_| EntityRuntime::new()).collect();
        Self {
            scene,
            runtimes,
            index,
            loader,
            divider,
        }
    }

    pub fn scene(&self) -> &SceneDescriptor {
        &self.scene
    }

    pub fn definition(&self, name: &str) -> Option<&EntityDefinition> {
        self.index.get(name).map(|&i| &self.scene.entities[i])
    }

    pub fn runtime(&self, name: &str) -> Option<&EntityRuntime> {
        self.index.get(name).map(|&i| &self.runtimes[i])
    }

    pub fn existence(&self, name: &str) -> Option<Existence> {
        self.runtime(name).map(|r| r.existence)
    }

    pub fn geometry(&self, name: &str) -> Option<&Geometry> {
        self.runtime(name).and_then(|r| r.geometry.as_ref())
    }

    /// Current placement of an active entity.
    pub fn placement(&self, name: &str) -> Option<Placement> {
        self.runtime(name)
            .filter(|r| r.existence == Existence::Active)
            .and_then(|r| r.placement)
    }

    pub fn element_count(&self, name: &str) -> Option<usize> {
        self.geometry(name).map(Geometry::element_count)
    }

    fn lookup(&self, name: &str) -> KinemaResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| KinemaError::UnknownEntity(name.to_string()))
    }

    /// Bring an entity into existence at `at_frame`.
    ///
    /// Returns `false` without touching anything when the entity already exists
    /// or has been merged.
    pub fn materialize(&mut self, name: &str, at_frame: u64) -> KinemaResult<bool> {
        let idx = self.lookup(name)?;
        if self.runtimes[idx].existence != Existence::NotMaterialized {
            return Ok(false);
        }
        let def = self.scene.entities[idx].clone();

        match &def.kind {
            EntityKind::SplitFragment { parent, selector } => {
                let earliest = def.earliest_frame();
                if at_frame < earliest {
                    return Err(KinemaError::Validation(format!(
                        "fragment '{}' cannot split at frame {} before its first keyframe {}",
                        def.name, at_frame, earliest
                    )));
                }
                self.split(&def, parent, selector, earliest)?;
            }
            EntityKind::StaticPrimitive { geometry } => {
                let anchor = interpolate::position_at(
                    &def.name,
                    &def.position_track,
                    0,
                    &PositionMode::Absolute,
                )?;
                if def.rotation_track.is_some() && matches!(geometry, StaticGeometry::Camera) {
                    tracing::warn!("Camera '{}' has a rotation track; it is ignored", def.name);
                }
                let geometry = match geometry {
                    StaticGeometry::Camera => {
                        Geometry::Camera(anchor.camera().unwrap_or(self.scene.settings.default_camera))
                    }
                    StaticGeometry::Shapes(shapes) => Geometry::Shapes {
                        origin: anchor.point().unwrap_or_default(),
                        shapes: shapes.clone(),
                    },
                };
                self.activate(idx, geometry, anchor, None, 0);
            }
            EntityKind::FileDefinedBody { source } => {
                let anchor = interpolate::position_at(
                    &def.name,
                    &def.position_track,
                    0,
                    &PositionMode::Absolute,
                )?;
                let mut body = self.loader.load(&def.name, source)?;
                body.move_to(anchor.point().unwrap_or_default());
                self.activate(idx, Geometry::Body(body), anchor, None, 0);
            }
        }
        tracing::info!("Materialized {} '{}' at frame {}", def.kind, def.name, at_frame);
        Ok(true)
    }

    fn activate(
        &mut self,
        idx: usize,
        geometry: Geometry,
        anchor: Placement,
        offset: Option<OffsetCursor>,
        rotation_cursor: u64,
    ) {
        let runtime = &mut self.runtimes[idx];
        runtime.existence = Existence::Active;
        runtime.geometry = Some(geometry);
        runtime.origin_anchor = Some(anchor);
        runtime.placement = Some(anchor);
        runtime.offset = offset;
        runtime.rotation_cursor = rotation_cursor;
    }

    /// Carve a fragment out of its parent with the parent pinned at `split_frame`.
    fn split(
        &mut self,
        def: &EntityDefinition,
        parent: &str,
        selector: &[usize],
        split_frame: u64,
    ) -> KinemaResult<()> {
        let pidx = self.lookup(parent)?;
        if self.runtimes[pidx].existence != Existence::Active {
            return Err(KinemaError::ParentNotReady {
                entity: def.name.clone(),
                parent: parent.to_string(),
            });
        }

        let pin = self.pose_at(pidx, split_frame)?.point().unwrap_or_default();
        let (forward, backward) = self.rotation_offsets(pidx, split_frame)?;

        let parent_def = &self.scene.entities[pidx];
        let runtime = &mut self.runtimes[pidx];
        let Some(Geometry::Body(body)) = runtime.geometry.as_mut() else {
            return Err(KinemaError::Validation(format!(
                "fragment '{}' can only split from a body, '{}' is a {}",
                def.name, parent, parent_def.kind
            )));
        };

        let saved = body.origin;
        body.move_to(pin);
        for step in backward.iter().rev() {
            body.unrotate(step);
        }
        for step in &forward {
            body.rotate(step);
        }

        let carved = self.divider.divide(body, selector, &def.name);

        for step in forward.iter().rev() {
            body.unrotate(step);
        }
        for step in &backward {
            body.rotate(step);
        }
        body.move_to(saved);

        let carved = carved?;
        let anchor = Placement::Point(carved.origin);
        tracing::info!(
            "Split '{}' ({} elements) from '{}' at frame {}, anchor {}",
            def.name,
            carved.len(),
            parent,
            split_frame,
            anchor
        );
        let idx = self.lookup(&def.name)?;
        self.activate(
            idx,
            Geometry::Body(carved),
            anchor,
            Some(OffsetCursor::new(anchor)),
            split_frame,
        );
        Ok(())
    }

    /// Rotation angles that take entity `idx` from its applied rotation to the one
    /// it has at `frame`: `(forward, backward)` where `backward` lists steps already
    /// applied past `frame`.
    fn rotation_offsets(&self, idx: usize, frame: u64) -> KinemaResult<(Vec<Vec3>, Vec<Vec3>)> {
        let cursor = self.runtimes[idx].rotation_cursor;
        if cursor <= frame {
            Ok((self.rotation_steps(idx, cursor, frame)?, Vec::new()))
        } else {
            Ok((Vec::new(), self.rotation_steps(idx, frame + 1, cursor - 1)?))
        }
    }

    /// Per-frame rotation angles of entity `idx` for every frame in `from..=to`.
    fn rotation_steps(&self, idx: usize, from: u64, to: u64) -> KinemaResult<Vec<Vec3>> {
        let def = &self.scene.entities[idx];
        let Some(track) = def.rotation_track.as_ref() else {
            return Ok(Vec::new());
        };
        let (Some(first), Some(last)) = (track.first_frame(), track.last_frame()) else {
            return Ok(Vec::new());
        };
        let lo = from.max(first + 1);
        let hi = to.min(last);
        let mut steps = Vec::new();
        for frame in lo..=hi {
            if let Some(step) = interpolate::rotation_increment_at(&def.name, track, frame)? {
                steps.push(step.angles());
            }
        }
        Ok(steps)
    }

    /// Position of entity `idx` at `frame` without touching its cached state.
    fn pose_at(&self, idx: usize, frame: u64) -> KinemaResult<Placement> {
        let def = &self.scene.entities[idx];
        let runtime = &self.runtimes[idx];
        let mode = match (&def.kind, runtime.origin_anchor) {
            (EntityKind::SplitFragment { .. }, Some(anchor)) => {
                PositionMode::OffsetAccumulating { anchor }
            }
            _ => PositionMode::Absolute,
        };
        interpolate::position_at(&def.name, &def.position_track, frame, &mode)
    }

    /// Move an active entity to its placement at `frame` and apply every
    /// rotation increment up to and including `frame` not yet applied.
    pub fn advance_pose(&mut self, name: &str, frame: u64) -> KinemaResult<()> {
        let idx = self.lookup(name)?;
        if self.runtimes[idx].existence != Existence::Active {
            return Ok(());
        }

        let cursor = self.runtimes[idx].rotation_cursor;
        let steps = if cursor <= frame {
            self.rotation_steps(idx, cursor, frame)?
        } else {
            Vec::new()
        };

        let def = &self.scene.entities[idx];
        let runtime = &mut self.runtimes[idx];
        let placement = match runtime.offset.as_mut() {
            Some(offset) => offset.position_at(&def.name, &def.position_track, frame)?,
            None => interpolate::position_at(
                &def.name,
                &def.position_track,
                frame,
                &PositionMode::Absolute,
            )?,
        };

        if let Some(geometry) = runtime.geometry.as_mut() {
            geometry.place(&placement);
            for angles in &steps {
                geometry.rotate(angles);
            }
        }
        runtime.placement = Some(placement);
        runtime.rotation_cursor = runtime.rotation_cursor.max(frame + 1);
        Ok(())
    }

    /// Join events of `name` scheduled at or before `frame` and not yet applied.
    pub fn due_joins(&self, name: &str, frame: u64) -> Vec<(usize, String)> {
        let (Some(def), Some(runtime)) = (self.definition(name), self.runtime(name)) else {
            return Vec::new();
        };
        def.join_events()
            .filter(|(_, at, _)| *at <= frame)
            .map(|(key, _, absorbed)| (key, absorbed.to_string()))
            .filter(|event| !runtime.consumed_joins.contains(event))
            .collect()
    }

    /// Absorb `source` into `target` at `at_frame`.
    ///
    /// `target` is the entity whose position track schedules the join. The
    /// source is posed for `at_frame`, its elements are appended after the
    /// target's, and it becomes `Merged`. Returns `false` when the event was
    /// already applied.
    pub fn apply_join(&mut self, source: &str, target: &str, at_frame: u64) -> KinemaResult<bool> {
        let sidx = self.lookup(source)?;
        let tidx = self.lookup(target)?;

        let scheduled: Vec<(usize, u64)> = self.scene.entities[tidx]
            .join_events()
            .filter(|(_, _, absorbed)| *absorbed == source)
            .map(|(key, frame, _)| (key, frame))
            .collect();
        if scheduled.is_empty() {
            return Err(KinemaError::invalid_join(target, source, "no join event scheduled"));
        }
        let consumed = &self.runtimes[tidx].consumed_joins;
        let pending = scheduled
            .into_iter()
            .find(|(key, _)| !consumed.contains(&(*key, source.to_string())));
        let Some((key, frame)) = pending else {
            return Ok(false);
        };
        if at_frame < frame {
            return Err(KinemaError::invalid_join(
                target,
                source,
                format!("scheduled for frame {}, not {}", frame, at_frame),
            ));
        }

        for (idx, name) in [(tidx, target), (sidx, source)] {
            let existence = self.runtimes[idx].existence;
            if existence != Existence::Active {
                return Err(KinemaError::invalid_join(
                    target,
                    source,
                    format!("'{}' is {}", name, existence),
                ));
            }
        }

        let is_body = |idx: usize| matches!(self.runtimes[idx].geometry, Some(Geometry::Body(_)));
        if !is_body(tidx) || !is_body(sidx) {
            return Err(KinemaError::invalid_join(target, source, "only bodies can be joined"));
        }

        self.advance_pose(source, at_frame)?;
        let Some(Geometry::Body(absorbed)) = self.runtimes[sidx].geometry.take() else {
            return Err(KinemaError::invalid_join(target, source, "source has no body"));
        };
        let Some(Geometry::Body(body)) = self.runtimes[tidx].geometry.as_mut() else {
            return Err(KinemaError::invalid_join(target, source, "target has no body"));
        };

        let added = absorbed.len();
        body.absorb(absorbed);
        let total = body.len();

        let src = &mut self.runtimes[sidx];
        src.existence = Existence::Merged;
        src.placement = None;
        self.runtimes[tidx]
            .consumed_joins
            .insert((key, source.to_string()));
        tracing::info!(
            "Joined '{}' into '{}' at frame {} (+{} elements, {} total)",
            source,
            target,
            at_frame,
            added,
            total
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::divider::IndexDivider;
    use crate::loader::InMemoryLoader;
    use kinema_core::Element;
    use kinema_ir::{EntityBuilder, SceneBuilder};

    fn line(n: usize) -> Vec<Element> {
        (0..n)
            .map(|i| Element::new("C", Vec3::new(i as f64, 0.0, 0.0)))
            .collect()
    }

    fn manager(scene: SceneDescriptor) -> LifecycleManager {
        let loader = InMemoryLoader::new()
            .with_body("line5.json", line(5))
            .with_body("line3.json", line(3));
        LifecycleManager::new(scene, Box::new(loader), Box::new(IndexDivider))
    }

    #[test]
    fn test_body_materializes_at_frame_zero_position() {
        let scene = SceneBuilder::new()
            .entity(
                EntityBuilder::body("a", "line5.json")
                    .key(10, [5.0, 0.0, 0.0])
                    .key(20, [9.0, 0.0, 0.0])
                    .build(),
            )
            .build();
        let mut m = manager(scene);
        assert_eq!(m.existence("a"), Some(Existence::NotMaterialized));
        assert!(m.materialize("a", 0).unwrap());
        assert!(!m.materialize("a", 1).unwrap());
        let runtime = m.runtime("a").unwrap();
        assert_eq!(runtime.existence, Existence::Active);
        assert_eq!(runtime.origin_anchor, Some(Placement::Point(Vec3::new(5.0, 0.0, 0.0))));
        assert_eq!(m.element_count("a"), Some(5));
    }

    #[test]
    fn test_fragment_requires_active_parent() {
        let scene = SceneBuilder::new()
            .entity(EntityBuilder::body("a", "line5.json").key(0, [0.0; 3]).build())
            .entity(EntityBuilder::fragment("b", "a", &[4]).key(5, [0.0; 3]).build())
            .build();
        let mut m = manager(scene);
        assert!(matches!(
            m.materialize("b", 5).unwrap_err(),
            KinemaError::ParentNotReady { .. }
        ));
        m.materialize("a", 0).unwrap();
        assert!(m.materialize("b", 3).is_err());
        assert!(m.materialize("b", 5).unwrap());
        assert_eq!(m.element_count("a"), Some(4));
        assert_eq!(m.element_count("b"), Some(1));
    }

    #[test]
    fn test_split_pins_parent_then_restores() {
        let scene = SceneBuilder::new()
            .entity(
                EntityBuilder::body("a", "line3.json")
                    .key(0, [0.0, 0.0, 0.0])
                    .key(10, [10.0, 0.0, 0.0])
                    .build(),
            )
            .entity(EntityBuilder::fragment("b", "a", &[2]).key(6, [0.0; 3]).build())
            .build();
        let mut m = manager(scene);
        m.materialize("a", 0).unwrap();
        m.advance_pose("a", 0).unwrap();
        m.materialize("b", 6).unwrap();
        // Element 2 sits one unit right of the centroid; the parent was pinned at x = 6.
        assert_eq!(
            m.runtime("b").unwrap().origin_anchor,
            Some(Placement::Point(Vec3::new(7.0, 0.0, 0.0)))
        );
        match m.geometry("a") {
            Some(Geometry::Body(body)) => assert_eq!(body.origin, Vec3::zero()),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_split_pin_includes_pending_rotation() {
        let scene = SceneBuilder::new()
            .entity(
                EntityBuilder::body("a", "line3.json")
                    .key(0, [0.0; 3])
                    .rotation(0, [0.0; 3], [0.0; 3])
                    .rotation(2, [0.0, 0.0, 1.0], [0.0, 0.0, std::f64::consts::PI])
                    .build(),
            )
            .entity(EntityBuilder::fragment("b", "a", &[2]).key(2, [0.0; 3]).build())
            .build();
        let mut m = manager(scene);
        m.materialize("a", 0).unwrap();
        m.advance_pose("a", 0).unwrap();
        m.materialize("b", 2).unwrap();
        // Half turns over frames 1 and 2 flip element 2 to the other side.
        let anchor = m.runtime("b").unwrap().origin_anchor.unwrap().point().unwrap();
        assert!(anchor.distance(&Vec3::new(-1.0, 0.0, 0.0)) < 1e-9);
        // The parent itself is unrotated until it is posed.
        match m.geometry("a") {
            Some(Geometry::Body(body)) => {
                assert!(body.elements[0].position.distance(&Vec3::new(-1.0, 0.0, 0.0)) < 1e-9)
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_rotation_applies_each_frame_once() {
        let scene = SceneBuilder::new()
            .entity(
                EntityBuilder::body("a", "line3.json")
                    .key(0, [0.0; 3])
                    .rotation(0, [0.0; 3], [0.0; 3])
                    .rotation(4, [0.0, 0.0, 1.0], [0.0, 0.0, std::f64::consts::PI])
                    .build(),
            )
            .build();
        let mut m = manager(scene);
        m.materialize("a", 0).unwrap();
        m.advance_pose("a", 0).unwrap();
        m.advance_pose("a", 3).unwrap();
        m.advance_pose("a", 3).unwrap();
        m.advance_pose("a", 4).unwrap();
        m.advance_pose("a", 9).unwrap();
        match m.geometry("a") {
            Some(Geometry::Body(body)) => {
                assert!(body.elements[2].position.distance(&Vec3::new(-1.0, 0.0, 0.0)) < 1e-9)
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_join_is_applied_once() {
        let scene = SceneBuilder::new()
            .entity(
                EntityBuilder::body("d", "line5.json")
                    .key(0, [0.0; 3])
                    .join(20, [0.0; 3], &["e"])
                    .build(),
            )
            .entity(EntityBuilder::body("e", "line3.json").key(0, [0.0, 5.0, 0.0]).build())
            .build();
        let mut m = manager(scene);
        m.materialize("d", 0).unwrap();
        m.materialize("e", 0).unwrap();
        assert!(m.due_joins("d", 19).is_empty());
        assert!(m.apply_join("e", "d", 19).is_err());

        assert_eq!(m.due_joins("d", 20), vec![(1, "e".to_string())]);
        assert!(m.apply_join("e", "d", 20).unwrap());
        assert_eq!(m.element_count("d"), Some(8));
        assert_eq!(m.existence("e"), Some(Existence::Merged));
        assert_eq!(m.placement("e"), None);

        assert!(!m.apply_join("e", "d", 25).unwrap());
        assert_eq!(m.element_count("d"), Some(8));
        assert!(m.due_joins("d", 25).is_empty());
    }

    #[test]
    fn test_join_requires_scheduled_event() {
        let scene = SceneBuilder::new()
            .entity(EntityBuilder::body("d", "line5.json").key(0, [0.0; 3]).build())
            .entity(EntityBuilder::body("e", "line3.json").key(0, [0.0; 3]).build())
            .build();
        let mut m = manager(scene);
        m.materialize("d", 0).unwrap();
        m.materialize("e", 0).unwrap();
        assert!(matches!(
            m.apply_join("e", "d", 5).unwrap_err(),
            KinemaError::InvalidJoin { .. }
        ));
    }
}
