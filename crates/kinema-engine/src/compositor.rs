//! Per-frame composition: materialize what is due, pose every active entity,
//! fire joins and collect the visible geometry into a render list.

use std::path::PathBuf;

use serde::Serialize;

use kinema_core::hash::hash_value;
use kinema_core::{CameraPose, ContentHash, Element, KinemaError, KinemaResult, Light, Primitive, Vec3};
use kinema_ir::{validate_scene, Placement, SceneDescriptor};

use crate::divider::{Divider, IndexDivider};
use crate::interpolate;
use crate::lifecycle::{Existence, Geometry, LifecycleManager};
use crate::loader::{GeometryLoader, JsonBodyLoader};
use crate::resolver;

/// One renderable item of a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderItem {
    Body {
        entity: String,
        elements: Vec<Element>,
    },
    Shape {
        entity: String,
        primitive: Primitive,
    },
    Label {
        entity: String,
        text: String,
        position: Vec3,
    },
}

impl RenderItem {
    pub fn entity(&self) -> &str {
        match self {
            RenderItem::Body { entity, .. }
            | RenderItem::Shape { entity, .. }
            | RenderItem::Label { entity, .. } => entity,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderList {
    pub frame: u64,
    pub camera: CameraPose,
    pub lights: Vec<Light>,
    pub items: Vec<RenderItem>,
}

impl RenderList {
    /// Content hash of this frame, for deterministic output verification.
    pub fn content_hash(&self) -> KinemaResult<ContentHash> {
        hash_value(self)
    }

    /// Items belonging to `entity`.
    pub fn items_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a RenderItem> + 'a {
        self.items.iter().filter(move |item| item.entity() == entity)
    }
}

/// Drives the resolver, lifecycle manager and interpolator frame by frame.
///
/// Frames must be requested in non-decreasing order; the entity table, the
/// accumulated rotations and the applied joins carry over between calls.
pub struct Compositor {
    lifecycle: LifecycleManager,
    order: Vec<String>,
    last_frame: Option<u64>,
}

impl Compositor {
    /// Validate `scene`, resolve its dependency order and set up the entity table.
    pub fn new(
        scene: SceneDescriptor,
        loader: Box<dyn GeometryLoader>,
        divider: Box<dyn Divider>,
    ) -> KinemaResult<Self> {
        validate_scene(&scene).map_err(KinemaError::InvalidScene)?;
        let order = resolver::resolve(&scene)?;
        tracing::info!(
            "Scene {} ready: {} entities, frames {}",
            scene.id,
            scene.len(),
            scene.frame_range()
        );
        Ok(Self {
            lifecycle: LifecycleManager::new(scene, loader, divider),
            order,
            last_frame: None,
        })
    }

    /// A compositor loading bodies as JSON files under `root`, dividing by index.
    pub fn with_json_bodies(scene: SceneDescriptor, root: impl Into<PathBuf>) -> KinemaResult<Self> {
        Self::new(
            scene,
            Box::new(JsonBodyLoader::new(root)),
            Box::new(IndexDivider),
        )
    }

    pub fn scene(&self) -> &SceneDescriptor {
        self.lifecycle.scene()
    }

    /// Dependency order used for materialization.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    pub fn existence(&self, name: &str) -> Option<Existence> {
        self.lifecycle.existence(name)
    }

    /// Placement of an active entity as of the last composed frame.
    pub fn position_of(&self, name: &str) -> Option<Placement> {
        self.lifecycle.placement(name)
    }

    pub fn element_count(&self, name: &str) -> Option<usize> {
        self.lifecycle.element_count(name)
    }

    /// Compose the render list of `frame`.
    pub fn compose_frame(&mut self, frame: u64) -> KinemaResult<RenderList> {
        if let Some(last) = self.last_frame {
            if frame < last {
                return Err(KinemaError::OutOfOrderQuery { frame, last });
            }
        }
        self.last_frame = Some(frame);

        self.materialize_due(frame)?;

        let names: Vec<String> = self
            .scene()
            .entities
            .iter()
            .map(|e| e.name.clone())
            .collect();
        for name in &names {
            if self.lifecycle.existence(name) != Some(Existence::Active) {
                continue;
            }
            self.lifecycle.advance_pose(name, frame)?;
            for (_, absorbed) in self.lifecycle.due_joins(name, frame) {
                self.lifecycle.apply_join(&absorbed, name, frame)?;
            }
        }

        let list = self.collect(frame);
        tracing::debug!("Frame {}: {} items", frame, list.items.len());
        Ok(list)
    }

    fn materialize_due(&mut self, frame: u64) -> KinemaResult<()> {
        for name in &self.order {
            if self.lifecycle.existence(name) != Some(Existence::NotMaterialized) {
                continue;
            }
            let Some(def) = self.lifecycle.definition(name) else {
                continue;
            };
            if def.is_fragment() && frame < def.earliest_frame() {
                continue;
            }
            self.lifecycle.materialize(name, frame)?;
        }
        Ok(())
    }

    fn collect(&self, frame: u64) -> RenderList {
        let scene = self.lifecycle.scene();
        let mut camera = None;
        let mut items = Vec::new();

        for def in &scene.entities {
            let Some(runtime) = self.lifecycle.runtime(&def.name) else {
                continue;
            };
            if runtime.existence != Existence::Active {
                continue;
            }
            let Some(geometry) = runtime.geometry.as_ref() else {
                continue;
            };
            if let Geometry::Camera(pose) = geometry {
                camera.get_or_insert(*pose);
                continue;
            }
            if !interpolate::visibility_at(def.visibility_track.as_ref(), frame) {
                continue;
            }
            let anchor = match geometry {
                Geometry::Body(body) => {
                    items.push(RenderItem::Body {
                        entity: def.name.clone(),
                        elements: body.elements.clone(),
                    });
                    body.origin
                }
                Geometry::Shapes { origin, shapes } => {
                    items.extend(shapes.iter().map(|shape| RenderItem::Shape {
                        entity: def.name.clone(),
                        primitive: shape.translated(*origin),
                    }));
                    *origin
                }
                Geometry::Camera(_) => continue,
            };
            if def.display_label {
                items.push(RenderItem::Label {
                    entity: def.name.clone(),
                    text: def.name.clone(),
                    position: anchor,
                });
            }
        }

        RenderList {
            frame,
            camera: camera.unwrap_or(scene.settings.default_camera),
            lights: scene.settings.lights.clone(),
            items,
        }
    }
}
