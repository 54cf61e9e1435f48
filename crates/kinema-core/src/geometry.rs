//! Scene geometry value types: element-based rigid bodies, simple primitives,
//! the camera pose and lights.
//!
//! Element positions are always stored in world space. A body's `origin` is
//! the point it is placed by; moving a body translates every element by the
//! same delta and rotations pivot about the origin.

use serde::{Deserialize, Serialize};

use crate::math::{Lerp, Vec3};

/// A single element (atom) of a rigid body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element symbol, e.g. `"C"` or `"H"`.
    pub symbol: String,
    /// World-space position.
    pub position: Vec3,
}

impl Element {
    pub fn new(symbol: impl Into<String>, position: Vec3) -> Self {
        Self {
            symbol: symbol.into(),
            position,
        }
    }
}

/// A rigid assembly of elements that is moved and rotated as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub name: String,
    /// Placement point of the body.
    pub origin: Vec3,
    pub elements: Vec<Element>,
}

impl RigidBody {
    /// Create a body from world-space elements, with its origin at their centroid.
    pub fn new(name: impl Into<String>, elements: Vec<Element>) -> Self {
        let origin = Vec3::centroid(elements.iter().map(|e| &e.position)).unwrap_or_default();
        Self {
            name: name.into(),
            origin,
            elements,
        }
    }

    /// Create a body and shift it so that its centroid sits at the world origin.
    pub fn centered(name: impl Into<String>, elements: Vec<Element>) -> Self {
        let mut body = Self::new(name, elements);
        body.move_to(Vec3::zero());
        body
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn centroid(&self) -> Option<Vec3> {
        Vec3::centroid(self.elements.iter().map(|e| &e.position))
    }

    /// Translate the body so its origin lands on `target`.
    pub fn move_to(&mut self, target: Vec3) {
        let delta = target - self.origin;
        for element in &mut self.elements {
            element.position += delta;
        }
        self.origin = target;
    }

    /// Rotate every element about the origin (X, then Y, then Z).
    pub fn rotate(&mut self, angles: &Vec3) {
        let pivot = self.origin;
        for element in &mut self.elements {
            element.position = element.position.rotate_about(&pivot, angles);
        }
    }

    /// Undo a [`RigidBody::rotate`] with the same angles.
    pub fn unrotate(&mut self, angles: &Vec3) {
        let pivot = self.origin;
        for element in &mut self.elements {
            element.position = element.position.unrotate_about(&pivot, angles);
        }
    }

    /// Append another body's elements after this body's own, keeping this origin.
    pub fn absorb(&mut self, other: RigidBody) {
        self.elements.extend(other.elements);
    }
}

/// A simple renderable shape, positioned relative to its owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Primitive {
    Sphere { center: Vec3, radius: f64 },
    Box { min: Vec3, max: Vec3 },
}

impl Primitive {
    /// The same primitive moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Primitive {
        match self {
            Primitive::Sphere { center, radius } => Primitive::Sphere {
                center: *center + offset,
                radius: *radius,
            },
            Primitive::Box { min, max } => Primitive::Box {
                min: *min + offset,
                max: *max + offset,
            },
        }
    }

    /// The same primitive turned about the local origin.
    pub fn rotated(&self, angles: &Vec3) -> Primitive {
        let pivot = Vec3::zero();
        match self {
            Primitive::Sphere { center, radius } => Primitive::Sphere {
                center: center.rotate_about(&pivot, angles),
                radius: *radius,
            },
            // Boxes stay axis-aligned; only their center follows the rotation.
            Primitive::Box { min, max } => {
                let half = (*max - *min) * 0.5;
                let center = (*min + half).rotate_about(&pivot, angles);
                Primitive::Box {
                    min: center - half,
                    max: center + half,
                }
            }
        }
    }
}

/// Camera placement: where the eye is and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub eye: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    pub fn new(eye: Vec3, look_at: Vec3) -> Self {
        Self { eye, look_at }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 100.0), Vec3::zero())
    }
}

impl Lerp for CameraPose {
    fn lerp(&self, other: &CameraPose, t: f64) -> CameraPose {
        CameraPose {
            eye: self.eye.lerp(&other.eye, t),
            look_at: self.look_at.lerp(&other.look_at, t),
        }
    }
}

/// A point light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
    pub intensity: f64,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 100.0),
            intensity: 1.0,
        }
    }
}
