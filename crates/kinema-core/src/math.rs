use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Values that can be linearly interpolated between two keyframes.
pub trait Lerp {
    /// Interpolate from `self` towards `other`; `t` is the fraction of the segment covered.
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

/// A 3D vector, written as `[x, y, z]` in scene files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Component-wise product.
    pub fn component_mul(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Scale every component by `1 / divisor`.
    pub fn per(&self, divisor: f64) -> Vec3 {
        Vec3::new(self.x / divisor, self.y / divisor, self.z / divisor)
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Distance to another point.
    pub fn distance(&self, other: &Vec3) -> f64 {
        (*self - *other).length()
    }

    /// Rotate this point about `pivot` by `angles` (radians), turning about X, then Y, then Z.
    pub fn rotate_about(&self, pivot: &Vec3, angles: &Vec3) -> Vec3 {
        let p = *self - *pivot;
        let p = rotate_x(p, angles.x);
        let p = rotate_y(p, angles.y);
        let p = rotate_z(p, angles.z);
        p + *pivot
    }

    /// Exact inverse of [`Vec3::rotate_about`] with the same arguments.
    pub fn unrotate_about(&self, pivot: &Vec3, angles: &Vec3) -> Vec3 {
        let p = *self - *pivot;
        let p = rotate_z(p, -angles.z);
        let p = rotate_y(p, -angles.y);
        let p = rotate_x(p, -angles.x);
        p + *pivot
    }

    /// Centroid of a set of points, `None` for an empty set.
    pub fn centroid<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Vec3> {
        let mut sum = Vec3::zero();
        let mut count = 0usize;
        for p in points {
            sum += *p;
            count += 1;
        }
        (count > 0).then(|| sum.per(count as f64))
    }
}

fn rotate_x(p: Vec3, a: f64) -> Vec3 {
    let (s, c) = a.sin_cos();
    Vec3::new(p.x, p.y * c - p.z * s, p.y * s + p.z * c)
}

fn rotate_y(p: Vec3, a: f64) -> Vec3 {
    let (s, c) = a.sin_cos();
    Vec3::new(p.x * c + p.z * s, p.y, -p.x * s + p.z * c)
}

fn rotate_z(p: Vec3, a: f64) -> Vec3 {
    let (s, c) = a.sin_cos();
    Vec3::new(p.x * c - p.y * s, p.x * s + p.y * c, p.z)
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Vec3, t: f64) -> Vec3 {
        *self + (*other - *self) * t
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}, {:.3}, {:.3}]", self.x, self.y, self.z)
    }
}
