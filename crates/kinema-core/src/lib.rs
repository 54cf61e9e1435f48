//! # kinema-core
//!
//! Core types and primitives for the Kinema scene engine.
//! This crate contains foundational types shared across all Kinema crates:
//! vectors, rigid bodies and primitives, frame ranges, content hashes,
//! configuration and the error taxonomy.

pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hash;
pub mod math;
pub mod types;

pub use config::*;

pub use error::{KinemaError, KinemaResult};
pub use frame::FrameRange;
pub use geometry::{CameraPose, Element, Light, Primitive, RigidBody};
pub use hash::{ContentHash, SequenceHasher};
pub use math::{Lerp, Vec3};
pub use types::TrackKind;
