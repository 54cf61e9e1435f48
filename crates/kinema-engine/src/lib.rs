//! # kinema-engine
//!
//! The Kinema scene engine. Given a validated scene descriptor it resolves
//! the order in which entities come into existence, keeps the runtime entity
//! table, interpolates keyframe tracks and composes one render list per frame.
//!
//! The engine is stateful across frames: frames must be composed in
//! non-decreasing order, starting from the scene's first frame.

pub mod compositor;
pub mod divider;
pub mod driver;
pub mod interpolate;
pub mod lifecycle;
pub mod loader;
pub mod resolver;

pub use compositor::{Compositor, RenderItem, RenderList};
pub use divider::{Divider, IndexDivider};
pub use driver::{render_range, CollectingSink, FrameSink, JsonLinesSink, RenderSummary};
pub use interpolate::{
    position_at, rotation_increment_at, visibility_at, OffsetCursor, PositionMode, RotationStep,
};
pub use lifecycle::{EntityRuntime, Existence, Geometry, LifecycleManager};
pub use loader::{GeometryLoader, InMemoryLoader, JsonBodyLoader};
pub use resolver::resolve;
