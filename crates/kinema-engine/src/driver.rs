//! Frame-range driver: composes an ascending frame range and forwards every
//! render list to a sink.

use std::io::Write;

use kinema_core::{ContentHash, FrameRange, KinemaResult, SequenceHasher};

use crate::compositor::{Compositor, RenderList};

/// Receives composed frames in order.
pub trait FrameSink {
    fn submit(&mut self, list: &RenderList) -> KinemaResult<()>;

    fn finish(&mut self) -> KinemaResult<()> {
        Ok(())
    }
}

/// Writes one JSON document per frame, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn submit(&mut self, list: &RenderList) -> KinemaResult<()> {
        serde_json::to_writer(&mut self.writer, list)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> KinemaResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub frames: Vec<RenderList>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for CollectingSink {
    fn submit(&mut self, list: &RenderList) -> KinemaResult<()> {
        self.frames.push(list.clone());
        Ok(())
    }
}

/// Outcome of a driven frame range.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    /// Hash over every produced render list, in order.
    pub content_hash: ContentHash,
}

/// Compose every frame of `range` in order and hand each to `sink`.
///
/// The first engine error aborts the remaining frames.
pub fn render_range(
    compositor: &mut Compositor,
    range: FrameRange,
    sink: &mut dyn FrameSink,
) -> KinemaResult<RenderSummary> {
    tracing::info!("Rendering frames {}", range);
    let mut hasher = SequenceHasher::new();
    for frame in range.frames() {
        let list = compositor.compose_frame(frame)?;
        hasher.update(&list)?;
        sink.submit(&list)?;
    }
    sink.finish()?;
    let frames = hasher.count();
    let content_hash = hasher.finish();
    tracing::info!("Rendered {} frames, hash {}", frames, content_hash);
    Ok(RenderSummary {
        frames,
        content_hash,
    })
}
