use super::{Frame, RenderBackend};
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::Arc;
use vista_utils::{ok, AnyResult};

/// Statistics gathered by a [`RecordingBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_presented: u64,
    pub last_frame_number: u64,
    pub passes: usize,
    pub draws: usize,
    pub triangles: usize,
    /// Qualified names of the named draws in the last frame.
    pub named_draws: Vec<String>,
    pub released: bool,
}

/// Shared view into the statistics of a [`RecordingBackend`], usable after the backend was
/// moved into a scene.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle(Arc<Mutex<FrameStats>>);

impl RecordingHandle {
    pub fn stats(&self) -> FrameStats {
        self.0.lock().clone()
    }
}

/// Headless backend, which only records what it was asked to draw.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    stats: RecordingHandle,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RecordingHandle {
        self.stats.clone()
    }
}

impl RenderBackend for RecordingBackend {
    fn present(&mut self, frame: &Frame) -> AnyResult {
        let mut stats = self.stats.0.lock();
        stats.frames_presented += 1;
        stats.last_frame_number = frame.number;
        stats.passes = frame.passes.len();
        stats.draws = frame.draw_count();
        stats.triangles = frame.triangle_count();
        stats.named_draws = frame
            .draws()
            .filter_map(|draw| draw.name.as_ref().map(ToString::to_string))
            .collect();

        debug!(
            "Canvas `{}` frame #{}: {} passes, {} draws, {} triangles",
            frame.canvas.id, frame.number, stats.passes, stats.draws, stats.triangles
        );
        ok()
    }

    fn release(&mut self) {
        trace!("Releasing recording backend");
        self.stats.0.lock().released = true;
    }
}
