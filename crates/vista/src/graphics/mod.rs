//! Frame assembly and presentation
//!
//! Rendering a scene produces a [`Frame`]: an ordered list of [`RenderPass`]es, one for every
//! `renderer` node, each holding the [`DrawItem`]s of the geometry below it. Draw items are fully
//! resolved, they carry their own mesh, matrices, material and lights, so a backend doesn't need
//! to know anything about the node tree.
//!
//! Frames are handed to a [`RenderBackend`]. The engine doesn't talk to GPUs by itself, the
//! only built-in backend is the headless [`RecordingBackend`], which keeps statistics about the
//! frames it was given.

use crate::{
    nodes::{
        params::{ClearMask, Color, LightSource, Material, Viewport},
        NamePath,
    },
    picking::NameRegistry,
};
use glam::Mat4;
use smallvec::SmallVec;
use std::sync::Arc;
use vista_utils::AnyResult;

pub mod camera;

#[doc(inline)]
pub use mesh::*;
mod mesh;

#[doc(inline)]
pub use recording::*;
mod recording;

/// Lights affecting a single draw. Most scenes only use a handful of them.
pub type LightList = SmallVec<[LightSource; 4]>;

/// The render target of a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Viewport covering the whole canvas.
    pub fn full_viewport(&self) -> Viewport {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: self.width as f32,
            height: self.height as f32,
        }
    }
}

/// A single resolved draw call.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub mesh: Arc<Mesh>,
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub material: Material,
    pub lights: LightList,
    /// Qualified name of the innermost enclosing `name` node.
    pub name: Option<NamePath>,
    /// Stable identifier derived from `name`, usable as a color in pick buffers.
    pub pick_id: Option<u32>,
}

impl DrawItem {
    pub fn world_bounds(&self) -> BoundingSphere {
        self.mesh.bounds.transformed(&self.model)
    }
}

/// Draws sharing a clear state and a viewport.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub clear_color: Color,
    pub clear: ClearMask,
    pub viewport: Viewport,
    pub draws: Vec<DrawItem>,
}

/// Everything drawn by a single [`crate::Scene::render`] call.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Number of the frame, the first rendered frame is 1.
    pub number: u64,
    pub canvas: Canvas,
    pub passes: Vec<RenderPass>,
    pub names: NameRegistry,
}

impl Frame {
    pub fn draws(&self) -> impl Iterator<Item = &DrawItem> {
        self.passes.iter().flat_map(|pass| pass.draws.iter())
    }

    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|pass| pass.draws.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.draws().map(|draw| draw.mesh.triangle_count()).sum()
    }
}

/// Presents frames on some output.
pub trait RenderBackend: Send {
    /// Draws the frame. Called once per successful render.
    fn present(&mut self, frame: &Frame) -> AnyResult;

    /// Releases all resources held by the backend. Called once, when the scene is destroyed.
    fn release(&mut self);
}
