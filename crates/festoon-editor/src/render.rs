//! Renderer port. The editor never draws; it asks a backend for rendered
//! node boxes and raster output.

use festoon_core::{Bounds, NodeId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("renderer is not ready")]
    NotReady,
    #[error("nothing to export")]
    NoContent,
    #[error("renderer failed: {0}")]
    Backend(String),
}

pub trait Renderer {
    /// Rendered box of a visible node, in canvas space. `None` for nodes
    /// that are hidden or not drawn.
    fn node_rect(&self, id: NodeId) -> Option<Bounds>;

    /// Encode the scene (or `region` of it) as PNG at `pixel_ratio`.
    fn rasterize(&self, region: Option<Bounds>, pixel_ratio: f32) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub pixel_ratio: f32,
    pub crop_to_content: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: 2.0,
            crop_to_content: false,
        }
    }
}
