use super::camera::Camera;
use crate::scene::{GpuHandle, RenderHost};

/// Current size of a session's drawing area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Applies a resize notification: the camera aspect becomes
    /// `width / height` and the render target is resized to exactly
    /// `(width, height)`. Zero-sized notifications are ignored.
    ///
    /// Returns whether anything changed.
    pub fn on_resize(
        &mut self,
        camera: &mut Camera,
        host: &mut dyn RenderHost,
        render_target: GpuHandle,
        width: u32,
        height: u32,
    ) -> bool {
        if width == 0 || height == 0 {
            log::debug!("ignoring {}x{} resize", width, height);
            return false;
        }

        self.width = width;
        self.height = height;
        camera.set_aspect(self.aspect_ratio());
        host.resize_render_target(render_target, width, height);
        true
    }
}
