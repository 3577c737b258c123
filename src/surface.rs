//! Render surfaces - the GPU side of each renderer.
//!
//! Renderers keep all per-frame state on the host and push it through these
//! traits. The wgpu implementations live in [`crate::gpu`]; tests use the
//! recording surfaces below to observe exactly what would reach the device.

use crate::error::RenderResult;
use crate::fluid_field::FluidUniforms;
use crate::point_field::PointUniforms;

/// Logical window size plus the device's pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Backing canvas size in physical pixels at `ratio`, never below 1x1.
    pub fn backing_size(&self, ratio: f32) -> (u32, u32) {
        let w = (self.width * ratio).round().max(1.0) as u32;
        let h = (self.height * ratio).round().max(1.0) as u32;
        (w, h)
    }
}

/// Device side of the point field.
pub trait PointSurface {
    /// Resize the backing canvas. May fail if the surface is not ready yet.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Upload the full position buffer (xyz per point).
    fn upload_positions(&mut self, positions: &[f32]) -> RenderResult<()>;

    /// Upload the full color buffer (rgb per point).
    fn upload_colors(&mut self, colors: &[f32]) -> RenderResult<()>;

    fn draw(&mut self, uniforms: &PointUniforms) -> RenderResult<()>;

    /// Free buffers, pipeline and canvas. Later calls must fail with
    /// [`RenderError::Released`](crate::RenderError::Released).
    fn release(&mut self);
}

/// Device side of the fluid field.
pub trait FluidSurface {
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    fn write_uniforms(&mut self, uniforms: &FluidUniforms) -> RenderResult<()>;

    fn draw(&mut self) -> RenderResult<()>;

    fn release(&mut self);
}
