//! wgpu render surfaces.
//!
//! Each surface owns its pipeline, buffers and an offscreen canvas texture.
//! Several surfaces can share one [`GpuContext`]; releasing a surface drops
//! its own resources only.

mod fluid;
mod points;

pub use fluid::WgpuFluidSurface;
pub use points::WgpuPointSurface;

use crate::error::{RenderError, RenderResult};
use pollster::block_on;
use std::sync::Arc;

/// Color format of every canvas.
pub const CANVAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub const POINTS_WGSL: &str = include_str!("../shaders/points.wgsl");
pub const FLUID_WGSL: &str = include_str!("../shaders/fluid.wgsl");

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    /// Open a device without any window attached.
    pub fn headless(power_preference: wgpu::PowerPreference) -> RenderResult<Arc<Self>> {
        let instance = wgpu::Instance::default();
        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let adapter_name = adapter.get_info().name;
        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glaze.device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|err| RenderError::RequestDevice(err.to_string()))?;

        // Errors outside a scope are logged, never panicked on.
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured gpu error");
        }));

        tracing::info!(adapter = %adapter_name, "gpu context ready");
        Ok(Arc::new(Self {
            device,
            queue,
            adapter_name,
        }))
    }

    /// Run `create` inside out-of-memory and validation error scopes and
    /// report whatever they caught.
    pub(crate) fn scoped<T>(&self, create: impl FnOnce() -> T) -> RenderResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        let validation = block_on(self.device.pop_error_scope());
        let out_of_memory = block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(gpu_error(err)),
            None => Ok(value),
        }
    }

    fn max_canvas_side(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn shader(&self, label: &str, source: &'static str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
    }

    fn uniform_layout(&self, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            })
    }

    fn uniform_bind_group(
        &self,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

fn gpu_error(err: wgpu::Error) -> RenderError {
    tracing::warn!(error = %err, "gpu resource creation failed");
    RenderError::Gpu(err.to_string())
}

/// Renderer-owned offscreen color target, with an optional depth buffer.
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth: Option<wgpu::TextureView>,
}

impl Canvas {
    pub(crate) fn new(
        ctx: &GpuContext,
        label: &str,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> RenderResult<Self> {
        let max = ctx.max_canvas_side();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::SurfaceNotReady { width, height });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let (texture, view, depth) = ctx.scoped(|| {
            let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: CANVAS_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

            let depth = with_depth.then(|| {
                ctx.device
                    .create_texture(&wgpu::TextureDescriptor {
                        label: Some("glaze.canvas.depth"),
                        size,
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format: DEPTH_FORMAT,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        view_formats: &[],
                    })
                    .create_view(&wgpu::TextureViewDescriptor::default())
            });
            (texture, view, depth)
        })?;

        Ok(Self {
            width,
            height,
            texture,
            view,
            depth,
        })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    fn color_attachment(&self) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: &self.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        }
    }

    fn depth_attachment(&self) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
        self.depth
            .as_ref()
            .map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            })
    }
}
