use super::{Canvas, GpuContext, CANVAS_FORMAT, DEPTH_FORMAT, POINTS_WGSL};
use crate::error::{RenderError, RenderResult};
use crate::point_field::PointUniforms;
use crate::surface::PointSurface;
use bytemuck::cast_slice;
use std::sync::Arc;

const STRIDE: u64 = 3 * std::mem::size_of::<f32>() as u64;

struct PointResources {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    positions: wgpu::Buffer,
    colors: wgpu::Buffer,
}

/// Point field drawn as instanced, size-attenuated quads.
pub struct WgpuPointSurface {
    ctx: Arc<GpuContext>,
    point_count: usize,
    resources: Option<PointResources>,
    canvas: Option<Canvas>,
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const COLOR_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];

fn instance_layout(attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: STRIDE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

impl WgpuPointSurface {
    /// Build the pipeline and buffers for `point_count` points. The canvas
    /// is created by the first resize.
    pub fn new(ctx: Arc<GpuContext>, point_count: usize) -> RenderResult<Self> {
        let resources = ctx.scoped(|| Self::create(&ctx, point_count))?;
        tracing::debug!(points = point_count, "point surface created");
        Ok(Self {
            ctx,
            point_count,
            resources: Some(resources),
            canvas: None,
        })
    }

    fn create(ctx: &GpuContext, point_count: usize) -> PointResources {
        let layout = ctx.uniform_layout("glaze.points.layout", wgpu::ShaderStages::VERTEX);
        let uniforms = ctx.buffer(
            "glaze.points.uniforms",
            std::mem::size_of::<PointUniforms>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        let bind_group = ctx.uniform_bind_group("glaze.points.bind", &layout, &uniforms);

        let buffer_size = point_count as u64 * STRIDE;
        let positions = ctx.buffer("glaze.points.positions", buffer_size, wgpu::BufferUsages::VERTEX);
        let colors = ctx.buffer("glaze.points.colors", buffer_size, wgpu::BufferUsages::VERTEX);

        let module = ctx.shader("glaze.points.shader", POINTS_WGSL);
        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("glaze.points.pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("glaze.points.pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[instance_layout(&POSITION_ATTRS), instance_layout(&COLOR_ATTRS)],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: "fs_main",
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: CANVAS_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            });

        PointResources {
            pipeline,
            uniforms,
            bind_group,
            positions,
            colors,
        }
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    fn resources(&self) -> RenderResult<&PointResources> {
        self.resources.as_ref().ok_or(RenderError::Released)
    }

    fn upload(&self, buffer: &wgpu::Buffer, data: &[f32]) -> RenderResult<()> {
        let expected = self.point_count * 3;
        if data.len() != expected {
            return Err(RenderError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        self.ctx.queue.write_buffer(buffer, 0, cast_slice(data));
        Ok(())
    }
}

impl PointSurface for WgpuPointSurface {
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.resources()?;
        self.canvas = Some(Canvas::new(&self.ctx, "glaze.points.canvas", width, height, true)?);
        Ok(())
    }

    fn upload_positions(&mut self, positions: &[f32]) -> RenderResult<()> {
        let resources = self.resources()?;
        self.upload(&resources.positions, positions)
    }

    fn upload_colors(&mut self, colors: &[f32]) -> RenderResult<()> {
        let resources = self.resources()?;
        self.upload(&resources.colors, colors)
    }

    fn draw(&mut self, uniforms: &PointUniforms) -> RenderResult<()> {
        let resources = self.resources()?;
        let canvas = self
            .canvas
            .as_ref()
            .ok_or(RenderError::SurfaceNotReady { width: 0, height: 0 })?;

        self.ctx
            .queue
            .write_buffer(&resources.uniforms, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glaze.points.encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glaze.points.pass"),
                color_attachments: &[Some(canvas.color_attachment())],
                depth_stencil_attachment: canvas.depth_attachment(),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            pass.set_vertex_buffer(0, resources.positions.slice(..));
            pass.set_vertex_buffer(1, resources.colors.slice(..));
            pass.draw(0..6, 0..self.point_count as u32);
        }
        self.ctx.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            resources.positions.destroy();
            resources.colors.destroy();
            resources.uniforms.destroy();
        }
        if let Some(canvas) = self.canvas.take() {
            canvas.texture().destroy();
        }
        tracing::debug!("point surface released");
    }
}
