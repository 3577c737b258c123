use super::{Canvas, GpuContext, CANVAS_FORMAT, FLUID_WGSL};
use crate::error::{RenderError, RenderResult};
use crate::fluid_field::FluidUniforms;
use crate::surface::FluidSurface;
use std::sync::Arc;

struct FluidResources {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Full-screen fluid shader drawn as a single triangle.
pub struct WgpuFluidSurface {
    ctx: Arc<GpuContext>,
    resources: Option<FluidResources>,
    canvas: Option<Canvas>,
}

impl WgpuFluidSurface {
    pub fn new(ctx: Arc<GpuContext>) -> RenderResult<Self> {
        let resources = ctx.scoped(|| Self::create(&ctx))?;
        tracing::debug!("fluid surface created");
        Ok(Self {
            ctx,
            resources: Some(resources),
            canvas: None,
        })
    }

    fn create(ctx: &GpuContext) -> FluidResources {
        let layout = ctx.uniform_layout(
            "glaze.fluid.layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let uniforms = ctx.buffer(
            "glaze.fluid.uniforms",
            std::mem::size_of::<FluidUniforms>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        let bind_group = ctx.uniform_bind_group("glaze.fluid.bind", &layout, &uniforms);

        let module = ctx.shader("glaze.fluid.shader", FLUID_WGSL);
        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("glaze.fluid.pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("glaze.fluid.pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
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

        FluidResources {
            pipeline,
            uniforms,
            bind_group,
        }
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    fn resources(&self) -> RenderResult<&FluidResources> {
        self.resources.as_ref().ok_or(RenderError::Released)
    }
}

impl FluidSurface for WgpuFluidSurface {
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.resources()?;
        self.canvas = Some(Canvas::new(&self.ctx, "glaze.fluid.canvas", width, height, false)?);
        Ok(())
    }

    fn write_uniforms(&mut self, uniforms: &FluidUniforms) -> RenderResult<()> {
        let resources = self.resources()?;
        self.ctx
            .queue
            .write_buffer(&resources.uniforms, 0, bytemuck::bytes_of(uniforms));
        Ok(())
    }

    fn draw(&mut self) -> RenderResult<()> {
        let resources = self.resources()?;
        let canvas = self
            .canvas
            .as_ref()
            .ok_or(RenderError::SurfaceNotReady { width: 0, height: 0 })?;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("glaze.fluid.encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("glaze.fluid.pass"),
                color_attachments: &[Some(canvas.color_attachment())],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&resources.pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.ctx.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            resources.uniforms.destroy();
        }
        if let Some(canvas) = self.canvas.take() {
            canvas.texture().destroy();
        }
        tracing::debug!("fluid surface released");
    }
}
