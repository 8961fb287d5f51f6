use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, trace};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::surface::{DrawError, RenderSurface};
use crate::types::BackdropOptions;
use crate::uniforms::FrameUniforms;

use super::context::GpuContext;
use super::pipeline::BackdropPipeline;

struct MultisampleTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    fn for_context(context: &GpuContext) -> Option<Self> {
        (context.sample_count > 1).then(|| {
            Self::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }
}

/// `wgpu` implementation of [`RenderSurface`] drawing into a window swapchain.
pub struct GpuSurface {
    context: GpuContext,
    pipeline: BackdropPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    multisample_target: Option<MultisampleTarget>,
}

impl GpuSurface {
    pub fn new(
        window: Arc<Window>,
        size: PhysicalSize<u32>,
        options: &BackdropOptions,
    ) -> Result<Self> {
        let context = GpuContext::new(window, size, options)?;
        let pipeline = BackdropPipeline::new(
            &context.device,
            context.surface_format,
            context.sample_count,
        )?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("backdrop uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("backdrop uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let multisample_target = MultisampleTarget::for_context(&context);
        debug!(
            width = context.size.width,
            height = context.size.height,
            sample_count = context.sample_count,
            "gpu surface ready"
        );

        Ok(Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            multisample_target,
        })
    }
}

impl RenderSurface for GpuSurface {
    fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) -> PhysicalSize<u32> {
        let applied = self.context.resize(size);
        if let Some(old) = self.multisample_target.take() {
            old.texture.destroy();
        }
        self.multisample_target = MultisampleTarget::for_context(&self.context);
        applied
    }

    fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), DrawError> {
        let frame = self.context.surface.get_current_texture()?;
        if frame.suboptimal {
            trace!("presenting to a suboptimal swapchain");
        }

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("backdrop encoder"),
                });

        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(&view)),
            None => (&view, None),
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("backdrop pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.context.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn recover(&mut self) {
        debug!(
            width = self.context.size.width,
            height = self.context.size.height,
            "reconfiguring lost surface"
        );
        self.context.reconfigure();
    }

    fn release(self) {
        let Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            multisample_target,
        } = self;

        drop(uniform_bind_group);
        uniform_buffer.destroy();
        if let Some(msaa) = multisample_target {
            msaa.texture.destroy();
        }
        drop(pipeline);
        context.device.destroy();
        debug!("gpu surface released");
    }
}
