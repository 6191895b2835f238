//! wgpu implementation of the lifecycle `Surface`.
//!
//! One `present` does: sync sprite textures with the snapshot, rebuild and
//! upload the quad mesh, clear to the window background, draw the batched
//! sprites, then composite the debug overlay and present the swapchain image.
//! Window events reach the surface through `handle_window_event` and are
//! handed to the controller on the next `poll_events`.

use std::sync::Arc;

use slate_core::assets::AssetCache;
use slate_core::input::Key;
use slate_core::lifecycle::{Frame, Surface, SurfaceError, SurfaceEvent};
use slate_devtools::{DebugOverlay, OverlayStats};
use slate_platform::translate_window_event;
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::batch::{count_texture_binds, SpriteBatch};
use crate::camera::Camera2D;
use crate::gpu_context::{clear_color, GpuContext, RenderError};
use crate::sprite_pipeline::{resolve_shader_source, SpritePipeline};
use crate::texture::{Texture, TextureCache};
use crate::vertex::SpriteVertex;

struct GpuSpriteTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

pub struct GpuSurface {
    window: Arc<Window>,
    gpu: GpuContext,
    camera: Camera2D,
    pipeline: SpritePipeline,
    overlay: DebugOverlay,
    textures: TextureCache<GpuSpriteTexture>,
    batch: SpriteBatch,
    pending: Vec<SurfaceEvent>,

    // Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl GpuSurface {
    pub fn new(window: Arc<Window>, assets: &AssetCache) -> Result<Self, RenderError> {
        let gpu = GpuContext::new(window.clone())?;
        let shader_source = resolve_shader_source(assets);
        let pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format, &shader_source);
        let overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);
        let camera = Camera2D::new(gpu.size.0, gpu.size.1);

        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        Ok(Self {
            window,
            gpu,
            camera,
            pipeline,
            overlay,
            textures: TextureCache::new(),
            batch: SpriteBatch::new(),
            pending: Vec::new(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            vertex_capacity: 0,
            index_capacity: 0,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Feed a winit event to the overlay and queue the engine event, if any.
    /// Keys egui consumed are not forwarded.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        let egui_consumed = self.overlay.handle_window_event(&self.window, event);
        if egui_consumed && matches!(event, WindowEvent::KeyboardInput { .. }) {
            return;
        }
        let Some(engine_event) = translate_window_event(event) else {
            return;
        };
        match engine_event {
            SurfaceEvent::Resized { width, height } => {
                self.gpu.resize(width, height);
                self.camera.resize(width, height);
                log::info!("Resized to {}x{}", width, height);
            }
            SurfaceEvent::KeyDown(Key::F3) => self.overlay.toggle(),
            SurfaceEvent::CloseRequested => log::info!("Close requested by window"),
            _ => {}
        }
        self.pending.push(engine_event);
    }

    fn sync_textures(&mut self, frame: &Frame) {
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        let pipeline = &self.pipeline;
        self.textures.sync(&frame.sprites, |image| {
            let texture = Texture::from_image(device, queue, image, "sprite");
            let bind_group = pipeline.create_texture_bind_group(device, &texture);
            GpuSpriteTexture {
                texture,
                bind_group,
            }
        });
    }

    fn upload_mesh(&mut self) {
        let vertices = self.batch.vertices();
        let indices = self.batch.indices();

        let needed_vertices = vertices.len().max(1);
        if needed_vertices > self.vertex_capacity {
            self.vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.vertex_capacity);
        }
        let needed_indices = indices.len().max(1);
        if needed_indices > self.index_capacity {
            self.index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.index_capacity);
        }

        if !vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }
        if !indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(indices));
        }
    }

    fn texture_memory_mb(&self) -> f32 {
        let bytes: usize = self.textures.values().map(|t| t.texture.byte_size()).sum();
        bytes as f32 / (1024.0 * 1024.0)
    }
}

impl Surface for GpuSurface {
    fn size(&self) -> (u32, u32) {
        self.gpu.size
    }

    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return Ok(());
        }

        self.sync_textures(frame);
        self.batch.rebuild(&frame.sprites, &self.textures);
        self.upload_mesh();
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );

        let Some((output, view)) = self.gpu.begin_frame()? else {
            return Ok(());
        };

        let stats = OverlayStats {
            frame: frame.stats,
            draw_calls: self.batch.draw_calls().len() as u32,
            texture_binds: count_texture_binds(self.batch.draw_calls()) as u32,
            texture_count: self.textures.len() as u32,
            texture_memory_mb: self.texture_memory_mb(),
        };
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.overlay.prepare(&self.window, &stats);
        if overlay_actions.close_requested {
            self.pending.push(SurfaceEvent::CloseRequested);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let clear = clear_color(frame.background, self.gpu.surface_format.is_srgb());
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            let mut last_bound = None;
            for draw in self.batch.draw_calls() {
                let Some(texture) = self.textures.get(draw.texture) else {
                    continue;
                };
                if last_bound != Some(draw.texture) {
                    render_pass.set_bind_group(1, &texture.bind_group, &[]);
                    last_bound = Some(draw.texture);
                }
                let end = draw.index_start + draw.index_count;
                render_pass.draw_indexed(draw.index_start..end, 0, 0..1);
            }
        }

        self.overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        log::trace!(
            "Presented frame {}: {} quad(s), {} draw call(s)",
            frame.stats.frame_number,
            self.batch.quad_count(),
            self.batch.draw_calls().len()
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.pending)
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
