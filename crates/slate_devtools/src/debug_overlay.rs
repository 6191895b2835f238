//! Debug overlay rendered via egui on top of the sprite pass.
//!
//! egui needs a `RenderPass<'static>` while `begin_render_pass` borrows the
//! encoder, so a frame goes through four calls:
//!
//!   1. `prepare()` -- run the UI, produce tessellated primitives
//!   2. `upload()`  -- upload textures and update GPU buffers
//!   3. `paint()`   -- render into a pass created with `forget_lifetime()`
//!   4. `cleanup()` -- free textures egui no longer references
//!
//! UI logic only runs while `visible` (F3), but window events are always fed
//! to egui so the overlay can take clicks when shown.

use slate_core::lifecycle::FrameStats;
use winit::window::Window;

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub frame: FrameStats,
    pub draw_calls: u32,
    /// Bind-group switches across the draw calls
    pub texture_binds: u32,
    pub texture_count: u32,
    /// Estimated texture memory in megabytes
    pub texture_memory_mb: f32,
}

impl OverlayStats {
    /// Text rows shown in the overlay window, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let frame = &self.frame;
        vec![
            format!("FPS: {:.1}", frame.fps),
            format!("Frame time: {:.2} ms", frame.frame_time_ms),
            format!("Frame: {}", frame.frame_number),
            format!("Updates: {}", frame.update_count),
            format!("State: {}", frame.state),
            format!("Sprites: {}", frame.sprite_count),
            format!("Draw calls: {} ({} binds)", self.draw_calls, self.texture_binds),
            format!("Textures: {} ({:.1} MB)", self.texture_count, self.texture_memory_mb),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayActions {
    /// User clicked the close button
    pub close_requested: bool,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    /// Returns whether egui consumed the event.
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        self.egui_winit_state.on_window_event(window, event).consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        stats: &OverlayStats,
    ) -> (Vec<egui::ClippedPrimitive>, egui::TexturesDelta, OverlayActions) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if !visible {
                return;
            }
            egui::Window::new("Debug")
                .default_pos([10.0, 10.0])
                .show(ctx, |ui| {
                    for line in stats.lines() {
                        ui.label(line);
                    }
                    ui.separator();
                    if ui.button("Close window").clicked() {
                        actions.close_requested = true;
                    }
                });
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::lifecycle::WindowState;

    #[test]
    fn lines_report_frame_and_gpu_counters() {
        let stats = OverlayStats {
            frame: FrameStats {
                frame_number: 42,
                update_count: 21,
                fps: 59.94,
                frame_time_ms: 16.683,
                sprite_count: 136,
                state: WindowState::Running,
            },
            draw_calls: 2,
            texture_binds: 2,
            texture_count: 3,
            texture_memory_mb: 1.5,
        };
        let lines = stats.lines();
        assert_eq!(lines[0], "FPS: 59.9");
        assert_eq!(lines[1], "Frame time: 16.68 ms");
        assert!(lines.contains(&"Frame: 42".to_string()));
        assert!(lines.contains(&"Updates: 21".to_string()));
        assert!(lines.contains(&"State: Running".to_string()));
        assert!(lines.contains(&"Sprites: 136".to_string()));
        assert!(lines.contains(&"Draw calls: 2 (2 binds)".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Textures: 3 (1.5 MB)"));
    }
}
