//! Pixel-space orthographic camera. World units are window pixels with the
//! origin at the top-left corner and y growing downward, matching sprite
//! positions and grid cell origins.

use glam::Mat4;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

pub struct Camera2D {
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn view_proj(&self) -> Mat4 {
        let width = self.viewport.0.max(1) as f32;
        let height = self.viewport.1.max(1) as f32;

        // bottom > top flips y so pixel rows run downward.
        Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0)
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn ndc(camera: &Camera2D, x: f32, y: f32) -> Vec2 {
        let p = camera.view_proj().project_point3(Vec3::new(x, y, 0.0));
        Vec2::new(p.x, p.y)
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn top_left_pixel_maps_to_upper_left_ndc() {
        let camera = Camera2D::new(800, 500);
        assert!(close(ndc(&camera, 0.0, 0.0), Vec2::new(-1.0, 1.0)));
        assert!(close(ndc(&camera, 800.0, 500.0), Vec2::new(1.0, -1.0)));
        assert!(close(ndc(&camera, 400.0, 250.0), Vec2::ZERO));
    }

    #[test]
    fn resize_keeps_one_unit_per_pixel() {
        let mut camera = Camera2D::new(800, 500);
        camera.resize(400, 200);
        assert!(close(ndc(&camera, 400.0, 200.0), Vec2::new(1.0, -1.0)));
        assert!(close(ndc(&camera, 200.0, 100.0), Vec2::ZERO));
    }

    #[test]
    fn zero_viewport_is_clamped() {
        let camera = Camera2D::new(0, 0);
        assert!(camera.view_proj().is_finite());
    }
}
