use glam::Vec2;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    /// Corners of an axis-aligned quad in pixel space, clockwise from the
    /// top-left. Texture row 0 is the top of the image, so v grows with y.
    pub fn quad(min: Vec2, size: Vec2, color: [f32; 4]) -> [SpriteVertex; 4] {
        let max = min + size;
        [
            SpriteVertex {
                position: [min.x, min.y],
                tex_coords: [0.0, 0.0],
                color,
            },
            SpriteVertex {
                position: [max.x, min.y],
                tex_coords: [1.0, 0.0],
                color,
            },
            SpriteVertex {
                position: [max.x, max.y],
                tex_coords: [1.0, 1.0],
                color,
            },
            SpriteVertex {
                position: [min.x, max.y],
                tex_coords: [0.0, 1.0],
                color,
            },
        ]
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}
