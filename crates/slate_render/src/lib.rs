pub mod batch;
pub mod camera;
pub mod gpu_context;
pub mod sprite_pipeline;
pub mod surface;
pub mod texture;
pub mod vertex;

pub use batch::{DrawCall, SpriteBatch};
pub use camera::{Camera2D, CameraUniform};
pub use gpu_context::{GpuContext, RenderError};
pub use sprite_pipeline::SpritePipeline;
pub use surface::GpuSurface;
pub use texture::{Texture, TextureCache, TextureKey};
pub use vertex::SpriteVertex;
