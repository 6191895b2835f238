pub mod assets;
pub mod canvas;
pub mod collision;
pub mod color;
pub mod config;
pub mod frame;
pub mod grid;
pub mod input;
pub mod lifecycle;
pub mod registry;
pub mod replay;
pub mod sprite;
pub mod threaded;

pub use assets::{AssetCache, AssetError};
pub use canvas::SoftwareCanvas;
pub use collision::Aabb;
pub use color::{ColorParseError, Rgb};
pub use config::{EngineConfig, GridConfig, WindowConfig};
pub use frame::FrameClock;
pub use grid::{Cell, Grid, GridError, GridLayout};
pub use input::{InputState, Key};
pub use lifecycle::{
    Frame, FrameContext, FrameStats, LifecycleController, LifecycleError, Surface, SurfaceError,
    SurfaceEvent, WindowHooks, WindowState,
};
pub use registry::{SpriteRegistry, SpriteSnapshot};
pub use sprite::{Sprite, SpriteDesc, SpriteId};
