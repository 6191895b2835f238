pub mod keymap;
pub mod window;

pub use keymap::{map_key, translate_window_event};
pub use window::{create_window, PlatformError};
