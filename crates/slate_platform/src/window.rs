use std::sync::Arc;
use slate_core::config::WindowConfig;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(thiserror::Error, Debug)]
pub enum PlatformError {
    #[error("failed to create window: {0}")]
    CreateWindow(#[from] winit::error::OsError),
}

/// Window attributes for `config`. The inner size is in physical pixels so the
/// grid layout computed from the configured size matches the drawable area.
pub fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(&config.title)
        .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height))
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &WindowConfig,
) -> Result<Arc<Window>, PlatformError> {
    let window = event_loop.create_window(window_attributes(config))?;
    let size = window.inner_size();
    log::info!(
        "Window '{}' created: {}x{} (requested {}x{})",
        config.title,
        size.width,
        size.height,
        config.width,
        config.height
    );
    Ok(Arc::new(window))
}
