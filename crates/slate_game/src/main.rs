//! Slate -- winit entry point.
//!
//! winit drives the event loop via `ApplicationHandler`. The window and GPU
//! surface are created in `resumed`, which also starts the lifecycle
//! controller (`on_load`). Every `RedrawRequested` runs one controller frame:
//!
//!   1. `on_render`, then present the registry snapshot through `GpuSurface`
//!   2. apply window events queued since the last frame
//!   3. `on_update` on every `update_divisor`-th frame
//!
//! Once the controller reports `Closing` the app shuts it down and exits the
//! event loop. Fatal errors are stored and returned from `main`.

mod demo;

use std::path::Path;

use slate_core::assets::AssetCache;
use slate_core::config::{load_config_or_default, EngineConfig, DEFAULT_CONFIG_PATH};
use slate_core::lifecycle::{LifecycleController, Surface, WindowState};
use slate_render::GpuSurface;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use demo::DemoGame;

struct App {
    config: EngineConfig,
    assets: AssetCache,
    controller: LifecycleController<DemoGame>,
    surface: Option<GpuSurface>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        let assets = AssetCache::new(&config.assets.root);
        let hooks = DemoGame::new(assets.clone(), config.grid.clone());
        let controller =
            LifecycleController::new(config.window.clone(), config.frame.update_divisor, hooks);
        Self {
            config,
            assets,
            controller,
            surface: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = slate_platform::create_window(event_loop, &self.config.window)?;
        let surface = GpuSurface::new(window, &self.assets)?;
        self.controller.start(surface.size())?;
        self.surface = Some(surface);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        if self.controller.state() != WindowState::Running {
            return Ok(());
        }
        if self.controller.run_frame(surface)? == WindowState::Closing {
            self.controller.shutdown()?;
            event_loop.exit();
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.open(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(surface) = &self.surface {
            surface.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            event => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.handle_window_event(&event);
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Slate starting...");
    let config = load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => {
            log::info!("Slate exited cleanly");
            Ok(())
        }
    }
}
