//! Window lifecycle controller.
//!
//! ```text
//! Created --start()--> Loaded --(on_load ok)--> Running
//! Running --close--> Closing --shutdown()--> Terminated
//! ```
//!
//! The controller is backend-agnostic. A backend implements [`Surface`]
//! (present a frame, hand over pending events) and the application implements
//! [`WindowHooks`]. Each `run_frame` while `Running`:
//!
//!   1. `on_render` (every frame)
//!   2. present a registry snapshot to the surface
//!   3. drain and apply surface events (keys, resize, close)
//!   4. `on_update`, only when `frame_count % update_divisor == 0`
//!   5. advance the frame counter
//!
//! Hook errors are not caught: they propagate out of `start`/`run_frame` to
//! the caller with the failing hook named as context.

use anyhow::Context as _;

use crate::color::Rgb;
use crate::config::WindowConfig;
use crate::frame::FrameClock;
use crate::input::{InputState, Key};
use crate::registry::{SpriteRegistry, SpriteSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Created,
    Loaded,
    Running,
    Closing,
    Terminated,
}

impl WindowState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Loaded => "Loaded",
            Self::Running => "Running",
            Self::Closing => "Closing",
            Self::Terminated => "Terminated",
        }
    }
}

impl std::fmt::Display for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot {op} while the window is {state}")]
    InvalidState { op: &'static str, state: WindowState },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface lost")]
    Lost,
    #[error("surface out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Other(String),
}

/// Events a backend collects between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    KeyDown(Key),
    KeyUp(Key),
    Resized { width: u32, height: u32 },
    CloseRequested,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frame_number: u64,
    pub update_count: u64,
    pub fps: f64,
    pub frame_time_ms: f64,
    pub sprite_count: usize,
    pub state: WindowState,
}

/// Everything a backend needs to present one frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub background: Rgb,
    pub sprites: Vec<SpriteSnapshot>,
    pub stats: FrameStats,
}

/// A presentation backend: the native window surface or a software canvas.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Draw `frame` and make it visible (swap buffers / request refresh).
    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError>;

    /// Drain the events received since the last call.
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;
}

/// Application callbacks driven by the controller.
pub trait WindowHooks {
    /// Called once by `start`. Build the grid and initial sprites here.
    fn on_load(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()>;

    /// Called on update frames only.
    fn on_update(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()>;

    /// Called every frame before the frame is presented.
    fn on_render(&mut self, _ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the surface reports a new size. The controller does not
    /// rebuild any grid; size-dependent state is the hook's business.
    fn on_resize(
        &mut self,
        _ctx: &mut FrameContext<'_>,
        _width: u32,
        _height: u32,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// State shared with hooks for the duration of one callback.
struct LoopState {
    config: WindowConfig,
    registry: SpriteRegistry,
    input: InputState,
    clock: FrameClock,
    surface_size: (u32, u32),
    close_requested: bool,
}

impl LoopState {
    fn context(&mut self) -> FrameContext<'_> {
        FrameContext { state: self }
    }
}

pub struct FrameContext<'a> {
    state: &'a mut LoopState,
}

impl FrameContext<'_> {
    /// The registry sprites should be constructed against.
    pub fn registry(&self) -> &SpriteRegistry {
        &self.state.registry
    }

    pub fn input(&self) -> &InputState {
        &self.state.input
    }

    pub fn window(&self) -> &WindowConfig {
        &self.state.config
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.state.surface_size
    }

    pub fn frame_count(&self) -> u64 {
        self.state.clock.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.state.clock.update_count
    }

    /// Ask the loop to stop after the current frame.
    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.state.close_requested
    }
}

pub struct LifecycleController<H> {
    hooks: H,
    state: WindowState,
    shared: LoopState,
}

impl<H: WindowHooks> LifecycleController<H> {
    /// Construction only records configuration; nothing runs until `start`.
    pub fn new(config: WindowConfig, update_divisor: u32, hooks: H) -> Self {
        let surface_size = config.size();
        Self {
            hooks,
            state: WindowState::Created,
            shared: LoopState {
                config,
                registry: SpriteRegistry::new(),
                input: InputState::new(),
                clock: FrameClock::new(update_divisor),
                surface_size,
                close_requested: false,
            },
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn config(&self) -> &WindowConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &SpriteRegistry {
        &self.shared.registry
    }

    pub fn input(&self) -> &InputState {
        &self.shared.input
    }

    pub fn clock(&self) -> &FrameClock {
        &self.shared.clock
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    pub fn request_close(&mut self) {
        self.shared.close_requested = true;
    }

    fn expect_state(&self, expected: WindowState, op: &'static str) -> Result<(), LifecycleError> {
        if self.state != expected {
            return Err(LifecycleError::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: WindowState) {
        log::info!("Window '{}': {} -> {}", self.shared.config.title, self.state, next);
        self.state = next;
    }

    /// `Created -> Loaded -> Running`, invoking `on_load` in between.
    pub fn start(&mut self, surface_size: (u32, u32)) -> anyhow::Result<()> {
        self.expect_state(WindowState::Created, "start")?;
        self.shared.surface_size = surface_size;
        self.transition(WindowState::Loaded);
        self.hooks
            .on_load(&mut self.shared.context())
            .context("on_load hook failed")?;
        log::info!("Loaded with {} sprite(s)", self.shared.registry.len());
        self.transition(WindowState::Running);
        Ok(())
    }

    /// Run one loop iteration and return the state afterwards.
    pub fn run_frame<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> anyhow::Result<WindowState> {
        self.expect_state(WindowState::Running, "run a frame")?;
        self.shared.clock.begin_frame();

        self.hooks
            .on_render(&mut self.shared.context())
            .context("on_render hook failed")?;

        let frame = self.snapshot_frame();
        surface.present(&frame)?;

        for event in surface.poll_events() {
            self.apply_event(event)?;
        }

        if self.shared.clock.should_update() {
            self.hooks
                .on_update(&mut self.shared.context())
                .context("on_update hook failed")?;
            self.shared.clock.record_update();
            self.shared.input.end_frame();
        }

        self.shared.clock.end_frame();

        if self.shared.close_requested {
            log::info!("Close requested after frame {}", frame.stats.frame_number);
            self.transition(WindowState::Closing);
        }
        Ok(self.state)
    }

    /// `Closing -> Terminated`. A running controller passes through `Closing`.
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        match self.state {
            WindowState::Running => self.transition(WindowState::Closing),
            WindowState::Closing => {}
            state => {
                return Err(LifecycleError::InvalidState {
                    op: "shut down",
                    state,
                }
                .into())
            }
        }
        log::info!(
            "Shutting down after {} frame(s), {} update(s)",
            self.shared.clock.frame_count,
            self.shared.clock.update_count
        );
        self.transition(WindowState::Terminated);
        Ok(())
    }

    /// Drive the whole lifecycle against `surface` until a close is requested.
    pub fn run<S: Surface + ?Sized>(&mut self, surface: &mut S) -> anyhow::Result<()> {
        self.start(surface.size())?;
        while self.run_frame(surface)? == WindowState::Running {}
        self.shutdown()
    }

    pub fn snapshot_frame(&self) -> Frame {
        let sprites = self.shared.registry.snapshot();
        let clock = &self.shared.clock;
        Frame {
            background: self.shared.config.background,
            stats: FrameStats {
                frame_number: clock.frame_count,
                update_count: clock.update_count,
                fps: clock.smoothed_fps,
                frame_time_ms: clock.smoothed_frame_time_ms,
                sprite_count: sprites.len(),
                state: self.state,
            },
            sprites,
        }
    }

    fn apply_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::KeyDown(Key::Escape) => {
                self.shared.input.key_down(Key::Escape);
                self.shared.close_requested = true;
            }
            SurfaceEvent::KeyDown(key) => self.shared.input.key_down(key),
            SurfaceEvent::KeyUp(key) => self.shared.input.key_up(key),
            SurfaceEvent::Resized { width, height } => {
                self.shared.surface_size = (width, height);
                log::debug!("Surface resized to {}x{}", width, height);
                self.hooks
                    .on_resize(&mut self.shared.context(), width, height)
                    .context("on_resize hook failed")?;
            }
            SurfaceEvent::CloseRequested => self.shared.close_requested = true,
        }
        Ok(())
    }
}
