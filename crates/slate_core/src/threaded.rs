//! Dedicated loop thread for the software canvas.
//!
//! The loop thread owns the controller, the registry and the canvas. The UI
//! side never touches them: it forwards `SurfaceEvent`s through a channel and
//! receives `LoopMessage::Refresh` with a copy of the presented image. At most
//! one message is buffered; frames presented while a refresh is still unread
//! are dropped. Dropping either end of the channels closes the loop at the
//! next poll.

use anyhow::anyhow;
use image::RgbaImage;
use std::sync::mpsc::{
    self, Receiver, RecvTimeoutError, Sender, SyncSender, TryRecvError, TrySendError,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::canvas::SoftwareCanvas;
use crate::config::WindowConfig;
use crate::lifecycle::{
    Frame, LifecycleController, Surface, SurfaceError, SurfaceEvent, WindowHooks, WindowState,
};

#[derive(Debug, Clone)]
pub enum LoopMessage {
    Refresh { frame_number: u64, image: RgbaImage },
    Closed { frames: u64, updates: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub update_divisor: u32,
    /// Minimum wall time per frame. Zero runs flat out.
    pub frame_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            update_divisor: 1,
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// Canvas plus the two channel ends, as seen from the loop thread.
struct ChannelSurface {
    canvas: SoftwareCanvas,
    events: Receiver<SurfaceEvent>,
    refresh: SyncSender<LoopMessage>,
    ui_gone: bool,
    dropped_refreshes: u64,
}

impl Surface for ChannelSurface {
    fn size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        self.canvas.present(frame)?;
        let message = LoopMessage::Refresh {
            frame_number: frame.stats.frame_number,
            image: self.canvas.image().clone(),
        };
        match self.refresh.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped_refreshes += 1,
            Err(TrySendError::Disconnected(_)) => self.ui_gone = true,
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        let mut out = self.canvas.poll_events();
        loop {
            match self.events.try_recv() {
                Ok(SurfaceEvent::Resized { width, height }) => {
                    // resize() queues the event for the next poll; take it now.
                    self.canvas.resize(width, height);
                    out.extend(self.canvas.poll_events());
                }
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.ui_gone = true;
                    break;
                }
            }
        }
        if self.ui_gone {
            out.push(SurfaceEvent::CloseRequested);
        }
        out
    }
}

/// UI-side handle to a running loop thread.
pub struct LoopHandle<H> {
    events: Sender<SurfaceEvent>,
    messages: Receiver<LoopMessage>,
    thread: JoinHandle<anyhow::Result<H>>,
}

/// Start the lifecycle on a new thread. `make_hooks` runs on the loop thread,
/// so sprites created by the hooks never cross threads.
pub fn spawn_loop<H, F>(
    config: WindowConfig,
    options: LoopOptions,
    make_hooks: F,
) -> anyhow::Result<LoopHandle<H>>
where
    H: WindowHooks + Send + 'static,
    F: FnOnce() -> H + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel();
    let (message_tx, message_rx) = mpsc::sync_channel(1);
    let title = config.title.clone();

    let thread = thread::Builder::new()
        .name(format!("slate-loop-{title}"))
        .spawn(move || run_loop(config, options, make_hooks(), event_rx, message_tx))?;

    log::info!("Spawned loop thread for '{}'", title);
    Ok(LoopHandle {
        events: event_tx,
        messages: message_rx,
        thread,
    })
}

fn run_loop<H: WindowHooks>(
    config: WindowConfig,
    options: LoopOptions,
    hooks: H,
    events: Receiver<SurfaceEvent>,
    refresh: SyncSender<LoopMessage>,
) -> anyhow::Result<H> {
    let (width, height) = config.size();
    let mut surface = ChannelSurface {
        canvas: SoftwareCanvas::new(width, height),
        events,
        refresh: refresh.clone(),
        ui_gone: false,
        dropped_refreshes: 0,
    };
    let mut controller = LifecycleController::new(config, options.update_divisor, hooks);
    controller.start(surface.size())?;

    loop {
        let started = Instant::now();
        let state = controller.run_frame(&mut surface)?;
        if state != WindowState::Running {
            break;
        }
        if let Some(remaining) = options.frame_interval.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }

    controller.shutdown()?;
    if surface.dropped_refreshes > 0 {
        log::debug!(
            "Dropped {} refresh(es) the UI had not caught up with",
            surface.dropped_refreshes
        );
    }
    let clock = controller.clock();
    // Blocks until the UI takes the pending refresh or drops its receiver.
    let _ = refresh.send(LoopMessage::Closed {
        frames: clock.frame_count,
        updates: clock.update_count,
    });
    Ok(controller.into_hooks())
}

impl<H> LoopHandle<H> {
    /// Forward an event to the loop. Returns `false` once the loop has exited.
    pub fn send(&self, event: SurfaceEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn request_close(&self) -> bool {
        self.send(SurfaceEvent::CloseRequested)
    }

    pub fn try_recv(&self) -> Option<LoopMessage> {
        self.messages.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<LoopMessage, RecvTimeoutError> {
        self.messages.recv_timeout(timeout)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Close both channels and wait for the loop to wind down.
    pub fn join(self) -> anyhow::Result<H> {
        let Self {
            events,
            messages,
            thread,
        } = self;
        drop(events);
        drop(messages);
        thread
            .join()
            .map_err(|_| anyhow!("loop thread panicked"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crate::lifecycle::FrameContext;
    use crate::sprite::{Sprite, SpriteDesc};
    use glam::Vec2;
    use image::Rgba;

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct Walker {
        player: Option<Sprite>,
        fail_load: bool,
    }

    impl WindowHooks for Walker {
        fn on_load(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
            if self.fail_load {
                anyhow::bail!("no assets");
            }
            self.player = Some(Sprite::with_image(
                ctx.registry(),
                SpriteDesc::new("player.png", 2, 2, Vec2::new(1.0, 1.0)),
                RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])),
            ));
            Ok(())
        }

        fn on_update(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
            if let Some(player) = self.player.as_mut() {
                player.translate(ctx.input().direction());
            }
            Ok(())
        }
    }

    fn small_window() -> WindowConfig {
        WindowConfig {
            width: 16,
            height: 8,
            ..WindowConfig::default()
        }
    }

    fn fast() -> LoopOptions {
        LoopOptions {
            update_divisor: 1,
            frame_interval: Duration::from_millis(1),
        }
    }

    fn next_refresh(handle: &LoopHandle<Walker>) -> (u64, RgbaImage) {
        match handle.recv_timeout(WAIT).expect("loop stalled") {
            LoopMessage::Refresh { frame_number, image } => (frame_number, image),
            LoopMessage::Closed { .. } => panic!("loop closed early"),
        }
    }

    #[test]
    fn refreshes_arrive_in_frame_order() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        let (first, image) = next_refresh(&handle);
        let (second, _) = next_refresh(&handle);
        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(image.dimensions(), (16, 8));
        assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);

        assert!(handle.request_close());
        let hooks = handle.join().expect("clean exit");
        assert!(hooks.player.is_some());
    }

    #[test]
    fn events_reach_the_loop_thread() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        next_refresh(&handle);
        handle.send(SurfaceEvent::KeyDown(Key::Right));
        // Wait until the player has visibly moved.
        let mut moved = false;
        for _ in 0..1000 {
            let (_, image) = next_refresh(&handle);
            if image.get_pixel(1, 1).0 != [255, 255, 255, 255] {
                moved = true;
                break;
            }
        }
        assert!(moved);
        handle.send(SurfaceEvent::KeyUp(Key::Right));
        let hooks = handle.join().expect("clean exit");
        let player = hooks.player.expect("player");
        assert!(player.position().x > 1.0);
        assert_eq!(player.position().y, 1.0);
    }

    #[test]
    fn resize_reallocates_canvas() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        handle.send(SurfaceEvent::Resized { width: 4, height: 4 });
        let mut resized = false;
        for _ in 0..1000 {
            let (_, image) = next_refresh(&handle);
            if image.dimensions() == (4, 4) {
                resized = true;
                break;
            }
        }
        assert!(resized);
        handle.join().expect("clean exit");
    }

    #[test]
    fn close_reports_counts() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        handle.request_close();
        let closed = loop {
            match handle.recv_timeout(WAIT).expect("loop stalled") {
                LoopMessage::Closed { frames, updates } => break (frames, updates),
                LoopMessage::Refresh { .. } => {}
            }
        };
        assert!(closed.0 >= 1);
        assert_eq!(closed.0, closed.1);
        handle.join().expect("clean exit");
    }

    #[test]
    fn hook_failure_surfaces_on_join() {
        let handle = spawn_loop(small_window(), fast(), || Walker {
            fail_load: true,
            ..Walker::default()
        })
        .expect("spawn");
        let err = handle.join().err().expect("load fails");
        assert!(format!("{err:#}").contains("on_load hook failed: no assets"));
    }

    #[test]
    fn idle_ui_buffers_at_most_one_refresh() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        // Let the loop present many frames while nothing drains the channel.
        thread::sleep(Duration::from_millis(200));
        handle.request_close();

        let mut refreshes = 0;
        let frames = loop {
            match handle.recv_timeout(WAIT).expect("loop stalled") {
                LoopMessage::Refresh { .. } => refreshes += 1,
                LoopMessage::Closed { frames, .. } => break frames,
            }
        };
        // The buffered frame, plus at most one presented before the close was polled.
        assert!(refreshes <= 2, "{refreshes} refreshes were buffered");
        assert!(frames > refreshes);
        handle.join().expect("clean exit");
    }

    #[test]
    fn join_does_not_wait_for_an_idle_ui() {
        let handle = spawn_loop(small_window(), fast(), Walker::default).expect("spawn");
        next_refresh(&handle);
        thread::sleep(Duration::from_millis(20));
        let hooks = handle.join().expect("clean exit");
        assert!(hooks.player.is_some());
    }
}
