//! Scripted input for headless runs.
//!
//! A script lists which keys are held on each frame. Replaying turns the
//! held sets into key down/up events, feeds them to a [`SoftwareCanvas`] one
//! frame at a time and runs the lifecycle to completion. The same script and
//! hooks always produce the same final image.

use image::RgbaImage;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::canvas::SoftwareCanvas;
use crate::config::WindowConfig;
use crate::input::Key;
use crate::lifecycle::{LifecycleController, SurfaceEvent, WindowHooks, WindowState};

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse replay JSON {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("replay validation failed: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InputScript {
    pub frames: Vec<ScriptFrame>,
    /// Send a close request after the last scripted frame.
    #[serde(default = "default_close")]
    pub close: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScriptFrame {
    #[serde(default)]
    pub held: Vec<Key>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

/// Result of a replay run.
pub struct ReplayOutcome<H> {
    pub hooks: H,
    pub frames: u64,
    pub updates: u64,
    pub image: RgbaImage,
}

impl InputScript {
    /// Held-key set for every frame, with repeats expanded.
    pub fn expanded(&self) -> Vec<BTreeSet<Key>> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let held: BTreeSet<Key> = frame.held.iter().copied().collect();
            for _ in 0..frame.repeat.max(1) {
                out.push(held.clone());
            }
        }
        out
    }

    /// Events to deliver on each frame: key transitions relative to the
    /// previous frame, plus the close request on the last frame.
    pub fn frame_events(&self) -> Vec<Vec<SurfaceEvent>> {
        let mut previous = BTreeSet::new();
        let mut out: Vec<Vec<SurfaceEvent>> = self
            .expanded()
            .into_iter()
            .map(|held| {
                let mut events: Vec<SurfaceEvent> =
                    previous.difference(&held).map(|k| SurfaceEvent::KeyUp(*k)).collect();
                events.extend(held.difference(&previous).map(|k| SurfaceEvent::KeyDown(*k)));
                previous = held;
                events
            })
            .collect();
        if self.close {
            if let Some(last) = out.last_mut() {
                last.push(SurfaceEvent::CloseRequested);
            }
        }
        out
    }
}

pub fn load_script_from_path(path: &Path) -> Result<InputScript, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let script: InputScript = serde_json::from_str(&raw).map_err(|source| ReplayError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_script(&script)?;
    Ok(script)
}

fn validate_script(script: &InputScript) -> Result<(), ReplayError> {
    if script.frames.is_empty() {
        return Err(ReplayError::Invalid("frames list is empty"));
    }
    if script.frames.iter().any(|frame| frame.repeat == 0) {
        return Err(ReplayError::Invalid("repeat must be > 0"));
    }
    Ok(())
}

/// Run `hooks` against a software canvas of the window's size, one scripted
/// frame per loop iteration. The run ends when the lifecycle leaves `Running`
/// or the script runs out, whichever comes first.
pub fn replay<H: WindowHooks>(
    script: &InputScript,
    config: WindowConfig,
    update_divisor: u32,
    hooks: H,
) -> anyhow::Result<ReplayOutcome<H>> {
    let (width, height) = config.size();
    let mut canvas = SoftwareCanvas::new(width, height);
    let mut controller = LifecycleController::new(config, update_divisor, hooks);
    controller.start((width, height))?;

    for events in script.frame_events() {
        for event in events {
            canvas.push_event(event);
        }
        if controller.run_frame(&mut canvas)? != WindowState::Running {
            break;
        }
    }
    controller.shutdown()?;

    let clock = controller.clock();
    let (frames, updates) = (clock.frame_count, clock.update_count);
    log::debug!("Replay finished after {} frame(s), {} update(s)", frames, updates);
    Ok(ReplayOutcome {
        image: canvas.image().clone(),
        frames,
        updates,
        hooks: controller.into_hooks(),
    })
}

const fn default_repeat() -> u32 {
    1
}

const fn default_close() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::FrameContext;
    use crate::sprite::{Sprite, SpriteDesc};
    use glam::Vec2;
    use image::Rgba;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "slate_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[derive(Default)]
    struct Walker {
        player: Option<Sprite>,
    }

    impl WindowHooks for Walker {
        fn on_load(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
            self.player = Some(Sprite::with_image(
                ctx.registry(),
                SpriteDesc::new("player.png", 3, 3, Vec2::new(10.0, 10.0)),
                RgbaImage::from_pixel(1, 1, Rgba([0, 200, 0, 255])),
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

    fn window() -> WindowConfig {
        WindowConfig {
            width: 64,
            height: 48,
            ..WindowConfig::default()
        }
    }

    #[test]
    fn script_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "held": ["right"], "repeat": 3 },
                { "held": ["right", "down"] },
                { "repeat": 2 }
              ]
            }"#,
        )
        .expect("write script file");

        let script = load_script_from_path(&path).expect("script should load");
        assert!(script.close);
        let expanded = script.expanded();
        assert_eq!(expanded.len(), 6);
        assert!(expanded[3].contains(&Key::Down));
        assert!(expanded[5].is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_script_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write script file");
        let err = load_script_from_path(&path).expect_err("empty script");
        assert!(matches!(err, ReplayError::Invalid(_)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let path = temp_file_path("bad_key");
        fs::write(&path, r#"{ "frames": [ { "held": ["space"] } ] }"#).expect("write script file");
        let err = load_script_from_path(&path).expect_err("unknown key");
        assert!(matches!(err, ReplayError::Parse { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn frame_events_only_report_transitions() {
        let script = InputScript {
            frames: vec![
                ScriptFrame {
                    held: vec![Key::Right],
                    repeat: 2,
                },
                ScriptFrame {
                    held: vec![Key::Up],
                    repeat: 1,
                },
            ],
            close: true,
        };
        assert_eq!(
            script.frame_events(),
            vec![
                vec![SurfaceEvent::KeyDown(Key::Right)],
                vec![],
                vec![
                    SurfaceEvent::KeyUp(Key::Right),
                    SurfaceEvent::KeyDown(Key::Up),
                    SurfaceEvent::CloseRequested
                ],
            ]
        );
    }

    #[test]
    fn replay_moves_sprite_by_held_frames() {
        let script = InputScript {
            frames: vec![
                ScriptFrame {
                    held: vec![Key::Right],
                    repeat: 5,
                },
                ScriptFrame {
                    held: vec![Key::Down],
                    repeat: 2,
                },
            ],
            close: true,
        };
        let outcome = replay(&script, window(), 1, Walker::default()).expect("replay");
        let player = outcome.hooks.player.expect("player");
        assert_eq!(player.position(), Vec2::new(15.0, 12.0));
        assert_eq!(outcome.frames, 7);
        assert_eq!(outcome.updates, 7);
    }

    #[test]
    fn replay_respects_update_divisor() {
        let script = InputScript {
            frames: vec![ScriptFrame {
                held: vec![Key::Left],
                repeat: 6,
            }],
            close: true,
        };
        let outcome = replay(&script, window(), 2, Walker::default()).expect("replay");
        assert_eq!(outcome.updates, 3);
        assert_eq!(outcome.hooks.player.expect("player").position(), Vec2::new(7.0, 10.0));
    }

    #[test]
    fn replay_run_is_deterministic() {
        let script = InputScript {
            frames: vec![
                ScriptFrame {
                    held: vec![Key::Right, Key::Down],
                    repeat: 20,
                },
                ScriptFrame {
                    held: vec![Key::Left],
                    repeat: 7,
                },
                ScriptFrame {
                    held: vec![],
                    repeat: 3,
                },
            ],
            close: true,
        };
        let run_a = replay(&script, window(), 1, Walker::default()).expect("replay a");
        let run_b = replay(&script, window(), 1, Walker::default()).expect("replay b");
        assert_eq!(run_a.image, run_b.image);
        assert_eq!(run_a.frames, run_b.frames);
        let pos_a = run_a.hooks.player.expect("player").position();
        let pos_b = run_b.hooks.player.expect("player").position();
        assert_eq!(pos_a, pos_b);
        assert_eq!(pos_a, Vec2::new(23.0, 30.0));
    }
}
