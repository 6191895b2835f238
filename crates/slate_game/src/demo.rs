//! Demo application: a tiled background grid and one player sprite moved one
//! pixel per update with the arrow keys.

use anyhow::Context as _;
use glam::Vec2;
use slate_core::assets::AssetCache;
use slate_core::config::GridConfig;
use slate_core::grid::Grid;
use slate_core::lifecycle::{FrameContext, WindowHooks};
use slate_core::sprite::{Sprite, SpriteDesc};

pub const PLAYER_ASSET: &str = "player.png";
pub const PLAYER_SIZE: u32 = 32;
pub const PLAYER_START: Vec2 = Vec2::new(10.0, 10.0);

pub struct DemoGame {
    assets: AssetCache,
    grid_config: GridConfig,
    grid: Option<Grid>,
    player: Option<Sprite>,
}

impl DemoGame {
    pub fn new(assets: AssetCache, grid_config: GridConfig) -> Self {
        Self {
            assets,
            grid_config,
            grid: None,
            player: None,
        }
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn player(&self) -> Option<&Sprite> {
        self.player.as_ref()
    }
}

impl WindowHooks for DemoGame {
    fn on_load(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
        // Tiles register before the player so the player draws on top.
        let grid = Grid::tiled(ctx.window().size(), &self.grid_config, ctx.registry(), &self.assets)
            .context("failed to build background grid")?;
        let player = Sprite::load(
            ctx.registry(),
            &self.assets,
            SpriteDesc::new(PLAYER_ASSET, PLAYER_SIZE, PLAYER_SIZE, PLAYER_START),
        )
        .with_context(|| format!("failed to load player sprite '{PLAYER_ASSET}'"))?;

        log::info!(
            "Demo loaded: {}x{} grid, player at ({}, {})",
            grid.width(),
            grid.height(),
            PLAYER_START.x,
            PLAYER_START.y
        );
        self.grid = Some(grid);
        self.player = Some(player);
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut FrameContext<'_>) -> anyhow::Result<()> {
        let delta = ctx.input().direction();
        if delta == Vec2::ZERO {
            return Ok(());
        }
        if let Some(player) = self.player.as_mut() {
            player.translate(delta);
            log::trace!("Player moved to {:?}", player.position());
        }
        Ok(())
    }

    fn on_resize(
        &mut self,
        _ctx: &mut FrameContext<'_>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<()> {
        if let Some(grid) = &self.grid {
            log::debug!(
                "Window now {}x{}; grid stays {}x{}",
                width,
                height,
                grid.width(),
                grid.height()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use slate_core::config::WindowConfig;
    use slate_core::grid::Cell;
    use slate_core::input::Key;
    use slate_core::replay::{replay, InputScript, ScriptFrame};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    const GRASS: [u8; 4] = [40, 160, 40, 255];
    const PLAYER: [u8; 4] = [230, 60, 60, 255];

    struct TempRoot(PathBuf);

    impl TempRoot {
        fn new(hint: &str) -> Self {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("system time before unix epoch")
                .as_nanos();
            let root = std::env::temp_dir().join(format!(
                "slate_demo_test_{}_{}_{}",
                hint,
                std::process::id(),
                nanos
            ));
            std::fs::create_dir_all(AssetCache::new(&root).sprites_dir())
                .expect("create sprite dir");
            Self(root)
        }

        fn cache(&self) -> AssetCache {
            AssetCache::new(&self.0)
        }

        fn write(&self, name: &str, size: u32, color: [u8; 4]) {
            RgbaImage::from_pixel(size, size, Rgba(color))
                .save(self.cache().sprite_path(name))
                .expect("write png fixture");
        }
    }

    impl Drop for TempRoot {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn demo(root: &TempRoot) -> DemoGame {
        DemoGame::new(
            root.cache(),
            GridConfig {
                background_sprite: Some("grass.png".to_string()),
                ..GridConfig::default()
            },
        )
    }

    fn hold(keys: &[Key], repeat: u32) -> ScriptFrame {
        ScriptFrame {
            held: keys.to_vec(),
            repeat,
        }
    }

    #[test]
    fn arrows_move_player_and_leave_grid_alone() {
        let root = TempRoot::new("move");
        root.write("grass.png", 8, GRASS);
        root.write(PLAYER_ASSET, 4, PLAYER);

        let script = InputScript {
            frames: vec![hold(&[Key::Right], 3), hold(&[Key::Down], 2), hold(&[], 1)],
            close: true,
        };
        let outcome = replay(&script, WindowConfig::default(), 1, demo(&root)).expect("replay");

        let player = outcome.hooks.player().expect("player loaded");
        assert_eq!(player.position(), Vec2::new(13.0, 12.0));

        let grid = outcome.hooks.grid().expect("grid loaded");
        assert_eq!((grid.width(), grid.height()), (15, 9));
        assert_eq!(grid.tiles().len(), 15 * 9);
        assert!(grid
            .cells()
            .iter()
            .all(|cell| *cell == Cell::Label("background".to_string())));

        // Last presented frame: player drawn at its pre-update position over grass.
        let image = &outcome.image;
        assert_eq!(image.get_pixel(13, 12).0, PLAYER);
        assert_eq!(image.get_pixel(20, 20).0, PLAYER);
        assert_eq!(image.get_pixel(60, 60).0, GRASS);
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn single_right_press_moves_one_pixel() {
        let root = TempRoot::new("one_step");
        root.write("grass.png", 8, GRASS);
        root.write(PLAYER_ASSET, 4, PLAYER);

        let script = InputScript {
            frames: vec![hold(&[Key::Right], 1)],
            close: true,
        };
        let outcome = replay(&script, WindowConfig::default(), 1, demo(&root)).expect("replay");
        assert_eq!(outcome.hooks.player().expect("player").position(), Vec2::new(11.0, 10.0));
        assert_eq!(outcome.updates, 1);
    }

    #[test]
    fn missing_player_asset_fails_load() {
        let root = TempRoot::new("missing");
        root.write("grass.png", 8, GRASS);

        let script = InputScript {
            frames: vec![hold(&[], 1)],
            close: true,
        };
        let err = replay(&script, WindowConfig::default(), 1, demo(&root))
            .err()
            .expect("player asset is missing");
        let message = format!("{err:#}");
        assert!(message.contains("on_load hook failed"));
        assert!(message.contains("failed to load player sprite 'player.png'"));
    }
}
