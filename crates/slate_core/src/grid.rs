//! Tile grid overlaying the pixel canvas.
//!
//! Layout for a window of `W x H` pixels, cell size `C` and margin `M`:
//!
//! ```text
//! grid_width  = (W - M) / C          border_x = ((W - M) % C) / 2
//! grid_height = (H - M) / C          border_y = ((H - M) % C) / 2
//! ```
//!
//! Cell `(x, y)` starts at pixel `(border_x + x * C, border_y + y * C)`, so the
//! leftover pixels are split evenly on both sides. Cells are stored row-major
//! (`index = y * width + x`). The grid is built once per window size and is
//! never resized; a window resize does not touch it.

use glam::Vec2;
use std::sync::Arc;

use crate::assets::{AssetCache, AssetError};
use crate::collision::Aabb;
use crate::config::GridConfig;
use crate::registry::SpriteRegistry;
use crate::sprite::{Sprite, SpriteDesc};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// What a cell currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    /// A semantic marker such as `"background"`.
    Label(String),
    /// The asset path of a sprite painted into the cell.
    Sprite(Arc<str>),
}

impl Cell {
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Empty => "",
            Cell::Label(label) => label,
            Cell::Sprite(path) => path,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Grid dimensions and centering offsets derived from a window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
    pub border_x: u32,
    pub border_y: u32,
}

impl GridLayout {
    /// A window smaller than the margin yields a 0x0 grid.
    pub fn compute(window_size: (u32, u32), cell_size: u32, margin: u32) -> Self {
        let cell_size = cell_size.max(1);
        let usable_w = window_size.0.saturating_sub(margin);
        let usable_h = window_size.1.saturating_sub(margin);
        Self {
            width: usable_w / cell_size,
            height: usable_h / cell_size,
            cell_size,
            border_x: (usable_w % cell_size) / 2,
            border_y: (usable_h % cell_size) / 2,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn check(&self, x: i32, y: i32) -> Result<usize, GridError> {
        if !self.contains(x, y) {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Top-left pixel of cell `(x, y)`.
    pub fn cell_origin(&self, x: i32, y: i32) -> Result<Vec2, GridError> {
        self.check(x, y)?;
        Ok(Vec2::new(
            (self.border_x + x as u32 * self.cell_size) as f32,
            (self.border_y + y as u32 * self.cell_size) as f32,
        ))
    }

    /// Pixel area covered by the cells, borders excluded.
    pub fn area(&self) -> Aabb {
        Aabb::from_top_left(
            Vec2::new(self.border_x as f32, self.border_y as f32),
            Vec2::new(
                (self.width * self.cell_size) as f32,
                (self.height * self.cell_size) as f32,
            ),
        )
    }

    /// The cell containing pixel `point`, if any.
    pub fn cell_at_pixel(&self, point: Vec2) -> Option<(i32, i32)> {
        if !point.is_finite() || !self.area().contains_point(point) {
            return None;
        }
        let local = point - Vec2::new(self.border_x as f32, self.border_y as f32);
        let x = (local.x / self.cell_size as f32).floor() as i32;
        let y = (local.y / self.cell_size as f32).floor() as i32;
        self.contains(x, y).then_some((x, y))
    }
}

pub struct Grid {
    layout: GridLayout,
    cells: Vec<Cell>,
    /// Background mosaic sprites, one per cell in row-major order. Dropping
    /// the grid removes them from the registry.
    tiles: Vec<Sprite>,
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("layout", &self.layout)
            .field("tiles", &self.tiles.len())
            .finish()
    }
}

impl Grid {
    /// Logical-only grid with every cell set to the configured background label.
    pub fn new(window_size: (u32, u32), config: &GridConfig) -> Self {
        let layout = GridLayout::compute(window_size, config.cell_size, config.margin);
        let cells = vec![Cell::Label(config.background_label.clone()); layout.cell_count()];
        log::info!(
            "Grid {}x{} (cell {}px, border {}x{}) for window {}x{}",
            layout.width,
            layout.height,
            layout.cell_size,
            layout.border_x,
            layout.border_y,
            window_size.0,
            window_size.1
        );
        Self {
            layout,
            cells,
            tiles: Vec::new(),
        }
    }

    /// Like [`Grid::new`], plus one background sprite per cell when
    /// `config.background_sprite` is set. The asset is decoded once and each
    /// tile gets its own copy of the pixels.
    pub fn tiled(
        window_size: (u32, u32),
        config: &GridConfig,
        registry: &SpriteRegistry,
        assets: &AssetCache,
    ) -> Result<Self, AssetError> {
        let mut grid = Self::new(window_size, config);
        let Some(asset) = &config.background_sprite else {
            return Ok(grid);
        };
        let image = assets.load_sprite_image(asset)?;
        let size = grid.layout.cell_size;
        let mut tiles = Vec::with_capacity(grid.layout.cell_count());
        for (x, y) in grid.coords() {
            let origin = grid.layout.cell_origin(x, y).unwrap_or(Vec2::ZERO);
            tiles.push(Sprite::with_image(
                registry,
                SpriteDesc::new(asset.as_str(), size, size, origin),
                image.clone(),
            ));
        }
        log::debug!("Tiled grid with {} '{}' sprites", tiles.len(), asset);
        grid.tiles = tiles;
        Ok(grid)
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn border(&self) -> (u32, u32) {
        (self.layout.border_x, self.layout.border_y)
    }

    pub fn tiles(&self) -> &[Sprite] {
        &self.tiles
    }

    /// Read view of every cell, row-major.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.layout.width.max(1) as usize)
    }

    pub fn cell(&self, x: i32, y: i32) -> Result<&Cell, GridError> {
        let index = self.layout.check(x, y)?;
        Ok(&self.cells[index])
    }

    pub fn set_cell(&mut self, x: i32, y: i32, label: impl Into<String>) -> Result<(), GridError> {
        let index = self.layout.check(x, y)?;
        self.cells[index] = Cell::Label(label.into());
        Ok(())
    }

    pub fn clear_cell(&mut self, x: i32, y: i32) -> Result<(), GridError> {
        let index = self.layout.check(x, y)?;
        self.cells[index] = Cell::Empty;
        Ok(())
    }

    /// Record `sprite`'s asset in cell `(x, y)`. Only the cell layer changes;
    /// the sprite itself is not moved.
    pub fn draw_sprite_to_grid(
        &mut self,
        x: i32,
        y: i32,
        sprite: &Sprite,
    ) -> Result<(), GridError> {
        let index = self.layout.check(x, y)?;
        self.cells[index] = Cell::Sprite(sprite.asset_path());
        Ok(())
    }

    pub fn cell_origin(&self, x: i32, y: i32) -> Result<Vec2, GridError> {
        self.layout.cell_origin(x, y)
    }

    pub fn cell_at_pixel(&self, point: Vec2) -> Option<(i32, i32)> {
        self.layout.cell_at_pixel(point)
    }

    /// All `(x, y)` coordinates, row-major.
    pub fn coords(&self) -> impl Iterator<Item = (i32, i32)> {
        let (w, h) = (self.layout.width as i32, self.layout.height as i32);
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Cell)> {
        self.coords().zip(self.cells.iter()).map(|((x, y), cell)| (x, y, cell))
    }
}
