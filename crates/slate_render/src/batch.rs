//! Per-frame sprite mesh.
//!
//! Every registered sprite becomes one quad, emitted in registry order so
//! later registrations draw on top. Consecutive quads that sample the same
//! texture collapse into a single `draw_indexed` call; a tiled grid whose
//! tiles share one image draws as one call.

use glam::Vec2;
use slate_core::registry::SpriteSnapshot;

use crate::texture::{TextureCache, TextureKey};
use crate::vertex::SpriteVertex;

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// A contiguous run of indices sharing one texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: TextureKey,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct SpriteBatch {
    vertices: Vec<SpriteVertex>,
    indices: Vec<u32>,
    draw_calls: Vec<DrawCall>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
    }

    /// Rebuild from a registry snapshot. Sprites without a cached texture are
    /// skipped.
    pub fn rebuild<T>(&mut self, sprites: &[SpriteSnapshot], textures: &TextureCache<T>) {
        self.clear();
        for sprite in sprites {
            let Some(texture) = textures.key_for(sprite.id) else {
                log::trace!("No texture for sprite {:?}, skipping", sprite.id);
                continue;
            };
            let size = Vec2::new(sprite.width as f32, sprite.height as f32);
            self.add_quad(texture, sprite.position, size, WHITE);
        }
    }

    pub fn add_quad(&mut self, texture: TextureKey, min: Vec2, size: Vec2, color: [f32; 4]) {
        let base_index = self.vertices.len() as u32;
        self.vertices.extend(SpriteVertex::quad(min, size, color));

        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);

        push_draw_call(&mut self.draw_calls, texture, draw_start, 6);
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Append a draw call, merging with the previous one when the texture matches
/// and the indices are contiguous.
fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture: TextureKey,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if last.texture == texture && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture,
        index_start,
        index_count,
    });
}

/// Number of bind-group switches the draw calls need.
pub fn count_texture_binds(draw_calls: &[DrawCall]) -> usize {
    let mut binds = 0;
    let mut last = None;
    for draw in draw_calls {
        if last != Some(draw.texture) {
            binds += 1;
            last = Some(draw.texture);
        }
    }
    binds
}
