//! CPU framebuffer surface.
//!
//! Each present clears to the frame's background and blits every snapshot
//! sprite in registry order, nearest-neighbour scaled to the sprite's
//! width/height and alpha blended over what is already there. Sprites
//! partially or fully off-canvas are clipped.

use image::{Rgba, RgbaImage};
use std::collections::VecDeque;

use crate::lifecycle::{Frame, Surface, SurfaceError, SurfaceEvent};
use crate::registry::SpriteSnapshot;

pub struct SoftwareCanvas {
    image: RgbaImage,
    pending: VecDeque<SurfaceEvent>,
    presented: u64,
}

impl SoftwareCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            pending: VecDeque::new(),
            presented: 0,
        }
    }

    /// Queue an event for the next `poll_events`.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.pending.push_back(event);
    }

    /// Reallocate the framebuffer and queue the matching resize event.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
        self.pending.push_back(SurfaceEvent::Resized { width, height });
    }

    /// The most recently presented frame.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.image.width() && y < self.image.height()).then(|| self.image.get_pixel(x, y).0)
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    fn blit(&mut self, sprite: &SpriteSnapshot) {
        let (src_w, src_h) = sprite.image.dimensions();
        if src_w == 0 || src_h == 0 || sprite.width == 0 || sprite.height == 0 {
            return;
        }
        let origin_x = sprite.position.x.floor() as i64;
        let origin_y = sprite.position.y.floor() as i64;
        let (canvas_w, canvas_h) = (i64::from(self.image.width()), i64::from(self.image.height()));

        let x_start = origin_x.max(0);
        let y_start = origin_y.max(0);
        let x_end = (origin_x + i64::from(sprite.width)).min(canvas_w);
        let y_end = (origin_y + i64::from(sprite.height)).min(canvas_h);

        for y in y_start..y_end {
            let local_y = (y - origin_y) as u64;
            let src_y = (local_y * u64::from(src_h) / u64::from(sprite.height)) as u32;
            for x in x_start..x_end {
                let local_x = (x - origin_x) as u64;
                let src_x = (local_x * u64::from(src_w) / u64::from(sprite.width)) as u32;
                let src = sprite.image.get_pixel(src_x, src_y);
                let dst = self.image.get_pixel_mut(x as u32, y as u32);
                *dst = blend_over(*src, *dst);
            }
        }
    }
}

/// Source-over compositing onto an opaque framebuffer.
fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(src.0[3]);
    match alpha {
        255 => src,
        0 => dst,
        _ => {
            let mix = |s: u8, d: u8| {
                ((u32::from(s) * alpha + u32::from(d) * (255 - alpha) + 127) / 255) as u8
            };
            Rgba([
                mix(src.0[0], dst.0[0]),
                mix(src.0[1], dst.0[1]),
                mix(src.0[2], dst.0[2]),
                255,
            ])
        }
    }
}

impl Surface for SoftwareCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        let clear = Rgba(frame.background.to_rgba8());
        for pixel in self.image.pixels_mut() {
            *pixel = clear;
        }
        for sprite in &frame.sprites {
            self.blit(sprite);
        }
        self.presented += 1;
        log::trace!(
            "Canvas presented frame {} with {} sprite(s)",
            frame.stats.frame_number,
            frame.sprites.len()
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        self.pending.drain(..).collect()
    }
}
