//! Axis-aligned bounding boxes for sprite overlap tests.
//!
//! Boxes are stored center/half-extent so the overlap test is symmetric per
//! axis: X is only ever compared with X, Y only with Y.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center_x: f32,
    pub center_y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Aabb {
    /// Box covering `size` pixels to the right of and below `top_left`.
    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            center_x: top_left.x + half.x,
            center_y: top_left.y + half.y,
            half_w: half.x,
            half_h: half.y,
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.center_x - self.half_w, self.center_y - self.half_h)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.center_x + self.half_w, self.center_y + self.half_h)
    }

    /// Strict overlap: boxes that only share an edge do not collide.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center_x - other.center_x).abs() < self.half_w + other.half_w
            && (self.center_y - other.center_y).abs() < self.half_h + other.half_h
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
    }
}
