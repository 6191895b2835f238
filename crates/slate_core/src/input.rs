//! Keyboard state with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every frame the key is
//!   physically down. Movement reads this.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only until
//!   `end_frame()`. The lifecycle controller calls `end_frame()` only on frames
//!   where `on_update` actually ran, so a press that lands between updates
//!   (update divisor > 1) is still seen by the next update.

use glam::Vec2;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    F3,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Arrow keys as a one-pixel step per axis. Origin is top-left, so Up is -y.
    /// Opposite keys held together cancel out.
    pub fn direction(&self) -> Vec2 {
        let mut delta = Vec2::ZERO;
        if self.is_held(Key::Left) {
            delta.x -= 1.0;
        }
        if self.is_held(Key::Right) {
            delta.x += 1.0;
        }
        if self.is_held(Key::Up) {
            delta.y -= 1.0;
        }
        if self.is_held(Key::Down) {
            delta.y += 1.0;
        }
        delta
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        assert!(input.is_held(Key::Left));
        assert!(input.is_just_pressed(Key::Left));
    }

    #[test]
    fn test_key_up_clears_held_sets_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_up(Key::Left);
        assert!(!input.is_held(Key::Left));
        assert!(input.is_just_released(Key::Left));
    }

    #[test]
    fn test_key_down_repeat_does_not_double_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Up);
        input.end_frame();
        // OS key repeat delivers another press while the key is held.
        input.key_down(Key::Up);
        assert!(input.is_held(Key::Up));
        assert!(!input.is_just_pressed(Key::Up));
    }

    #[test]
    fn test_key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Escape);
        assert!(!input.is_just_released(Key::Escape));
        assert!(!input.is_held(Key::Escape));
    }

    #[test]
    fn test_end_frame_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_down(Key::Escape);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::Right));
        assert!(!input.is_just_pressed(Key::Escape));
        assert!(input.is_held(Key::Right));
        assert!(input.is_held(Key::Escape));
    }

    #[test]
    fn test_direction_maps_arrows_to_unit_steps() {
        let mut input = InputState::new();
        assert_eq!(input.direction(), Vec2::ZERO);
        input.key_down(Key::Right);
        assert_eq!(input.direction(), Vec2::new(1.0, 0.0));
        input.key_down(Key::Up);
        assert_eq!(input.direction(), Vec2::new(1.0, -1.0));
        input.key_down(Key::Left);
        assert_eq!(input.direction(), Vec2::new(0.0, -1.0));
        input.key_up(Key::Up);
        input.key_down(Key::Down);
        assert_eq!(input.direction(), Vec2::new(0.0, 1.0));
    }
}
