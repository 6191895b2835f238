//! Sprite entities: a positioned, scaled image that is visible exactly while
//! it is registered.
//!
//! A sprite registers itself with the registry it was constructed against and
//! deregisters when destroyed or dropped. Each sprite owns its own decoded
//! image even when several sprites share one asset file.

use glam::Vec2;
use image::RgbaImage;
use std::sync::{Arc, Mutex};

use crate::assets::{AssetCache, AssetError};
use crate::collision::Aabb;
use crate::registry::{lock, SpriteRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub(crate) u64);

impl SpriteId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Construction parameters. `width`/`height` are the unscaled base size in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDesc {
    pub asset_path: String,
    pub width: u32,
    pub height: u32,
    pub position: Vec2,
    pub scale: f32,
}

impl SpriteDesc {
    pub fn new(asset_path: impl Into<String>, width: u32, height: u32, position: Vec2) -> Self {
        Self {
            asset_path: asset_path.into(),
            width,
            height,
            position,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SpriteState {
    pub asset_path: Arc<str>,
    pub scale: f32,
    /// Unscaled size; `width`/`height` are always derived from this.
    pub base_size: Vec2,
    pub width: u32,
    pub height: u32,
    pub position: Vec2,
}

fn scaled(base: f32, scale: f32) -> u32 {
    // Truncates toward zero; negative or NaN products saturate to 0.
    (base * scale) as u32
}

pub struct Sprite {
    id: SpriteId,
    state: Arc<Mutex<SpriteState>>,
    image: Arc<RgbaImage>,
    registry: SpriteRegistry,
}

impl std::fmt::Debug for Sprite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Sprite")
            .field("id", &self.id)
            .field("asset_path", &state.asset_path)
            .field("position", &state.position)
            .field("size", &(state.width, state.height))
            .field("scale", &state.scale)
            .finish()
    }
}

impl Sprite {
    /// Load the sprite's image from the asset cache and register it.
    ///
    /// A missing or undecodable asset fails here; nothing is registered.
    pub fn load(
        registry: &SpriteRegistry,
        assets: &AssetCache,
        desc: SpriteDesc,
    ) -> Result<Self, AssetError> {
        let image = assets.load_sprite_image(&desc.asset_path)?;
        Ok(Self::with_image(registry, desc, image))
    }

    /// Register a sprite around an already-decoded image.
    pub fn with_image(registry: &SpriteRegistry, desc: SpriteDesc, image: RgbaImage) -> Self {
        let base_size = Vec2::new(desc.width as f32, desc.height as f32);
        let state = SpriteState {
            asset_path: Arc::from(desc.asset_path),
            scale: desc.scale,
            base_size,
            width: scaled(base_size.x, desc.scale),
            height: scaled(base_size.y, desc.scale),
            position: desc.position,
        };
        let sprite = Self {
            id: registry.allocate_id(),
            state: Arc::new(Mutex::new(state)),
            image: Arc::new(image),
            registry: registry.clone(),
        };
        registry.register(&sprite);
        sprite
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub(crate) fn state_handle(&self) -> &Arc<Mutex<SpriteState>> {
        &self.state
    }

    pub fn image(&self) -> &Arc<RgbaImage> {
        &self.image
    }

    pub fn asset_path(&self) -> Arc<str> {
        lock(&self.state).asset_path.clone()
    }

    pub fn position(&self) -> Vec2 {
        lock(&self.state).position
    }

    pub fn set_position(&mut self, position: Vec2) {
        lock(&self.state).position = position;
    }

    pub fn set_position_xy(&mut self, x: f32, y: f32) {
        self.set_position(Vec2::new(x, y));
    }

    /// Shift the sprite by `delta` pixels.
    pub fn translate(&mut self, delta: Vec2) {
        lock(&self.state).position += delta;
    }

    pub fn width(&self) -> u32 {
        lock(&self.state).width
    }

    pub fn height(&self) -> u32 {
        lock(&self.state).height
    }

    pub fn scale(&self) -> f32 {
        lock(&self.state).scale
    }

    /// Set the displayed width. The unscaled base is redefined as
    /// `width / scale` so a later [`Sprite::update_scale`] stays consistent.
    pub fn set_width(&mut self, width: u32) {
        let mut state = lock(&self.state);
        state.width = width;
        if state.scale != 0.0 {
            state.base_size.x = width as f32 / state.scale;
        }
    }

    pub fn set_height(&mut self, height: u32) {
        let mut state = lock(&self.state);
        state.height = height;
        if state.scale != 0.0 {
            state.base_size.y = height as f32 / state.scale;
        }
    }

    /// Rescale from the unscaled base size, never from the current size, so
    /// repeating the same scale is a no-op.
    pub fn update_scale(&mut self, scale: f32) {
        let mut state = lock(&self.state);
        state.scale = scale;
        state.width = scaled(state.base_size.x, scale);
        state.height = scaled(state.base_size.y, scale);
    }

    /// Swap the sprite's asset identity. The owned image is not reloaded.
    pub fn update_sprite(&mut self, asset_path: impl Into<String>) {
        lock(&self.state).asset_path = Arc::from(asset_path.into());
    }

    pub fn bounds(&self) -> Aabb {
        let state = lock(&self.state);
        Aabb::from_top_left(
            state.position,
            Vec2::new(state.width as f32, state.height as f32),
        )
    }

    /// Same-axis AABB overlap of the two sprites' current bounds.
    pub fn is_colliding(a: &Sprite, b: &Sprite) -> bool {
        a.bounds().overlaps(&b.bounds())
    }

    pub fn collides_with(&self, other: &Sprite) -> bool {
        Sprite::is_colliding(self, other)
    }

    /// Remove the sprite from its registry and release its image.
    pub fn destroy(self) {
        log::debug!("Destroying sprite {:?}", self.id);
        // Drop performs the deregistration.
    }
}

impl Drop for Sprite {
    fn drop(&mut self) {
        self.registry.remove_id(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_support::TempAssets;
    use image::Rgba;

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    fn make(registry: &SpriteRegistry, desc: SpriteDesc) -> Sprite {
        let image = blank(desc.width.max(1), desc.height.max(1));
        Sprite::with_image(registry, desc, image)
    }

    #[test]
    fn construction_applies_scale_to_base_size() {
        let registry = SpriteRegistry::new();
        let sprite = make(
            &registry,
            SpriteDesc::new("p.png", 16, 10, Vec2::new(3.0, 4.0)).with_scale(1.5),
        );
        assert_eq!(sprite.width(), 24);
        assert_eq!(sprite.height(), 15);
        assert_eq!(sprite.position(), Vec2::new(3.0, 4.0));
        assert_eq!(sprite.scale(), 1.5);
        assert!(registry.contains(&sprite));
    }

    #[test]
    fn update_scale_is_idempotent() {
        let registry = SpriteRegistry::new();
        let mut sprite = make(&registry, SpriteDesc::new("p.png", 16, 10, Vec2::ZERO));
        sprite.update_scale(2.0);
        let once = (sprite.width(), sprite.height());
        sprite.update_scale(2.0);
        assert_eq!((sprite.width(), sprite.height()), once);
        assert_eq!(once, (32, 20));
    }

    #[test]
    fn update_scale_is_not_cumulative() {
        let registry = SpriteRegistry::new();
        let mut sprite =
            make(&registry, SpriteDesc::new("p.png", 10, 10, Vec2::ZERO).with_scale(3.0));
        sprite.update_scale(0.5);
        sprite.update_scale(2.0);
        assert_eq!((sprite.width(), sprite.height()), (20, 20));
        sprite.update_scale(1.0);
        assert_eq!((sprite.width(), sprite.height()), (10, 10));
    }

    #[test]
    fn set_width_redefines_base_for_later_rescale() {
        let registry = SpriteRegistry::new();
        let mut sprite =
            make(&registry, SpriteDesc::new("p.png", 10, 10, Vec2::ZERO).with_scale(2.0));
        sprite.set_width(40);
        sprite.set_height(8);
        assert_eq!((sprite.width(), sprite.height()), (40, 8));
        sprite.update_scale(1.0);
        assert_eq!((sprite.width(), sprite.height()), (20, 4));
    }

    #[test]
    fn position_setters_and_translate() {
        let registry = SpriteRegistry::new();
        let mut sprite = make(&registry, SpriteDesc::new("p.png", 1, 1, Vec2::ZERO));
        sprite.set_position_xy(10.0, 10.0);
        sprite.translate(Vec2::new(1.0, -2.0));
        assert_eq!(sprite.position(), Vec2::new(11.0, 8.0));
    }

    #[test]
    fn update_sprite_swaps_identity_only() {
        let registry = SpriteRegistry::new();
        let mut sprite = make(&registry, SpriteDesc::new("a.png", 2, 2, Vec2::ZERO));
        let image = sprite.image().clone();
        sprite.update_sprite("b.png");
        assert_eq!(&*sprite.asset_path(), "b.png");
        assert!(Arc::ptr_eq(&image, sprite.image()));
        assert_eq!(&*registry.snapshot()[0].asset_path, "b.png");
    }

    #[test]
    fn destroy_deregisters() {
        let registry = SpriteRegistry::new();
        let sprite = make(&registry, SpriteDesc::new("p.png", 1, 1, Vec2::ZERO));
        let keep = make(&registry, SpriteDesc::new("q.png", 1, 1, Vec2::ZERO));
        sprite.destroy();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&keep));
    }

    #[test]
    fn collision_uses_matching_axes() {
        let registry = SpriteRegistry::new();
        let a = make(&registry, SpriteDesc::new("a.png", 10, 10, Vec2::new(0.0, 0.0)));
        let b = make(&registry, SpriteDesc::new("b.png", 10, 10, Vec2::new(5.0, 5.0)));
        let far_below = make(&registry, SpriteDesc::new("c.png", 10, 10, Vec2::new(0.0, 50.0)));
        assert!(Sprite::is_colliding(&a, &b));
        assert!(b.collides_with(&a));
        assert!(!Sprite::is_colliding(&a, &far_below));
        assert!(!Sprite::is_colliding(&far_below, &a));
    }

    #[test]
    fn load_reads_from_asset_cache() {
        let assets = TempAssets::new("sprite_load");
        assets.write_sprite("player.png", 8, 8, [0, 255, 0, 255]);
        let registry = SpriteRegistry::new();

        let a = Sprite::load(
            &registry,
            &assets.cache,
            SpriteDesc::new("player.png", 8, 8, Vec2::ZERO),
        )
        .expect("asset exists");
        let b = Sprite::load(
            &registry,
            &assets.cache,
            SpriteDesc::new("player.png", 8, 8, Vec2::ZERO),
        )
        .expect("asset exists");
        assert_eq!(a.image().dimensions(), (8, 8));
        assert!(!Arc::ptr_eq(a.image(), b.image()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn load_missing_asset_fails_without_registering() {
        let assets = TempAssets::new("sprite_missing");
        let registry = SpriteRegistry::new();
        let err = Sprite::load(
            &registry,
            &assets.cache,
            SpriteDesc::new("ghost.png", 8, 8, Vec2::ZERO),
        )
        .expect_err("missing asset should fail");
        assert!(matches!(err, AssetError::NotFound(_)));
        assert!(registry.is_empty());
    }
}
