use image::RgbaImage;
use slate_core::registry::SpriteSnapshot;
use slate_core::sprite::SpriteId;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: (u32, u32),
}

impl Texture {
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Nearest filtering keeps scaled-up pixel art crisp.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size: (width, height),
        }
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
    ) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba8(device, queue, image.as_raw(), width, height, label)
    }

    pub fn byte_size(&self) -> usize {
        self.size.0 as usize * self.size.1 as usize * 4
    }
}

/// Handle of one uploaded texture, stable while any sprite uses it.
pub type TextureKey = u64;

/// Hash of an image's dimensions and pixels. Equal hashes are only a hint;
/// the cache compares the pixels before sharing a texture.
pub fn content_hash(image: &RgbaImage) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.dimensions().hash(&mut hasher);
    image.as_raw().hash(&mut hasher);
    hasher.finish()
}

fn same_pixels(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions() && a.as_raw() == b.as_raw()
}

struct CacheEntry<T> {
    value: T,
    hash: u64,
    pixels: Arc<RgbaImage>,
    users: usize,
}

/// Uploaded textures shared by content, reference-counted by live sprites.
///
/// `sync` is called once per frame with the registry snapshot: sprites seen
/// for the first time are matched against textures with the same content and
/// uploaded if none matches, and sprites that left the snapshot release their
/// texture.
pub struct TextureCache<T> {
    by_sprite: HashMap<SpriteId, TextureKey>,
    by_hash: HashMap<u64, Vec<TextureKey>>,
    entries: HashMap<TextureKey, CacheEntry<T>>,
    next_key: TextureKey,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self {
            by_sprite: HashMap::new(),
            by_hash: HashMap::new(),
            entries: HashMap::new(),
            next_key: 0,
        }
    }
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, sprites: &[SpriteSnapshot], upload: impl FnMut(&RgbaImage) -> T) {
        self.sync_with_hash(sprites, content_hash, upload);
    }

    fn sync_with_hash(
        &mut self,
        sprites: &[SpriteSnapshot],
        hash_of: impl Fn(&RgbaImage) -> u64,
        mut upload: impl FnMut(&RgbaImage) -> T,
    ) {
        let live: HashSet<SpriteId> = sprites.iter().map(|sprite| sprite.id).collect();
        let gone: Vec<SpriteId> = self
            .by_sprite
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in gone {
            if let Some(key) = self.by_sprite.remove(&id) {
                self.release(key);
            }
        }

        for sprite in sprites {
            if self.by_sprite.contains_key(&sprite.id) {
                continue;
            }
            let hash = hash_of(&*sprite.image);
            let key = match self.find(hash, &sprite.image) {
                Some(key) => key,
                None => {
                    log::debug!(
                        "Uploading texture for '{}' ({}x{})",
                        sprite.asset_path,
                        sprite.image.width(),
                        sprite.image.height()
                    );
                    let key = self.next_key;
                    self.next_key += 1;
                    self.entries.insert(
                        key,
                        CacheEntry {
                            value: upload(&*sprite.image),
                            hash,
                            pixels: Arc::clone(&sprite.image),
                            users: 0,
                        },
                    );
                    self.by_hash.entry(hash).or_default().push(key);
                    key
                }
            };
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.users += 1;
            }
            self.by_sprite.insert(sprite.id, key);
        }
    }

    fn find(&self, hash: u64, image: &RgbaImage) -> Option<TextureKey> {
        self.by_hash.get(&hash)?.iter().copied().find(|key| {
            self.entries
                .get(key)
                .is_some_and(|entry| same_pixels(&entry.pixels, image))
        })
    }

    fn release(&mut self, key: TextureKey) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        entry.users -= 1;
        if entry.users > 0 {
            return;
        }
        let hash = entry.hash;
        self.entries.remove(&key);
        if let Some(keys) = self.by_hash.get_mut(&hash) {
            keys.retain(|other| *other != key);
            if keys.is_empty() {
                self.by_hash.remove(&hash);
            }
        }
        log::debug!("Evicted texture {}", key);
    }

    pub fn key_for(&self, sprite: SpriteId) -> Option<TextureKey> {
        self.by_sprite.get(&sprite).copied()
    }

    pub fn get(&self, key: TextureKey) -> Option<&T> {
        self.entries.get(&key).map(|entry| &entry.value)
    }

    /// Number of distinct uploaded textures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values().map(|entry| &entry.value)
    }
}
