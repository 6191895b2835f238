//! Resolves asset names against the on-disk cache layout:
//!
//! ```text
//! <root>/Assets/Sprites/<name>
//! <root>/Shaders/<name>
//! ```

use image::RgbaImage;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read asset {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sprites_dir(&self) -> PathBuf {
        self.root.join("Assets").join("Sprites")
    }

    pub fn shaders_dir(&self) -> PathBuf {
        self.root.join("Shaders")
    }

    pub fn sprite_path(&self, name: &str) -> PathBuf {
        self.sprites_dir().join(name)
    }

    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shaders_dir().join(name)
    }

    /// Decode a sprite image. Every call returns a fresh, independently owned image.
    pub fn load_sprite_image(&self, name: &str) -> Result<RgbaImage, AssetError> {
        let path = self.sprite_path(name);
        if !path.is_file() {
            return Err(AssetError::NotFound(path));
        }
        let image = image::open(&path).map_err(|source| match source {
            image::ImageError::IoError(io) => AssetError::Read {
                path: path.clone(),
                source: io,
            },
            other => AssetError::Decode {
                path: path.clone(),
                source: other,
            },
        })?;
        let rgba = image.into_rgba8();
        log::debug!(
            "Loaded sprite '{}' ({}x{})",
            path.display(),
            rgba.width(),
            rgba.height()
        );
        Ok(rgba)
    }

    pub fn load_shader_source(&self, name: &str) -> Result<String, AssetError> {
        let path = self.shader_path(name);
        if !path.is_file() {
            return Err(AssetError::NotFound(path));
        }
        std::fs::read_to_string(&path).map_err(|source| AssetError::Read { path, source })
    }
}
