//! Engine configuration loaded from JSON, with defaults for every field.
//!
//! Colors may be written as `"#RRGGBB"` or `[r, g, b]`; both normalize to
//! [`Rgb`] during load so nothing downstream ever sees the raw string.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::{ColorParseError, ColorSpec, Rgb};

pub const DEFAULT_CONFIG_PATH: &str = "assets/config/engine.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid background color: {0}")]
    Color(#[from] ColorParseError),

    #[error("config validation failed: {0}")]
    Invalid(String),
}

/// Immutable window parameters, fixed when the controller is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Slate".to_string(),
            width: 800,
            height: 500,
            background: Rgb::BLACK,
        }
    }
}

impl WindowConfig {
    /// Build a config from a hex background string; malformed hex is an error.
    pub fn with_hex_background(
        title: impl Into<String>,
        width: u32,
        height: u32,
        background: &str,
    ) -> Result<Self, ColorParseError> {
        Ok(Self {
            title: title.into(),
            width,
            height,
            background: Rgb::from_hex(background)?,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,
    #[serde(default = "default_margin")]
    pub margin: u32,
    #[serde(default = "default_background_label")]
    pub background_label: String,
    /// When set, every cell gets a sprite of this asset so the grid renders as a mosaic.
    #[serde(default)]
    pub background_sprite: Option<String>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            margin: default_margin(),
            background_label: default_background_label(),
            background_sprite: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameConfig {
    /// `on_update` runs on frames where `frame % update_divisor == 0`.
    #[serde(default = "default_update_divisor")]
    pub update_divisor: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            update_divisor: default_update_divisor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_asset_root")]
    pub root: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: default_asset_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub grid: GridConfig,
    pub frame: FrameConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Deserialize)]
struct EngineConfigFile {
    #[serde(default)]
    window: WindowSection,
    #[serde(default)]
    grid: GridConfig,
    #[serde(default)]
    frame: FrameConfig,
    #[serde(default)]
    assets: AssetConfig,
}

#[derive(Debug, Deserialize)]
struct WindowSection {
    #[serde(default = "default_title")]
    title: String,
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    #[serde(default = "default_background")]
    background: ColorSpec,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            background: default_background(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: EngineConfigFile =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self {
            window: WindowConfig {
                title: file.window.title,
                width: file.window.width,
                height: file.window.height,
                background: Rgb::try_from(file.window.background)?,
            },
            grid: file.grid,
            frame: file.frame,
            assets: file.assets,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window width and height must be > 0".to_string(),
            ));
        }
        if self.grid.cell_size == 0 {
            return Err(ConfigError::Invalid("grid cell_size must be > 0".to_string()));
        }
        if self.frame.update_divisor == 0 {
            return Err(ConfigError::Invalid(
                "frame update_divisor must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    EngineConfig::from_json(&raw, path)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_config_or_default(path: &Path) -> Result<EngineConfig, ConfigError> {
    if path.exists() {
        let config = load_config_from_path(path)?;
        log::info!("Loaded config '{}'", path.display());
        Ok(config)
    } else {
        log::info!("No config at '{}', using defaults", path.display());
        Ok(EngineConfig::default())
    }
}

fn default_title() -> String {
    "Slate".to_string()
}

const fn default_width() -> u32 {
    800
}

const fn default_height() -> u32 {
    500
}

fn default_background() -> ColorSpec {
    ColorSpec::Triple([0, 0, 0])
}

const fn default_cell_size() -> u32 {
    50
}

const fn default_margin() -> u32 {
    10
}

fn default_background_label() -> String {
    "background".to_string()
}

const fn default_update_divisor() -> u32 {
    1
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}
