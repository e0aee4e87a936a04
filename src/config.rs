//! Configuration for the command-line presets.
//!
//! The library functions take explicit parameters; only the binary reads
//! this file. A config file is sparse: stock defaults are the base layer and
//! any keys in the user's file override them.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_width = 800      # Bounding box for images sent to the wiki
//! max_height = 600
//! reversible = true    # Accept 600x800 portraits inside an 800x600 box
//! quality = 75         # JPEG quality (1-100)
//!
//! [thumbnail]
//! size = 96            # Square bounding box for previews, in pixels
//! quality = 85
//!
//! [decode]
//! max_alloc_mb = 512   # Memory ceiling for a single decode
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Bounds, DecodeLimits, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeohashConfig {
    /// Preset for images prepared for upload.
    pub upload: UploadConfig,
    /// Preset for on-screen previews.
    pub thumbnail: ThumbnailConfig,
    /// Decoder memory ceiling.
    pub decode: DecodeConfig,
}

impl GeohashConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_width == 0 || self.upload.max_height == 0 {
            return Err(ConfigError::Validation(
                "upload.max_width and upload.max_height must be non-zero".into(),
            ));
        }
        if self.thumbnail.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnail.size must be non-zero".into(),
            ));
        }
        for (key, quality) in [
            ("upload.quality", self.upload.quality),
            ("thumbnail.quality", self.thumbnail.quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if self.decode.max_alloc_mb == 0 {
            return Err(ConfigError::Validation(
                "decode.max_alloc_mb must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    pub max_width: u32,
    pub max_height: u32,
    /// Let the box turn to match the image's orientation.
    pub reversible: bool,
    pub quality: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            reversible: true,
            quality: 75,
        }
    }
}

impl UploadConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.max_width, self.max_height)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub quality: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 96,
            quality: 85,
        }
    }
}

impl ThumbnailConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::square(self.size)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    pub max_alloc_mb: u64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { max_alloc_mb: 512 }
    }
}

impl DecodeConfig {
    pub fn limits(&self) -> DecodeLimits {
        DecodeLimits::from_megabytes(self.max_alloc_mb)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GeohashConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<GeohashConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let config: GeohashConfig = merge_toml(stock_defaults_value(), overlay).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file, or the stock defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<GeohashConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => Ok(GeohashConfig::default()),
    }
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# geohash-core configuration
# ==========================
# All options are optional. Delete anything you don't need to change.

# Images prepared for upload.
[upload]
# Bounding box in pixels. Images are shrunk to fit, never enlarged.
max_width = 800
max_height = 600
# Turn the box around when the image's orientation disagrees with it,
# so an 800x600 box also accepts a 600x800 portrait unchanged.
reversible = true
# JPEG quality, 1-100.
quality = 75

# On-screen previews.
[thumbnail]
# Square bounding box in pixels.
size = 96
quality = 85

[decode]
# Largest allocation a single decode may make, in megabytes. Larger images
# fail with an out-of-memory error instead of taking the process down.
max_alloc_mb = 512
"##
}
