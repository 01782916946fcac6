//! Compiler configuration.
//!
//! Handles loading, validating, and merging `pubgen.toml`. Stock defaults are
//! overridden by an optional config file placed next to the input document
//! (or passed explicitly with `--config`).
//!
//! ## Config File Location
//!
//! ```text
//! articles/
//! ├── pubgen.toml        # applies to every document in this directory
//! ├── particle-box.md
//! └── figures/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [latex]
//! typesetter = "pdflatex"
//! typeset_args = ["-halt-on-error", "-interaction=nonstopmode"]
//! rasterizer = "convert"     # ImageMagick
//! density = 440              # rasterizer DPI
//! resize = "25%"             # applied after rasterizing
//! timeout_secs = 120         # per external invocation
//! image_dir = "."            # relative to the document
//!
//! [thumbnails]
//! enabled = true
//! size = 64                  # bounding box edge in pixels
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [latex]
//! image_dir = "img"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up next to the input document.
pub const CONFIG_FILENAME: &str = "pubgen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Compiler configuration loaded from `pubgen.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// External LaTeX toolchain and image placement.
    pub latex: LatexConfig,
    /// Article thumbnail generation.
    pub thumbnails: ThumbnailsConfig,
}

impl CompilerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latex.typesetter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "latex.typesetter must not be empty".into(),
            ));
        }
        if self.latex.rasterizer.trim().is_empty() {
            return Err(ConfigError::Validation(
                "latex.rasterizer must not be empty".into(),
            ));
        }
        if self.latex.density == 0 {
            return Err(ConfigError::Validation(
                "latex.density must be non-zero".into(),
            ));
        }
        if self.latex.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "latex.timeout_secs must be non-zero".into(),
            ));
        }
        if Path::new(&self.latex.image_dir).is_absolute() {
            return Err(ConfigError::Validation(
                "latex.image_dir must be relative to the document".into(),
            ));
        }
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// External LaTeX toolchain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatexConfig {
    /// Typesetter executable, run twice per render.
    pub typesetter: String,
    /// Arguments placed before `-output-directory <dir> <file.tex>`.
    pub typeset_args: Vec<String>,
    /// PDF → PNG converter executable (ImageMagick `convert` syntax).
    pub rasterizer: String,
    /// Rasterizer `-density` value.
    pub density: u32,
    /// Rasterizer `-resize` geometry.
    pub resize: String,
    /// Wall-clock limit for each external invocation.
    pub timeout_secs: u64,
    /// Directory for rendered images, relative to the document.
    pub image_dir: String,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            typesetter: "pdflatex".to_string(),
            typeset_args: vec![
                "-halt-on-error".to_string(),
                "-interaction=nonstopmode".to_string(),
            ],
            rasterizer: "convert".to_string(),
            density: 440,
            resize: "25%".to_string(),
            timeout_secs: 120,
            image_dir: ".".to_string(),
        }
    }
}

/// Article thumbnail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Generate a thumbnail for the `img` header image.
    pub enabled: bool,
    /// Edge of the square box the thumbnail fits into.
    pub size: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 64,
        }
    }
}

/// Stock defaults as a TOML value, the base layer of every merge.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CompilerConfig::default()).expect("default config must serialize")
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// value in the overlay replaces the base value.
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

/// Read `pubgen.toml` from `dir`, if present.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    load_raw_config_file(&config_path).map(Some)
}

/// Read an explicit config file. A missing file is an error.
pub fn load_raw_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(value)
}

/// Merge an optional overlay onto `base`, deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CompilerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CompilerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Stock defaults overridden by `<dir>/pubgen.toml` when it exists.
pub fn load_config(dir: &Path) -> Result<CompilerConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Stock defaults overridden by the file at `path`.
pub fn load_config_file(path: &Path) -> Result<CompilerConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config_file(path)?;
    resolve_config(base, Some(overlay))
}

/// Documented stock config, printed by `pubgen gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# pubgen Configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file next to your documents as pubgen.toml, or pass it with
# `pubgen compile --config <file>`.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# LaTeX blocks
# ---------------------------------------------------------------------------
[latex]
# Typesetter executable. It runs twice per changed block.
typesetter = "pdflatex"

# Arguments passed before `-output-directory <scratch> file.tex`.
# Add "-shell-escape" only for documents you trust.
typeset_args = ["-halt-on-error", "-interaction=nonstopmode"]

# PDF to PNG converter, invoked as:
#   <rasterizer> -density <density> file.pdf -resize <resize> out.png
rasterizer = "convert"
density = 440
resize = "25%"

# Seconds each external invocation may run before it is killed.
timeout_secs = 120

# Where rendered images are written, relative to the document.
image_dir = "."

# ---------------------------------------------------------------------------
# Article thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Create <image>.thumb.png for the `img` header image and publish it under
# the image's own name instead of the full image.
enabled = true

# The thumbnail fits inside a size x size box, aspect ratio kept.
size = 64
"##
}
