//! Server configuration module.
//!
//! Handles loading, validating, and layering the server's settings. Values are
//! resolved from four layers, each overriding the one before:
//!
//! ```text
//! stock defaults  →  config file (drawpro.toml)  →  PORT env var  →  CLI flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "0.0.0.0"          # Interface to bind
//! port = 5000               # TCP port (PORT env var overrides)
//! max_body_bytes = 67108864 # Largest accepted request body (64 MiB)
//!
//! [storage]
//! projects_dir = "projects" # One JSON file per saved project
//! exports_dir = "exports"   # Exported images, served at /exports/<file>
//! static_dir = "."          # Front-end assets, served at /
//!
//! [export]
//! format = "png"            # Used when a request has no "format"
//! quality = 95              # JPEG quality when a request has no "quality" (0-100)
//!
//! [images]
//! blur_sigma = 1.0          # Gaussian sigma for the "blur" filter
//! max_dimension = 10000     # Largest width/height a stretch resize may request
//!
//! [processing]
//! max_processes = 4         # Max parallel pixel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{ImageSettings, OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "drawpro.toml";

/// Environment variable that overrides `server.port`.
pub const PORT_ENV_VAR: &str = "PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `drawpro.toml`.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener settings.
    pub server: HttpConfig,
    /// Where projects, exports and front-end assets live.
    pub storage: StorageConfig,
    /// Defaults for export requests.
    pub export: ExportConfig,
    /// Filter and resize tunables.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "server.max_body_bytes must be non-zero".into(),
            ));
        }
        if self.export.quality > 100 {
            return Err(ConfigError::Validation(
                "export.quality must be 0-100".into(),
            ));
        }
        if OutputFormat::from_hint(&self.export.format).is_err() {
            return Err(ConfigError::Validation(format!(
                "export.format '{}' is not a supported image format",
                self.export.format
            )));
        }
        if !(self.images.blur_sigma.is_finite() && self.images.blur_sigma > 0.0) {
            return Err(ConfigError::Validation(
                "images.blur_sigma must be positive".into(),
            ));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(PORT_ENV_VAR) {
            self.server.port = raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{PORT_ENV_VAR}={raw:?} is not a valid port"))
            })?;
        }
        Ok(())
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn image_settings(&self) -> ImageSettings {
        ImageSettings {
            blur_sigma: self.images.blur_sigma,
            max_dimension: self.images.max_dimension,
        }
    }

    pub fn default_quality(&self) -> Quality {
        Quality::new(self.export.quality)
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Interface to bind; `0.0.0.0` listens on all interfaces.
    pub host: String,
    pub port: u16,
    /// Largest request body accepted, in bytes. Canvas snapshots are big.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Storage locations. Relative paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub projects_dir: PathBuf,
    pub exports_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("projects"),
            exports_dir: PathBuf::from("exports"),
            static_dir: PathBuf::from("."),
        }
    }
}

/// Defaults for `/api/export-image` requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Format hint used when the request has none.
    pub format: String,
    /// Lossy quality used when the request has none (0 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            quality: 95,
        }
    }
}

/// Filter and resize tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub blur_sigma: f32,
    pub max_dimension: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let settings = ImageSettings::default();
        Self {
            blur_sigma: settings.blur_sigma,
            max_dimension: settings.max_dimension,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel pixel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ServerConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Load config from `path` over stock defaults.
///
/// An explicitly requested file must exist; the implicit `drawpro.toml` may be
/// absent. The result is not validated yet: env and CLI layers still apply.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let overlay = match path {
        Some(p) => Some(load_raw_config(p)?.ok_or_else(|| {
            ConfigError::Validation(format!("config file {} not found", p.display()))
        })?),
        None => load_raw_config(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `drawpro.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# DrawPro Server Configuration
# ============================
#
# All options are optional. Remove or comment out any you don't need;
# the values shown are the built-in defaults.
#
# Precedence (lowest to highest):
#   defaults → this file → PORT environment variable → command-line flags

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
# Interface to bind. "0.0.0.0" accepts connections on every interface.
host = "0.0.0.0"

# TCP port. Overridden by the PORT environment variable when set.
port = 5000

# Largest request body accepted, in bytes. Canvas snapshots arrive as
# base64 data URLs, so this needs to be generous.
max_body_bytes = 67108864

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Saved projects: one <project_id>.json file each.
projects_dir = "projects"

# Exported images, downloadable at /exports/<filename>.
exports_dir = "exports"

# Front-end assets (index.html, app.js, ...), served at /.
static_dir = "."

# ---------------------------------------------------------------------------
# Export defaults (used when a request leaves them out)
# ---------------------------------------------------------------------------
[export]
# "png", "jpg"/"jpeg", or any other extension the image encoder supports
# (webp, bmp, tiff, gif, avif).
format = "png"

# JPEG quality, 0-100.
quality = 95

# ---------------------------------------------------------------------------
# Filters and resizing
# ---------------------------------------------------------------------------
[images]
# Gaussian sigma for the "blur" filter. Larger = softer.
blur_sigma = 1.0

# Largest width or height a resize may stretch to (maintain_aspect = false).
max_dimension = 10000

# ---------------------------------------------------------------------------
# Parallelism
# ---------------------------------------------------------------------------
[processing]
# Maximum worker threads for per-pixel filters.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
