use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "FOOTPRINT_OVERLAY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "footprint-overlay.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub footprint: FootprintConfig,
    pub store: StoreConfig,
    pub zone: ZoneConfig,
    pub grid: GridConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FootprintConfig {
    /// Column width in pixels; also the horizontal culling margin.
    pub column_width: f32,
    /// Diagonal multiplier a side must exceed to be flagged.
    pub imbalance_ratio: f32,
    /// Bins above this total always draw at full text opacity.
    pub hot_volume: f32,
    /// Gap between the lowest row and the summary block.
    pub summary_gap: f32,
    pub summary_height: f32,
    pub text_size: f32,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        FootprintConfig {
            column_width: 50.0,
            imbalance_ratio: 1.5,
            hot_volume: 500.0,
            summary_gap: 2.0,
            summary_height: 24.0,
            text_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of most recent time buckets kept.
    pub retention: usize,
    /// Bin total above which a bin is flagged as high volume.
    pub high_volume: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            retention: 50,
            high_volume: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub price_grid: f64,
    pub time_grid: u64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        ZoneConfig {
            price_grid: 0.2,
            time_grid: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridConfig {
    pub time_step: u64,
    pub price_step: i64,
    /// Price rows below the top edge where hour labels go.
    pub label_row_offset: i64,
    /// Upper bound on dots per frame; the grid is skipped beyond it.
    pub max_points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            time_step: 60,
            price_step: 1,
            label_row_offset: 5,
            max_points: 20_000,
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Reads a JSON config. A file that fails to parse is moved aside to
/// `<name>_old.<ext>` so the next save does not overwrite it.
pub fn read_from_file(path: &Path) -> Result<Config, ConfigError> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;

    match serde_json::from_str(&contents) {
        Ok(config) => Ok(config),
        Err(e) => {
            let backup_path = backup_path(path);

            if let Err(rename_err) = std::fs::rename(path, &backup_path) {
                log::warn!(
                    "Failed to backup corrupted config '{}' to '{}': {}",
                    path.display(),
                    backup_path.display(),
                    rename_err
                );
            } else {
                log::info!(
                    "Backed up corrupted config to '{}'",
                    backup_path.display()
                );
            }

            Err(e.into())
        }
    }
}

pub fn write_to_file(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_or_default(path: &Path) -> Config {
    match read_from_file(path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(e) => {
            log::warn!("Using default config, {}: {e}", path.display());
            Config::default()
        }
    }
}

/// Loads from the file named by `FOOTPRINT_OVERLAY_CONFIG`, or the default
/// file in the working directory.
pub fn load() -> Config {
    load_or_default(&config_path())
}

fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match path.extension() {
        Some(ext) => format!("{stem}_old.{}", ext.to_string_lossy()),
        None => format!("{stem}_old"),
    };
    path.with_file_name(file_name)
}
