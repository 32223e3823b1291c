//! Generator configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the catalog root and is optional; any key it sets overrides the stock
//! default, everything else keeps its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [grid]
//! min_columns = 2           # Sheet grid bounds (inclusive)
//! max_columns = 10
//! min_rows = 2
//! max_rows = 7
//!
//! [pages]
//! max_cards = 69            # Cards per sheet page (<= 99, < columns*rows)
//!
//! [backside]
//! brightness = -30          # Backside tile brightness in percent (-100..100)
//!
//! [sheet]
//! resize_mismatched = false # Resize cards that differ from the first card
//!
//! [scene]
//! url_prefix = ""           # FaceURL/BackURL prefix ("" = file:// URL)
//! scale = [1.0, 1.0, 1.0]   # Transform scale of bag, decks and cards
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::grid::GridBounds;
use crate::scene::MAX_CARDS_PER_PAGE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Generator configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Column and row bounds for the grid solver.
    pub grid: GridBounds,
    /// Page size.
    pub pages: PagesConfig,
    /// Backside tile appearance.
    pub backside: BacksideConfig,
    /// Handling of cards that do not match the page's cell size.
    pub sheet: SheetConfig,
    /// Scene descriptor output.
    pub scene: SceneConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl GeneratorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.min_columns == 0 || grid.min_rows == 0 {
            return Err(ConfigError::Validation(
                "grid.min_columns and grid.min_rows must be at least 1".into(),
            ));
        }
        if grid.min_columns > grid.max_columns {
            return Err(ConfigError::Validation(
                "grid.min_columns must not exceed grid.max_columns".into(),
            ));
        }
        if grid.min_rows > grid.max_rows {
            return Err(ConfigError::Validation(
                "grid.min_rows must not exceed grid.max_rows".into(),
            ));
        }
        if self.pages.max_cards == 0 {
            return Err(ConfigError::Validation(
                "pages.max_cards must be at least 1".into(),
            ));
        }
        if self.pages.max_cards > MAX_CARDS_PER_PAGE {
            return Err(ConfigError::Validation(format!(
                "pages.max_cards must be at most {MAX_CARDS_PER_PAGE}"
            )));
        }
        let cells = grid.max_cells() as usize;
        if self.pages.max_cards + 1 > cells {
            return Err(ConfigError::Validation(format!(
                "pages.max_cards must leave room for the backside tile \
                 (at most {} for a {}x{} grid)",
                cells.saturating_sub(1),
                grid.max_columns,
                grid.max_rows
            )));
        }
        if !(-100..=100).contains(&self.backside.brightness) {
            return Err(ConfigError::Validation(
                "backside.brightness must be -100..100".into(),
            ));
        }
        if self.scene.scale.iter().any(|s| s.is_nan() || *s <= 0.0) {
            return Err(ConfigError::Validation(
                "scene.scale values must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Sheet page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
    /// Maximum number of cards on one sheet page.
    pub max_cards: usize,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self { max_cards: 69 }
    }
}

/// Backside tile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacksideConfig {
    /// Brightness adjustment in percent, -100 (black) to 100 (white).
    pub brightness: i32,
}

impl Default for BacksideConfig {
    fn default() -> Self {
        Self { brightness: -30 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    /// When false, a card whose size differs from the first card on its page
    /// aborts the run. When true, it is resized to fit the cell.
    pub resize_mismatched: bool,
}

/// Scene descriptor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Prefix for `FaceURL`/`BackURL`. Empty means a `file://` URL of the
    /// results directory.
    pub url_prefix: String,
    /// `scaleX`, `scaleY`, `scaleZ` of every object's transform.
    pub scale: [f64; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of pages composited at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
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
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(GeneratorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
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

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, deserialize, validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<GeneratorConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GeneratorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the catalog root.
pub fn load_config(catalog_root: &Path) -> Result<GeneratorConfig, ConfigError> {
    resolve_config(load_raw_config(catalog_root)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Deck Sheets Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the catalog root, next to the game directories.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Sheet grid
# ---------------------------------------------------------------------------
[grid]
# Inclusive bounds for the number of card columns and rows on a sheet.
# The smallest grid that fits the page's cards plus the backside tile wins.
min_columns = 2
max_columns = 10
min_rows = 2
max_rows = 7

# ---------------------------------------------------------------------------
# Pages
# ---------------------------------------------------------------------------
[pages]
# Maximum cards per sheet page. Card ids are page * 100 + index, so this
# must stay below 100, and one grid cell is always kept for the backside.
max_cards = 69

# ---------------------------------------------------------------------------
# Backside tile
# ---------------------------------------------------------------------------
[backside]
# Brightness adjustment of the backside tile drawn into the last cell,
# from -100 (black) to 100 (white). 0 keeps it unchanged.
brightness = -30

# ---------------------------------------------------------------------------
# Sheet compositing
# ---------------------------------------------------------------------------
[sheet]
# Cell size is taken from the first card of each page. Cards of another
# size abort the run unless this is true, in which case they are resized.
resize_mismatched = false

# ---------------------------------------------------------------------------
# Scene descriptor (decks.json)
# ---------------------------------------------------------------------------
[scene]
# Prefix for FaceURL / BackURL. Leave empty to use a file:// URL of the
# results directory; set to e.g. "https://example.com/sheets/" when hosting.
url_prefix = ""

# Transform scale [x, y, z] applied to every bag, deck and card.
scale = [1.0, 1.0, 1.0]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum sheet pages composited in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
