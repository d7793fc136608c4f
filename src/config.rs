use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineSettings, WeekStart};
use crate::models::{CategoryCatalog, DEFAULT_CATEGORIES};

const CONFIG_FILE_NAME: &str = "tallybook.toml";

/// Display/output formatting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// If set, money amounts are rounded to this many decimal places before
    /// being rendered as strings.
    ///
    /// This is purely a presentation setting and does not affect calculations.
    pub currency_decimals: Option<u32>,

    /// When true, render amounts with thousands separators.
    ///
    /// This only affects optional `*_display` fields.
    pub currency_grouping: bool,

    /// Optional currency symbol (e.g. "$", "€") for display rendering.
    pub currency_symbol: Option<String>,

    /// When true and `currency_decimals` is set, display values with exactly
    /// that many decimal places (padding with trailing zeros).
    pub currency_fixed_decimals: bool,
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Budget thresholds and the category catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Percent used at which a line is shown as near its limit.
    pub near_limit_percent: u32,

    /// Tolerance around the prior total before a trend counts as rising or
    /// falling.
    pub trend_deadband_percent: u32,

    /// First day of the week for weekly chart buckets.
    pub week_start: WeekStart,

    /// Canonical category spellings offered for new expenses.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            near_limit_percent: 80,
            trend_deadband_percent: 10,
            week_start: WeekStart::Monday,
            categories: default_categories(),
        }
    }
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.near_limit_percent > 100 {
            anyhow::bail!(
                "budget.near_limit_percent must be at most 100, got {}",
                self.near_limit_percent
            );
        }
        if self.trend_deadband_percent > 100 {
            anyhow::bail!(
                "budget.trend_deadband_percent must be at most 100, got {}",
                self.trend_deadband_percent
            );
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            near_limit_percent: self.near_limit_percent,
            trend_deadband: Decimal::new(i64::from(self.trend_deadband_percent), 2),
            week_start: self.week_start,
            catalog: CategoryCatalog::new(self.categories.iter()),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// User whose ledger commands act on when `--user` is not given.
    pub default_user: Option<String>,

    /// Display/output formatting settings.
    pub display: DisplayConfig,

    /// Budget thresholds and categories.
    pub budget: BudgetConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .budget
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The config file this was loaded from (it may not exist).
    pub config_path: PathBuf,

    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub default_user: Option<String>,

    pub display: DisplayConfig,

    pub budget: BudgetConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./tallybook.toml` if it exists in current directory
/// 2. `~/.local/share/tallybook/tallybook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("tallybook").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            config_path: config_path.clone(),
            default_user: config.default_user,
            display: config.display,
            budget: config.budget,
        })
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the intended parent directory of the config file is
    /// the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self {
            data_dir: config_dir.to_path_buf(),
            config_path: config_path.clone(),
            default_user: None,
            display: DisplayConfig::default(),
            budget: BudgetConfig::default(),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        self.budget.engine_settings()
    }
}
