//! Configuration file and resolved runtime settings

pub mod repository;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::inventory::{AlertConfig, SheetMap};

const APP_DIR: &str = "inventory-cli";
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
const DEFAULT_PAGE_SIZE: usize = 20;
/// Upper bound for the year offset of a derived expiry rule
const MAX_DERIVED_YEARS: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workbook file holding one sheet per category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workbook: Option<PathBuf>,
    /// SQLite file for the snapshot cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    /// How long a cached sheet read is reused; 0 disables the cache
    pub cache_ttl_secs: u64,
    /// IANA zone used for 更新日 and alert day counts
    pub timezone: String,
    pub page_size: usize,
    /// Sheet name overrides keyed by category
    pub sheets: HashMap<String, String>,
    pub alerts: AlertConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook: None,
            cache_path: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            timezone: DEFAULT_TIMEZONE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            sheets: HashMap::new(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    /// Explicit path if given, otherwise the default location
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path()
                .ok_or_else(|| anyhow!("Could not determine config directory for this platform")),
        }
    }

    /// Load the config file. A missing file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;

        if !path.exists() {
            if explicit.is_some() {
                bail!("Config file does not exist: {}", path.display());
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        self.sheet_map()?;

        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.alerts.warning_days < 0 || self.alerts.notice_days < 0 {
            bail!("Alert windows must not be negative");
        }
        if self.alerts.warning_days > self.alerts.notice_days {
            bail!(
                "alerts.warning_days ({}) must not exceed alerts.notice_days ({})",
                self.alerts.warning_days,
                self.alerts.notice_days
            );
        }
        for rule in &self.alerts.derived {
            if rule.category.field(&rule.column).is_none() || rule.category.field(&rule.from).is_none() {
                bail!(
                    "Derived expiry rule {} -> {} does not match the {} columns",
                    rule.from,
                    rule.column,
                    rule.category
                );
            }
            if !(1..=MAX_DERIVED_YEARS).contains(&rule.years) {
                bail!(
                    "Derived expiry rule {} -> {} must add 1 to {} years, got {}",
                    rule.from,
                    rule.column,
                    MAX_DERIVED_YEARS,
                    rule.years
                );
            }
        }

        Ok(())
    }

    pub fn workbook_path(&self) -> Result<PathBuf> {
        match &self.workbook {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|p| p.join(APP_DIR).join("inventory.xlsx"))
                .ok_or_else(|| anyhow!("Could not determine data directory; set `workbook` in the config")),
        }
    }

    pub fn cache_path(&self) -> Result<PathBuf> {
        match &self.cache_path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|p| p.join(APP_DIR).join("cache.db"))
                .ok_or_else(|| anyhow!("Could not determine data directory; set `cache_path` in the config")),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}': {}", self.timezone, e))
    }

    /// Today's date in the configured zone
    pub fn today(&self) -> Result<NaiveDate> {
        let tz = self.timezone()?;
        Ok(Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn sheet_map(&self) -> Result<SheetMap> {
        SheetMap::with_overrides(&self.sheets).context("Invalid [sheets] section")
    }
}
