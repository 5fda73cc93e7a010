//! Shared state built once per command invocation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use super::Cli;
use crate::config::Config;
use crate::config::repository::{SnapshotCache, snapshots};
use crate::inventory::InventoryService;
use crate::sheets::XlsxStore;

pub struct AppContext {
    pub config: Config,
    pub workbook: PathBuf,
    pub service: InventoryService,
}

impl AppContext {
    /// Load the config, apply command line overrides and open the workbook and cache
    pub async fn load(cli: &Cli) -> Result<Self> {
        let config = load_config(cli)?;
        let workbook = config.workbook_path()?;
        log::debug!("Using workbook {}", workbook.display());

        let store = Arc::new(XlsxStore::new(&workbook));
        let mut service = InventoryService::new(store, config.sheet_map()?);

        if !config.cache_ttl().is_zero() {
            match open_cache(&config, &workbook).await {
                Ok(cache) => service = service.with_cache(cache),
                Err(e) => log::warn!("Snapshot cache unavailable, reading the workbook directly: {:#}", e),
            }
        }

        Ok(Self {
            config,
            workbook,
            service,
        })
    }

    pub fn today(&self) -> Result<NaiveDate> {
        self.config.today()
    }
}

/// Config file with the `--workbook` override applied
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workbook) = &cli.workbook {
        config.workbook = Some(workbook.clone());
    }
    Ok(config)
}

async fn open_cache(config: &Config, workbook: &std::path::Path) -> Result<SnapshotCache> {
    let path = config.cache_path()?;
    let pool = snapshots::connect(&path).await?;
    // Snapshots are keyed by the absolute workbook path
    let source = std::fs::canonicalize(workbook)
        .unwrap_or_else(|_| workbook.to_path_buf())
        .display()
        .to_string();
    Ok(SnapshotCache::new(pool, source, config.cache_ttl()))
}
