//! In-memory sheet store for tests and dry runs

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SheetData, SheetStore, index_for_row_number, row_number_for_index};

#[derive(Debug, Default)]
struct Inner {
    order: Vec<String>,
    sheets: HashMap<String, SheetData>,
}

/// Sheet store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Build a store pre-populated with sheets
    pub fn with_sheets(sheets: Vec<(String, SheetData)>) -> Self {
        let mut inner = Inner::default();
        for (name, data) in sheets {
            inner.order.push(name.clone());
            inner.sheets.insert(name, data);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().await.order.clone())
    }

    async fn read_sheet(&self, name: &str) -> Result<Option<SheetData>> {
        Ok(self.inner.read().await.sheets.get(name).cloned())
    }

    async fn create_sheet(&self, name: &str, header: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.sheets.contains_key(name) {
            bail!("Sheet already exists: {}", name);
        }
        inner.order.push(name.to_string());
        inner
            .sheets
            .insert(name.to_string(), SheetData::new(header.to_vec()));
        Ok(())
    }

    async fn set_header(&self, name: &str, header: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let sheet = inner
            .sheets
            .get_mut(name)
            .with_context(|| format!("Sheet not found: {}", name))?;
        sheet.header = header.to_vec();
        Ok(())
    }

    async fn update_row(&self, name: &str, row_number: usize, values: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        let sheet = inner
            .sheets
            .get_mut(name)
            .with_context(|| format!("Sheet not found: {}", name))?;
        let index = index_for_row_number(row_number)
            .with_context(|| format!("Row {} is not a data row", row_number))?;
        let row = sheet
            .rows
            .get_mut(index)
            .with_context(|| format!("Row {} does not exist in sheet {}", row_number, name))?;
        *row = values.to_vec();
        Ok(())
    }

    async fn append_row(&self, name: &str, values: &[String]) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let sheet = inner
            .sheets
            .get_mut(name)
            .with_context(|| format!("Sheet not found: {}", name))?;
        sheet.rows.push(values.to_vec());
        Ok(row_number_for_index(sheet.rows.len() - 1))
    }
}
