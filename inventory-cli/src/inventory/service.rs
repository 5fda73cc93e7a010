//! Inventory operations over a sheet store
//!
//! Each category lives on its own sheet. Writes are upserts keyed by the ID
//! column; reads for listing go through the optional snapshot cache while
//! lookups and writes always read the sheet fresh.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::category::{Category, SheetMap, columns};
use super::dates::format_date;
use super::item::{Item, ItemDraft};
use crate::config::repository::SnapshotCache;
use crate::sheets::{MemoryStore, SheetData, SheetStore, row_number_for_index};

/// How an upsert treats an existing row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Keep existing values for tail columns the draft does not provide
    pub merge: bool,
}

/// Result of an upsert, with the sheet row that was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { row: usize },
    Updated { row: usize },
}

impl UpsertOutcome {
    pub fn row(&self) -> usize {
        match self {
            UpsertOutcome::Created { row } | UpsertOutcome::Updated { row } => *row,
        }
    }
}

/// Everything read by [`InventoryService::load_all`]
#[derive(Debug, Default)]
pub struct LoadReport {
    pub items: Vec<Item>,
    /// Categories whose sheet does not exist yet
    pub missing_sheets: Vec<Category>,
    /// Categories whose sheet could not be read, with the error message
    pub failed_sheets: Vec<(Category, String)>,
}

pub struct InventoryService {
    store: Arc<dyn SheetStore>,
    sheets: SheetMap,
    cache: Option<SnapshotCache>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn SheetStore>, sheets: SheetMap) -> Self {
        Self {
            store,
            sheets,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn sheet_map(&self) -> &SheetMap {
        &self.sheets
    }

    /// Copy of this service over an in-memory copy of the workbook.
    ///
    /// Writes through the copy never reach the real store.
    pub async fn detached(&self) -> Result<InventoryService> {
        let mut sheets = Vec::new();
        for name in self.store.sheet_names().await.context("Failed to list sheets")? {
            if let Some(data) = self.read_fresh(&name).await? {
                sheets.push((name, data));
            }
        }
        Ok(InventoryService::new(
            Arc::new(MemoryStore::with_sheets(sheets)),
            self.sheets.clone(),
        ))
    }

    /// Read every category sheet.
    ///
    /// Cached snapshots are used unless `force_refresh` is set. A sheet that
    /// fails to read is reported and skipped so the other categories still load.
    pub async fn load_all(&self, force_refresh: bool) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for category in Category::ALL {
            match self.read_category_sheet(category, force_refresh).await {
                Ok(Some(sheet)) => report.items.extend(items_from_sheet(category, &sheet)),
                Ok(None) => {
                    log::debug!("Sheet for {} does not exist", category);
                    report.missing_sheets.push(category);
                }
                Err(e) => {
                    log::warn!("Failed to read sheet for {}: {:#}", category, e);
                    report.failed_sheets.push((category, format!("{:#}", e)));
                }
            }
        }

        Ok(report)
    }

    /// Items of one category, `None` when its sheet does not exist
    pub async fn load_category(&self, category: Category, force_refresh: bool) -> Result<Option<Vec<Item>>> {
        Ok(self
            .read_category_sheet(category, force_refresh)
            .await?
            .map(|sheet| items_from_sheet(category, &sheet)))
    }

    /// Look up one record by ID, reading the sheet fresh
    pub async fn find(&self, category: Category, id: &str) -> Result<Option<Item>> {
        let sheet_name = self.sheets.sheet_name(category);
        let Some(sheet) = self.read_fresh(sheet_name).await? else {
            return Ok(None);
        };

        Ok(sheet.find_row(columns::ID, id).and_then(|row_number| {
            let row = sheet.row_at(row_number)?;
            Item::from_row(category, &sheet.header, row, row_number)
        }))
    }

    /// Write a record: overwrite the row whose ID matches, or append a new one.
    ///
    /// `更新日` is stamped with `today`.
    pub async fn upsert(
        &self,
        category: Category,
        draft: &ItemDraft,
        today: NaiveDate,
        options: UpsertOptions,
    ) -> Result<UpsertOutcome> {
        let draft = draft.validate(category)?;
        let sheet_name = self.sheets.sheet_name(category);
        let values = draft.schema_values(category, &format_date(today));

        let sheet = match self.read_fresh(sheet_name).await? {
            Some(sheet) => sheet,
            None => {
                let header: Vec<String> = category.schema().iter().map(|s| s.to_string()).collect();
                log::info!("Creating sheet '{}'", sheet_name);
                self.store
                    .create_sheet(sheet_name, &header)
                    .await
                    .with_context(|| format!("Failed to create sheet '{}'", sheet_name))?;
                SheetData::new(header)
            }
        };

        let header = match extend_header(&sheet, category) {
            Some(header) => {
                log::info!("Adding missing columns to sheet '{}'", sheet_name);
                self.store
                    .set_header(sheet_name, &header)
                    .await
                    .with_context(|| format!("Failed to update header of sheet '{}'", sheet_name))?;
                header
            }
            None => sheet.header.clone(),
        };

        let outcome = match sheet.find_row(columns::ID, &draft.id) {
            Some(row_number) => {
                let existing = sheet.row_at(row_number).map(|r| r.as_slice());
                let row = align_row(&header, &values, existing, options.merge);
                self.store
                    .update_row(sheet_name, row_number, &row)
                    .await
                    .with_context(|| format!("Failed to update row {} of sheet '{}'", row_number, sheet_name))?;
                log::info!("Updated {} '{}' at row {}", category, draft.id, row_number);
                UpsertOutcome::Updated { row: row_number }
            }
            None => {
                let row = align_row(&header, &values, None, options.merge);
                let row_number = self
                    .store
                    .append_row(sheet_name, &row)
                    .await
                    .with_context(|| format!("Failed to append to sheet '{}'", sheet_name))?;
                log::info!("Added {} '{}' at row {}", category, draft.id, row_number);
                UpsertOutcome::Created { row: row_number }
            }
        };

        self.invalidate(sheet_name).await;
        Ok(outcome)
    }

    /// Create every missing category sheet with its schema header.
    ///
    /// Returns the categories whose sheet was created.
    pub async fn init_sheets(&self) -> Result<Vec<Category>> {
        let existing = self.store.sheet_names().await.context("Failed to list sheets")?;
        let mut created = Vec::new();

        for category in Category::ALL {
            let sheet_name = self.sheets.sheet_name(category);
            if existing.iter().any(|name| name == sheet_name) {
                continue;
            }
            let header: Vec<String> = category.schema().iter().map(|s| s.to_string()).collect();
            self.store
                .create_sheet(sheet_name, &header)
                .await
                .with_context(|| format!("Failed to create sheet '{}'", sheet_name))?;
            log::info!("Created sheet '{}'", sheet_name);
            self.invalidate(sheet_name).await;
            created.push(category);
        }

        Ok(created)
    }

    /// Drop every cached snapshot, returning how many were removed
    pub async fn refresh(&self) -> Result<u64> {
        match &self.cache {
            Some(cache) => cache.clear().await,
            None => Ok(0),
        }
    }

    async fn read_category_sheet(&self, category: Category, force_refresh: bool) -> Result<Option<SheetData>> {
        let sheet_name = self.sheets.sheet_name(category);

        if !force_refresh {
            if let Some(cache) = &self.cache {
                match cache.get(sheet_name).await {
                    Ok(Some(sheet)) => {
                        log::debug!("Using cached snapshot of '{}'", sheet_name);
                        return Ok(Some(sheet));
                    }
                    Ok(None) => {}
                    Err(e) => log::warn!("Snapshot cache read failed for '{}': {:#}", sheet_name, e),
                }
            }
        }

        let sheet = self.read_fresh(sheet_name).await?;
        if let (Some(cache), Some(data)) = (&self.cache, &sheet) {
            if let Err(e) = cache.put(sheet_name, data).await {
                log::warn!("Snapshot cache write failed for '{}': {:#}", sheet_name, e);
            }
        }
        Ok(sheet)
    }

    async fn read_fresh(&self, sheet_name: &str) -> Result<Option<SheetData>> {
        log::debug!("Reading sheet '{}' from store", sheet_name);
        self.store
            .read_sheet(sheet_name)
            .await
            .with_context(|| format!("Failed to read sheet '{}'", sheet_name))
    }

    async fn invalidate(&self, sheet_name: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate(sheet_name).await {
                log::warn!("Failed to invalidate snapshot of '{}': {:#}", sheet_name, e);
            }
        }
    }
}

fn items_from_sheet(category: Category, sheet: &SheetData) -> Vec<Item> {
    let items: Vec<Item> = sheet
        .rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| Item::from_row(category, &sheet.header, row, row_number_for_index(i)))
        .collect();

    for item in items.iter().filter(|item| item.has_unknown_status()) {
        log::warn!(
            "{} '{}' (row {}) has an unknown status '{}'",
            category,
            item.id,
            item.row_number,
            item.status
        );
    }

    items
}

/// Header with the schema columns it lacks appended, or `None` if complete.
///
/// New columns go after the widest row so unlabelled data is never covered.
fn extend_header(sheet: &SheetData, category: Category) -> Option<Vec<String>> {
    let missing: Vec<&str> = category
        .schema()
        .into_iter()
        .filter(|col| sheet.column_index(col).is_none())
        .collect();

    if missing.is_empty() {
        return None;
    }

    let width = sheet
        .rows
        .iter()
        .map(Vec::len)
        .chain([sheet.header.len()])
        .max()
        .unwrap_or(0);

    let mut extended = sheet.header.clone();
    extended.resize(width, String::new());
    extended.extend(missing.into_iter().map(String::from));
    Some(extended)
}

/// Lay out schema values under an existing header.
///
/// Columns outside the schema, including cells past the end of the header,
/// keep their current value. Schema columns the draft leaves out are cleared,
/// or kept when merging.
fn align_row(
    header: &[String],
    values: &[(&'static str, Option<String>)],
    existing: Option<&[String]>,
    merge: bool,
) -> Vec<String> {
    let current = |col: usize| {
        existing
            .and_then(|row| row.get(col))
            .cloned()
            .unwrap_or_default()
    };
    let width = header.len().max(existing.map(|row| row.len()).unwrap_or(0));

    (0..width)
        .map(|col| {
            let title = header.get(col).map(|t| t.trim()).unwrap_or("");
            match values.iter().find(|(name, _)| !title.is_empty() && *name == title) {
                Some((_, Some(value))) => value.clone(),
                Some((_, None)) if merge => current(col),
                Some((_, None)) => String::new(),
                None => current(col),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::repository::snapshots;
    use crate::inventory::item::Status;

    /// Store whose reads of one sheet always fail
    struct BrokenSheetStore {
        inner: MemoryStore,
        broken: String,
    }

    #[async_trait]
    impl SheetStore for BrokenSheetStore {
        async fn sheet_names(&self) -> Result<Vec<String>> {
            self.inner.sheet_names().await
        }

        async fn read_sheet(&self, name: &str) -> Result<Option<SheetData>> {
            if name == self.broken {
                anyhow::bail!("sheet '{}' is corrupt", name);
            }
            self.inner.read_sheet(name).await
        }

        async fn create_sheet(&self, name: &str, header: &[String]) -> Result<()> {
            self.inner.create_sheet(name, header).await
        }

        async fn set_header(&self, name: &str, header: &[String]) -> Result<()> {
            self.inner.set_header(name, header).await
        }

        async fn update_row(&self, name: &str, row_number: usize, values: &[String]) -> Result<()> {
            self.inner.update_row(name, row_number, values).await
        }

        async fn append_row(&self, name: &str, values: &[String]) -> Result<usize> {
            self.inner.append_row(name, values).await
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    fn pc_sheet() -> SheetData {
        let header: Vec<String> = Category::Pc.schema().iter().map(|s| s.to_string()).collect();
        SheetData {
            header,
            rows: vec![
                strings(&["P-1", "PC", "ThinkPad", "山田", "利用可能", "2024-01-01", "2023-04-01", "SN1", "Win11", ""]),
                strings(&["P-2", "PC", "MacBook", "P-1", "貸出中", "2024-01-01", "", "SN2", "macOS", ""]),
            ],
        }
    }

    fn service_with(sheets: Vec<(String, SheetData)>) -> (Arc<MemoryStore>, InventoryService) {
        let store = Arc::new(MemoryStore::with_sheets(sheets));
        let service = InventoryService::new(store.clone(), SheetMap::default());
        (store, service)
    }

    #[tokio::test]
    async fn test_upsert_appends_unknown_id() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let draft = ItemDraft::new("P-3", "Surface").with_holder("鈴木");
        let outcome = service
            .upsert(Category::Pc, &draft, today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created { row: 4 });

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[2][0], "P-3");
        assert_eq!(sheet.rows[2][4], "利用可能");
        assert_eq!(sheet.rows[2][5], "2025-04-01");
    }

    #[tokio::test]
    async fn test_upsert_overwrites_matching_row_in_place() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let draft = ItemDraft::new("P-2", "MacBook Pro")
            .with_status(Status::Broken)
            .with_field("シリアル番号", "SN2-new");
        let outcome = service
            .upsert(Category::Pc, &draft, today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { row: 3 });

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1][2], "MacBook Pro");
        assert_eq!(sheet.rows[1][4], "故障/修理中");
        assert_eq!(sheet.rows[1][7], "SN2-new");
        // Full overwrite clears tail columns the draft leaves out
        assert_eq!(sheet.rows[1][8], "");
        // Row 2 is untouched even though its holder column did not match
        assert_eq!(sheet.rows[0][2], "ThinkPad");
    }

    #[tokio::test]
    async fn test_upsert_never_matches_other_columns() {
        // "P-1" is also the holder of row 3
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let outcome = service
            .upsert(Category::Pc, &ItemDraft::new("P-1", "ThinkPad X1"), today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { row: 2 });

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows[1][2], "MacBook");
    }

    #[tokio::test]
    async fn test_upsert_merge_keeps_absent_fields() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let draft = ItemDraft::new("P-1", "ThinkPad").with_field("OS・詳細", "Win11 Pro");
        service
            .upsert(Category::Pc, &draft, today(), UpsertOptions { merge: true })
            .await
            .unwrap();

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows[0][6], "2023-04-01");
        assert_eq!(sheet.rows[0][7], "SN1");
        assert_eq!(sheet.rows[0][8], "Win11 Pro");
    }

    #[tokio::test]
    async fn test_upsert_preserves_extra_columns_and_extends_header() {
        // Legacy layout: no 契約期限 column, plus an unknown 旧管理番号 column
        let sheet = SheetData {
            header: strings(&["ID", "品名", "旧管理番号", "ステータス"]),
            rows: vec![strings(&["M-1", "iPhone 12", "K-77", "利用可能"])],
        };
        let (store, service) = service_with(vec![("携帯電話".to_string(), sheet)]);

        let draft = ItemDraft::new("M-1", "iPhone 15").with_field("契約期限", "2026/3/31");
        service
            .upsert(Category::Phone, &draft, today(), UpsertOptions::default())
            .await
            .unwrap();

        let sheet = store.read_sheet("携帯電話").await.unwrap().unwrap();
        assert_eq!(&sheet.header[..4], &strings(&["ID", "品名", "旧管理番号", "ステータス"])[..]);
        assert!(sheet.column_index("契約期限").is_some());
        assert!(sheet.column_index("更新日").is_some());

        let item = service.find(Category::Phone, "M-1").await.unwrap().unwrap();
        assert_eq!(item.name, "iPhone 15");
        assert_eq!(item.field("旧管理番号"), "K-77");
        assert_eq!(item.field("契約期限"), "2026-03-31");
        assert_eq!(item.updated, "2025-04-01");
    }

    #[tokio::test]
    async fn test_upsert_creates_missing_sheet() {
        let (store, service) = service_with(Vec::new());

        let outcome = service
            .upsert(Category::Vehicle, &ItemDraft::new("V-1", "プリウス"), today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created { row: 2 });

        let sheet = store.read_sheet("訪問車").await.unwrap().unwrap();
        assert_eq!(sheet.header, strings(&Category::Vehicle.schema()));
        assert_eq!(sheet.rows[0][1], "訪問車");
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_draft() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let err = service
            .upsert(Category::Pc, &ItemDraft::new("", "NoId"), today(), UpsertOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("IDと品名は必須です"));
        assert_eq!(store.read_sheet("PC").await.unwrap().unwrap().rows.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let (_, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let item = service.find(Category::Pc, " P-2 ").await.unwrap().unwrap();
        assert_eq!(item.name, "MacBook");
        assert_eq!(item.row_number, 3);

        assert!(service.find(Category::Pc, "P-9").await.unwrap().is_none());
        assert!(service.find(Category::Tablet, "P-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_all_reports_missing_sheets() {
        let (_, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let report = service.load_all(false).await.unwrap();
        assert_eq!(report.items.len(), 2);
        assert!(report.items.iter().all(|i| i.category == Category::Pc));
        assert_eq!(report.missing_sheets.len(), 4);
        assert!(report.failed_sheets.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_skips_sheets_that_fail_to_read() {
        let phone = SheetData {
            header: strings(&Category::Phone.schema()),
            rows: vec![strings(&["M-1", "携帯電話", "iPhone 15"])],
        };
        let store = BrokenSheetStore {
            inner: MemoryStore::with_sheets(vec![
                ("PC".to_string(), pc_sheet()),
                ("iPad".to_string(), SheetData::new(strings(&Category::Tablet.schema()))),
                ("携帯電話".to_string(), phone),
            ]),
            broken: "iPad".to_string(),
        };
        let service = InventoryService::new(Arc::new(store), SheetMap::default());

        let report = service.load_all(false).await.unwrap();
        assert_eq!(report.items.len(), 3);
        assert!(report.items.iter().any(|i| i.category == Category::Phone));
        assert_eq!(report.failed_sheets.len(), 1);
        assert_eq!(report.failed_sheets[0].0, Category::Tablet);
        assert!(report.failed_sheets[0].1.contains("corrupt"));
        assert_eq!(report.missing_sheets, vec![Category::Vehicle, Category::Other]);

        // A single-category read still surfaces the error
        assert!(service.load_category(Category::Tablet, false).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_never_covers_unlabelled_cells() {
        // Legacy layout with a memo cell that has no header above it
        let sheet = SheetData {
            header: strings(&["ID", "品名"]),
            rows: vec![strings(&["P-1", "ThinkPad", "memo"])],
        };
        let (store, service) = service_with(vec![("PC".to_string(), sheet)]);

        service
            .upsert(Category::Pc, &ItemDraft::new("P-1", "ThinkPad X1"), today(), UpsertOptions::default())
            .await
            .unwrap();

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(&sheet.header[..3], &strings(&["ID", "品名", ""])[..]);
        assert_eq!(sheet.header[3], "カテゴリ");
        assert_eq!(sheet.rows[0][1], "ThinkPad X1");
        assert_eq!(sheet.rows[0][2], "memo");
        assert_eq!(sheet.rows[0][3], "PC");
    }

    #[tokio::test]
    async fn test_upsert_keeps_cells_past_the_header() {
        let mut sheet = pc_sheet();
        sheet.rows[0].push("手書きメモ".to_string());
        let (store, service) = service_with(vec![("PC".to_string(), sheet)]);

        service
            .upsert(Category::Pc, &ItemDraft::new("P-1", "ThinkPad X1"), today(), UpsertOptions::default())
            .await
            .unwrap();

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.header.len(), Category::Pc.schema().len());
        assert_eq!(sheet.rows[0].last().map(String::as_str), Some("手書きメモ"));
    }

    #[tokio::test]
    async fn test_load_all_uses_cache_until_write() {
        let store = Arc::new(MemoryStore::with_sheets(vec![("PC".to_string(), pc_sheet())]));
        let pool = snapshots::connect_in_memory().await.unwrap();
        let cache = SnapshotCache::new(pool, "memory", Duration::from_secs(600));
        let service = InventoryService::new(store.clone(), SheetMap::default()).with_cache(cache);

        assert_eq!(service.load_all(false).await.unwrap().items.len(), 2);

        // A change behind the service's back is hidden by the cache
        store
            .append_row("PC", &strings(&["P-9", "PC", "Ghost"]))
            .await
            .unwrap();
        assert_eq!(service.load_all(false).await.unwrap().items.len(), 2);
        assert_eq!(service.load_all(true).await.unwrap().items.len(), 3);

        // Writing through the service drops the snapshot
        service
            .upsert(Category::Pc, &ItemDraft::new("P-10", "Dell"), today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(service.load_all(false).await.unwrap().items.len(), 4);

        store
            .append_row("PC", &strings(&["P-11", "PC", "HP"]))
            .await
            .unwrap();
        assert!(service.refresh().await.unwrap() >= 1);
        assert_eq!(service.load_all(false).await.unwrap().items.len(), 5);
    }

    #[tokio::test]
    async fn test_init_sheets_creates_only_missing() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let created = service.init_sheets().await.unwrap();
        assert_eq!(created.len(), 4);
        assert!(!created.contains(&Category::Pc));
        assert_eq!(store.sheet_names().await.unwrap().len(), 5);

        let tablet = store.read_sheet("iPad").await.unwrap().unwrap();
        assert_eq!(tablet.header, strings(&Category::Tablet.schema()));

        assert!(service.init_sheets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detached_service_leaves_store_untouched() {
        let (store, service) = service_with(vec![("PC".to_string(), pc_sheet())]);

        let dry = service.detached().await.unwrap();
        let outcome = dry
            .upsert(Category::Pc, &ItemDraft::new("P-2", "MacBook Pro"), today(), UpsertOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated { row: 3 });
        assert_eq!(dry.find(Category::Pc, "P-2").await.unwrap().unwrap().name, "MacBook Pro");

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows[1][2], "MacBook");
    }

    #[test]
    fn test_align_row_by_header_name() {
        let header = strings(&["品名", "ID", "備考", "メモ"]);
        let values = vec![
            ("ID", Some("O-1".to_string())),
            ("品名", Some("脚立".to_string())),
            ("備考", None),
        ];
        let existing = strings(&["古い脚立", "O-1", "倉庫", "keep"]);

        assert_eq!(
            align_row(&header, &values, Some(&existing), false),
            strings(&["脚立", "O-1", "", "keep"])
        );
        assert_eq!(
            align_row(&header, &values, Some(&existing), true),
            strings(&["脚立", "O-1", "倉庫", "keep"])
        );
        assert_eq!(
            align_row(&header, &values, None, false),
            strings(&["脚立", "O-1", "", ""])
        );

        let longer = strings(&["古い脚立", "O-1", "倉庫", "keep", "past header"]);
        assert_eq!(
            align_row(&header, &values, Some(&longer), false),
            strings(&["脚立", "O-1", "", "keep", "past header"])
        );
    }
}
