//! Workbook-file sheet store
//!
//! Reads with calamine and writes with rust_xlsxwriter. rust_xlsxwriter can
//! only produce whole files, so every write loads the workbook, applies the
//! change and saves a new file next to the old one before renaming it into
//! place.
//!
//! Cells keep their stored type across a save: numbers, booleans, dates and
//! formulas the tool never touched are written back as they were read. Only
//! cells whose text changes are written, and those are written as strings so
//! identifiers like `001` stay textual.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use tokio::sync::Mutex;
use unicode_width::UnicodeWidthStr;

use super::{SheetData, SheetStore, index_for_row_number, row_number_for_index};

/// Column width bounds when saving (in Excel character units)
const MIN_COLUMN_WIDTH: usize = 8;
const MAX_COLUMN_WIDTH: usize = 40;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// One stored cell
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet serial date
    Date(f64),
    /// Formula text (without `=`) and its last computed result
    Formula { formula: String, result: String },
}

impl Cell {
    fn from_text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    /// The text a spreadsheet user would see
    fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) => format_number(*f),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(serial) => match serial_to_datetime(*serial) {
                Some(dt) if dt.time() == NaiveTime::MIN => dt.date().format("%Y-%m-%d").to_string(),
                Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => format_number(*serial),
            },
            Cell::Formula { result, .. } => result.clone(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::from_text(s),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Date(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// A sheet as stored in the file; row 0 is the header
#[derive(Debug, Clone, Default)]
struct StoredSheet {
    name: String,
    cells: Vec<Vec<Cell>>,
}

impl StoredSheet {
    fn from_data(name: &str, data: &SheetData) -> Self {
        let mut cells = vec![data.header.iter().map(|v| Cell::from_text(v)).collect()];
        cells.extend(
            data.rows
                .iter()
                .map(|row| row.iter().map(|v| Cell::from_text(v)).collect()),
        );
        Self {
            name: name.to_string(),
            cells,
        }
    }

    /// Text view of the sheet; trailing empty cells are dropped
    fn data(&self) -> SheetData {
        let mut rows: Vec<Vec<String>> = self
            .cells
            .iter()
            .map(|row| {
                let mut texts: Vec<String> = row.iter().map(Cell::text).collect();
                while texts.last().map(|c| c.is_empty()).unwrap_or(false) {
                    texts.pop();
                }
                texts
            })
            .collect();

        if rows.is_empty() {
            SheetData::default()
        } else {
            let header = rows.remove(0);
            SheetData { header, rows }
        }
    }

    /// Replace a row's text, keeping every cell whose text is unchanged as stored
    fn set_row(&mut self, index: usize, values: &[String]) {
        if self.cells.len() <= index {
            self.cells.resize(index + 1, Vec::new());
        }
        let old = std::mem::take(&mut self.cells[index]);
        self.cells[index] = values
            .iter()
            .enumerate()
            .map(|(col, value)| match old.get(col) {
                Some(cell) if cell.text() == *value => cell.clone(),
                _ => Cell::from_text(value),
            })
            .collect();
    }

    fn data_row_count(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }
}

/// Sheets of a workbook in order
type Sheets = Vec<StoredSheet>;

/// Sheet store backed by an `.xlsx` file
#[derive(Debug)]
pub struct XlsxStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Sheets> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_workbook(&path))
            .await
            .context("Workbook read task failed")?
    }

    /// Load, change and save the workbook while holding the file lock
    async fn modify<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Sheets) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut sheets = load_workbook(&path)?;
            let out = change(&mut sheets)?;
            write_workbook(&path, &sheets)?;
            Ok(out)
        })
        .await
        .context("Workbook write task failed")?
    }
}

#[async_trait]
impl SheetStore for XlsxStore {
    async fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_iter().map(|sheet| sheet.name).collect())
    }

    async fn read_sheet(&self, name: &str) -> Result<Option<SheetData>> {
        Ok(self
            .load()
            .await?
            .iter()
            .find(|sheet| sheet.name == name)
            .map(StoredSheet::data))
    }

    async fn create_sheet(&self, name: &str, header: &[String]) -> Result<()> {
        let name = name.to_string();
        let header = header.to_vec();
        log::debug!("Creating sheet '{}' in {}", name, self.path.display());
        self.modify(move |sheets| {
            if sheets.iter().any(|sheet| sheet.name == name) {
                bail!("Sheet already exists: {}", name);
            }
            sheets.push(StoredSheet::from_data(&name, &SheetData::new(header)));
            Ok(())
        })
        .await
    }

    async fn set_header(&self, name: &str, header: &[String]) -> Result<()> {
        let name = name.to_string();
        let header = header.to_vec();
        self.modify(move |sheets| {
            find_sheet_mut(sheets, &name)?.set_row(0, &header);
            Ok(())
        })
        .await
    }

    async fn update_row(&self, name: &str, row_number: usize, values: &[String]) -> Result<()> {
        let name = name.to_string();
        let values = values.to_vec();
        self.modify(move |sheets| {
            let sheet = find_sheet_mut(sheets, &name)?;
            let index = index_for_row_number(row_number)
                .with_context(|| format!("Row {} is not a data row", row_number))?;
            if index >= sheet.data_row_count() {
                bail!("Row {} does not exist in sheet {}", row_number, name);
            }
            sheet.set_row(index + 1, &values);
            Ok(())
        })
        .await
    }

    async fn append_row(&self, name: &str, values: &[String]) -> Result<usize> {
        let name = name.to_string();
        let values = values.to_vec();
        self.modify(move |sheets| {
            let sheet = find_sheet_mut(sheets, &name)?;
            let index = sheet.data_row_count();
            sheet.set_row(index + 1, &values);
            Ok(row_number_for_index(index))
        })
        .await
    }
}

fn find_sheet_mut<'a>(sheets: &'a mut Sheets, name: &str) -> Result<&'a mut StoredSheet> {
    sheets
        .iter_mut()
        .find(|sheet| sheet.name == name)
        .with_context(|| format!("Sheet not found: {}", name))
}

/// Read every sheet of a workbook. A missing file is an empty workbook.
fn load_workbook(path: &Path) -> Result<Sheets> {
    if !path.exists() {
        log::debug!("Workbook {} does not exist yet", path.display());
        return Ok(Vec::new());
    }

    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet: {}", name))?;

        // The used range may not start at A1
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut stored = vec![Cell::Empty; col_offset];
            stored.extend(row.iter().map(Cell::from));
            cells.push(stored);
        }

        let formulas = workbook
            .worksheet_formula(&name)
            .with_context(|| format!("Failed to read formulas of sheet: {}", name))?;
        if let Some((first_row, first_col)) = formulas.start() {
            for (r, c, formula) in formulas.used_cells() {
                let row = first_row as usize + r;
                let col = first_col as usize + c;
                if cells.len() <= row {
                    cells.resize(row + 1, Vec::new());
                }
                if cells[row].len() <= col {
                    cells[row].resize(col + 1, Cell::Empty);
                }
                let result = cells[row][col].text();
                cells[row][col] = Cell::Formula {
                    formula: formula.clone(),
                    result,
                };
            }
        }

        sheets.push(StoredSheet { name, cells });
    }

    Ok(sheets)
}

/// Write text-only sheets to a workbook file, replacing it atomically
pub fn save_workbook(path: &Path, sheets: &[(String, SheetData)]) -> Result<()> {
    let stored: Vec<StoredSheet> = sheets
        .iter()
        .map(|(name, data)| StoredSheet::from_data(name, data))
        .collect();
    write_workbook(path, &stored)
}

fn write_workbook(path: &Path, sheets: &[StoredSheet]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let mut widths: Vec<usize> = Vec::new();
        for (row, cells) in sheet.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if *cell == Cell::Empty {
                    continue;
                }
                write_cell(worksheet, row as u32, col as u16, cell, row == 0).with_context(|| {
                    format!("Failed to write cell ({}, {}) of sheet {}", row + 1, col + 1, sheet.name)
                })?;
                if col >= widths.len() {
                    widths.resize(col + 1, 0);
                }
                widths[col] = widths[col].max(cell.text().width());
            }
        }

        for (col, width) in widths.iter().enumerate() {
            let width = (*width + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            worksheet.set_column_width(col as u16, width as f64)?;
        }

        // Keep the header visible while scrolling
        worksheet.set_freeze_panes(1, 0)?;
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    workbook
        .save(&tmp_path)
        .with_context(|| format!("Failed to save workbook: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace workbook: {}", path.display()))?;

    log::debug!("Saved workbook {} ({} sheets)", path.display(), sheets.len());
    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell, header: bool) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(value) if header => {
            worksheet.write_string_with_format(row, col, value, &Format::new().set_bold())?;
        }
        Cell::Text(value) => {
            worksheet.write_string(row, col, value)?;
        }
        Cell::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        Cell::Bool(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        Cell::Date(serial) => {
            let pattern = if serial.fract() == 0.0 { DATE_FORMAT } else { DATETIME_FORMAT };
            worksheet.write_number_with_format(row, col, *serial, &Format::new().set_num_format(pattern))?;
        }
        Cell::Formula { formula, result } => {
            worksheet.write_formula(row, col, Formula::new(formula).set_result(result.as_str()))?;
        }
    }
    Ok(())
}

/// Convert a spreadsheet serial date (days since 1899-12-30) into a date-time
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        vec!["ID".to_string(), "品名".to_string(), "利用者".to_string()]
    }

    #[test]
    fn test_serial_to_datetime() {
        let dt = serial_to_datetime(45383.0).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());

        let dt = serial_to_datetime(45383.5).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");

        assert!(serial_to_datetime(-1.0).is_none());
        assert!(serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_cell_text_renders_values_like_a_spreadsheet() {
        assert_eq!(Cell::from(&Data::Float(12.0)).text(), "12");
        assert_eq!(Cell::from(&Data::Float(1.5)).text(), "1.5");
        assert_eq!(Cell::from(&Data::Int(7)).text(), "7");
        assert_eq!(Cell::from(&Data::Empty).text(), "");
        assert_eq!(Cell::Date(45383.0).text(), "2024-04-01");
        assert_eq!(Cell::Date(45383.5).text(), "2024-04-01 12:00:00");
    }

    #[test]
    fn test_set_row_keeps_cells_whose_text_is_unchanged() {
        let mut sheet = StoredSheet {
            name: "PC".to_string(),
            cells: vec![
                vec![Cell::Text("ID".into()), Cell::Text("購入日".into()), Cell::Text("台数".into())],
                vec![Cell::Text("P-1".into()), Cell::Date(45383.0), Cell::Number(2.0)],
            ],
        };

        sheet.set_row(1, &["P-1".into(), "2024-04-01".into(), "3".into()]);

        assert_eq!(sheet.cells[1][1], Cell::Date(45383.0));
        assert_eq!(sheet.cells[1][2], Cell::Text("3".into()));
        assert_eq!(sheet.data().rows[0], vec!["P-1", "2024-04-01", "3"]);
    }

    #[tokio::test]
    async fn test_missing_workbook_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = XlsxStore::new(dir.path().join("nothing.xlsx"));

        assert!(store.sheet_names().await.unwrap().is_empty());
        assert!(store.read_sheet("PC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rows_survive_a_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("inventory.xlsx");
        let store = XlsxStore::new(&path);

        store.create_sheet("PC", &header()).await.unwrap();
        store.create_sheet("訪問車", &header()).await.unwrap();

        let row = store
            .append_row("PC", &["001".into(), "ThinkPad".into(), "山田".into()])
            .await
            .unwrap();
        assert_eq!(row, 2);
        store
            .append_row("PC", &["002".into(), "MacBook".into(), String::new()])
            .await
            .unwrap();
        store
            .update_row("PC", 2, &["001".into(), "ThinkPad X1".into(), "鈴木".into()])
            .await
            .unwrap();
        assert!(store.update_row("PC", 9, &["009".into()]).await.is_err());

        assert!(path.exists());
        assert!(!path.with_extension("xlsx.tmp").exists());

        // A fresh store reads what the first one wrote
        let reopened = XlsxStore::new(&path);
        assert_eq!(
            reopened.sheet_names().await.unwrap(),
            vec!["PC".to_string(), "訪問車".to_string()]
        );

        let sheet = reopened.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.header, header());
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["001", "ThinkPad X1", "鈴木"]);
        // Trailing empty cells are dropped on read
        assert_eq!(sheet.rows[1], vec!["002", "MacBook"]);
        assert_eq!(sheet.find_row("ID", "002"), Some(3));

        let empty = reopened.read_sheet("訪問車").await.unwrap().unwrap();
        assert_eq!(empty.header, header());
        assert!(empty.rows.is_empty());
    }

    #[tokio::test]
    async fn test_header_can_be_extended() {
        let dir = tempfile::tempdir().unwrap();
        let store = XlsxStore::new(dir.path().join("inventory.xlsx"));
        store.create_sheet("PC", &header()).await.unwrap();

        let mut extended = header();
        extended.push("シリアル番号".to_string());
        store.set_header("PC", &extended).await.unwrap();

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.header, extended);
        assert!(store.set_header("iPad", &extended).await.is_err());
    }

    #[tokio::test]
    async fn test_writes_keep_numbers_dates_and_formulas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.xlsx");

        // A workbook edited by hand: typed cells and a formula on a summary sheet
        let mut workbook = Workbook::new();
        let date = Format::new().set_num_format(DATE_FORMAT);
        let pc = workbook.add_worksheet();
        pc.set_name("PC").unwrap();
        pc.write_string(0, 0, "ID").unwrap();
        pc.write_string(0, 1, "品名").unwrap();
        pc.write_string(0, 2, "購入日").unwrap();
        pc.write_string(1, 0, "P-1").unwrap();
        pc.write_string(1, 1, "ThinkPad").unwrap();
        pc.write_number_with_format(1, 2, 45383.0, &date).unwrap();
        let summary = workbook.add_worksheet();
        summary.set_name("集計").unwrap();
        summary.write_number(0, 0, 3.0).unwrap();
        summary.write_formula(0, 1, "=A1*2").unwrap();
        workbook.save(&path).unwrap();

        let store = XlsxStore::new(&path);
        store
            .update_row("PC", 2, &["P-1".into(), "ThinkPad X1".into(), "2024-04-01".into()])
            .await
            .unwrap();
        store
            .append_row("PC", &["P-2".into(), "MacBook".into(), "2025-01-10".into()])
            .await
            .unwrap();

        let mut reopened: Xlsx<_> = open_workbook(&path).unwrap();
        let values = reopened.worksheet_range("集計").unwrap();
        assert_eq!(values.get_value((0, 0)), Some(&Data::Float(3.0)));
        let formulas = reopened.worksheet_formula("集計").unwrap();
        assert_eq!(formulas.get_value((0, 1)).map(String::as_str), Some("A1*2"));

        let pc = reopened.worksheet_range("PC").unwrap();
        assert!(matches!(pc.get_value((1, 2)), Some(Data::DateTime(_))));
        assert_eq!(pc.get_value((1, 1)), Some(&Data::String("ThinkPad X1".to_string())));
        // New text is written as text
        assert_eq!(pc.get_value((2, 2)), Some(&Data::String("2025-01-10".to_string())));

        let sheet = store.read_sheet("PC").await.unwrap().unwrap();
        assert_eq!(sheet.rows[0], vec!["P-1", "ThinkPad X1", "2024-04-01"]);
    }
}
