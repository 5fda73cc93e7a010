//! Row-oriented sheet storage
//!
//! A workbook is a set of named sheets. Each sheet has a header in row 1 and
//! data rows below it. Row numbers are 1-based like in any spreadsheet, so the
//! first data row is row 2.

pub mod memory;
pub mod xlsx;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use xlsx::XlsxStore;

/// Row number of the header row
pub const HEADER_ROW: usize = 1;

/// Full contents of one sheet, cells rendered as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetData {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Index of a header column by exact (trimmed) name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    /// Linear search of one column for an exact match, returning the sheet row number.
    ///
    /// Only the named column is searched; a key that happens to appear in
    /// another column never matches.
    pub fn find_row(&self, column: &str, key: &str) -> Option<usize> {
        let col = self.column_index(column)?;
        let key = key.trim();
        self.rows
            .iter()
            .position(|row| row.get(col).map(|c| c.trim() == key).unwrap_or(false))
            .map(row_number_for_index)
    }

    /// Data row at a 1-based sheet row number
    pub fn row_at(&self, row_number: usize) -> Option<&Vec<String>> {
        index_for_row_number(row_number).and_then(|i| self.rows.get(i))
    }
}

/// Convert a data row index (0-based) into a sheet row number
pub fn row_number_for_index(index: usize) -> usize {
    index + HEADER_ROW + 1
}

/// Convert a sheet row number into a data row index; `None` for the header or row 0
pub fn index_for_row_number(row_number: usize) -> Option<usize> {
    row_number.checked_sub(HEADER_ROW + 1)
}

/// A row-oriented record store organised as named sheets
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Names of all sheets, in workbook order
    async fn sheet_names(&self) -> Result<Vec<String>>;

    /// Read a whole sheet. `Ok(None)` when the sheet does not exist.
    async fn read_sheet(&self, name: &str) -> Result<Option<SheetData>>;

    /// Create an empty sheet with the given header. Fails if it already exists.
    async fn create_sheet(&self, name: &str, header: &[String]) -> Result<()>;

    /// Replace the header row of an existing sheet
    async fn set_header(&self, name: &str, header: &[String]) -> Result<()>;

    /// Overwrite a data row in place
    async fn update_row(&self, name: &str, row_number: usize, values: &[String]) -> Result<()>;

    /// Append a data row after the last one, returning its row number
    async fn append_row(&self, name: &str, values: &[String]) -> Result<usize>;
}
