//! Terminal tables and file exports

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::*;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::inventory::{AlertLevel, Item, Status};
use crate::sheets::SheetData;
use crate::sheets::xlsx::save_workbook;

/// How results are printed to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Widest a table cell is allowed to get before it is cut
const MAX_CELL_WIDTH: usize = 32;
const COLUMN_GAP: &str = "  ";

/// Sheet name used for `.xlsx` exports
const EXPORT_SHEET: &str = "一覧";

/// Pad to a display width, counting wide (CJK) characters as two columns
pub fn pad(text: &str, width: usize) -> String {
    let current = text.width();
    if current >= width {
        return text.to_string();
    }
    format!("{}{}", text, " ".repeat(width - current))
}

/// Cut text to a display width, marking the cut with an ellipsis
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

/// Plain-text table. `style` gets the column name, the raw value and the
/// padded cell, and returns what to print.
pub fn render_table<F>(columns: &[String], rows: &[Vec<String>], style: F) -> String
where
    F: Fn(&str, &str, String) -> String,
{
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(v, MAX_CELL_WIDTH)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(col, title)| {
            cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|v| v.width())
                .chain(std::iter::once(title.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(title, w)| pad(title, *w).bold().to_string())
        .collect();
    out.push_str(header.join(COLUMN_GAP).trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    out.push_str(&rule.join(COLUMN_GAP).dimmed().to_string());
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (title, w))| {
                let value = row.get(col).map(|s| s.as_str()).unwrap_or("");
                style(title, value, pad(value, *w))
            })
            .collect();
        out.push_str(line.join(COLUMN_GAP).trim_end());
        out.push('\n');
    }

    out
}

/// Colour a padded status cell by its status
pub fn style_status(value: &str, padded: String) -> String {
    match value.parse::<Status>() {
        Ok(Status::Available) => padded.green().to_string(),
        Ok(Status::Loaned) => padded.yellow().to_string(),
        Ok(Status::Broken) => padded.red().to_string(),
        Ok(Status::Disposed) => padded.dimmed().to_string(),
        Err(_) if value.trim().is_empty() => padded,
        Err(_) => padded.magenta().to_string(),
    }
}

/// Status text, marked when it is outside the known set
pub fn status_label(value: &str) -> String {
    if !value.trim().is_empty() && value.parse::<Status>().is_err() {
        format!("{} (不明なステータス)", value)
    } else {
        value.to_string()
    }
}

pub fn style_alert_level(level: AlertLevel, padded: String) -> String {
    match level {
        AlertLevel::Unreadable => padded.magenta().to_string(),
        AlertLevel::Expired => padded.red().bold().to_string(),
        AlertLevel::Due => padded.yellow().to_string(),
        AlertLevel::Upcoming => padded.cyan().to_string(),
    }
}

/// Cell values of each item for the given columns
pub fn item_rows(columns: &[String], items: &[&Item]) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| columns.iter().map(|c| item.field(c).to_string()).collect())
        .collect()
}

/// Write a header and rows as CSV
pub fn write_csv<W: Write>(writer: W, columns: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(columns).context("Failed to write CSV header")?;
    for row in rows {
        wtr.write_record(row).context("Failed to write CSV row")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to format JSON output")
}

/// File formats accepted by `--output`, picked by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            _ => bail!(
                "Unsupported export file '{}'. Use a .csv, .json or .xlsx extension",
                path.display()
            ),
        }
    }
}

/// Export listed items to a file, format chosen by extension
pub fn export_items(path: &Path, columns: &[String], items: &[&Item]) -> Result<()> {
    let format = ExportFormat::from_path(path)?;

    match format {
        ExportFormat::Csv => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
            write_csv(file, columns, &item_rows(columns, items))?;
        }
        ExportFormat::Json => {
            std::fs::write(path, to_json(items)?)
                .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
        }
        ExportFormat::Xlsx => {
            let sheet = SheetData {
                header: columns.to_vec(),
                rows: item_rows(columns, items),
            };
            save_workbook(path, &[(EXPORT_SHEET.to_string(), sheet)])?;
        }
    }

    log::info!("Exported {} items to {}", items.len(), path.display());
    Ok(())
}
