//! `list` command: browse, search and export equipment

pub mod handler;

use std::path::PathBuf;

use clap::Args;

use crate::cli::output::OutputFormat;
use crate::inventory::Category;

#[derive(Args, Debug)]
pub struct ListCommands {
    /// Only this category (PC, 訪問車, iPad, 携帯電話, その他 or pc/vehicle/tablet/phone/other)
    #[arg(short, long)]
    pub category: Option<Category>,

    /// Case-insensitive text to look for in any field
    #[arg(short, long)]
    pub search: Option<String>,

    /// Treat --search as a regular expression
    #[arg(long, requires = "search")]
    pub regex: bool,

    /// Page to show, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Show every matching row instead of one page
    #[arg(long)]
    pub all: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Also write all matching rows to a .csv, .json or .xlsx file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read the workbook even if a cached read is still fresh
    #[arg(long)]
    pub refresh: bool,
}
