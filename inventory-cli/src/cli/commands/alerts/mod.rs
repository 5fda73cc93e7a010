//! `alerts` command: upcoming and overdue expiries

pub mod handler;

use clap::Args;

use crate::cli::output::OutputFormat;
use crate::inventory::Category;

#[derive(Args, Debug)]
pub struct AlertsCommands {
    /// Only this category
    #[arg(short, long)]
    pub category: Option<Category>,

    /// Report expiries up to this many days ahead (defaults to alerts.notice_days)
    #[arg(short, long)]
    pub within: Option<i64>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Read the workbook even if a cached read is still fresh
    #[arg(long)]
    pub refresh: bool,
}
