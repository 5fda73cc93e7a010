//! `show`, `upsert` and `edit`: work with a single record

pub mod form;
pub mod handler;

use clap::Args;

use crate::cli::output::OutputFormat;
use crate::inventory::{Category, Status};

#[derive(Args, Debug)]
pub struct ShowCommands {
    pub category: Category,

    pub id: String,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct UpsertCommands {
    pub category: Category,

    /// Record ID; an existing record with this ID is overwritten
    #[arg(long)]
    pub id: String,

    /// 品名
    #[arg(long)]
    pub name: String,

    /// 利用者
    #[arg(long, default_value = "")]
    pub holder: String,

    /// ステータス (利用可能, 貸出中, 故障/修理中, 廃棄)
    #[arg(long, default_value = "利用可能")]
    pub status: Status,

    /// Category column as COLUMN=VALUE, repeatable (e.g. 車検期限=2026-03-31)
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Keep existing values of columns not given with --field
    #[arg(long)]
    pub merge: bool,

    /// Show what would be written without saving the workbook
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct EditCommands {
    pub category: Category,

    /// Record to edit; prompted for when omitted
    pub id: Option<String>,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{}'", s))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{}'", s));
    }
    Ok((column.to_string(), value.to_string()))
}
