//! Alerts command handler

use anyhow::{Result, bail};
use colored::*;

use super::AlertsCommands;
use crate::cli::context::AppContext;
use crate::cli::output::{self, OutputFormat};
use crate::inventory::dates::format_date;
use crate::inventory::{AlertLevel, ExpiryAlert, compute_alerts};

const COLUMNS: [&str; 7] = ["状態", "残り日数", "期限", "カテゴリ", "ID", "品名", "項目"];

pub async fn handle_alerts_command(ctx: &AppContext, args: AlertsCommands) -> Result<()> {
    let config = match args.within {
        Some(days) if days < 0 => bail!("--within must not be negative"),
        Some(days) => ctx.config.alerts.with_window(days),
        None => ctx.config.alerts.clone(),
    };

    let report = ctx.service.load_all(args.refresh).await?;
    for (category, error) in &report.failed_sheets {
        eprintln!("{} {} could not be read: {}", "Warning:".yellow().bold(), category, error);
    }

    let today = ctx.today()?;
    let alerts: Vec<ExpiryAlert> = compute_alerts(&report.items, today, &config)
        .into_iter()
        .filter(|a| args.category.map(|c| a.category == c).unwrap_or(true))
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", output::to_json(&alerts)?),
        OutputFormat::Csv => {
            let columns: Vec<String> = COLUMNS.iter().map(|s| s.to_string()).collect();
            let rows: Vec<Vec<String>> = alerts.iter().map(alert_row).collect();
            output::write_csv(std::io::stdout().lock(), &columns, &rows)?;
        }
        OutputFormat::Table => {
            if alerts.is_empty() {
                println!(
                    "No expiries within {} days (as of {}).",
                    config.notice_days,
                    format_date(today)
                );
                return Ok(());
            }

            let columns: Vec<String> = COLUMNS.iter().map(|s| s.to_string()).collect();
            let rows: Vec<Vec<String>> = alerts.iter().map(alert_row).collect();
            let table = output::render_table(&columns, &rows, |column, value, padded| {
                if column == COLUMNS[0] {
                    match level_from_label(value) {
                        Some(level) => output::style_alert_level(level, padded),
                        None => padded,
                    }
                } else {
                    padded
                }
            });
            print!("{}", table);

            let expired = alerts.iter().filter(|a| a.level == AlertLevel::Expired).count();
            let due = alerts.iter().filter(|a| a.level == AlertLevel::Due).count();
            println!(
                "{}",
                format!("{} alerts: {} expired, {} due within {} days", alerts.len(), expired, due, config.warning_days)
                    .dimmed()
            );
        }
    }

    Ok(())
}

fn alert_row(alert: &ExpiryAlert) -> Vec<String> {
    let expiry = match (alert.expiry, alert.derived) {
        (Some(date), true) => format!("{} (推定)", format_date(date)),
        (Some(date), false) => format_date(date),
        (None, _) => alert.raw_value.clone(),
    };

    vec![
        alert.level.to_string(),
        alert.days_left.map(|d| d.to_string()).unwrap_or_default(),
        expiry,
        alert.category.to_string(),
        alert.id.clone(),
        alert.name.clone(),
        alert.column.clone(),
    ]
}

fn level_from_label(label: &str) -> Option<AlertLevel> {
    [
        AlertLevel::Unreadable,
        AlertLevel::Expired,
        AlertLevel::Due,
        AlertLevel::Upcoming,
    ]
    .into_iter()
    .find(|level| level.to_string() == label)
}
