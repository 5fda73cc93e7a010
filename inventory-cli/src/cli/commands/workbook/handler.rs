//! Workbook maintenance handlers

use anyhow::Result;
use colored::*;

use super::ConfigCommands;
use crate::cli::Cli;
use crate::cli::context::{AppContext, load_config};
use crate::config::Config;

pub async fn handle_refresh_command(ctx: &AppContext) -> Result<()> {
    let removed = ctx.service.refresh().await?;
    println!(
        "Cleared {} cached sheet read{}; the next listing reads {}",
        removed,
        if removed == 1 { "" } else { "s" },
        ctx.workbook.display().to_string().cyan()
    );
    Ok(())
}

pub async fn handle_init_command(ctx: &AppContext) -> Result<()> {
    let created = ctx.service.init_sheets().await?;

    if created.is_empty() {
        println!("All category sheets already exist in {}", ctx.workbook.display());
        return Ok(());
    }

    for category in &created {
        println!(
            "{} sheet '{}'",
            "Created".bright_green().bold(),
            ctx.service.sheet_map().sheet_name(*category)
        );
    }
    println!("Workbook: {}", ctx.workbook.display().to_string().cyan());
    Ok(())
}

/// Config commands run without opening the workbook
pub fn handle_config_command(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            let path = Config::resolve_path(cli.config.as_deref())?;
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("{}", "(file does not exist, defaults are in use)".dimmed());
            }
        }
        ConfigCommands::Show => {
            let config = load_config(cli)?;
            print!("{}", config.to_toml()?);
            println!("# workbook: {}", config.workbook_path()?.display());
            println!("# cache: {}", config.cache_path()?.display());
        }
    }
    Ok(())
}
