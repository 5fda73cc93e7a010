mod cli;
mod config;
mod inventory;
mod sheets;

use anyhow::Result;
use clap::Parser;
use colored::*;
use is_terminal::IsTerminal;

use cli::commands::{alerts, item, list, workbook};
use cli::context::AppContext;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "warn,inventory_cli=info",
        _ => "info,inventory_cli=debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { command } = &cli.command {
        return workbook::handler::handle_config_command(&cli, command);
    }

    let ctx = AppContext::load(&cli).await?;

    match cli.command {
        Commands::List(args) => list::handler::handle_list_command(&ctx, args).await,
        Commands::Show(args) => item::handler::handle_show_command(&ctx, args).await,
        Commands::Upsert(args) => item::handler::handle_upsert_command(&ctx, args).await,
        Commands::Edit(args) => item::handler::handle_edit_command(&ctx, args).await,
        Commands::Alerts(args) => alerts::handler::handle_alerts_command(&ctx, args).await,
        Commands::Refresh => workbook::handler::handle_refresh_command(&ctx).await,
        Commands::Init => workbook::handler::handle_init_command(&ctx).await,
        Commands::Config { .. } => Ok(()),
    }
}
