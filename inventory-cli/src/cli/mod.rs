//! Command line interface

pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::alerts::AlertsCommands;
use commands::item::{EditCommands, ShowCommands, UpsertCommands};
use commands::list::ListCommands;
use commands::workbook::ConfigCommands;

#[derive(Parser)]
#[command(name = "inventory-cli")]
#[command(about = "Track company equipment (PCs, vehicles, tablets, phones) in a spreadsheet workbook")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "INVENTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workbook file, overriding the config
    #[arg(long, global = true, env = "INVENTORY_WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List and search equipment
    List(ListCommands),
    /// Show one record by ID
    Show(ShowCommands),
    /// Add a record, or overwrite the record with the same ID
    Upsert(UpsertCommands),
    /// Add or edit a record with an interactive form
    Edit(EditCommands),
    /// Show leases, inspections, insurance and contracts that expire soon
    Alerts(AlertsCommands),
    /// Drop cached sheet reads so the next listing reads the workbook
    Refresh,
    /// Create missing category sheets in the workbook
    Init,
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}
