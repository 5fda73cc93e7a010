//! Single-record command handlers

use anyhow::{Result, bail};
use colored::*;
use dialoguer::theme::ColorfulTheme;
use is_terminal::IsTerminal;

use super::{EditCommands, ShowCommands, UpsertCommands, form};
use crate::cli::context::AppContext;
use crate::cli::output::{self, OutputFormat};
use crate::inventory::category::columns;
use crate::inventory::{Category, Item, ItemDraft, UpsertOptions, UpsertOutcome, display_columns};

pub async fn handle_show_command(ctx: &AppContext, args: ShowCommands) -> Result<()> {
    let Some(item) = ctx.service.find(args.category, &args.id).await? else {
        bail!("指定されたIDは見つかりませんでした (no {} record with ID '{}')", args.category, args.id);
    };

    match args.format {
        OutputFormat::Json => println!("{}", output::to_json(&item)?),
        OutputFormat::Csv => {
            let columns = display_columns(Some(item.category), &[&item]);
            output::write_csv(std::io::stdout().lock(), &columns, &output::item_rows(&columns, &[&item]))?;
        }
        OutputFormat::Table => print_record(&item),
    }

    Ok(())
}

pub async fn handle_upsert_command(ctx: &AppContext, args: UpsertCommands) -> Result<()> {
    let draft = args
        .fields
        .into_iter()
        .fold(
            ItemDraft::new(args.id, args.name)
                .with_holder(args.holder)
                .with_status(args.status),
            |draft, (column, value)| draft.with_field(column, value),
        );

    let options = UpsertOptions { merge: args.merge };

    if args.dry_run {
        let preview = ctx.service.detached().await?;
        let outcome = preview.upsert(args.category, &draft, ctx.today()?, options).await?;
        let verb = match outcome {
            UpsertOutcome::Created { .. } => "append",
            UpsertOutcome::Updated { .. } => "overwrite",
        };
        println!(
            "{} would {} row {}:",
            "Dry run:".yellow().bold(),
            verb,
            outcome.row()
        );
        if let Some(item) = preview.find(args.category, &draft.id).await? {
            print_record(&item);
        }
        return Ok(());
    }

    let outcome = ctx
        .service
        .upsert(args.category, &draft, ctx.today()?, options)
        .await?;

    report_outcome(args.category, &draft.id, outcome);
    Ok(())
}

pub async fn handle_edit_command(ctx: &AppContext, args: EditCommands) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        bail!("The edit form needs an interactive terminal; use `inventory-cli upsert` instead");
    }

    let theme = ColorfulTheme::default();
    let id = match args.id {
        Some(id) => id.trim().to_string(),
        None => form::prompt_id(&theme)?,
    };

    let existing = ctx.service.find(args.category, &id).await?;
    match &existing {
        Some(item) => println!(
            "Editing {} {} (row {})",
            args.category,
            id.bold(),
            item.row_number
        ),
        None => println!("New {} record {}", args.category, id.bold()),
    }
    if let Some(item) = existing.as_ref().filter(|item| item.has_unknown_status()) {
        eprintln!(
            "{} status '{}' is not a known status; choose one below",
            "Warning:".yellow().bold(),
            item.status
        );
    }

    let draft = form::prompt_draft(&theme, args.category, &id, existing.as_ref())?;
    // Surface validation errors before asking to save
    draft.validate(args.category)?;

    if !form::confirm(&theme, "Save to the workbook?")? {
        println!("{}", "Cancelled, nothing was written.".dimmed());
        return Ok(());
    }

    let outcome = ctx
        .service
        .upsert(args.category, &draft, ctx.today()?, UpsertOptions::default())
        .await?;

    report_outcome(args.category, &id, outcome);
    Ok(())
}

fn report_outcome(category: Category, id: &str, outcome: UpsertOutcome) {
    let verb = match outcome {
        UpsertOutcome::Created { .. } => "Added",
        UpsertOutcome::Updated { .. } => "Updated",
    };
    println!(
        "{} {} {} (row {})",
        verb.bright_green().bold(),
        category,
        id,
        outcome.row()
    );
}

/// Print a record as aligned `column  value` lines
fn print_record(item: &Item) {
    let names = display_columns(Some(item.category), &[item]);
    let width = names.iter().map(|n| unicode_width::UnicodeWidthStr::width(n.as_str())).max().unwrap_or(0);

    for name in &names {
        let value = item.field(name);
        let label = output::pad(name, width).bold().to_string();
        let value = if name == columns::STATUS {
            output::style_status(value, output::status_label(value))
        } else if value.is_empty() {
            "-".dimmed().to_string()
        } else {
            value.to_string()
        };
        println!("{}  {}", label, value);
    }
}
