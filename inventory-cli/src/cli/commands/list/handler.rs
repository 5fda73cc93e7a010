//! List command handler

use anyhow::Result;
use colored::*;

use super::ListCommands;
use crate::cli::context::AppContext;
use crate::cli::output::{self, OutputFormat};
use crate::inventory::{Item, SearchQuery, display_columns, filter_items, paginate};

pub async fn handle_list_command(ctx: &AppContext, args: ListCommands) -> Result<()> {
    let query = match &args.search {
        Some(text) if args.regex => Some(SearchQuery::regex(text)?),
        Some(text) => Some(SearchQuery::text(text)),
        None => None,
    };

    let (items, sheets_missing) = match args.category {
        Some(category) => match ctx.service.load_category(category, args.refresh).await? {
            Some(items) => (items, false),
            None => (Vec::new(), true),
        },
        None => {
            let report = ctx.service.load_all(args.refresh).await?;
            for (category, error) in &report.failed_sheets {
                eprintln!("{} {} could not be read: {}", "Warning:".yellow().bold(), category, error);
            }
            (report.items, !report.missing_sheets.is_empty())
        }
    };

    let matched = filter_items(&items, args.category, query.as_ref());
    let columns = display_columns(args.category, &matched);

    if let Some(path) = &args.output {
        output::export_items(path, &columns, &matched)?;
        eprintln!(
            "Exported {} rows to {}",
            matched.len(),
            path.display().to_string().bright_green()
        );
    }

    let page_size = args.page_size.unwrap_or(ctx.config.page_size);
    let (shown, footer): (&[&Item], Option<String>) = if args.all {
        (matched.as_slice(), None)
    } else {
        let page = paginate(&matched, args.page, page_size);
        let footer = format!(
            "Page {}/{} ({} items)",
            page.page, page.total_pages, page.total_items
        );
        (page.items, Some(footer))
    };

    match args.format {
        OutputFormat::Json => println!("{}", output::to_json(shown)?),
        OutputFormat::Csv => {
            output::write_csv(std::io::stdout().lock(), &columns, &output::item_rows(&columns, shown))?
        }
        OutputFormat::Table => {
            if matched.is_empty() {
                if items.is_empty() && sheets_missing {
                    println!("No records yet. Run `inventory-cli init` to create the category sheets.");
                } else {
                    println!("No matching records.");
                }
                return Ok(());
            }

            let rows = output::item_rows(&columns, shown);
            let table = output::render_table(&columns, &rows, |column, value, padded| {
                if column == crate::inventory::category::columns::STATUS {
                    output::style_status(value, padded)
                } else {
                    padded
                }
            });
            print!("{}", table);
            if let Some(footer) = footer {
                println!("{}", footer.dimmed());
            }
        }
    }

    Ok(())
}
