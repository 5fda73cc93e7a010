//! Interactive record form

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::inventory::dates::normalize_date;
use crate::inventory::{Category, Item, ItemDraft, Status};

/// Ask for an ID
pub fn prompt_id(theme: &ColorfulTheme) -> Result<String> {
    let id: String = Input::with_theme(theme)
        .with_prompt("ID")
        .validate_with(|input: &String| -> Result<(), &'static str> {
            if input.trim().is_empty() {
                Err("ID is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(id.trim().to_string())
}

/// Ask for every field of a record, pre-filled from `existing`
pub fn prompt_draft(
    theme: &ColorfulTheme,
    category: Category,
    id: &str,
    existing: Option<&Item>,
) -> Result<ItemDraft> {
    let base = existing.map(|item| item.to_draft());

    let name: String = Input::with_theme(theme)
        .with_prompt("品名")
        .with_initial_text(base.as_ref().map(|d| d.name.as_str()).unwrap_or(""))
        .validate_with(|input: &String| -> Result<(), &'static str> {
            if input.trim().is_empty() {
                Err("品名 is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let holder: String = Input::with_theme(theme)
        .with_prompt("利用者")
        .with_initial_text(base.as_ref().map(|d| d.holder.as_str()).unwrap_or(""))
        .allow_empty(true)
        .interact_text()?;

    let current_status = base.as_ref().map(|d| d.status).unwrap_or_default();
    let labels: Vec<&str> = Status::ALL.iter().map(|s| s.label()).collect();
    let selected = Select::with_theme(theme)
        .with_prompt("ステータス")
        .items(&labels)
        .default(Status::ALL.iter().position(|s| *s == current_status).unwrap_or(0))
        .interact()?;

    let mut draft = ItemDraft::new(id, name)
        .with_holder(holder)
        .with_status(Status::ALL[selected]);

    for spec in category.fields() {
        let initial = base
            .as_ref()
            .and_then(|d| d.fields.get(spec.name))
            .map(|s| s.as_str())
            .unwrap_or("");

        let prompt = if spec.kind.is_date() {
            format!("{} (YYYY-MM-DD)", spec.name)
        } else {
            spec.name.to_string()
        };

        let is_date = spec.kind.is_date();
        let value: String = Input::with_theme(theme)
            .with_prompt(prompt)
            .with_initial_text(initial)
            .allow_empty(true)
            .validate_with(move |input: &String| -> Result<(), &'static str> {
                let input = input.trim();
                if is_date && !input.is_empty() && normalize_date(input).is_none() {
                    Err("Not a date")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        draft = draft.with_field(spec.name, value);
    }

    Ok(draft)
}

pub fn confirm(theme: &ColorfulTheme, prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(true)
        .interact()?)
}
