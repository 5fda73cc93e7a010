//! Searching, filtering and paging the item list

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use super::category::{BASE_COLUMNS, Category};
use super::item::Item;

/// Free-text query over every field of an item
#[derive(Debug, Clone)]
pub enum SearchQuery {
    /// Case-insensitive substring
    Text(String),
    /// Case-insensitive regular expression
    Pattern(Regex),
}

impl SearchQuery {
    pub fn text(query: &str) -> Self {
        SearchQuery::Text(query.trim().to_lowercase())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid search pattern: {}", pattern))?;
        Ok(SearchQuery::Pattern(regex))
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            SearchQuery::Text(needle) if needle.is_empty() => true,
            SearchQuery::Text(needle) => item.values().any(|v| v.to_lowercase().contains(needle)),
            SearchQuery::Pattern(regex) => item.values().any(|v| regex.is_match(v)),
        }
    }
}

/// Items of one category (or all) that match the query, in input order
pub fn filter_items<'a>(
    items: &'a [Item],
    category: Option<Category>,
    query: Option<&SearchQuery>,
) -> Vec<&'a Item> {
    items
        .iter()
        .filter(|item| category.map(|c| item.category == c).unwrap_or(true))
        .filter(|item| query.map(|q| q.matches(item)).unwrap_or(true))
        .collect()
}

/// Columns to show for a listing.
///
/// A single category shows its own schema; the combined view shows the base
/// columns followed by every category's tail. Extra columns found on the
/// records come last, in first-seen order.
pub fn display_columns(category: Option<Category>, items: &[&Item]) -> Vec<String> {
    let mut columns: Vec<String> = match category {
        Some(c) => c.schema().iter().map(|s| s.to_string()).collect(),
        None => {
            let mut cols: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();
            for c in Category::ALL {
                for field in c.fields() {
                    if !cols.iter().any(|existing| existing == field.name) {
                        cols.push(field.name.to_string());
                    }
                }
            }
            cols
        }
    };

    for item in items {
        for extra in item.extra_columns() {
            if !columns.iter().any(|c| c == extra) {
                columns.push(extra.to_string());
            }
        }
    }

    columns
}

/// One page of a list
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number actually shown
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice a list into pages. Page 0 is treated as 1 and pages past the end
/// show the last page.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);

    Page {
        items: &items[start.min(total_items)..end],
        page,
        total_pages,
        total_items,
    }
}
