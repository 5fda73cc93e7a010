//! Inventory records and the drafts used to write them

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::Serialize;

use super::category::{BASE_COLUMNS, Category, columns};
use super::dates::normalize_date;

/// Lifecycle status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Status {
    #[default]
    #[serde(rename = "利用可能")]
    Available,
    #[serde(rename = "貸出中")]
    Loaned,
    #[serde(rename = "故障/修理中")]
    Broken,
    #[serde(rename = "廃棄")]
    Disposed,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Available,
        Status::Loaned,
        Status::Broken,
        Status::Disposed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Status::Available => "利用可能",
            Status::Loaned => "貸出中",
            Status::Broken => "故障/修理中",
            Status::Disposed => "廃棄",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(status) = Status::ALL.iter().find(|st| st.label() == trimmed) {
            return Ok(*status);
        }
        match trimmed.to_lowercase().as_str() {
            "available" => Ok(Status::Available),
            "loaned" | "on-loan" => Ok(Status::Loaned),
            "broken" | "repair" => Ok(Status::Broken),
            "disposed" => Ok(Status::Disposed),
            _ => Err(anyhow!(
                "Unknown status '{}'. Expected one of: {}",
                s,
                Status::ALL
                    .iter()
                    .map(|st| st.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// One asset as read from its category sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "カテゴリ")]
    pub category: Category,
    #[serde(rename = "品名")]
    pub name: String,
    #[serde(rename = "利用者")]
    pub holder: String,
    /// Raw status text; may be something outside the known set
    #[serde(rename = "ステータス")]
    pub status: String,
    #[serde(rename = "更新日")]
    pub updated: String,
    /// Category columns and any extra columns found on the sheet, by header name
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    #[serde(skip)]
    pub row_number: usize,
}

impl Item {
    /// Build an item from a sheet row, mapping cells by header name.
    ///
    /// Returns `None` for a blank row. The category always comes from the
    /// sheet, never from the カテゴリ cell.
    pub fn from_row(
        category: Category,
        header: &[String],
        row: &[String],
        row_number: usize,
    ) -> Option<Item> {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            return None;
        }

        let mut item = Item {
            id: String::new(),
            category,
            name: String::new(),
            holder: String::new(),
            status: String::new(),
            updated: String::new(),
            fields: BTreeMap::new(),
            row_number,
        };

        for (col, title) in header.iter().enumerate() {
            let title = title.trim();
            if title.is_empty() {
                continue;
            }
            let value = row.get(col).map(|c| c.trim()).unwrap_or("").to_string();
            match title {
                columns::ID => item.id = value,
                columns::CATEGORY => {}
                columns::NAME => item.name = value,
                columns::HOLDER => item.holder = value,
                columns::STATUS => item.status = value,
                columns::UPDATED => item.updated = value,
                other => {
                    if !value.is_empty() {
                        item.fields.insert(other.to_string(), value);
                    }
                }
            }
        }

        Some(item)
    }

    /// Parsed status, `None` when the sheet holds text outside the known set
    pub fn status(&self) -> Option<Status> {
        self.status.parse().ok()
    }

    /// Status cell holds text outside the known set. A blank cell is not unknown.
    pub fn has_unknown_status(&self) -> bool {
        !self.status.trim().is_empty() && self.status().is_none()
    }

    /// Value of any column, base or tail; empty when absent
    pub fn field(&self, column: &str) -> &str {
        match column {
            columns::ID => &self.id,
            columns::CATEGORY => self.category.label(),
            columns::NAME => &self.name,
            columns::HOLDER => &self.holder,
            columns::STATUS => &self.status,
            columns::UPDATED => &self.updated,
            other => self.fields.get(other).map(|s| s.as_str()).unwrap_or(""),
        }
    }

    /// Every cell value, for free-text search
    pub fn values(&self) -> impl Iterator<Item = &str> {
        [
            self.id.as_str(),
            self.category.label(),
            self.name.as_str(),
            self.holder.as_str(),
            self.status.as_str(),
            self.updated.as_str(),
        ]
        .into_iter()
        .chain(self.fields.values().map(|s| s.as_str()))
    }

    /// Columns on this record that are not part of its category schema
    pub fn extra_columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(|k| k.as_str())
            .filter(|k| self.category.field(k).is_none())
    }

    /// Draft pre-filled with this record, for editing
    pub fn to_draft(&self) -> ItemDraft {
        let fields = self
            .category
            .fields()
            .iter()
            .filter_map(|f| {
                self.fields
                    .get(f.name)
                    .map(|v| (f.name.to_string(), v.clone()))
            })
            .collect();

        ItemDraft {
            id: self.id.clone(),
            name: self.name.clone(),
            holder: self.holder.clone(),
            status: self.status().unwrap_or_default(),
            fields,
        }
    }
}

/// Values to write for one asset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemDraft {
    pub id: String,
    pub name: String,
    pub holder: String,
    pub status: Status,
    /// Category columns by header name. Absent keys are "not provided".
    pub fields: BTreeMap<String, String>,
}

impl ItemDraft {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Check the draft against the category schema and return a normalised copy.
    ///
    /// ID and name are required. Tail columns must belong to the category and
    /// date columns must be readable; they are rewritten as YYYY-MM-DD.
    pub fn validate(&self, category: Category) -> Result<ItemDraft> {
        let id = self.id.trim();
        let name = self.name.trim();
        if id.is_empty() || name.is_empty() {
            bail!("IDと品名は必須です (ID and name are required)");
        }

        let mut fields = BTreeMap::new();
        for (column, value) in &self.fields {
            let spec = match category.field(column.trim()) {
                Some(spec) => spec,
                None => {
                    if BASE_COLUMNS.contains(&column.trim()) {
                        bail!("Column '{}' cannot be set as a detail field", column);
                    }
                    bail!(
                        "Unknown column '{}' for category {}. Expected one of: {}",
                        column,
                        category,
                        category
                            .fields()
                            .iter()
                            .map(|f| f.name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            };

            let value = value.trim();
            let value = if spec.kind.is_date() && !value.is_empty() {
                normalize_date(value)
                    .ok_or_else(|| anyhow!("Invalid date for {}: '{}'", spec.name, value))?
            } else {
                value.to_string()
            };
            fields.insert(spec.name.to_string(), value);
        }

        Ok(ItemDraft {
            id: id.to_string(),
            name: name.to_string(),
            holder: self.holder.trim().to_string(),
            status: self.status,
            fields,
        })
    }

    /// Cell value for every schema column of the category.
    ///
    /// Tail columns the draft does not provide are `None`.
    pub fn schema_values(&self, category: Category, updated: &str) -> Vec<(&'static str, Option<String>)> {
        let mut values = vec![
            (columns::ID, Some(self.id.clone())),
            (columns::CATEGORY, Some(category.label().to_string())),
            (columns::NAME, Some(self.name.clone())),
            (columns::HOLDER, Some(self.holder.clone())),
            (columns::STATUS, Some(self.status.label().to_string())),
            (columns::UPDATED, Some(updated.to_string())),
        ];
        for spec in category.fields() {
            values.push((spec.name, self.fields.get(spec.name).cloned()));
        }
        values
    }
}
