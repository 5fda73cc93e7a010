//! Asset categories and their fixed column schema
//!
//! Every category lives on its own sheet. All sheets share the base columns;
//! each category adds its own tail of detail columns.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize};

/// Column names as they appear in the sheet header
pub mod columns {
    pub const ID: &str = "ID";
    pub const CATEGORY: &str = "カテゴリ";
    pub const NAME: &str = "品名";
    pub const HOLDER: &str = "利用者";
    pub const STATUS: &str = "ステータス";
    pub const UPDATED: &str = "更新日";

    pub const PURCHASE_DATE: &str = "購入日";
    pub const SERIAL_NUMBER: &str = "シリアル番号";
    pub const OS_DETAIL: &str = "OS・詳細";
    pub const LEASE_EXPIRY: &str = "リース期限";
    pub const PLATE_NUMBER: &str = "車両番号";
    pub const INSPECTION_EXPIRY: &str = "車検期限";
    pub const INSURANCE_EXPIRY: &str = "保険期限";
    pub const PHONE_NUMBER: &str = "電話番号";
    pub const CARRIER: &str = "キャリア";
    pub const CONTRACT_DETAIL: &str = "契約詳細";
    pub const CONTRACT_EXPIRY: &str = "契約期限";
    pub const NOTES: &str = "備考";
}

/// Columns shared by every category, in sheet order
pub const BASE_COLUMNS: [&str; 6] = [
    columns::ID,
    columns::CATEGORY,
    columns::NAME,
    columns::HOLDER,
    columns::STATUS,
    columns::UPDATED,
];

/// How a tail column is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// A plain date, normalised to YYYY-MM-DD on write
    Date,
    /// A date that raises alerts as it approaches
    Expiry,
}

impl FieldKind {
    pub fn is_date(&self) -> bool {
        matches!(self, FieldKind::Date | FieldKind::Expiry)
    }
}

/// A category-specific column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
    }
}

const fn date(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Date,
    }
}

const fn expiry(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Expiry,
    }
}

const PC_FIELDS: &[FieldSpec] = &[
    date(columns::PURCHASE_DATE),
    text(columns::SERIAL_NUMBER),
    text(columns::OS_DETAIL),
    expiry(columns::LEASE_EXPIRY),
];

const VEHICLE_FIELDS: &[FieldSpec] = &[
    text(columns::PLATE_NUMBER),
    expiry(columns::INSPECTION_EXPIRY),
    expiry(columns::INSURANCE_EXPIRY),
    expiry(columns::LEASE_EXPIRY),
];

// Tablets and phones carry the same contract details
const MOBILE_FIELDS: &[FieldSpec] = &[
    date(columns::PURCHASE_DATE),
    text(columns::SERIAL_NUMBER),
    text(columns::PHONE_NUMBER),
    text(columns::CARRIER),
    text(columns::CONTRACT_DETAIL),
    expiry(columns::CONTRACT_EXPIRY),
];

const OTHER_FIELDS: &[FieldSpec] = &[date(columns::PURCHASE_DATE), text(columns::NOTES)];

/// Asset category
///
/// Serialises as its label and deserialises through [`FromStr`], so config
/// files accept the same names as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    #[serde(rename = "PC")]
    Pc,
    #[serde(rename = "訪問車")]
    Vehicle,
    #[serde(rename = "iPad")]
    Tablet,
    #[serde(rename = "携帯電話")]
    Phone,
    #[serde(rename = "その他")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Pc,
        Category::Vehicle,
        Category::Tablet,
        Category::Phone,
        Category::Other,
    ];

    /// Label stored in the カテゴリ column, also the default sheet name
    pub fn label(&self) -> &'static str {
        match self {
            Category::Pc => "PC",
            Category::Vehicle => "訪問車",
            Category::Tablet => "iPad",
            Category::Phone => "携帯電話",
            Category::Other => "その他",
        }
    }

    /// Category-specific columns in sheet order
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Category::Pc => PC_FIELDS,
            Category::Vehicle => VEHICLE_FIELDS,
            Category::Tablet | Category::Phone => MOBILE_FIELDS,
            Category::Other => OTHER_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Full header: base columns followed by the category tail
    pub fn schema(&self) -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .copied()
            .chain(self.fields().iter().map(|f| f.name))
            .collect()
    }

    pub fn expiry_fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields().iter().filter(|f| f.kind == FieldKind::Expiry)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(category) = Category::ALL.iter().find(|c| c.label() == trimmed) {
            return Ok(*category);
        }
        match trimmed.to_lowercase().as_str() {
            "pc" => Ok(Category::Pc),
            "vehicle" | "car" => Ok(Category::Vehicle),
            "ipad" | "tablet" => Ok(Category::Tablet),
            "phone" | "mobile" => Ok(Category::Phone),
            "other" => Ok(Category::Other),
            _ => Err(anyhow!(
                "Unknown category '{}'. Expected one of: {}",
                s,
                Category::ALL
                    .iter()
                    .map(|c| c.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Which sheet holds which category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMap {
    names: HashMap<Category, String>,
}

impl Default for SheetMap {
    fn default() -> Self {
        Self {
            names: Category::ALL
                .iter()
                .map(|c| (*c, c.label().to_string()))
                .collect(),
        }
    }
}

impl SheetMap {
    /// Default map with per-category overrides keyed by category label or alias
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut map = Self::default();
        for (key, sheet) in overrides {
            let category: Category = key.parse()?;
            map.names.insert(category, sheet.clone());
        }
        Ok(map)
    }

    pub fn sheet_name(&self, category: Category) -> &str {
        self.names
            .get(&category)
            .map(|s| s.as_str())
            .unwrap_or_else(|| category.label())
    }
}
