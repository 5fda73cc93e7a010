//! Expiry alerts for leases, inspections, insurance and contracts
//!
//! Each expiry column of a category is checked against today's date. When an
//! expiry cell is empty, a derived rule may compute it from another date
//! column plus a fixed number of years.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::category::{Category, columns};
use super::dates::{add_years, days_until, parse_date};
use super::item::{Item, Status};

/// Default threshold for "due soon"
pub const DEFAULT_WARNING_DAYS: i64 = 30;
/// Default threshold for "coming up"
pub const DEFAULT_NOTICE_DAYS: i64 = 90;

/// Severity of an alert, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// The cell holds something that is not a date
    Unreadable,
    Expired,
    Due,
    Upcoming,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Unreadable => write!(f, "日付不明"),
            AlertLevel::Expired => write!(f, "期限切れ"),
            AlertLevel::Due => write!(f, "期限間近"),
            AlertLevel::Upcoming => write!(f, "予定"),
        }
    }
}

/// Compute an empty expiry column from another date column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedExpiryRule {
    pub category: Category,
    /// Expiry column to fill in
    pub column: String,
    /// Date column the expiry is counted from
    pub from: String,
    pub years: i32,
}

/// Alert thresholds and derived-expiry rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Days left at or below which an expiry is due
    pub warning_days: i64,
    /// Days left at or below which an expiry is reported at all
    pub notice_days: i64,
    pub derived: Vec<DerivedExpiryRule>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_days: DEFAULT_WARNING_DAYS,
            notice_days: DEFAULT_NOTICE_DAYS,
            derived: default_derived_rules(),
        }
    }
}

fn default_derived_rules() -> Vec<DerivedExpiryRule> {
    let rule = |category, column: &str, years| DerivedExpiryRule {
        category,
        column: column.to_string(),
        from: columns::PURCHASE_DATE.to_string(),
        years,
    };
    vec![
        rule(Category::Pc, columns::LEASE_EXPIRY, 5),
        rule(Category::Tablet, columns::CONTRACT_EXPIRY, 2),
        rule(Category::Phone, columns::CONTRACT_EXPIRY, 2),
    ]
}

impl AlertConfig {
    /// Copy with the reporting window narrowed or widened to `days`
    pub fn with_window(&self, days: i64) -> Self {
        Self {
            warning_days: self.warning_days.min(days),
            notice_days: days,
            derived: self.derived.clone(),
        }
    }

    /// Level for a number of days left, `None` when outside the window
    pub fn classify(&self, days_left: i64) -> Option<AlertLevel> {
        if days_left < 0 {
            Some(AlertLevel::Expired)
        } else if days_left <= self.warning_days {
            Some(AlertLevel::Due)
        } else if days_left <= self.notice_days {
            Some(AlertLevel::Upcoming)
        } else {
            None
        }
    }

    fn rule_for(&self, category: Category, column: &str) -> Option<&DerivedExpiryRule> {
        self.derived
            .iter()
            .find(|r| r.category == category && r.column == column)
    }
}

/// Where an expiry date came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryDate {
    /// Written in the expiry column
    Explicit(NaiveDate),
    /// Computed from a derived rule
    Derived(NaiveDate),
    /// The cell is not empty but cannot be read as a date
    Unreadable(String),
}

/// Expiry of one column of an item, if it has one
pub fn expiry_for(item: &Item, column: &str, config: &AlertConfig) -> Option<ExpiryDate> {
    let raw = item.field(column);
    if !raw.is_empty() {
        return Some(match parse_date(raw) {
            Some(date) => ExpiryDate::Explicit(date),
            None => ExpiryDate::Unreadable(raw.to_string()),
        });
    }

    let rule = config.rule_for(item.category, column)?;
    let base = parse_date(item.field(&rule.from))?;
    add_years(base, rule.years).map(ExpiryDate::Derived)
}

/// A single expiry that needs attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryAlert {
    pub category: Category,
    pub id: String,
    pub name: String,
    pub holder: String,
    pub column: String,
    pub level: AlertLevel,
    pub expiry: Option<NaiveDate>,
    pub days_left: Option<i64>,
    /// True when the date was computed rather than written in the sheet
    pub derived: bool,
    /// Cell text, kept for unreadable dates
    pub raw_value: String,
}

/// All alerts for the given items as of `today`, most urgent first.
///
/// Disposed items never raise alerts.
pub fn compute_alerts(items: &[Item], today: NaiveDate, config: &AlertConfig) -> Vec<ExpiryAlert> {
    let mut alerts = Vec::new();

    for item in items {
        if item.status() == Some(Status::Disposed) {
            continue;
        }

        for spec in item.category.expiry_fields() {
            let Some(expiry) = expiry_for(item, spec.name, config) else {
                continue;
            };

            let (level, date, days_left, derived) = match &expiry {
                ExpiryDate::Unreadable(raw) => {
                    log::debug!(
                        "{} {}: unreadable date in {}: '{}'",
                        item.category,
                        item.id,
                        spec.name,
                        raw
                    );
                    (AlertLevel::Unreadable, None, None, false)
                }
                ExpiryDate::Explicit(date) | ExpiryDate::Derived(date) => {
                    let days = days_until(*date, today);
                    let Some(level) = config.classify(days) else {
                        continue;
                    };
                    let derived = matches!(expiry, ExpiryDate::Derived(_));
                    (level, Some(*date), Some(days), derived)
                }
            };

            alerts.push(ExpiryAlert {
                category: item.category,
                id: item.id.clone(),
                name: item.name.clone(),
                holder: item.holder.clone(),
                column: spec.name.to_string(),
                level,
                expiry: date,
                days_left,
                derived,
                raw_value: item.field(spec.name).to_string(),
            });
        }
    }

    alerts.sort_by(compare_alerts);
    alerts
}

fn compare_alerts(a: &ExpiryAlert, b: &ExpiryAlert) -> Ordering {
    let unreadable = |alert: &ExpiryAlert| alert.level != AlertLevel::Unreadable;
    unreadable(a)
        .cmp(&unreadable(b))
        .then_with(|| a.days_left.cmp(&b.days_left))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.column.cmp(&b.column))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(category: Category, id: &str, status: &str, fields: &[(&str, &str)]) -> Item {
        let mut header = vec!["ID".to_string(), "品名".to_string(), "ステータス".to_string()];
        let mut row = vec![id.to_string(), format!("item {}", id), status.to_string()];
        for (column, value) in fields {
            header.push(column.to_string());
            row.push(value.to_string());
        }
        Item::from_row(category, &header, &row, 2).unwrap()
    }

    #[test]
    fn test_classify_boundaries_are_inclusive() {
        let config = AlertConfig::default();
        assert_eq!(config.classify(-1), Some(AlertLevel::Expired));
        assert_eq!(config.classify(0), Some(AlertLevel::Due));
        assert_eq!(config.classify(30), Some(AlertLevel::Due));
        assert_eq!(config.classify(31), Some(AlertLevel::Upcoming));
        assert_eq!(config.classify(90), Some(AlertLevel::Upcoming));
        assert_eq!(config.classify(91), None);
    }

    #[test]
    fn test_with_window_narrows_thresholds() {
        let config = AlertConfig::default().with_window(14);
        assert_eq!(config.warning_days, 14);
        assert_eq!(config.classify(14), Some(AlertLevel::Due));
        assert_eq!(config.classify(15), None);
    }

    #[test]
    fn test_vehicle_inspection_alerts() {
        let today = ymd(2025, 4, 1);
        let items = vec![
            item(Category::Vehicle, "V-1", "利用可能", &[("車検期限", "2025-03-31")]),
            item(Category::Vehicle, "V-2", "貸出中", &[("車検期限", "2025/4/20"), ("保険期限", "2026-01-01")]),
            item(Category::Vehicle, "V-3", "利用可能", &[("車検期限", "2025-06-01")]),
            item(Category::Vehicle, "V-4", "廃棄", &[("車検期限", "2024-01-01")]),
        ];

        let alerts = compute_alerts(&items, today, &AlertConfig::default());
        let summary: Vec<_> = alerts
            .iter()
            .map(|a| (a.id.as_str(), a.level, a.days_left))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("V-1", AlertLevel::Expired, Some(-1)),
                ("V-2", AlertLevel::Due, Some(19)),
                ("V-3", AlertLevel::Upcoming, Some(61)),
            ]
        );
    }

    #[test]
    fn test_unreadable_dates_come_first() {
        let today = ymd(2025, 4, 1);
        let items = vec![
            item(Category::Vehicle, "V-1", "利用可能", &[("車検期限", "2025-04-02")]),
            item(Category::Vehicle, "V-2", "利用可能", &[("保険期限", "来年春")]),
        ];

        let alerts = compute_alerts(&items, today, &AlertConfig::default());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].level, AlertLevel::Unreadable);
        assert_eq!(alerts[0].raw_value, "来年春");
        assert_eq!(alerts[1].id, "V-1");
    }

    #[test]
    fn test_derived_lease_expiry_from_purchase_date() {
        let config = AlertConfig::default();
        let pc = item(Category::Pc, "P-1", "利用可能", &[("購入日", "2020-05-10")]);

        assert_eq!(
            expiry_for(&pc, "リース期限", &config),
            Some(ExpiryDate::Derived(ymd(2025, 5, 10)))
        );

        let alerts = compute_alerts(&[pc], ymd(2025, 4, 1), &config);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].derived);
        assert_eq!(alerts[0].level, AlertLevel::Upcoming);
    }

    #[test]
    fn test_explicit_expiry_wins_over_derived() {
        let config = AlertConfig::default();
        let pc = item(
            Category::Pc,
            "P-1",
            "利用可能",
            &[("購入日", "2020-05-10"), ("リース期限", "2027-05-10")],
        );
        assert_eq!(
            expiry_for(&pc, "リース期限", &config),
            Some(ExpiryDate::Explicit(ymd(2027, 5, 10)))
        );
    }

    #[test]
    fn test_derived_contract_expiry_on_leap_day() {
        let config = AlertConfig::default();
        let phone = item(Category::Phone, "M-1", "利用可能", &[("購入日", "2024-02-29")]);

        // Two years on lands on a non-leap year
        assert_eq!(
            expiry_for(&phone, "契約期限", &config),
            Some(ExpiryDate::Derived(ymd(2026, 2, 28)))
        );

        let alerts = compute_alerts(&[phone], ymd(2026, 2, 28), &config);
        assert_eq!(alerts[0].days_left, Some(0));
        assert_eq!(alerts[0].level, AlertLevel::Due);
    }

    #[test]
    fn test_no_rule_means_no_alert() {
        let config = AlertConfig {
            derived: Vec::new(),
            ..Default::default()
        };
        let pc = item(Category::Pc, "P-1", "利用可能", &[("購入日", "2020-05-10")]);
        assert!(expiry_for(&pc, "リース期限", &config).is_none());
        assert!(compute_alerts(&[pc], ymd(2025, 4, 1), &config).is_empty());
    }
}
