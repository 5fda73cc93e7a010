//! Equipment inventory domain: categories, records, search and expiry alerts

pub mod alerts;
pub mod category;
pub mod dates;
pub mod item;
pub mod search;
pub mod service;

pub use alerts::{AlertConfig, AlertLevel, ExpiryAlert, compute_alerts};
pub use category::{Category, SheetMap};
pub use item::{Item, ItemDraft, Status};
pub use search::{SearchQuery, display_columns, filter_items, paginate};
pub use service::{InventoryService, LoadReport, UpsertOptions, UpsertOutcome};
