pub mod alerts;
pub mod item;
pub mod list;
pub mod workbook;
