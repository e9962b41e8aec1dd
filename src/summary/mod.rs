//! Figures derived from fetched records, shown by the kitchen and inventory screens.

pub mod inventory;
pub mod kitchen;

pub use inventory::{summarize, InventoryRow, StockStatus};
