//! Per-product stock and waste totals for the inventory screen.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::api::types::{Product, StockBatch, WasteLog};

/// At or below this a product is reported as low stock.
pub const LOW_STOCK: Decimal = Decimal::TEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
  Out,
  Low,
  Ok,
}

impl StockStatus {
  pub fn for_stock(stock: Decimal) -> Self {
    if stock <= Decimal::ZERO {
      StockStatus::Out
    } else if stock <= LOW_STOCK {
      StockStatus::Low
    } else {
      StockStatus::Ok
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      StockStatus::Out => "Out",
      StockStatus::Low => "Low stock",
      StockStatus::Ok => "OK",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
  pub product_id: u64,
  pub name: String,
  pub sku: Option<String>,
  pub category: Option<String>,
  pub price: Option<Decimal>,
  pub stock: Decimal,
  pub batches: usize,
  pub waste_qty: Decimal,
  pub waste_count: usize,
  pub available: bool,
}

impl InventoryRow {
  pub fn status(&self) -> StockStatus {
    StockStatus::for_stock(self.stock)
  }

  /// `"3.5 (2)"`: wasted quantity and number of log entries.
  pub fn waste_text(&self) -> String {
    if self.waste_count == 0 {
      "-".into()
    } else {
      format!("{} ({})", self.waste_qty.normalize(), self.waste_count)
    }
  }
}

#[derive(Default)]
struct Totals {
  stock: Decimal,
  batches: usize,
  waste_qty: Decimal,
  waste_count: usize,
}

/// One row per product, in product order.
///
/// Batch and waste rows for products not in `products` are ignored. A
/// product with no batches reports its own `qty` as stock.
pub fn summarize(
  products: &[Product],
  batches: &[StockBatch],
  waste: &[WasteLog],
) -> Vec<InventoryRow> {
  let mut totals: HashMap<u64, Totals> = HashMap::new();
  for batch in batches {
    let t = totals.entry(batch.product_id).or_default();
    t.stock += batch.on_hand();
    t.batches += 1;
  }
  for log in waste {
    let t = totals.entry(log.product_id).or_default();
    t.waste_qty += log.quantity.unwrap_or_default();
    t.waste_count += 1;
  }

  products
    .iter()
    .map(|p| {
      let t = totals.remove(&p.id).unwrap_or_default();
      let stock = if t.batches > 0 {
        t.stock
      } else {
        Decimal::from(p.qty.unwrap_or(0))
      };
      InventoryRow {
        product_id: p.id,
        name: p.name.clone(),
        sku: p.sku.clone(),
        category: p.category.as_ref().and_then(|c| c.name.clone()),
        price: p.price,
        stock,
        batches: t.batches,
        waste_qty: t.waste_qty,
        waste_count: t.waste_count,
        available: p.availability.unwrap_or(false),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn products() -> Vec<Product> {
    serde_json::from_value(json!([
      {"id": 1, "name": "Milk", "qty": 99},
      {"id": 2, "name": "Beans", "qty": 4},
      {"id": 3, "name": "Sugar"}
    ]))
    .unwrap()
  }

  #[test]
  fn test_batches_and_waste_are_totalled_per_product() {
    let batches: Vec<StockBatch> = serde_json::from_value(json!([
      {"id": 1, "product_id": 1, "quantity": 10, "remaining_quantity": 6},
      {"id": 2, "product_id": 1, "quantity": 8},
      {"id": 3, "product_id": 7, "quantity": 50}
    ]))
    .unwrap();
    let waste: Vec<WasteLog> = serde_json::from_value(json!([
      {"id": 1, "product_id": 1, "quantity": "1.5"},
      {"id": 2, "product_id": 1, "quantity": 2},
      {"id": 3, "product_id": 2}
    ]))
    .unwrap();

    let rows = summarize(&products(), &batches, &waste);
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].stock, Decimal::from(14));
    assert_eq!(rows[0].batches, 2);
    assert_eq!(rows[0].waste_text(), "3.5 (2)");
    assert_eq!(rows[0].status(), StockStatus::Ok);

    // no batches: falls back to the product's own qty
    assert_eq!(rows[1].stock, Decimal::from(4));
    assert_eq!(rows[1].waste_count, 1);
    assert_eq!(rows[1].status(), StockStatus::Low);

    assert_eq!(rows[2].stock, Decimal::ZERO);
    assert_eq!(rows[2].waste_text(), "-");
    assert_eq!(rows[2].status(), StockStatus::Out);
  }

  #[test]
  fn test_stock_status_thresholds() {
    assert_eq!(StockStatus::for_stock(Decimal::ZERO), StockStatus::Out);
    assert_eq!(StockStatus::for_stock(Decimal::ONE), StockStatus::Low);
    assert_eq!(StockStatus::for_stock(Decimal::TEN), StockStatus::Low);
    assert_eq!(StockStatus::for_stock(Decimal::from(11)), StockStatus::Ok);
  }
}
