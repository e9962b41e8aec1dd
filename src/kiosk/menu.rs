use crate::api::types::{MenuItem, OrderType};

/// Menu items the kiosk offers: everything not explicitly unavailable.
pub fn orderable(items: &[MenuItem]) -> Vec<&MenuItem> {
  items.iter().filter(|m| m.is_orderable()).collect()
}

/// Whether the checkout dialog should ask for a delivery zone.
pub fn needs_zone(order_types: &[OrderType], selected: Option<u64>) -> bool {
  selected
    .and_then(|id| order_types.iter().find(|t| t.id == id))
    .is_some_and(OrderType::is_delivery)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_orderable_skips_unavailable() {
    let items: Vec<MenuItem> = serde_json::from_value(json!([
      {"id": 1, "display_name": "Latte", "is_available": true},
      {"id": 2, "display_name": "Mocha", "is_available": false},
      {"id": 3, "display_name": "Tea"}
    ]))
    .unwrap();
    let ids: Vec<u64> = orderable(&items).iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[test]
  fn test_needs_zone_only_for_delivery() {
    let types: Vec<OrderType> = serde_json::from_value(json!([
      {"id": 1, "type_name": "Dine In"},
      {"id": 2, "type_name": "delivery"}
    ]))
    .unwrap();
    assert!(!needs_zone(&types, Some(1)));
    assert!(needs_zone(&types, Some(2)));
    assert!(!needs_zone(&types, None));
    assert!(!needs_zone(&types, Some(9)));
  }
}
