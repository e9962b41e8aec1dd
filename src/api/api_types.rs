//! Serde types matching the backend's wire envelopes.
//!
//! Record types live in `types.rs`; this module only holds the generic
//! response/error wrappers and the kiosk-specific request bodies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Envelopes
// ============================================================================

/// Every successful response wraps its payload in `{ "data": ... }`.
/// Pagination metadata (`meta`, `links`) is ignored.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

/// Error body: `{ "message": "...", "errors": { "field": ["..."] } }`.
///
/// Some endpoints put field errors at the top level next to `message`, so
/// everything else is captured in `extra` and inspected as a fallback.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  #[serde(default)]
  pub errors: BTreeMap<String, ApiFieldMessages>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// Field messages come either as a list or a single string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiFieldMessages {
  Many(Vec<String>),
  One(String),
}

impl ApiFieldMessages {
  pub fn into_vec(self) -> Vec<String> {
    match self {
      Self::Many(v) => v,
      Self::One(s) => vec![s],
    }
  }
}

impl ApiErrorBody {
  /// Collect field errors from `errors`, or from top-level keys when absent.
  pub fn field_messages(self) -> BTreeMap<String, Vec<String>> {
    if !self.errors.is_empty() {
      return self
        .errors
        .into_iter()
        .map(|(k, v)| (k, v.into_vec()))
        .collect();
    }

    self
      .extra
      .into_iter()
      .filter_map(|(k, v)| {
        let messages: ApiFieldMessages = serde_json::from_value(v).ok()?;
        Some((k, messages.into_vec()))
      })
      .collect()
  }
}

// ============================================================================
// Lookups (reference field options)
// ============================================================================

/// Keys that may carry a human-readable label, in preference order.
const LABEL_KEYS: &[&str] = &[
  "name",
  "type_name",
  "display_name",
  "customer_code",
  "bill_no",
  "zone_name",
  "group_name",
];

/// A loosely typed row used only to build `{id, label}` option lists.
#[derive(Debug, Deserialize)]
pub struct ApiLookupRow {
  pub id: u64,
  #[serde(flatten)]
  pub rest: BTreeMap<String, serde_json::Value>,
}

impl ApiLookupRow {
  pub fn label(&self) -> String {
    LABEL_KEYS
      .iter()
      .filter_map(|k| self.rest.get(*k))
      .filter_map(|v| v.as_str())
      .find(|s| !s.is_empty())
      .map(String::from)
      .unwrap_or_else(|| format!("#{}", self.id))
  }
}

// ============================================================================
// Kiosk request/response bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiCartItemRequest {
  pub menu_item_id: u64,
  pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiCheckoutRequest {
  pub cart_id: u64,
  pub order_type_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub zone_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPlacedOrder {
  pub id: u64,
  #[serde(default)]
  pub bill_no: Option<String>,
  #[serde(default)]
  pub net_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCheckoutResponse {
  pub order: Option<ApiPlacedOrder>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_body_with_errors_map() {
    let json = r#"{
      "message": "The name field is required.",
      "errors": { "name": ["The name field is required."] }
    }"#;
    let body: ApiErrorBody = serde_json::from_str(json).unwrap();
    assert_eq!(body.message.as_deref(), Some("The name field is required."));
    let fields = body.field_messages();
    assert_eq!(fields["name"], vec!["The name field is required."]);
  }

  #[test]
  fn test_error_body_with_top_level_fields() {
    let json = r#"{ "message": "Invalid", "sku": "Already taken", "status": 422 }"#;
    let body: ApiErrorBody = serde_json::from_str(json).unwrap();
    let fields = body.field_messages();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields["sku"], vec!["Already taken"]);
  }

  #[test]
  fn test_lookup_label_preference() {
    let row: ApiLookupRow =
      serde_json::from_str(r#"{"id": 3, "type_name": "Delivery", "active": true}"#).unwrap();
    assert_eq!(row.label(), "Delivery");

    let row: ApiLookupRow = serde_json::from_str(r#"{"id": 9, "name": ""}"#).unwrap();
    assert_eq!(row.label(), "#9");
  }

  #[test]
  fn test_checkout_request_skips_empty_optionals() {
    let req = ApiCheckoutRequest {
      cart_id: 4,
      order_type_id: 1,
      customer_id: None,
      store_id: Some(2),
      address_id: None,
      zone_id: None,
    };
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(
      value,
      serde_json::json!({ "cart_id": 4, "order_type_id": 1, "store_id": 2 })
    );
  }
}
