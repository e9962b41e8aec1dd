//! Kitchen board figures: ticket age, rush flag and ingredient amounts.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::api::types::{KitchenTicket, TICKET_STATUSES};

/// A pending ticket older than this is a rush.
pub const RUSH_MINUTES: i64 = 15;

/// Parse an order's `date_time`. Naive timestamps are taken as local time.
pub fn parse_order_time(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    .map(|dt| dt.with_timezone(&Utc))
}

pub fn order_time(ticket: &KitchenTicket) -> Option<DateTime<Utc>> {
  ticket
    .order
    .as_ref()
    .and_then(|o| o.date_time.as_deref())
    .and_then(parse_order_time)
}

/// Whole minutes since the order was placed.
pub fn waiting_minutes(ticket: &KitchenTicket, now: DateTime<Utc>) -> Option<i64> {
  order_time(ticket).map(|at| (now - at).num_minutes())
}

pub fn is_rush(ticket: &KitchenTicket, now: DateTime<Utc>) -> bool {
  ticket.status == "pending" && waiting_minutes(ticket, now).is_some_and(|m| m > RUSH_MINUTES)
}

pub fn time_ago(ticket: &KitchenTicket, now: DateTime<Utc>) -> String {
  match waiting_minutes(ticket, now) {
    None => "-".into(),
    Some(m) if m < 1 => "Just now".into(),
    Some(m) if m < 60 => format!("{}m ago", m),
    Some(m) => format!("{}h {}m ago", m / 60, m % 60),
  }
}

/// The status after `status`, or `None` once served (or unknown).
pub fn next_status(status: &str) -> Option<&'static str> {
  let pos = TICKET_STATUSES.iter().position(|s| *s == status)?;
  TICKET_STATUSES.get(pos + 1).copied()
}

pub fn status_label(status: &str) -> String {
  status.replacen('_', " ", 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientNeed {
  pub name: String,
  pub amount: Decimal,
}

impl IngredientNeed {
  pub fn amount_text(&self) -> String {
    format!("{:.1}", self.amount.round_dp(1))
  }
}

/// One order line with what the kitchen has to pull for it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineNeeds {
  pub label: String,
  pub qty: Decimal,
  pub ingredients: Vec<IngredientNeed>,
}

pub fn line_needs(ticket: &KitchenTicket) -> Vec<LineNeeds> {
  let Some(order) = &ticket.order else {
    return Vec::new();
  };
  order
    .items
    .iter()
    .map(|item| {
      let (label, ingredients) = match &item.menu_item {
        Some(menu) => (menu.display_name.clone(), menu.ingredients.as_slice()),
        None => (format!("Item #{}", item.id), &[][..]),
      };
      LineNeeds {
        label,
        qty: item.qty,
        ingredients: ingredients
          .iter()
          .map(|ing| IngredientNeed {
            name: ing.product_name(),
            amount: ing.quantity_per_serving * item.qty,
          })
          .collect(),
      }
    })
    .collect()
}

/// Bill number, falling back to the order id.
pub fn bill_label(ticket: &KitchenTicket) -> String {
  ticket
    .order
    .as_ref()
    .and_then(|o| o.bill_no.clone())
    .unwrap_or_else(|| ticket.order_id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;
  use serde_json::json;

  fn ticket(status: &str, date_time: Option<&str>) -> KitchenTicket {
    serde_json::from_value(json!({
      "id": 1,
      "ticket_number": "KT-1",
      "status": status,
      "order_id": 9,
      "order": {
        "id": 9,
        "date_time": date_time,
        "items": [
          {
            "id": 3,
            "qty": 2,
            "menu_item": {
              "display_name": "Latte",
              "ingredients": [
                {"id": 1, "product_id": 4, "quantity_per_serving": "0.25", "product": {"name": "Milk"}},
                {"id": 2, "product_id": 5, "quantity_per_serving": "18"}
              ]
            }
          },
          {"id": 4, "qty": 1}
        ]
      }
    }))
    .unwrap()
  }

  fn placed() -> DateTime<Utc> {
    parse_order_time("2024-05-01T12:00:00Z").unwrap()
  }

  #[test]
  fn test_parse_order_time_formats() {
    assert!(parse_order_time("2024-05-01T12:00:00+02:00").is_some());
    assert!(parse_order_time("2024-05-01 12:00:00").is_some());
    assert!(parse_order_time("2024-05-01T12:00:00").is_some());
    assert!(parse_order_time("yesterday").is_none());
  }

  #[test]
  fn test_rush_only_for_old_pending_tickets() {
    let t = ticket("pending", Some("2024-05-01T12:00:00Z"));
    assert!(!is_rush(&t, placed() + Duration::minutes(15)));
    assert!(is_rush(&t, placed() + Duration::minutes(16)));

    let t = ticket("in_preparation", Some("2024-05-01T12:00:00Z"));
    assert!(!is_rush(&t, placed() + Duration::minutes(40)));

    let t = ticket("pending", None);
    assert!(!is_rush(&t, placed() + Duration::minutes(40)));
  }

  #[test]
  fn test_time_ago() {
    let t = ticket("pending", Some("2024-05-01T12:00:00Z"));
    assert_eq!(time_ago(&t, placed() + Duration::seconds(30)), "Just now");
    assert_eq!(time_ago(&t, placed() + Duration::minutes(7)), "7m ago");
    assert_eq!(time_ago(&t, placed() + Duration::minutes(135)), "2h 15m ago");
    assert_eq!(time_ago(&ticket("pending", None), placed()), "-");
  }

  #[test]
  fn test_status_progression() {
    assert_eq!(next_status("pending"), Some("in_preparation"));
    assert_eq!(next_status("in_preparation"), Some("ready"));
    assert_eq!(next_status("ready"), Some("served"));
    assert_eq!(next_status("served"), None);
    assert_eq!(next_status("bogus"), None);
    assert_eq!(status_label("in_preparation"), "in preparation");
  }

  #[test]
  fn test_ingredient_amounts_scale_with_quantity() {
    let lines = line_needs(&ticket("pending", None));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].label, "Latte");
    assert_eq!(lines[0].ingredients[0].name, "Milk");
    assert_eq!(lines[0].ingredients[0].amount_text(), "0.5");
    assert_eq!(lines[0].ingredients[1].name, "Product #5");
    assert_eq!(lines[0].ingredients[1].amount_text(), "36.0");
    assert_eq!(lines[1].label, "Item #4");
    assert!(lines[1].ingredients.is_empty());
  }
}
