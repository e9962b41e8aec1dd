use ratatui::prelude::Color;
use rust_decimal::Decimal;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a ticket, reservation or delivery status
pub fn status_color(status: &str) -> Color {
  match status {
    "pending" => Color::Blue,
    "in_preparation" | "out_for_delivery" | "seated" => Color::LightRed,
    "ready" | "confirmed" | "delivered" | "completed" => Color::Green,
    "cancelled" | "no_show" => Color::Red,
    "served" => Color::Gray,
    _ => Color::White,
  }
}

/// Money with two decimals
pub fn money(amount: Decimal) -> String {
  format!("{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("latte", 10), "latte");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("latte", 5), "latte");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("flat white", 8), "flat ...");
    assert_eq!(truncate("crème brûlée", 8), "crème...");
  }

  #[test]
  fn test_status_color_kitchen_flow() {
    assert_eq!(status_color("pending"), Color::Blue);
    assert_eq!(status_color("in_preparation"), Color::LightRed);
    assert_eq!(status_color("ready"), Color::Green);
    assert_eq!(status_color("served"), Color::Gray);
  }

  #[test]
  fn test_status_color_default() {
    assert_eq!(status_color("whatever"), Color::White);
  }

  #[test]
  fn test_money() {
    assert_eq!(money(Decimal::new(45, 1)), "4.50");
    assert_eq!(money(Decimal::from(3)), "3.00");
  }
}
