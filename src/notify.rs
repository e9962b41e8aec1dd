//! User-facing notifications (toasts) shown in the status bar.

use std::time::{Duration, Instant};

/// Severity of a notification, drives its color in the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Warning,
  Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub title: Option<String>,
  pub message: String,
  /// How long the footer keeps showing the message
  pub ttl: Duration,
}

impl Notification {
  pub fn new(level: Level, message: impl Into<String>) -> Self {
    Self {
      level,
      title: None,
      message: message.into(),
      ttl: Duration::from_secs(5),
    }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(Level::Success, message).with_ttl(Duration::from_secs(3))
  }

  pub fn warning(message: impl Into<String>) -> Self {
    Self::new(Level::Warning, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(Level::Error, message)
  }

  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Render as a single status-bar line
  pub fn text(&self) -> String {
    match &self.title {
      Some(title) => format!("{}: {}", title, self.message),
      None => self.message.clone(),
    }
  }
}

/// A notification plus the moment it should disappear.
#[derive(Debug, Clone)]
pub struct Toast {
  pub notification: Notification,
  expires_at: Instant,
}

impl Toast {
  pub fn new(notification: Notification) -> Self {
    let expires_at = Instant::now() + notification.ttl;
    Self {
      notification,
      expires_at,
    }
  }

  pub fn is_expired(&self) -> bool {
    Instant::now() >= self.expires_at
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_text_with_title() {
    let n = Notification::error("Unable to connect to the server.").with_title("Network Error");
    assert_eq!(n.text(), "Network Error: Unable to connect to the server.");
  }

  #[test]
  fn test_text_without_title() {
    assert_eq!(Notification::success("Created").text(), "Created");
  }

  #[test]
  fn test_toast_expiry() {
    let toast = Toast::new(Notification::warning("hi").with_ttl(Duration::ZERO));
    assert!(toast.is_expired());

    let toast = Toast::new(Notification::warning("hi"));
    assert!(!toast.is_expired());
  }
}
