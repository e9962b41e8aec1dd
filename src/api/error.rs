//! Error taxonomy for calls against the backend.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use super::api_types::ApiErrorBody;
use super::schema::FieldErrors;
use crate::notify::{Level, Notification};

/// Errors that can occur when talking to the REST backend.
///
/// `Clone` so one failed fetch can be handed to every reader sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// The request never got a response (connection refused, DNS, TLS...).
  #[error("network error: {0}")]
  Network(String),

  /// 422: the payload was rejected field by field.
  #[error("validation failed: {message}")]
  Validation {
    message: String,
    fields: BTreeMap<String, Vec<String>>,
  },

  /// 404
  #[error("not found: {0}")]
  NotFound(String),

  /// 401
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// 403
  #[error("forbidden: {0}")]
  Forbidden(String),

  /// 429
  #[error("too many requests: {0}")]
  RateLimited(String),

  /// 5xx
  #[error("server error ({status}): {message}")]
  Server { status: u16, message: String },

  /// Any other non-success status.
  #[error("request rejected ({status}): {message}")]
  Rejected { status: u16, message: String },

  /// The body did not match the expected schema.
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      ApiError::Decode(e.to_string())
    } else {
      ApiError::Network(e.to_string())
    }
  }
}

impl ApiError {
  /// Classify a non-success response by status code and error body.
  pub fn from_status(status: u16, body: &[u8]) -> Self {
    let body: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = body.message.clone();

    match status {
      401 => ApiError::Unauthorized(message.unwrap_or_else(|| "Please log in again.".into())),
      403 => {
        ApiError::Forbidden(message.unwrap_or_else(|| "You do not have permission.".into()))
      }
      404 => ApiError::NotFound(message.unwrap_or_else(|| "Record not found.".into())),
      422 => ApiError::Validation {
        message: message.unwrap_or_else(|| "The given data was invalid.".into()),
        fields: body.field_messages(),
      },
      429 => ApiError::RateLimited(message.unwrap_or_else(|| "Please try again later.".into())),
      500..=599 => ApiError::Server {
        status,
        message: message.unwrap_or_else(|| "An error occurred.".into()),
      },
      _ => ApiError::Rejected {
        status,
        message: message.unwrap_or_else(|| "An error occurred.".into()),
      },
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound(_))
  }

  /// 401/403 are surfaced but never retried.
  pub fn is_auth(&self) -> bool {
    matches!(self, ApiError::Unauthorized(_) | ApiError::Forbidden(_))
  }

  /// Field-level messages for a validation error, first message per field.
  pub fn field_errors(&self) -> Option<FieldErrors> {
    match self {
      ApiError::Validation { fields, .. } => Some(
        fields
          .iter()
          .filter_map(|(k, msgs)| msgs.first().map(|m| (k.clone(), m.clone())))
          .collect(),
      ),
      _ => None,
    }
  }

  /// Generic notification for this error.
  pub fn notification(&self) -> Notification {
    let short = Duration::from_secs(3);
    match self {
      ApiError::Network(_) => {
        Notification::error("Unable to connect to the server.").with_title("Network Error")
      }
      ApiError::Unauthorized(msg) => Notification::error(msg.clone())
        .with_title("Unauthorized")
        .with_ttl(short),
      ApiError::Forbidden(msg) => Notification::error(msg.clone())
        .with_title("Forbidden")
        .with_ttl(short),
      ApiError::RateLimited(msg) => Notification::new(Level::Warning, msg.clone())
        .with_title("Too many requests")
        .with_ttl(short),
      ApiError::NotFound(msg) => Notification::warning(msg.clone()).with_title("Not found"),
      ApiError::Validation { message, .. } => {
        Notification::error(message.clone()).with_title("Invalid data")
      }
      ApiError::Server { message, .. } | ApiError::Rejected { message, .. } => {
        Notification::error(message.clone()).with_title("Error")
      }
      ApiError::Decode(_) => {
        Notification::error("The server sent an unexpected response.").with_title("Error")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classify_validation() {
    let body = br#"{"message":"Invalid","errors":{"name":["Required","Too short"]}}"#;
    let err = ApiError::from_status(422, body);
    let fields = err.field_errors().unwrap();
    assert_eq!(fields["name"], "Required");
    assert!(!err.is_auth());
  }

  #[test]
  fn test_classify_statuses() {
    assert!(ApiError::from_status(404, b"").is_not_found());
    assert!(ApiError::from_status(401, b"{}").is_auth());
    assert!(ApiError::from_status(403, b"{}").is_auth());
    assert_eq!(
      ApiError::from_status(503, br#"{"message":"down"}"#),
      ApiError::Server {
        status: 503,
        message: "down".into()
      }
    );
    assert!(matches!(
      ApiError::from_status(409, b"not json"),
      ApiError::Rejected { status: 409, .. }
    ));
    assert!(matches!(
      ApiError::from_status(429, b""),
      ApiError::RateLimited(_)
    ));
  }

  #[test]
  fn test_default_messages() {
    assert_eq!(
      ApiError::from_status(401, b""),
      ApiError::Unauthorized("Please log in again.".into())
    );
  }

  #[test]
  fn test_notifications() {
    let n = ApiError::Network("refused".into()).notification();
    assert_eq!(n.text(), "Network Error: Unable to connect to the server.");
    assert_eq!(n.level, Level::Error);

    let n = ApiError::Forbidden("nope".into()).notification();
    assert_eq!(n.ttl, Duration::from_secs(3));
  }

  #[test]
  fn test_error_display() {
    let err = ApiError::Server {
      status: 500,
      message: "boom".into(),
    };
    assert_eq!(err.to_string(), "server error (500): boom");
  }
}
