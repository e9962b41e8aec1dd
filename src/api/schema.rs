//! Per-resource schemas: how records are listed, edited and turned into payloads.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::str::FromStr;

use super::resource::ListParams;

/// Field name → first error message for that field.
pub type FieldErrors = BTreeMap<String, String>;

/// A table column for list views. `width == 0` means "take the rest".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub header: &'static str,
  pub width: u16,
}

impl Column {
  pub const fn new(header: &'static str, width: u16) -> Self {
    Self { header, width }
  }
}

/// Input type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Integer,
  Decimal,
  Flag,
  /// `YYYY-MM-DD`
  Date,
  /// `HH:MM`
  Time,
  /// One of a fixed set of values
  Choice(&'static [&'static str]),
  /// Id of a record in another resource (resource path)
  Reference(&'static str),
}

/// One editable field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub key: &'static str,
  pub label: &'static str,
  pub kind: FieldKind,
  pub required: bool,
  pub default: &'static str,
}

impl FieldSpec {
  pub const fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
    Self {
      key,
      label,
      kind,
      required: false,
      default: "",
    }
  }

  pub const fn text(key: &'static str, label: &'static str) -> Self {
    Self::new(key, label, FieldKind::Text)
  }

  pub const fn required(mut self) -> Self {
    self.required = true;
    self
  }

  pub const fn default_value(mut self, value: &'static str) -> Self {
    self.default = value;
    self
  }
}

/// Store scoping applied to list params and payloads of scoped resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
  pub store_id: Option<u64>,
}

impl Scope {
  pub fn new(store_id: Option<u64>) -> Self {
    Self { store_id }
  }

  /// List params for a resource, with `store_id` when it is scoped.
  pub fn list_params(&self, scoped: bool) -> ListParams {
    match (scoped, self.store_id) {
      (true, Some(id)) => ListParams::new().with("store_id", id),
      _ => ListParams::new(),
    }
  }

  /// `store_id` to put into a payload of a scoped resource.
  pub fn payload_store(&self, scoped: bool) -> Option<u64> {
    if scoped {
      self.store_id
    } else {
      None
    }
  }
}

/// An `{id, label}` option for reference fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOption {
  pub id: u64,
  pub label: String,
}

/// A record type served by one REST collection.
pub trait Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Collection path under `/v1/` (e.g. "menu-items")
  const RESOURCE: &'static str;
  /// Singular human label (e.g. "Menu Item")
  const LABEL: &'static str;
  /// Whether list calls and payloads carry the current store id
  const SCOPED: bool = false;

  /// Body sent on create/update
  type Payload: Serialize + Send + Sync + 'static;

  fn id(&self) -> u64;

  /// Short human-readable name of this record
  fn title(&self) -> String;

  fn columns() -> &'static [Column];

  /// Cell text for each of `columns()`, in order
  fn cells(&self) -> Vec<String>;

  /// Case-insensitive match used by the `/` filter
  fn matches(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    self
      .cells()
      .iter()
      .any(|c| c.to_lowercase().contains(&needle))
  }

  /// Label/value pairs for the detail screen
  fn details(&self) -> Vec<(&'static str, String)> {
    Self::columns()
      .iter()
      .map(|c| c.header)
      .zip(self.cells())
      .collect()
  }

  /// Embedded child rows shown under the details (ingredients, order lines)
  fn related(&self) -> Option<Related> {
    None
  }
}

/// A small table of child records embedded in a parent record.
#[derive(Debug, Clone, PartialEq)]
pub struct Related {
  pub title: &'static str,
  pub columns: &'static [Column],
  pub rows: Vec<Vec<String>>,
}

/// An entity that can be created and edited through a form.
pub trait Editable: Entity {
  fn fields() -> &'static [FieldSpec];

  /// Draft pre-filled from this record's current values
  fn draft(&self) -> Draft;

  /// Parse a draft into the typed payload, or report per-field problems
  fn payload(draft: &Draft, scope: &Scope) -> Result<Self::Payload, FieldErrors>;
}

/// Required-field check shared by all forms. Does not touch the network.
pub fn validate_required(fields: &[FieldSpec], draft: &Draft) -> FieldErrors {
  fields
    .iter()
    .filter(|f| f.required && draft.get(f.key).trim().is_empty())
    .map(|f| (f.key.to_string(), format!("{} is required", f.label)))
    .collect()
}

/// Turn a built payload plus collected errors into a result.
pub fn finish<T>(payload: T, errors: FieldErrors) -> Result<T, FieldErrors> {
  if errors.is_empty() {
    Ok(payload)
  } else {
    Err(errors)
  }
}

/// Unsaved field values of an open form, stored as raw input text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
  values: BTreeMap<&'static str, String>,
}

impl Draft {
  /// Draft with every field at its schema default
  pub fn defaults(fields: &[FieldSpec]) -> Self {
    Self {
      values: fields
        .iter()
        .map(|f| (f.key, f.default.to_string()))
        .collect(),
    }
  }

  /// Builder used by `Editable::draft`
  pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
    self.values.insert(key, value.to_string());
    self
  }

  /// Builder for optional values: `None` becomes an empty input
  pub fn with_opt<V: ToString>(self, key: &'static str, value: Option<V>) -> Self {
    let value = value.map(|v| v.to_string()).unwrap_or_default();
    self.with(key, value)
  }

  pub fn set(&mut self, key: &'static str, value: String) {
    self.values.insert(key, value);
  }

  pub fn get(&self, key: &str) -> &str {
    self.values.get(key).map(String::as_str).unwrap_or("")
  }

  /// Trimmed text, `None` when blank
  pub fn text(&self, key: &str) -> Option<String> {
    let v = self.get(key).trim();
    (!v.is_empty()).then(|| v.to_string())
  }

  pub fn required_text(&self, key: &str, errors: &mut FieldErrors) -> String {
    match self.text(key) {
      Some(v) => v,
      None => {
        errors.insert(key.to_string(), "This field is required".into());
        String::new()
      }
    }
  }

  pub fn flag(&self, key: &str) -> bool {
    matches!(
      self.get(key).trim().to_lowercase().as_str(),
      "true" | "yes" | "1" | "y"
    )
  }

  /// Parse a number field; blank is `None`, garbage is a field error
  pub fn number<T: FromStr>(&self, key: &str, errors: &mut FieldErrors) -> Option<T> {
    let raw = self.text(key)?;
    match raw.parse::<T>() {
      Ok(v) => Some(v),
      Err(_) => {
        errors.insert(key.to_string(), format!("'{}' is not a valid number", raw));
        None
      }
    }
  }

  pub fn id(&self, key: &str, errors: &mut FieldErrors) -> Option<u64> {
    self.number::<u64>(key, errors)
  }

  pub fn decimal(&self, key: &str, errors: &mut FieldErrors) -> Option<Decimal> {
    let value = self.number::<Decimal>(key, errors)?;
    if value.is_sign_negative() {
      errors.insert(key.to_string(), "Must not be negative".into());
      return None;
    }
    Some(value)
  }

  pub fn date(&self, key: &str, errors: &mut FieldErrors) -> Option<String> {
    let raw = self.text(key)?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
      Ok(d) => Some(d.format("%Y-%m-%d").to_string()),
      Err(_) => {
        errors.insert(key.to_string(), "Use YYYY-MM-DD".into());
        None
      }
    }
  }

  pub fn time(&self, key: &str, errors: &mut FieldErrors) -> Option<String> {
    let raw = self.text(key)?;
    match NaiveTime::parse_from_str(&raw, "%H:%M") {
      Ok(t) => Some(t.format("%H:%M").to_string()),
      Err(_) => {
        errors.insert(key.to_string(), "Use HH:MM".into());
        None
      }
    }
  }

  /// A value from a fixed choice list
  pub fn choice(
    &self,
    key: &str,
    options: &[&str],
    errors: &mut FieldErrors,
  ) -> Option<String> {
    let raw = self.text(key)?;
    if options.contains(&raw.as_str()) {
      Some(raw)
    } else {
      errors.insert(key.to_string(), format!("Must be one of: {}", options.join(", ")));
      None
    }
  }
}
