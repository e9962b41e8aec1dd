//! Create/edit form state for one resource.
//!
//! `Closed -> Open(Create | Edit(id)) -> Submitting -> Closed`, with the
//! draft discarded on close and after a successful submit.

use std::collections::HashMap;
use std::marker::PhantomData;

use thiserror::Error;
use tracing::debug;

use crate::api::schema::validate_required;
use crate::api::{ApiError, Draft, Editable, FieldErrors, FieldKind, FieldSpec, LookupOption, Resource, Scope};
use crate::cache::{QueryCache, QueryKey};
use crate::notify::Notification;

/// Error key for server messages that are not tied to a field.
pub const FORM_ERROR_KEY: &str = "_form";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTarget {
  Create,
  Edit(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
  Closed,
  Open(FormTarget),
  Submitting(FormTarget),
}

/// Why a submit did not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
  #[error("form is not open")]
  NotOpen,
  #[error("a submit is already in flight")]
  InFlight,
  #[error("form has invalid fields")]
  Invalid(FieldErrors),
}

/// A validated payload ready to be sent.
pub struct Submission<E: Editable> {
  pub target: FormTarget,
  pub payload: E::Payload,
}

impl<E: Editable> Submission<E> {
  /// Send the create/update and invalidate the resource on success.
  pub async fn run<R: Resource<E>>(self, resource: R, cache: QueryCache) -> Result<E, ApiError> {
    let result = match self.target {
      FormTarget::Create => resource.create(&self.payload).await,
      FormTarget::Edit(id) => resource.update(id, &self.payload).await,
    };
    // a 404 on update means the list is out of date too
    if result.is_ok() || result.as_ref().is_err_and(ApiError::is_not_found) {
      cache.invalidate(&QueryKey::resource(E::RESOURCE));
    }
    result
  }
}

pub struct FormController<E: Editable> {
  state: FormState,
  draft: Draft,
  errors: FieldErrors,
  focus: usize,
  scope: Scope,
  options: HashMap<&'static str, Vec<LookupOption>>,
  _entity: PhantomData<fn() -> E>,
}

impl<E: Editable> FormController<E> {
  pub fn new(scope: Scope) -> Self {
    Self {
      state: FormState::Closed,
      draft: Draft::default(),
      errors: FieldErrors::new(),
      focus: 0,
      scope,
      options: HashMap::new(),
      _entity: PhantomData,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> FormState {
    self.state
  }

  pub fn is_open(&self) -> bool {
    self.state != FormState::Closed
  }

  pub fn is_submitting(&self) -> bool {
    matches!(self.state, FormState::Submitting(_))
  }

  pub fn fields(&self) -> &'static [FieldSpec] {
    E::fields()
  }

  #[cfg(test)]
  pub fn draft(&self) -> &Draft {
    &self.draft
  }

  pub fn errors(&self) -> &FieldErrors {
    &self.errors
  }

  pub fn title(&self) -> String {
    match self.state {
      FormState::Open(FormTarget::Edit(_)) | FormState::Submitting(FormTarget::Edit(_)) => {
        format!("Edit {}", E::LABEL)
      }
      _ => format!("New {}", E::LABEL),
    }
  }

  /// Open an empty form with schema defaults.
  pub fn open_create(&mut self) {
    self.open(FormTarget::Create, Draft::defaults(E::fields()));
  }

  /// Open a form pre-filled from `record`.
  pub fn open_edit(&mut self, record: &E) {
    self.open(FormTarget::Edit(record.id()), record.draft());
  }

  fn open(&mut self, target: FormTarget, draft: Draft) {
    self.state = FormState::Open(target);
    self.draft = draft;
    self.errors.clear();
    self.focus = 0;
  }

  pub fn close(&mut self) {
    self.state = FormState::Closed;
    self.draft = Draft::default();
    self.errors.clear();
  }

  /// Local required-field check. No network.
  pub fn validate(&mut self) -> FieldErrors {
    self.errors = validate_required(E::fields(), &self.draft);
    self.errors.clone()
  }

  /// Validate and parse the draft, moving to `Submitting`.
  pub fn begin_submit(&mut self) -> Result<Submission<E>, SubmitRejected> {
    let target = match self.state {
      FormState::Closed => return Err(SubmitRejected::NotOpen),
      FormState::Submitting(_) => return Err(SubmitRejected::InFlight),
      FormState::Open(target) => target,
    };

    let errors = self.validate();
    if !errors.is_empty() {
      return Err(SubmitRejected::Invalid(errors));
    }

    let payload = E::payload(&self.draft, &self.scope).map_err(|errors| {
      self.errors = errors.clone();
      SubmitRejected::Invalid(errors)
    })?;

    debug!(resource = E::RESOURCE, ?target, "submitting form");
    self.state = FormState::Submitting(target);
    Ok(Submission { target, payload })
  }

  /// Apply the outcome of a submission. Returns the notification to show.
  pub fn finish(&mut self, result: Result<E, ApiError>) -> Option<Notification> {
    let FormState::Submitting(target) = self.state else {
      return None;
    };

    match result {
      Ok(_) => {
        self.close();
        Some(Notification::success(match target {
          FormTarget::Create => "Created",
          FormTarget::Edit(_) => "Updated",
        }))
      }
      Err(err) => {
        self.state = FormState::Open(target);
        match (&err, err.field_errors()) {
          (ApiError::Validation { message, .. }, Some(fields)) => {
            self.errors = fields;
            if self.errors.is_empty() {
              self.errors.insert(FORM_ERROR_KEY.into(), message.clone());
            }
            None
          }
          _ => Some(err.notification()),
        }
      }
    }
  }

  /// Validate, send and apply the result in one go.
  #[cfg(test)]
  pub async fn submit<R: Resource<E>>(
    &mut self,
    resource: R,
    cache: QueryCache,
  ) -> Result<Option<Notification>, SubmitRejected> {
    let submission = self.begin_submit()?;
    let result = submission.run(resource, cache).await;
    Ok(self.finish(result))
  }

  // ==========================================================================
  // Editing
  // ==========================================================================

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn focused_field(&self) -> Option<&'static FieldSpec> {
    E::fields().get(self.focus)
  }

  pub fn focus_next(&mut self) {
    let len = E::fields().len();
    if len > 0 {
      self.focus = (self.focus + 1) % len;
    }
  }

  pub fn focus_prev(&mut self) {
    let len = E::fields().len();
    if len > 0 {
      self.focus = (self.focus + len - 1) % len;
    }
  }

  /// Options for a reference field, loaded by the view.
  pub fn set_options(&mut self, key: &'static str, options: Vec<LookupOption>) {
    self.options.insert(key, options);
  }

  pub fn options(&self, key: &str) -> Option<&[LookupOption]> {
    self.options.get(key).map(Vec::as_slice)
  }

  /// Value of a field as shown in the form (labels for references).
  pub fn display_value(&self, field: &FieldSpec) -> String {
    let raw = self.draft.get(field.key);
    match field.kind {
      FieldKind::Flag => {
        if self.draft.flag(field.key) {
          "[x]".into()
        } else {
          "[ ]".into()
        }
      }
      FieldKind::Reference(_) => self
        .options(field.key)
        .and_then(|opts| opts.iter().find(|o| o.id.to_string() == raw))
        .map(|o| format!("{} (#{})", o.label, o.id))
        .unwrap_or_else(|| raw.to_string()),
      _ => raw.to_string(),
    }
  }

  fn edit_focused(&mut self, f: impl FnOnce(&FieldSpec, &mut String)) {
    if !matches!(self.state, FormState::Open(_)) {
      return;
    }
    let Some(field) = self.focused_field() else {
      return;
    };
    let mut value = self.draft.get(field.key).to_string();
    f(field, &mut value);
    self.draft.set(field.key, value);
    self.errors.remove(field.key);
    self.errors.remove(FORM_ERROR_KEY);
  }

  /// Type a character into the focused field.
  pub fn input_char(&mut self, c: char) {
    self.edit_focused(|field, value| match field.kind {
      FieldKind::Text | FieldKind::Date | FieldKind::Time => value.push(c),
      FieldKind::Integer | FieldKind::Reference(_) if c.is_ascii_digit() => value.push(c),
      FieldKind::Decimal if c.is_ascii_digit() || c == '.' => value.push(c),
      FieldKind::Flag if c == ' ' => toggle(value),
      _ => {}
    });
  }

  pub fn backspace(&mut self) {
    self.edit_focused(|field, value| {
      if !matches!(field.kind, FieldKind::Flag | FieldKind::Choice(_)) {
        value.pop();
      }
    });
  }

  /// Step a flag, choice or reference field through its values.
  pub fn cycle(&mut self, forward: bool) {
    let options: Vec<String> = match self.focused_field().map(|f| f.kind) {
      Some(FieldKind::Choice(values)) => values.iter().map(|v| v.to_string()).collect(),
      Some(FieldKind::Reference(_)) => {
        let key = self.focused_field().map(|f| f.key).unwrap_or_default();
        std::iter::once(String::new())
          .chain(
            self
              .options(key)
              .unwrap_or_default()
              .iter()
              .map(|o| o.id.to_string()),
          )
          .collect()
      }
      Some(FieldKind::Flag) => {
        self.edit_focused(|_, value| toggle(value));
        return;
      }
      _ => return,
    };

    self.edit_focused(|_, value| {
      if options.is_empty() {
        return;
      }
      let len = options.len();
      let next = match options.iter().position(|o| o == value) {
        Some(i) if forward => (i + 1) % len,
        Some(i) => (i + len - 1) % len,
        None => 0,
      };
      *value = options[next].clone();
    });
  }
}

fn toggle(value: &mut String) {
  let on = matches!(value.as_str(), "true" | "1" | "yes" | "y");
  *value = (!on).to_string();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{Category, Product, Reservation};
  use crate::api::ListParams;
  use crate::notify::Level;
  use crate::testing::MemoryResource;
  use std::collections::BTreeMap;
  use std::time::Duration;

  fn type_text<E: Editable>(form: &mut FormController<E>, text: &str) {
    for c in text.chars() {
      form.input_char(c);
    }
  }

  #[tokio::test]
  async fn test_create_then_list() {
    let resource = MemoryResource::<Category>::new();
    let cache = QueryCache::default();
    let mut form = FormController::<Category>::new(Scope::default());

    form.open_create();
    type_text(&mut form, "Beverages");
    let note = form
      .submit(resource.clone(), cache.clone())
      .await
      .unwrap()
      .unwrap();

    assert_eq!(note.message, "Created");
    assert_eq!(form.state(), FormState::Closed);

    let rows = resource.list(ListParams::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Beverages");
    assert!(rows[0].id > 0);
  }

  #[tokio::test]
  async fn test_rename_category() {
    let resource = MemoryResource::<Category>::new();
    let cache = QueryCache::default();
    let mut form = FormController::<Category>::new(Scope::default());

    form.open_create();
    type_text(&mut form, "Beverages");
    form.submit(resource.clone(), cache.clone()).await.unwrap();
    let created = resource.list(ListParams::new()).await.unwrap().remove(0);

    form.open_edit(&created);
    assert_eq!(form.draft().get("name"), "Beverages");
    for _ in 0.."Beverages".len() {
      form.backspace();
    }
    type_text(&mut form, "Drinks");
    let note = form
      .submit(resource.clone(), cache.clone())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(note.message, "Updated");

    let names: Vec<_> = resource
      .list(ListParams::new())
      .await
      .unwrap()
      .into_iter()
      .map(|c| c.name)
      .collect();
    assert_eq!(names, vec!["Drinks"]);
  }

  #[tokio::test]
  async fn test_submit_invalidates_resource() {
    let resource = MemoryResource::<Category>::new();
    let cache = QueryCache::default();
    let key = QueryKey::list("categories", &ListParams::new());
    let r = resource.clone();
    cache
      .read(&key, move || async move { r.list(ListParams::new()).await })
      .await
      .unwrap();

    let mut form = FormController::<Category>::new(Scope::default());
    form.open_create();
    type_text(&mut form, "Soups");
    form.submit(resource.clone(), cache.clone()).await.unwrap();

    assert_eq!(cache.generation(&key), 1);
  }

  #[tokio::test]
  async fn test_invalid_draft_makes_no_request() {
    let resource = MemoryResource::<Category>::new();
    let mut form = FormController::<Category>::new(Scope::default());

    form.open_create();
    let err = form
      .submit(resource.clone(), QueryCache::default())
      .await
      .unwrap_err();

    assert!(matches!(err, SubmitRejected::Invalid(ref e) if e.contains_key("name")));
    assert_eq!(form.errors()["name"], "Name is required");
    assert_eq!(resource.mutation_calls(), 0);
    assert!(matches!(form.state(), FormState::Open(FormTarget::Create)));
  }

  #[tokio::test]
  async fn test_parse_errors_block_submit() {
    let resource = MemoryResource::<Reservation>::new();
    let mut form = FormController::<Reservation>::new(Scope::default());
    form.open_create();
    form.draft.set("reservation_date", "tomorrow".into());

    let err = form.submit(resource.clone(), QueryCache::default()).await;
    assert!(matches!(err, Err(SubmitRejected::Invalid(_))));
    assert_eq!(form.errors()["reservation_date"], "Use YYYY-MM-DD");
    assert_eq!(resource.mutation_calls(), 0);
  }

  #[tokio::test]
  async fn test_double_submit_single_request() {
    let resource = MemoryResource::<Category>::new().with_delay(Duration::from_millis(20));
    let cache = QueryCache::default();
    let mut form = FormController::<Category>::new(Scope::default());
    form.open_create();
    type_text(&mut form, "Desserts");

    let first = form.begin_submit().unwrap();
    assert!(form.is_submitting());
    assert_eq!(form.begin_submit().err(), Some(SubmitRejected::InFlight));

    let result = first.run(resource.clone(), cache).await;
    form.finish(result);
    assert_eq!(resource.mutation_calls(), 1);
    assert_eq!(form.state(), FormState::Closed);
  }

  #[tokio::test]
  async fn test_server_validation_maps_to_fields() {
    let resource = MemoryResource::<Product>::new();
    resource.fail_next(ApiError::Validation {
      message: "The given data was invalid.".into(),
      fields: BTreeMap::from([("sku".to_string(), vec!["Already taken".to_string()])]),
    });
    let mut form = FormController::<Product>::new(Scope::new(Some(1)));
    form.open_create();
    type_text(&mut form, "Cola");

    let note = form
      .submit(resource.clone(), QueryCache::default())
      .await
      .unwrap();
    assert!(note.is_none());
    assert_eq!(form.errors()["sku"], "Already taken");
    assert!(matches!(form.state(), FormState::Open(FormTarget::Create)));
  }

  #[tokio::test]
  async fn test_server_error_keeps_form_open() {
    let resource = MemoryResource::<Category>::new();
    resource.fail_next(ApiError::Server {
      status: 500,
      message: "An error occurred.".into(),
    });
    let mut form = FormController::<Category>::new(Scope::default());
    form.open_create();
    type_text(&mut form, "Mains");

    let note = form
      .submit(resource.clone(), QueryCache::default())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(note.level, Level::Error);
    assert!(form.is_open());
    assert_eq!(form.draft().get("name"), "Mains");
  }

  #[test]
  fn test_submit_when_closed() {
    let mut form = FormController::<Category>::new(Scope::default());
    assert!(matches!(form.begin_submit(), Err(SubmitRejected::NotOpen)));
  }

  #[test]
  fn test_field_editing() {
    let mut form = FormController::<Product>::new(Scope::default());
    form.open_create();

    // name
    type_text(&mut form, "Tea");
    form.focus_next(); // sku
    form.focus_next(); // price
    type_text(&mut form, "2.5x");
    assert_eq!(form.draft().get("price"), "2.5");

    form.focus_prev();
    form.focus_prev();
    form.focus_prev(); // wraps to availability
    assert_eq!(form.focused_field().unwrap().key, "availability");
    form.cycle(true);
    assert!(!form.draft().flag("availability"));

    form.focus_prev(); // brand
    form.set_options(
      "brand_id",
      vec![LookupOption {
        id: 4,
        label: "Acme".into(),
      }],
    );
    form.cycle(true);
    assert_eq!(form.draft().get("brand_id"), "4");
    let brand = form.focused_field().unwrap();
    assert_eq!(form.display_value(brand), "Acme (#4)");
    form.cycle(true);
    assert_eq!(form.draft().get("brand_id"), "");
  }

  #[test]
  fn test_choice_cycling() {
    let mut form = FormController::<Reservation>::new(Scope::default());
    form.open_create();
    while form.focused_field().unwrap().key != "status" {
      form.focus_next();
    }
    form.cycle(true);
    assert_eq!(form.draft().get("status"), "confirmed");
    form.cycle(false);
    form.cycle(false);
    assert_eq!(form.draft().get("status"), "no_show");
  }
}
