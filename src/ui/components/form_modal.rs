use super::KeyResult;
use crate::api::{ApiError, Editable, FieldKind, Resource};
use crate::cache::QueryCache;
use crate::form::{FormController, SubmitRejected, FORM_ERROR_KEY};
use crate::notify::Notification;
use crate::query::Mutation;
use crate::ui::centered_rect;
use crate::ui::view::{ShortcutInfo, ShortcutProvider};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the form modal that the parent view needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter pressed; the view should call `submit` with its resource
  SubmitRequested,
  /// Esc pressed, form discarded
  Closed,
}

/// Create/edit modal: a `FormController` plus its background submit.
pub struct FormModal<E: Editable> {
  controller: FormController<E>,
  submit: Mutation<Result<E, ApiError>>,
}

impl<E: Editable> FormModal<E> {
  pub fn new(controller: FormController<E>) -> Self {
    Self {
      controller,
      submit: Mutation::new(),
    }
  }

  #[cfg(test)]
  pub fn controller(&self) -> &FormController<E> {
    &self.controller
  }

  pub fn controller_mut(&mut self) -> &mut FormController<E> {
    &mut self.controller
  }

  pub fn is_open(&self) -> bool {
    self.controller.is_open()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.controller.is_open() {
      return KeyResult::NotHandled;
    }
    let form = &mut self.controller;

    match key.code {
      KeyCode::Esc => {
        if form.is_submitting() {
          return KeyResult::Handled;
        }
        form.close();
        KeyResult::Event(FormEvent::Closed)
      }
      KeyCode::Enter => KeyResult::Event(FormEvent::SubmitRequested),
      KeyCode::Tab | KeyCode::Down => {
        form.focus_next();
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        form.focus_prev();
        KeyResult::Handled
      }
      KeyCode::Left => {
        form.cycle(false);
        KeyResult::Handled
      }
      KeyCode::Right => {
        form.cycle(true);
        KeyResult::Handled
      }
      KeyCode::Backspace => {
        form.backspace();
        KeyResult::Handled
      }
      KeyCode::Char(c) => {
        form.input_char(c);
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Start the create/update in the background. Local validation problems
  /// stay in the form; nothing is sent for them.
  pub fn submit<R: Resource<E>>(&mut self, resource: R, cache: QueryCache) {
    match self.controller.begin_submit() {
      Ok(submission) => {
        self.submit.start(submission.run(resource, cache));
      }
      Err(SubmitRejected::Invalid(errors)) => {
        tracing::debug!(resource = E::RESOURCE, fields = ?errors.keys().collect::<Vec<_>>(), "form invalid");
      }
      Err(SubmitRejected::InFlight | SubmitRejected::NotOpen) => {}
    }
  }

  /// Apply a finished submit. Returns the notification to show.
  pub fn poll(&mut self) -> Option<Notification> {
    let result = self.submit.poll()?;
    self.controller.finish(result)
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    if !self.controller.is_open() {
      return;
    }
    let form = &self.controller;
    let fields = form.fields();
    let errors = form.errors();

    let form_error = errors.get(FORM_ERROR_KEY);
    let height = fields.len() as u16 + 4 + u16::from(form_error.is_some());
    let overlay = centered_rect(area, 70, height);
    frame.render_widget(Clear, overlay);

    let title = if form.is_submitting() {
      format!(" {} (saving...) ", form.title())
    } else {
      format!(" {} ", form.title())
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let label_width = fields
      .iter()
      .map(|f| f.label.chars().count() + 1)
      .max()
      .unwrap_or(8);

    let mut lines = Vec::new();
    if let Some(message) = form_error {
      lines.push(Line::styled(message.clone(), Style::default().fg(Color::Red)));
    }
    for (idx, field) in fields.iter().enumerate() {
      let focused = idx == form.focus();
      let label = if field.required {
        format!("{}*", field.label)
      } else {
        field.label.to_string()
      };
      let mut spans = vec![
        Span::styled(
          if focused { "> " } else { "  " },
          Style::default().fg(Color::Yellow),
        ),
        Span::styled(
          format!("{:<width$} ", label, width = label_width),
          Style::default().fg(Color::DarkGray),
        ),
      ];
      let value_style = if focused {
        Style::default().fg(Color::White).bold()
      } else {
        Style::default().fg(Color::White)
      };
      spans.push(Span::styled(form.display_value(field), value_style));
      if focused && matches!(field.kind, FieldKind::Choice(_) | FieldKind::Reference(_)) {
        spans.push(Span::styled("  ←/→", Style::default().fg(Color::DarkGray)));
      }
      if let Some(error) = errors.get(field.key) {
        spans.push(Span::styled(format!("  {}", error), Style::default().fg(Color::Red)));
      }
      lines.push(Line::from(spans));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
      " Enter save  Tab next  Esc cancel",
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

impl<E: Editable> ShortcutProvider for FormModal<E> {
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "save").when_active().with_priority(1),
      ShortcutInfo::new("Tab", "next field").when_active().with_priority(2),
      ShortcutInfo::new("Esc", "cancel").when_active().with_priority(3),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Category;
  use crate::api::Scope;
  use crate::testing::MemoryResource;
  use crossterm::event::KeyModifiers;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_typed_form_submits_once() {
    let resource: MemoryResource<Category> = MemoryResource::new();
    let mut modal = FormModal::new(FormController::<Category>::new(Scope::default()));
    modal.controller_mut().open_create();

    for c in "Drinks".chars() {
      modal.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      modal.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::SubmitRequested)
    );
    modal.submit(resource.clone(), QueryCache::default());
    // second Enter while saving is ignored
    modal.submit(resource.clone(), QueryCache::default());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let note = modal.poll().unwrap();
    assert_eq!(note.message, "Created");
    assert!(!modal.is_open());
    assert_eq!(resource.mutation_calls(), 1);
  }

  #[tokio::test]
  async fn test_required_field_blocks_submit() {
    let resource: MemoryResource<Category> = MemoryResource::new();
    let mut modal = FormModal::new(FormController::<Category>::new(Scope::default()));
    modal.controller_mut().open_create();
    modal.submit(resource.clone(), QueryCache::default());

    assert!(modal.is_open());
    assert!(modal.controller().errors().contains_key("name"));
    assert_eq!(resource.mutation_calls(), 0);
  }

  #[test]
  fn test_escape_closes() {
    let mut modal = FormModal::new(FormController::<Category>::new(Scope::default()));
    assert_eq!(modal.handle_key(key(KeyCode::Esc)), KeyResult::NotHandled);
    modal.controller_mut().open_create();
    assert_eq!(
      modal.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Closed)
    );
    assert!(!modal.is_open());
  }
}
