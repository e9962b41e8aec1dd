use crate::api::{ApiError, Editable, FieldKind, LookupOption, Resource};
use crate::cache::QueryKey;
use crate::context::AppContext;
use crate::form::FormController;
use crate::notify::Notification;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{FormEvent, FormModal, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{visible_shortcuts, Shortcut, View, ViewAction};
use crate::ui::views::{resource_title, RecordDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tracing::debug;

/// Table of one resource with create/edit/delete, written once for every
/// record type.
pub struct ResourceListView<E: Editable, R: Resource<E>> {
  ctx: AppContext,
  resource: R,
  query: Query<Vec<E>>,
  table_state: TableState,
  search: SearchInput,
  form: FormModal<E>,
  delete: Mutation<Result<(), ApiError>>,
  lookups: Mutation<Vec<(&'static str, Vec<LookupOption>)>>,
}

impl<E: Editable, R: Resource<E>> ResourceListView<E, R> {
  pub fn new(ctx: AppContext, resource: R) -> Self {
    let params = ctx.list_params::<E>();
    let key = QueryKey::list(E::RESOURCE, &params);

    let fetch_resource = resource.clone();
    let mut query = Query::new(ctx.cache.clone(), key, move || {
      let resource = fetch_resource.clone();
      let params = params.clone();
      async move { resource.list(params).await }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      form: FormModal::new(FormController::new(ctx.scope)),
      ctx,
      resource,
      query,
      table_state: TableState::default(),
      search: SearchInput::new(),
      delete: Mutation::new(),
      lookups: Mutation::new(),
    }
  }

  fn records(&self) -> &[E] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Records matching the `/` filter
  fn visible(&self) -> Vec<&E> {
    let needle = self.search.query();
    self
      .records()
      .iter()
      .filter(|r| needle.is_empty() || r.matches(needle))
      .collect()
  }

  fn selected(&self) -> Option<&E> {
    self
      .table_state
      .selected()
      .and_then(|idx| self.visible().get(idx).copied())
  }

  fn open_form(&mut self, record: Option<E>) {
    match record {
      Some(record) => self.form.controller_mut().open_edit(&record),
      None => self.form.controller_mut().open_create(),
    }
    self.load_lookups();
  }

  /// Fetch options for every reference field of the form
  fn load_lookups(&mut self) {
    let references: Vec<(&'static str, &'static str)> = E::fields()
      .iter()
      .filter_map(|f| match f.kind {
        FieldKind::Reference(resource) => Some((f.key, resource)),
        _ => None,
      })
      .collect();
    if references.is_empty() {
      return;
    }

    let ctx = self.ctx.clone();
    self.lookups.start(async move {
      futures::future::join_all(references.into_iter().map(|(key, resource)| {
        let ctx = ctx.clone();
        async move { (key, ctx.lookup(resource).await) }
      }))
      .await
    });
  }

  fn delete_selected(&mut self) {
    let Some(id) = self.selected().map(|r| r.id()) else {
      return;
    };
    let resource = self.resource.clone();
    let cache = self.ctx.cache.clone();
    let started = self.delete.start(async move {
      let result = resource.delete(id).await;
      if result.is_ok() {
        cache.invalidate(&QueryKey::resource(E::RESOURCE));
      }
      result
    });
    if started {
      debug!(resource = E::RESOURCE, id, "delete requested");
    }
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::SubmitRequested) => {
        self
          .form
          .submit(self.resource.clone(), self.ctx.cache.clone());
        return Some(ViewAction::None);
      }
      KeyResult::Event(FormEvent::Closed) | KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        self.table_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.table_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.table_state.select_last(),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('n') => self.open_form(None),
      KeyCode::Char('e') => {
        if let Some(record) = self.selected().cloned() {
          self.open_form(Some(record));
        }
      }
      KeyCode::Char('d') => self.delete_selected(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Enter => {
        if let Some(record) = self.selected() {
          return ViewAction::Push(Box::new(RecordDetailView::<E>::new(
            self.ctx.clone(),
            self.resource.clone(),
            record.id(),
          )));
        }
      }
      // First Esc drops an applied filter
      KeyCode::Esc if !self.search.query().is_empty() => self.search.clear(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible().len();
    ensure_valid_selection(&mut self.table_state, len);

    let name = resource_title(E::RESOURCE);
    let filter = if self.search.query().is_empty() {
      String::new()
    } else {
      format!(" /{}", self.search.query())
    };
    let title = match self.query.state() {
      QueryState::Loading(_) => format!(" {}{} (loading...) ", name, filter),
      QueryState::Error(_) => format!(" {}{} (error) ", name, filter),
      _ => format!(" {}{} ({}) ", name, filter, len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = placeholder(&self.query, !self.search.query().is_empty());
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let columns = E::columns();
    let widths: Vec<Constraint> = columns
      .iter()
      .map(|c| match c.width {
        0 => Constraint::Min(10),
        w => Constraint::Length(w),
      })
      .collect();

    let header = Row::new(
      columns
        .iter()
        .map(|c| Cell::from(c.header).style(Style::default().fg(Color::Yellow).bold())),
    );

    let rows: Vec<Row> = self
      .visible()
      .iter()
      .map(|record| {
        let cells = record.cells().into_iter().zip(columns).enumerate().map(|(i, (text, col))| {
          let text = if col.width == 0 {
            text
          } else {
            truncate(&text, col.width as usize)
          };
          let style = if i == 0 {
            Style::default().fg(Color::Cyan)
          } else {
            Style::default()
          };
          Cell::from(text).style(style)
        });
        Row::new(cells)
      })
      .collect();

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

/// What an empty table shows instead of rows.
fn placeholder<T>(query: &Query<Vec<T>>, filtered: bool) -> String
where
  T: Clone + Send + Sync + 'static,
{
  match query.state() {
    QueryState::Idle | QueryState::Loading(_) => "Loading...".to_string(),
    QueryState::Error(e) => format!("{} Press 'r' to retry.", e.display_message()),
    QueryState::Success(_) if filtered => "No records match the filter.".to_string(),
    QueryState::Success(_) => "No records found.".to_string(),
  }
}

impl<E: Editable, R: Resource<E>> View for ResourceListView<E, R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .unwrap_or_else(|| self.handle_actions(key))
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.form.render(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    resource_title(E::RESOURCE).to_string()
  }

  fn captures_input(&self) -> bool {
    self.form.is_open() || self.search.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    if let Some(note) = self.form.poll() {
      self.ctx.notify(note);
    }

    if let Some(loaded) = self.lookups.poll() {
      for (key, options) in loaded {
        self.form.controller_mut().set_options(key, options);
      }
    }

    if let Some(result) = self.delete.poll() {
      let note = match result {
        Ok(()) => Notification::success("Deleted"),
        Err(e) if e.is_not_found() => Notification::warning("Record was already deleted."),
        Err(e) => e.notification(),
      };
      self.ctx.notify(note);
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let base = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "filter").with_priority(20),
      Shortcut::new("n", "new").with_priority(30),
      Shortcut::new("e", "edit").with_priority(31),
      Shortcut::new("d", "delete").with_priority(32),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("Enter", "details").with_priority(50),
      Shortcut::new("q", "back").with_priority(60),
    ];
    if self.form.is_open() {
      return visible_shortcuts(Vec::new(), Some(&self.form), true);
    }
    base
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Category;
  use crate::config::Config;
  use crate::event::{Event, Notifier};
  use crate::testing::MemoryResource;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::time::Duration;
  use tokio::sync::mpsc::UnboundedReceiver;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn setup() -> (
    ResourceListView<Category, MemoryResource<Category>>,
    MemoryResource<Category>,
    UnboundedReceiver<Event>,
  ) {
    let (notifier, rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let resource: MemoryResource<Category> = MemoryResource::new();
    resource.insert(json!({"id": 1, "name": "Beverages"}));
    resource.insert(json!({"id": 2, "name": "Desserts"}));
    let view = ResourceListView::new(ctx, resource.clone());
    (view, resource, rx)
  }

  async fn settle(view: &mut ResourceListView<Category, MemoryResource<Category>>) {
    for _ in 0..10 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  fn next_message(rx: &mut UnboundedReceiver<Event>) -> Option<String> {
    while let Ok(event) = rx.try_recv() {
      if let Event::Notify(note) = event {
        return Some(note.message);
      }
    }
    None
  }

  fn names(view: &ResourceListView<Category, MemoryResource<Category>>) -> Vec<String> {
    view.visible().iter().map(|c| c.name.clone()).collect()
  }

  #[tokio::test]
  async fn test_loads_rows_then_filters() {
    let (mut view, _resource, _rx) = setup();
    assert_eq!(placeholder(&view.query, false), "Loading...");
    settle(&mut view).await;
    assert_eq!(names(&view), vec!["Beverages", "Desserts"]);

    view.handle_key(key(KeyCode::Char('/')));
    for c in "dess".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    assert_eq!(names(&view), vec!["Desserts"]);
    assert!(!view.captures_input());

    // Esc clears the filter before leaving the view
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::None));
    assert_eq!(names(&view).len(), 2);
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_create_refetches_list() {
    let (mut view, resource, mut rx) = setup();
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('n')));
    assert!(view.captures_input());
    for c in "Snacks".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    assert_eq!(next_message(&mut rx).as_deref(), Some("Created"));
    assert_eq!(names(&view), vec!["Beverages", "Desserts", "Snacks"]);
    assert_eq!(resource.list_calls(), 2);
  }

  #[tokio::test]
  async fn test_delete_missing_row_warns_without_refetch() {
    let (mut view, resource, mut rx) = setup();
    settle(&mut view).await;

    view.table_state.select(Some(1));
    resource.fail_next(ApiError::NotFound("Record not found.".into()));
    view.handle_key(key(KeyCode::Char('d')));
    settle(&mut view).await;

    assert_eq!(
      next_message(&mut rx).as_deref(),
      Some("Record was already deleted.")
    );
    assert_eq!(resource.list_calls(), 1);
    assert_eq!(names(&view).len(), 2);
  }

  #[tokio::test]
  async fn test_delete_removes_selected_row() {
    let (mut view, _resource, mut rx) = setup();
    settle(&mut view).await;
    view.table_state.select(Some(0));

    view.handle_key(key(KeyCode::Char('d')));
    settle(&mut view).await;

    assert_eq!(next_message(&mut rx).as_deref(), Some("Deleted"));
    assert_eq!(names(&view), vec!["Desserts"]);
  }

  #[tokio::test]
  async fn test_failed_load_shows_retry_hint() {
    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let resource: MemoryResource<Category> = MemoryResource::new();
    resource.fail_next(ApiError::Server {
      status: 500,
      message: "boom".into(),
    });
    let mut view = ResourceListView::new(ctx, resource.clone());
    settle(&mut view).await;

    assert!(placeholder(&view.query, false).ends_with("Press 'r' to retry."));

    view.handle_key(key(KeyCode::Char('r')));
    settle(&mut view).await;
    assert_eq!(placeholder(&view.query, false), "No records found.");
  }
}
