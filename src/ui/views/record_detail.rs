use crate::api::{Entity, Resource};
use crate::cache::QueryKey;
use crate::context::AppContext;
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

/// Single record fetched fresh from the server, with its embedded child rows
pub struct RecordDetailView<E: Entity> {
  id: u64,
  query: Query<E>,
  related_state: TableState,
}

impl<E: Entity> RecordDetailView<E> {
  pub fn new<R: Resource<E>>(ctx: AppContext, resource: R, id: u64) -> Self {
    let key = QueryKey::resource(E::RESOURCE).child(id);
    let mut query = Query::new(ctx.cache.clone(), key, move || {
      let resource = resource.clone();
      async move { resource.get(id).await }
    });
    query.fetch();

    Self {
      id,
      query,
      related_state: TableState::default(),
    }
  }

  fn render_fields(&self, record: &E, frame: &mut Frame, area: Rect) {
    let details = record.details();
    let label_width = details
      .iter()
      .map(|(label, _)| label.chars().count())
      .max()
      .unwrap_or(0);

    let lines: Vec<Line> = details
      .into_iter()
      .map(|(label, value)| {
        Line::from(vec![
          Span::styled(
            format!("{:<width$}  ", label, width = label_width),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(value, Style::default().fg(Color::White)),
        ])
      })
      .collect();

    let block = Block::default()
      .title(format!(" {} #{}: {} ", E::LABEL, self.id, record.title()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      area,
    );
  }

  fn render_placeholder(&self, frame: &mut Frame, area: Rect) {
    let content = match self.query.state() {
      QueryState::Error(e) if e.source.is_not_found() => {
        format!("{} #{} no longer exists.", E::LABEL, self.id)
      }
      QueryState::Error(e) => format!("{} Press 'r' to retry.", e.display_message()),
      _ => "Loading...".to_string(),
    };
    let block = Block::default()
      .title(format!(" {} #{} ", E::LABEL, self.id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
  }
}

impl<E: Entity> View for RecordDetailView<E> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.related_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.related_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let Some(record) = self.query.data().cloned() else {
      self.render_placeholder(frame, area);
      return;
    };

    let Some(related) = record.related() else {
      self.render_fields(&record, frame, area);
      return;
    };

    let field_rows = record.details().len() as u16 + 2;
    let chunks = Layout::vertical([Constraint::Length(field_rows), Constraint::Min(3)]).split(area);
    self.render_fields(&record, frame, chunks[0]);

    ensure_valid_selection(&mut self.related_state, related.rows.len());
    let block = Block::default()
      .title(format!(" {} ({}) ", related.title, related.rows.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if related.rows.is_empty() {
      let paragraph = Paragraph::new(format!("No {}.", related.title.to_lowercase()))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[1]);
      return;
    }

    let widths: Vec<Constraint> = related
      .columns
      .iter()
      .map(|c| match c.width {
        0 => Constraint::Min(10),
        w => Constraint::Length(w),
      })
      .collect();
    let header = Row::new(
      related
        .columns
        .iter()
        .map(|c| Cell::from(c.header).style(Style::default().fg(Color::Yellow).bold())),
    );
    let rows: Vec<Row> = related.rows.into_iter().map(Row::new).collect();

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, chunks[1], &mut self.related_state);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(record) => record.title(),
      None => format!("{} #{}", E::LABEL, self.id),
    }
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("r", "refresh").with_priority(20),
      Shortcut::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::MenuItem;
  use crate::api::ApiError;
  use crate::config::Config;
  use crate::event::Notifier;
  use crate::testing::MemoryResource;
  use serde_json::json;
  use std::time::Duration;

  async fn settle(view: &mut RecordDetailView<MenuItem>) {
    for _ in 0..10 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  #[tokio::test]
  async fn test_menu_item_detail_has_ingredients() {
    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let resource: MemoryResource<MenuItem> = MemoryResource::new();
    resource.insert(json!({
      "id": 5, "display_name": "Latte", "base_price": "4.50",
      "ingredients": [{"id": 1, "product_id": 9, "quantity_per_serving": "0.25", "product": {"name": "Milk"}}]
    }));

    let mut view = RecordDetailView::new(ctx, resource, 5);
    assert_eq!(view.breadcrumb_label(), "Menu Item #5");
    settle(&mut view).await;

    let record = view.query.data().unwrap();
    assert_eq!(view.breadcrumb_label(), "Latte");
    assert_eq!(record.related().unwrap().rows.len(), 1);
  }

  #[tokio::test]
  async fn test_missing_record_is_not_found() {
    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let resource: MemoryResource<MenuItem> = MemoryResource::new();

    let mut view = RecordDetailView::new(ctx, resource, 42);
    settle(&mut view).await;

    let error = view.query.error().unwrap();
    assert!(matches!(error.source, ApiError::NotFound(_)));
  }
}
