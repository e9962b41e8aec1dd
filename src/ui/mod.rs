pub mod components;
pub mod renderfns;
pub mod view;
mod views;

pub use views::root_view;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{ListState, TableState};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumbs and toast
    ])
    .split(frame.area());

  let shortcuts = app.header_shortcuts();
  renderfns::draw_header(
    frame,
    chunks[0],
    &app.title(),
    app.store_id(),
    &shortcuts,
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }
  app.command_input().render_overlay(frame, chunks[1]);

  renderfns::draw_footer(frame, chunks[2], &app.breadcrumbs(), app.toast());
}

/// Any widget state with an optional selected row.
pub trait Selectable {
  fn selected(&self) -> Option<usize>;
  fn select(&mut self, index: Option<usize>);
}

impl Selectable for ListState {
  fn selected(&self) -> Option<usize> {
    ListState::selected(self)
  }

  fn select(&mut self, index: Option<usize>) {
    ListState::select(self, index);
  }
}

impl Selectable for TableState {
  fn selected(&self) -> Option<usize> {
    TableState::selected(self)
  }

  fn select(&mut self, index: Option<usize>) {
    TableState::select(self, index);
  }
}

/// Keep the selection inside `0..len`; select the first row when nothing is.
pub fn ensure_valid_selection<S: Selectable>(state: &mut S, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

/// A rect `percent_x` wide and `height` rows tall, centered in `area`.
pub fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
  let width = (area.width * percent_x / 100).max(20).min(area.width);
  let height = height.min(area.height);
  let x = area.x + (area.width.saturating_sub(width)) / 2;
  let y = area.y + (area.height.saturating_sub(height)) / 2;
  Rect::new(x, y, width, height)
}
