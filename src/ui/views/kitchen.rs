use crate::api::types::{KitchenTicket, TicketStatusPayload, TICKET_STATUSES};
use crate::api::{ApiError, Entity, ListParams, Resource};
use crate::cache::QueryKey;
use crate::context::AppContext;
use crate::notify::Notification;
use crate::query::{Mutation, Query, QueryState};
use crate::summary::kitchen::{
  bill_label, is_rush, line_needs, next_status, status_label, time_ago,
};
use crate::ui::components::{KeyResult, Picker, PickerEvent};
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use tracing::info;

/// Swimlane board of kitchen tickets, one column per status
pub struct KitchenView<R: Resource<KitchenTicket>> {
  ctx: AppContext,
  resource: R,
  query: Query<Vec<KitchenTicket>>,
  update: Mutation<Result<KitchenTicket, ApiError>>,

  // UI state
  selected_filter: Option<usize>, // Index into TICKET_STATUSES, None = "All"
  selected_column: usize,
  selected_row: usize,

  // Components
  picker: Picker,
}

impl<R: Resource<KitchenTicket>> KitchenView<R> {
  pub fn new(ctx: AppContext, resource: R) -> Self {
    let query = Self::ticket_query(&ctx, &resource, None);
    Self {
      ctx,
      resource,
      query,
      update: Mutation::new(),
      selected_filter: None,
      selected_column: 0,
      selected_row: 0,
      picker: Picker::new(),
    }
  }

  /// The status filter goes to the server as a list param
  fn ticket_query(
    ctx: &AppContext,
    resource: &R,
    status: Option<&'static str>,
  ) -> Query<Vec<KitchenTicket>> {
    let params = match status {
      Some(status) => ListParams::new().with("status", status),
      None => ListParams::new(),
    };
    let key = QueryKey::list(KitchenTicket::RESOURCE, &params);
    let resource = resource.clone();
    let mut query = Query::new(ctx.cache.clone(), key, move || {
      let resource = resource.clone();
      let params = params.clone();
      async move { resource.list(params).await }
    });
    query.fetch();
    query
  }

  fn tickets(&self) -> &[KitchenTicket] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Statuses shown as columns under the current filter
  fn columns(&self) -> &'static [&'static str] {
    match self.selected_filter {
      Some(idx) => &TICKET_STATUSES[idx..=idx],
      None => TICKET_STATUSES,
    }
  }

  fn tickets_for(&self, status: &str) -> Vec<&KitchenTicket> {
    self.tickets().iter().filter(|t| t.status == status).collect()
  }

  fn selected_ticket(&self) -> Option<&KitchenTicket> {
    let status = self.columns().get(self.selected_column)?;
    self.tickets_for(status).get(self.selected_row).copied()
  }

  fn set_filter(&mut self, filter: Option<usize>) {
    self.selected_filter = filter;
    self.selected_column = 0;
    self.selected_row = 0;
    self.query = Self::ticket_query(&self.ctx, &self.resource, filter.map(|i| TICKET_STATUSES[i]));
  }

  /// Cycle filter tabs: All, then each status
  fn navigate_filter(&mut self, direction: i32) {
    let total_tabs = TICKET_STATUSES.len() + 1;
    let current_pos = self.selected_filter.map(|i| i + 1).unwrap_or(0);
    let new_pos = if direction > 0 {
      (current_pos + 1) % total_tabs
    } else {
      current_pos.checked_sub(1).unwrap_or(total_tabs - 1)
    };
    self.set_filter(new_pos.checked_sub(1));
  }

  fn navigate(&mut self, direction: i32, horizontal: bool) {
    if horizontal {
      let num_columns = self.columns().len();
      if direction > 0 {
        self.selected_column = (self.selected_column + 1) % num_columns;
      } else {
        self.selected_column = self
          .selected_column
          .checked_sub(1)
          .unwrap_or(num_columns - 1);
      }
      self.selected_row = 0;
      return;
    }

    let Some(status) = self.columns().get(self.selected_column) else {
      return;
    };
    let len = self.tickets_for(status).len();
    if len == 0 {
      return;
    }
    if direction > 0 {
      self.selected_row = (self.selected_row + 1) % len;
    } else {
      self.selected_row = self.selected_row.checked_sub(1).unwrap_or(len - 1);
    }
  }

  fn set_status(&mut self, status: &'static str) {
    let Some(ticket) = self.selected_ticket() else {
      return;
    };
    if ticket.status == status {
      return;
    }
    let id = ticket.id;
    info!(ticket = id, status, "updating ticket status");

    let resource = self.resource.clone();
    let cache = self.ctx.cache.clone();
    self.update.start(async move {
      let payload = TicketStatusPayload {
        status: status.to_string(),
      };
      let result = resource.update(id, &payload).await;
      if result.is_ok() || result.as_ref().is_err_and(ApiError::is_not_found) {
        cache.invalidate(&QueryKey::resource(KitchenTicket::RESOURCE));
      }
      result
    });
  }

  fn open_picker(&mut self) {
    let Some(ticket) = self.selected_ticket() else {
      return;
    };
    let initial = TICKET_STATUSES
      .iter()
      .position(|s| *s == ticket.status)
      .unwrap_or(0);
    let options = TICKET_STATUSES.iter().map(|s| status_label(s)).collect();
    self.picker.show("Update status", options, initial);
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(idx)) => {
        if let Some(status) = TICKET_STATUSES.get(idx) {
          self.set_status(status);
        }
        Some(ViewAction::None)
      }
      KeyResult::Event(PickerEvent::Cancelled) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.navigate(1, false),
      KeyCode::Char('k') | KeyCode::Up => self.navigate(-1, false),
      KeyCode::Char('l') | KeyCode::Right => self.navigate(1, true),
      KeyCode::Char('h') | KeyCode::Left => self.navigate(-1, true),
      KeyCode::Tab => self.navigate_filter(1),
      KeyCode::BackTab => self.navigate_filter(-1),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('a') | KeyCode::Char(' ') => {
        if let Some(next) = self.selected_ticket().and_then(|t| next_status(&t.status)) {
          self.set_status(next);
        }
      }
      KeyCode::Char('s') => self.open_picker(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_filters(&self, frame: &mut Frame, area: Rect) {
    let mut spans = Vec::new();
    let active = Style::default().fg(Color::Black).bg(Color::Cyan);
    let inactive = Style::default().fg(Color::Gray);

    let all_style = if self.selected_filter.is_none() {
      active
    } else {
      inactive
    };
    spans.push(Span::styled(" All ", all_style));

    for (idx, status) in TICKET_STATUSES.iter().enumerate() {
      spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
      let style = if self.selected_filter == Some(idx) {
        active
      } else {
        inactive
      };
      spans.push(Span::styled(format!(" {} ", status_label(status)), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_swimlanes(&self, frame: &mut Frame, area: Rect) {
    let now = Utc::now();
    let columns = self.columns();

    if self.tickets().is_empty() {
      let content = match self.query.state() {
        QueryState::Idle | QueryState::Loading(_) => "Loading...".to_string(),
        QueryState::Error(e) => format!("{} Press 'r' to retry.", e.display_message()),
        QueryState::Success(_) => "No tickets yet. Tickets are created when orders are placed.".to_string(),
      };
      let block = Block::default()
        .title(" Kitchen ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let constraints: Vec<Constraint> = columns
      .iter()
      .map(|_| Constraint::Ratio(1, columns.len() as u32))
      .collect();
    let col_areas = Layout::horizontal(constraints).split(area);

    for (col_idx, status) in columns.iter().enumerate() {
      let tickets = self.tickets_for(status);
      let is_selected_column = col_idx == self.selected_column;
      let col_area = col_areas[col_idx];

      let border_color = if is_selected_column {
        Color::Yellow
      } else {
        status_color(status)
      };

      let title = format!(" {} ({}) ", status_label(status), tickets.len());
      let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

      let width = col_area.width.saturating_sub(4) as usize;
      let items: Vec<ListItem> = tickets
        .iter()
        .map(|ticket| {
          let rush = is_rush(ticket, now);
          let mut spans = vec![Span::styled(
            ticket.ticket_number.clone(),
            Style::default().fg(if rush { Color::Red } else { Color::Cyan }),
          )];
          if rush {
            spans.push(Span::styled(" RUSH", Style::default().fg(Color::Red).bold()));
          }
          let age = format!(" {}", time_ago(ticket, now));
          spans.push(Span::styled(
            truncate(&age, width),
            Style::default().fg(Color::DarkGray),
          ));
          ListItem::new(Line::from(spans))
        })
        .collect();

      let list = List::new(items)
        .block(block)
        .highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

      if is_selected_column {
        let mut state = ListState::default();
        state.select(Some(self.selected_row));
        frame.render_stateful_widget(list, col_area, &mut state);
      } else {
        frame.render_widget(list, col_area);
      }
    }
  }

  fn render_ticket(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Ticket ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(ticket) = self.selected_ticket() else {
      let paragraph = Paragraph::new("No ticket selected.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let now = Utc::now();
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
      Line::from(vec![
        Span::styled(ticket.ticket_number.clone(), Style::default().fg(Color::Cyan).bold()),
        Span::raw("  "),
        Span::styled(
          status_label(&ticket.status),
          Style::default().fg(status_color(&ticket.status)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Order  ", label),
        Span::raw(bill_label(ticket)),
      ]),
      Line::from(vec![
        Span::styled("Placed ", label),
        Span::raw(time_ago(ticket, now)),
      ]),
    ];
    if is_rush(ticket, now) {
      lines.push(Line::styled(
        "Rush: waiting too long",
        Style::default().fg(Color::Red).bold(),
      ));
    }
    lines.push(Line::raw(""));

    let needs = line_needs(ticket);
    if needs.is_empty() {
      lines.push(Line::styled("No items on this order.", label));
    }
    for line in needs {
      lines.push(Line::from(vec![
        Span::styled(
          format!("{}x ", line.qty.normalize()),
          Style::default().fg(Color::Yellow),
        ),
        Span::raw(line.label),
      ]));
      for need in line.ingredients {
        lines.push(Line::styled(
          format!("   {} {}", need.amount_text(), need.name),
          label,
        ));
      }
    }

    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      area,
    );
  }
}

impl<R: Resource<KitchenTicket>> View for KitchenView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .unwrap_or_else(|| self.handle_actions(key))
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(area);
    self.render_filters(frame, chunks[0]);

    let body = Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)])
      .split(chunks[1]);
    self.render_swimlanes(frame, body[0]);
    self.render_ticket(frame, body[1]);

    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.selected_filter {
      Some(idx) => format!("Kitchen [{}]", status_label(TICKET_STATUSES[idx])),
      None => "Kitchen".to_string(),
    }
  }

  fn captures_input(&self) -> bool {
    self.picker.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();

    // Keep the cursor on a ticket after the board changed
    if let Some(status) = self.columns().get(self.selected_column) {
      let len = self.tickets_for(status).len();
      if self.selected_row >= len {
        self.selected_row = len.saturating_sub(1);
      }
    }

    if let Some(result) = self.update.poll() {
      let note = match result {
        Ok(_) => Notification::success("Status updated"),
        Err(e) if e.is_not_found() => Notification::warning("Ticket no longer exists."),
        Err(e) => e.notification(),
      };
      self.ctx.notify(note);
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("a", "advance").with_priority(20),
      Shortcut::new("s", "status").with_priority(21),
      Shortcut::new("Tab", "filter").with_priority(30),
      Shortcut::new("h/l", "column").with_priority(31),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("q", "back").with_priority(50),
    ]
  }
}
