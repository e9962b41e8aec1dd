use crate::api::types::{Product, StockBatch, WasteLog};
use crate::api::{Entity, ListParams, Resource};
use crate::cache::QueryKey;
use crate::context::AppContext;
use crate::query::{Query, QueryState};
use crate::summary::{summarize, InventoryRow, StockStatus};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{money, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::RecordDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

fn list_query<E, R>(ctx: &AppContext, resource: R, params: ListParams) -> Query<Vec<E>>
where
  E: Entity,
  R: Resource<E>,
{
  let key = QueryKey::list(E::RESOURCE, &params);
  let mut query = Query::new(ctx.cache.clone(), key, move || {
    let resource = resource.clone();
    let params = params.clone();
    async move { resource.list(params).await }
  });
  query.fetch();
  query
}

/// Stock, batches and waste per product for the current store
pub struct InventoryView<P: Resource<Product>> {
  ctx: AppContext,
  products_resource: P,
  products: Query<Vec<Product>>,
  batches: Query<Vec<StockBatch>>,
  waste: Query<Vec<WasteLog>>,
  table_state: TableState,
  search: SearchInput,
}

impl<P: Resource<Product>> InventoryView<P> {
  pub fn new<B, W>(ctx: AppContext, products: P, batches: B, waste: W) -> Self
  where
    B: Resource<StockBatch>,
    W: Resource<WasteLog>,
  {
    // all products on one page
    let product_params = ctx.list_params::<Product>().with("per_page", 0);
    Self {
      products: list_query(&ctx, products.clone(), product_params),
      batches: list_query(&ctx, batches, ctx.list_params::<StockBatch>()),
      waste: list_query(&ctx, waste, ctx.list_params::<WasteLog>()),
      ctx,
      products_resource: products,
      table_state: TableState::default(),
      search: SearchInput::new(),
    }
  }

  fn rows(&self) -> Vec<InventoryRow> {
    let Some(products) = self.products.data() else {
      return Vec::new();
    };
    let batches = self.batches.data().map(Vec::as_slice).unwrap_or(&[]);
    let waste = self.waste.data().map(Vec::as_slice).unwrap_or(&[]);

    let needle = self.search.query().to_lowercase();
    summarize(products, batches, waste)
      .into_iter()
      .filter(|row| {
        needle.is_empty()
          || row.name.to_lowercase().contains(&needle)
          || row
            .sku
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(&needle))
      })
      .collect()
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let rows = self.rows();
    ensure_valid_selection(&mut self.table_state, rows.len());

    let low = rows
      .iter()
      .filter(|r| r.status() != StockStatus::Ok)
      .count();
    let title = match self.products.state() {
      QueryState::Loading(_) => " Inventory (loading...) ".to_string(),
      _ => format!(" Inventory ({} products, {} low or out) ", rows.len(), low),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() {
      let content = match self.products.state() {
        QueryState::Idle | QueryState::Loading(_) => "Loading...".to_string(),
        QueryState::Error(e) => format!("{} Press 'r' to retry.", e.display_message()),
        QueryState::Success(_) if !self.search.query().is_empty() => {
          "No products match the filter.".to_string()
        }
        QueryState::Success(_) => "No products. Add them via :products.".to_string(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(
      [
        "Name", "SKU", "Category", "Price", "Stock", "Batches", "Waste", "Status", "Avail",
      ]
      .into_iter()
      .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).bold())),
    );
    let widths = [
      Constraint::Min(16),
      Constraint::Length(10),
      Constraint::Length(14),
      Constraint::Length(9),
      Constraint::Length(8),
      Constraint::Length(8),
      Constraint::Length(10),
      Constraint::Length(10),
      Constraint::Length(5),
    ];

    let table_rows: Vec<Row> = rows
      .iter()
      .map(|row| {
        let status = row.status();
        let status_style = match status {
          StockStatus::Out => Style::default().fg(Color::Gray),
          StockStatus::Low => Style::default().fg(Color::Red),
          StockStatus::Ok => Style::default().fg(Color::Green),
        };
        Row::new(vec![
          Cell::from(row.name.clone()),
          Cell::from(truncate(row.sku.as_deref().unwrap_or("-"), 10)),
          Cell::from(truncate(row.category.as_deref().unwrap_or("-"), 14)),
          Cell::from(row.price.map(money).unwrap_or_else(|| "-".into())),
          Cell::from(row.stock.normalize().to_string()),
          Cell::from(row.batches.to_string()),
          Cell::from(row.waste_text()),
          Cell::from(status.label()).style(status_style),
          Cell::from(if row.available { "Yes" } else { "No" }),
        ])
      })
      .collect();

    let table = Table::new(table_rows, widths)
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

impl<P: Resource<Product>> View for InventoryView<P> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        self.table_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('r') => {
        self.products.refetch();
        self.batches.refetch();
        self.waste.refetch();
      }
      KeyCode::Enter => {
        let selected = self
          .table_state
          .selected()
          .and_then(|idx| self.rows().get(idx).map(|r| r.product_id));
        if let Some(id) = selected {
          return ViewAction::Push(Box::new(RecordDetailView::<Product>::new(
            self.ctx.clone(),
            self.products_resource.clone(),
            id,
          )));
        }
      }
      KeyCode::Esc if !self.search.query().is_empty() => self.search.clear(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Inventory".to_string()
  }

  fn captures_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) {
    self.products.poll();
    self.batches.poll();
    self.waste.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "filter").with_priority(20),
      Shortcut::new("r", "refresh").with_priority(30),
      Shortcut::new("Enter", "product").with_priority(40),
      Shortcut::new("q", "back").with_priority(50),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::event::Notifier;
  use crate::testing::MemoryResource;
  use rust_decimal::Decimal;
  use serde_json::json;
  use std::time::Duration;

  #[tokio::test]
  async fn test_rows_combine_batches_and_waste() {
    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();

    let products: MemoryResource<Product> = MemoryResource::new();
    products.insert(json!({"id": 1, "name": "Milk", "qty": 3}));
    products.insert(json!({"id": 2, "name": "Beans", "qty": 40}));
    let batches: MemoryResource<StockBatch> = MemoryResource::new();
    batches.insert(json!({"id": 1, "product_id": 1, "quantity": "20", "remaining_quantity": "12"}));
    let waste: MemoryResource<WasteLog> = MemoryResource::new();
    waste.insert(json!({"id": 1, "product_id": 2, "quantity": "1.5"}));

    let mut view = InventoryView::new(ctx, products, batches, waste);
    for _ in 0..10 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }

    let rows = view.rows();
    assert_eq!(rows[0].stock, Decimal::from(12));
    assert_eq!(rows[0].status(), StockStatus::Ok);
    assert_eq!(rows[1].stock, Decimal::from(40));
    assert_eq!(rows[1].waste_text(), "1.5 (1)");
  }
}
