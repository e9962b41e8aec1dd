use crate::api::types::{Cart, MenuItem, OrderType};
use crate::api::{
  ApiError, Entity, FieldErrors, KioskBackend, ListParams, LookupOption, Resource,
};
use crate::cache::QueryKey;
use crate::context::AppContext;
use crate::kiosk::{
  cart_key, needs_zone, orderable, CheckoutRequest, KioskError, KioskSession, PlacedOrder,
  SessionStore,
};
use crate::notify::Notification;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::centered_rect;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{money, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
  Menu,
  Cart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckoutField {
  OrderType,
  Customer,
  Zone,
}

/// Choices in the checkout dialog. `None` means nothing picked.
#[derive(Debug, Default)]
struct CheckoutForm {
  focus: usize,
  order_type: Option<usize>,
  customer: Option<usize>,
  zone: Option<usize>,
  customers: Vec<LookupOption>,
  zones: Vec<LookupOption>,
  errors: FieldErrors,
}

/// Step through `None, 0, 1, .., len - 1` and wrap.
fn cycle(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
  if len == 0 {
    return None;
  }
  let pos = current.map(|i| i + 1).unwrap_or(0);
  let total = len + 1;
  let next = if forward {
    (pos + 1) % total
  } else {
    (pos + total - 1) % total
  };
  next.checked_sub(1)
}

impl CheckoutForm {
  fn fields(&self, order_types: &[OrderType]) -> Vec<CheckoutField> {
    let mut fields = vec![CheckoutField::OrderType, CheckoutField::Customer];
    if needs_zone(order_types, self.order_type_id(order_types)) {
      fields.push(CheckoutField::Zone);
    }
    fields
  }

  fn order_type_id(&self, order_types: &[OrderType]) -> Option<u64> {
    self
      .order_type
      .and_then(|i| order_types.get(i))
      .map(|t| t.id)
  }

  fn focused(&self, order_types: &[OrderType]) -> CheckoutField {
    let fields = self.fields(order_types);
    fields[self.focus.min(fields.len() - 1)]
  }

  fn cycle_focused(&mut self, order_types: &[OrderType], forward: bool) {
    match self.focused(order_types) {
      CheckoutField::OrderType => {
        self.order_type = cycle(self.order_type, order_types.len(), forward);
        self.errors.remove("order_type_id");
      }
      CheckoutField::Customer => {
        self.customer = cycle(self.customer, self.customers.len(), forward);
      }
      CheckoutField::Zone => self.zone = cycle(self.zone, self.zones.len(), forward),
    }
  }

  fn move_focus(&mut self, order_types: &[OrderType], forward: bool) {
    let len = self.fields(order_types).len();
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
  }

  fn request(&self, order_types: &[OrderType]) -> CheckoutRequest {
    let order_type_id = self.order_type_id(order_types);
    let zone_id = if needs_zone(order_types, order_type_id) {
      self.zone.and_then(|i| self.zones.get(i)).map(|z| z.id)
    } else {
      None
    };
    CheckoutRequest {
      order_type_id,
      customer_id: self.customer.and_then(|i| self.customers.get(i)).map(|c| c.id),
      address_id: None,
      zone_id,
    }
  }
}

/// Self-service ordering: browse the menu, fill the cart, check out.
pub struct KioskView<B: KioskBackend, S: SessionStore> {
  ctx: AppContext,
  session: KioskSession<B, S>,
  menu: Query<Vec<MenuItem>>,
  order_types: Query<Vec<OrderType>>,
  cart: Query<Cart>,

  pane: Pane,
  menu_state: ListState,
  cart_state: ListState,

  /// Ok carries the confirmation to show, if any
  cart_action: Mutation<Result<Option<&'static str>, KioskError>>,
  checkout: Option<CheckoutForm>,
  options: Mutation<(Vec<LookupOption>, Vec<LookupOption>)>,
  placing: Mutation<Result<PlacedOrder, KioskError>>,
  placed: Option<PlacedOrder>,
}

impl<B: KioskBackend, S: SessionStore> KioskView<B, S> {
  pub fn new<M, T>(ctx: AppContext, session: KioskSession<B, S>, menu: M, order_types: T) -> Self
  where
    M: Resource<MenuItem>,
    T: Resource<OrderType>,
  {
    let menu_params = ctx.list_params::<MenuItem>();
    let mut menu_query = Query::new(
      ctx.cache.clone(),
      QueryKey::list(MenuItem::RESOURCE, &menu_params),
      move || {
        let menu = menu.clone();
        let params = menu_params.clone();
        async move { menu.list(params).await }
      },
    );
    menu_query.fetch();

    let mut types_query = Query::new(
      ctx.cache.clone(),
      QueryKey::list(OrderType::RESOURCE, &ListParams::new()),
      move || {
        let order_types = order_types.clone();
        async move { order_types.list(ListParams::new()).await }
      },
    );
    types_query.fetch();

    // the kiosk always works on a cart: stored, adopted or freshly created
    let cart_session = session.clone();
    let mut cart = Query::new(ctx.cache.clone(), cart_key(), move || {
      let session = cart_session.clone();
      async move { session.cart().await.map_err(ApiError::from) }
    });
    cart.fetch();

    Self {
      ctx,
      session,
      menu: menu_query,
      order_types: types_query,
      cart,
      pane: Pane::Menu,
      menu_state: ListState::default(),
      cart_state: ListState::default(),
      cart_action: Mutation::new(),
      checkout: None,
      options: Mutation::new(),
      placing: Mutation::new(),
      placed: None,
    }
  }

  fn menu_items(&self) -> Vec<&MenuItem> {
    self
      .menu
      .data()
      .map(|items| orderable(items))
      .unwrap_or_default()
  }

  fn order_type_list(&self) -> &[OrderType] {
    self.order_types.data().map(Vec::as_slice).unwrap_or(&[])
  }

  fn current_cart(&self) -> Option<&Cart> {
    self.cart.data()
  }

  fn add_selected(&mut self) {
    let Some(item_id) = self
      .menu_state
      .selected()
      .and_then(|idx| self.menu_items().get(idx).map(|m| m.id))
    else {
      return;
    };
    let session = self.session.clone();
    self
      .cart_action
      .start(async move { session.add_item(item_id, 1).await.map(|()| Some("Added to cart")) });
  }

  fn remove_selected(&mut self) {
    let Some(line_id) = self.cart_state.selected().and_then(|idx| {
      self
        .current_cart()
        .and_then(|c| c.items.get(idx))
        .map(|line| line.id)
    }) else {
      return;
    };
    let session = self.session.clone();
    self
      .cart_action
      .start(async move { session.remove_item(line_id).await.map(|()| None) });
  }

  fn open_checkout(&mut self) {
    if self.current_cart().is_none_or(|c| c.items.is_empty()) {
      self.ctx.notify(Notification::warning("Cart is empty."));
      return;
    }
    self.checkout = Some(CheckoutForm::default());

    let ctx = self.ctx.clone();
    self.options.start(async move {
      tokio::join!(ctx.lookup("customers"), ctx.lookup("delivery-zones"))
    });
  }

  fn submit_checkout(&mut self) {
    let order_types = self.order_types.data().cloned().unwrap_or_default();
    let Some(form) = &self.checkout else {
      return;
    };
    let request = form.request(&order_types);
    let session = self.session.clone();
    self
      .placing
      .start(async move { session.checkout(request).await });
  }

  fn handle_checkout_key(&mut self, key: KeyEvent) {
    let order_types = self.order_types.data().cloned().unwrap_or_default();
    let placing = self.placing.is_pending();
    let Some(form) = &mut self.checkout else {
      return;
    };
    match key.code {
      KeyCode::Esc if !placing => self.checkout = None,
      KeyCode::Enter => self.submit_checkout(),
      KeyCode::Tab | KeyCode::Down => form.move_focus(&order_types, true),
      KeyCode::BackTab | KeyCode::Up => form.move_focus(&order_types, false),
      KeyCode::Right | KeyCode::Char('l') => form.cycle_focused(&order_types, true),
      KeyCode::Left | KeyCode::Char('h') => form.cycle_focused(&order_types, false),
      _ => {}
    }
  }

  fn render_menu(&mut self, frame: &mut Frame, area: Rect) {
    let focused = self.pane == Pane::Menu;
    let items = self.menu_items();
    let len = items.len();

    let block = Block::default()
      .title(format!(" Menu ({}) ", len))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::Blue }));

    if len == 0 {
      let content = match self.menu.state() {
        QueryState::Idle | QueryState::Loading(_) => "Loading...".to_string(),
        QueryState::Error(e) => format!("{} Press 'r' to retry.", e.display_message()),
        QueryState::Success(_) => "No menu items available.".to_string(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let name_width = area.width.saturating_sub(16) as usize;
    let list_items: Vec<ListItem> = items
      .iter()
      .map(|item| {
        ListItem::new(Line::from(vec![
          Span::raw(format!(
            "{:<width$}",
            truncate(&item.display_name, name_width),
            width = name_width
          )),
          Span::styled(
            format!("{:>8}", money(item.price())),
            Style::default().fg(Color::Green),
          ),
        ]))
      })
      .collect();

    ensure_valid_selection(&mut self.menu_state, len);
    let list = List::new(list_items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.menu_state);
  }

  fn render_cart(&mut self, frame: &mut Frame, area: Rect) {
    let focused = self.pane == Pane::Cart;
    let cart = self.current_cart().cloned();
    let busy = if self.cart_action.is_pending() {
      " (updating...)"
    } else {
      ""
    };

    let title = match &cart {
      Some(cart) => format!(" Cart {}: {} items{} ", cart.cart_code, cart.item_count(), busy),
      None => format!(" Cart{} ", busy),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::Blue }));

    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(block.inner(area));
    frame.render_widget(block, area);

    let Some(cart) = cart.filter(|c| !c.items.is_empty()) else {
      let content = match self.cart.state() {
        QueryState::Idle | QueryState::Loading(None) => "Loading...".to_string(),
        QueryState::Error(e) => e.display_message(),
        _ => "Your cart is empty. Pick something from the menu.".to_string(),
      };
      frame.render_widget(
        Paragraph::new(content).style(Style::default().fg(Color::DarkGray)),
        chunks[0],
      );
      return;
    };

    let label_width = chunks[0].width.saturating_sub(18) as usize;
    let items: Vec<ListItem> = cart
      .items
      .iter()
      .map(|line| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:>3}x ", line.quantity), Style::default().fg(Color::Yellow)),
          Span::raw(format!(
            "{:<width$}",
            truncate(&line.label(), label_width),
            width = label_width
          )),
          Span::styled(
            format!("{:>9}", line.total_price.map(money).unwrap_or_else(|| "-".into())),
            Style::default().fg(Color::Green),
          ),
        ]))
      })
      .collect();

    ensure_valid_selection(&mut self.cart_state, cart.items.len());
    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol(if focused { "> " } else { "  " });
    frame.render_stateful_widget(list, chunks[0], &mut self.cart_state);

    let total = Line::from(vec![
      Span::styled("Total ", Style::default().fg(Color::DarkGray)),
      Span::styled(money(cart.total()), Style::default().fg(Color::White).bold()),
    ])
    .alignment(Alignment::Right);
    frame.render_widget(Paragraph::new(total), chunks[1]);
  }

  fn render_checkout(&self, frame: &mut Frame, area: Rect) {
    let Some(form) = &self.checkout else {
      return;
    };
    let order_types = self.order_type_list();
    let fields = form.fields(order_types);

    let overlay = centered_rect(area, 60, fields.len() as u16 + 6);
    frame.render_widget(Clear, overlay);

    let title = if self.placing.is_pending() {
      " Checkout (placing order...) "
    } else {
      " Checkout "
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let pick = |idx: Option<usize>, labels: Vec<String>, none: &str| -> String {
      idx
        .and_then(|i| labels.get(i).cloned())
        .unwrap_or_else(|| none.to_string())
    };

    let mut lines = Vec::new();
    for (i, field) in fields.iter().enumerate() {
      let focused = i == form.focus.min(fields.len() - 1);
      let (label, value, error) = match field {
        CheckoutField::OrderType => (
          "Order type*",
          pick(
            form.order_type,
            order_types.iter().map(|t| t.name.clone()).collect(),
            "Select...",
          ),
          form.errors.get("order_type_id"),
        ),
        CheckoutField::Customer => (
          "Customer",
          pick(
            form.customer,
            form.customers.iter().map(|c| c.label.clone()).collect(),
            "Walk-in",
          ),
          None,
        ),
        CheckoutField::Zone => (
          "Delivery zone",
          pick(
            form.zone,
            form.zones.iter().map(|z| z.label.clone()).collect(),
            "None",
          ),
          None,
        ),
      };
      let mut spans = vec![
        Span::styled(if focused { "> " } else { "  " }, Style::default().fg(Color::Yellow)),
        Span::styled(format!("{:<14}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(
          value,
          if focused {
            Style::default().fg(Color::White).bold()
          } else {
            Style::default().fg(Color::White)
          },
        ),
      ];
      if focused {
        spans.push(Span::styled("  ←/→", Style::default().fg(Color::DarkGray)));
      }
      if let Some(error) = error {
        spans.push(Span::styled(format!("  {}", error), Style::default().fg(Color::Red)));
      }
      lines.push(Line::from(spans));
    }

    let total = self.current_cart().map(Cart::total).unwrap_or_default();
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
      Span::styled("  Total ", Style::default().fg(Color::DarkGray)),
      Span::styled(money(total), Style::default().fg(Color::White).bold()),
    ]));
    lines.push(Line::styled(
      " Enter place order  Tab next  Esc cancel",
      Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn render_thank_you(&self, order: &PlacedOrder, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Order placed ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green));
    let mut lines = vec![
      Line::raw(""),
      Line::styled("Thank you!", Style::default().fg(Color::Green).bold()),
      Line::raw(""),
      Line::from(vec![
        Span::styled("Your bill number is ", Style::default().fg(Color::DarkGray)),
        Span::styled(order.bill_no.clone(), Style::default().fg(Color::Yellow).bold()),
      ]),
    ];
    if let Some(amount) = order.net_amount {
      lines.push(Line::from(vec![
        Span::styled("Total ", Style::default().fg(Color::DarkGray)),
        Span::raw(money(amount)),
      ]));
    }
    lines.push(Line::raw(""));
    lines.push(Line::styled(
      "Press any key to start a new order",
      Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(
      Paragraph::new(lines).block(block).alignment(Alignment::Center),
      area,
    );
  }
}

impl<B: KioskBackend, S: SessionStore> View for KioskView<B, S> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.placed.is_some() {
      self.placed = None;
      return ViewAction::None;
    }
    if self.checkout.is_some() {
      self.handle_checkout_key(key);
      return ViewAction::None;
    }

    match (self.pane, key.code) {
      (_, KeyCode::Tab) | (_, KeyCode::BackTab) => {
        self.pane = match self.pane {
          Pane::Menu => Pane::Cart,
          Pane::Cart => Pane::Menu,
        };
      }
      (Pane::Menu, KeyCode::Char('j') | KeyCode::Down) => self.menu_state.select_next(),
      (Pane::Menu, KeyCode::Char('k') | KeyCode::Up) => self.menu_state.select_previous(),
      (Pane::Cart, KeyCode::Char('j') | KeyCode::Down) => self.cart_state.select_next(),
      (Pane::Cart, KeyCode::Char('k') | KeyCode::Up) => self.cart_state.select_previous(),
      (Pane::Menu, KeyCode::Enter | KeyCode::Char('a')) => self.add_selected(),
      (Pane::Cart, KeyCode::Char('d') | KeyCode::Delete) => self.remove_selected(),
      (_, KeyCode::Char('c')) => self.open_checkout(),
      (_, KeyCode::Char('r')) => {
        self.menu.refetch();
        self.cart.refetch();
      }
      (_, KeyCode::Char('q') | KeyCode::Esc) => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    if let Some(order) = &self.placed {
      self.render_thank_you(order, frame, area);
      return;
    }

    let chunks = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
      .split(area);
    self.render_menu(frame, chunks[0]);
    self.render_cart(frame, chunks[1]);
    self.render_checkout(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Kiosk".to_string()
  }

  fn captures_input(&self) -> bool {
    self.checkout.is_some() || self.placed.is_some()
  }

  fn tick(&mut self) {
    self.menu.poll();
    self.order_types.poll();
    self.cart.poll();

    match self.cart_action.poll() {
      Some(Ok(Some(message))) => self.ctx.notify(Notification::success(message)),
      Some(Err(e)) => self.ctx.notify(e.notification()),
      Some(Ok(None)) | None => {}
    }

    if let Some((customers, zones)) = self.options.poll() {
      if let Some(form) = &mut self.checkout {
        form.customers = customers;
        form.zones = zones;
      }
    }

    if let Some(result) = self.placing.poll() {
      match result {
        Ok(order) => {
          self
            .ctx
            .notify(Notification::success(format!("Order {} placed", order.bill_no)));
          self.checkout = None;
          self.placed = Some(order);
        }
        Err(KioskError::Validation(errors)) => {
          if let Some(form) = &mut self.checkout {
            form.errors = errors;
          }
        }
        Err(e) => {
          self.checkout = None;
          self.ctx.notify(e.notification());
        }
      }
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.checkout.is_some() {
      return vec![
        Shortcut::new("Enter", "place order").with_priority(10),
        Shortcut::new("←/→", "choose").with_priority(20),
        Shortcut::new("Esc", "cancel").with_priority(30),
      ];
    }
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("Tab", "switch pane").with_priority(20),
      Shortcut::new("c", "checkout").with_priority(40),
      Shortcut::new("q", "back").with_priority(50),
    ];
    match self.pane {
      Pane::Menu => shortcuts.push(Shortcut::new("Enter", "add").with_priority(30)),
      Pane::Cart => shortcuts.push(Shortcut::new("d", "remove").with_priority(30)),
    }
    shortcuts.sort_by_key(|s| s.priority);
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;
  use crate::config::Config;
  use crate::event::{Event, Notifier};
  use crate::testing::{FakeKiosk, MemoryResource, MemorySessionStore};
  use crossterm::event::KeyModifiers;
  use rust_decimal::Decimal;
  use serde_json::json;
  use std::time::Duration;
  use tokio::sync::mpsc::UnboundedReceiver;

  type TestView = KioskView<FakeKiosk, MemorySessionStore>;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn setup() -> (TestView, FakeKiosk, MemorySessionStore, UnboundedReceiver<Event>) {
    let (notifier, rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let kiosk = FakeKiosk::new().with_price(5, Decimal::new(350, 2));
    let store = MemorySessionStore::default();
    let session = KioskSession::new(kiosk.clone(), store.clone(), ctx.cache.clone(), None);

    let menu: MemoryResource<MenuItem> = MemoryResource::new();
    menu.insert(json!({"id": 4, "display_name": "Sold out", "is_available": false}));
    menu.insert(json!({"id": 5, "display_name": "Burger", "base_price": "3.50"}));
    let order_types: MemoryResource<OrderType> = MemoryResource::new();
    order_types.insert(json!({"id": 1, "type_name": "Dine In"}));
    order_types.insert(json!({"id": 2, "type_name": "Delivery"}));

    let view = KioskView::new(ctx, session, menu, order_types);
    (view, kiosk, store, rx)
  }

  async fn settle(view: &mut TestView) {
    for _ in 0..10 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  fn messages(rx: &mut UnboundedReceiver<Event>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok())
      .filter_map(|e| match e {
        Event::Notify(n) => Some(n.message),
        _ => None,
      })
      .collect()
  }

  #[tokio::test]
  async fn test_opening_kiosk_creates_cart() {
    let (mut view, kiosk, store, _rx) = setup();
    settle(&mut view).await;

    assert_eq!(view.menu_items().len(), 1);
    let cart = view.current_cart().unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(store.load(), Some(cart.id));
    assert_eq!(kiosk.create_calls(), 1);
  }

  #[tokio::test]
  async fn test_opening_kiosk_adopts_active_cart() {
    let kiosk = FakeKiosk::new();
    let other = KioskSession::new(
      kiosk.clone(),
      MemorySessionStore::default(),
      crate::cache::QueryCache::default(),
      None,
    );
    let existing = other.acquire().await.unwrap();

    let (notifier, _rx) = Notifier::channel();
    let ctx = AppContext::new(Config::default(), notifier).unwrap();
    let store = MemorySessionStore::default();
    let session = KioskSession::new(kiosk.clone(), store.clone(), ctx.cache.clone(), None);
    let mut view: TestView = KioskView::new(
      ctx,
      session,
      MemoryResource::<MenuItem>::new(),
      MemoryResource::<OrderType>::new(),
    );
    settle(&mut view).await;

    assert_eq!(view.current_cart().map(|c| c.id), Some(existing));
    assert_eq!(store.load(), Some(existing));
    assert_eq!(kiosk.create_calls(), 1);
  }

  #[tokio::test]
  async fn test_add_then_remove_updates_total() {
    let (mut view, _kiosk, _store, mut rx) = setup();
    settle(&mut view).await;
    view.menu_state.select(Some(0));

    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    assert_eq!(messages(&mut rx), vec!["Added to cart"]);
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    assert_eq!(view.current_cart().unwrap().total(), Decimal::new(700, 2));

    view.handle_key(key(KeyCode::Tab));
    view.cart_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('d')));
    settle(&mut view).await;
    assert_eq!(view.current_cart().unwrap().items.len(), 1);
    assert_eq!(view.current_cart().unwrap().total(), Decimal::new(350, 2));
    // removal is quiet
    assert_eq!(messages(&mut rx), vec!["Added to cart"]);
  }

  #[tokio::test]
  async fn test_checkout_requires_order_type() {
    let (mut view, kiosk, _store, _rx) = setup();
    settle(&mut view).await;
    view.menu_state.select(Some(0));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('c')));
    assert!(view.captures_input());
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    let form = view.checkout.as_ref().unwrap();
    assert!(form.errors.contains_key("order_type_id"));
    assert_eq!(kiosk.checkout_calls(), 0);
  }

  #[tokio::test]
  async fn test_checkout_places_order_and_forgets_cart() {
    let (mut view, kiosk, store, mut rx) = setup();
    settle(&mut view).await;
    view.menu_state.select(Some(0));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('c')));
    // pick "Dine In"
    view.handle_key(key(KeyCode::Right));
    view.handle_key(key(KeyCode::Enter));
    let paid_cart = store.load();
    settle(&mut view).await;

    let order = view.placed.clone().unwrap();
    assert!(order.bill_no.starts_with("B-"));
    assert_eq!(kiosk.checkout_calls(), 1);
    assert!(messages(&mut rx).iter().any(|m| m.starts_with("Order B-")));

    // any key returns to the menu with a fresh, empty cart
    view.handle_key(key(KeyCode::Char('x')));
    assert!(!view.captures_input());
    settle(&mut view).await;
    let cart = view.current_cart().unwrap();
    assert!(cart.items.is_empty());
    assert_ne!(Some(cart.id), paid_cart);
    assert_eq!(store.load(), Some(cart.id));
    assert_eq!(kiosk.create_calls(), 2);
  }

  #[tokio::test]
  async fn test_zone_only_offered_for_delivery() {
    let (mut view, _kiosk, _store, _rx) = setup();
    settle(&mut view).await;
    let types = view.order_type_list().to_vec();

    let mut form = CheckoutForm {
      order_type: Some(0),
      zones: vec![LookupOption {
        id: 7,
        label: "North".into(),
      }],
      zone: Some(0),
      ..Default::default()
    };
    assert_eq!(form.fields(&types).len(), 2);
    assert_eq!(form.request(&types).zone_id, None);

    form.order_type = Some(1);
    assert_eq!(form.fields(&types).len(), 3);
    assert_eq!(form.request(&types).zone_id, Some(7));
  }

  #[tokio::test]
  async fn test_failed_checkout_closes_dialog_and_forgets_cart() {
    let (mut view, kiosk, store, mut rx) = setup();
    settle(&mut view).await;
    view.menu_state.select(Some(0));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    let cart_id = store.load();

    kiosk.fail_checkout(ApiError::Server {
      status: 500,
      message: "boom".into(),
    });
    view.handle_key(key(KeyCode::Char('c')));
    view.handle_key(key(KeyCode::Right));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    assert!(view.placed.is_none());
    assert!(view.checkout.is_none());
    assert!(messages(&mut rx)
      .iter()
      .any(|m| m == "Checkout failed. Cart may have expired."));

    // the server still lists it as active, so the reload adopts it again
    assert_eq!(store.load(), cart_id);
    assert_eq!(view.current_cart().map(|c| c.id), cart_id);
    assert_eq!(kiosk.create_calls(), 1);
  }

  #[test]
  fn test_cycle_includes_none() {
    assert_eq!(cycle(None, 2, true), Some(0));
    assert_eq!(cycle(Some(1), 2, true), None);
    assert_eq!(cycle(None, 2, false), Some(1));
    assert_eq!(cycle(None, 0, true), None);
  }
}
