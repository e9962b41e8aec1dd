//! In-memory backends for tests.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::api_types::{ApiCartItemRequest, ApiCheckoutRequest, ApiPlacedOrder};
use crate::api::types::{Cart, CartItem, NewCart};
use crate::api::{ApiError, Entity, KioskBackend, ListParams, Resource};
use crate::kiosk::SessionStore;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct MemoryState {
  rows: BTreeMap<u64, Value>,
  next_id: u64,
  list_calls: usize,
  mutation_calls: usize,
  fail_next: Option<ApiError>,
  delay: Duration,
}

/// `Resource` over a map of JSON rows, ids assigned from 1.
pub struct MemoryResource<E> {
  state: Arc<Mutex<MemoryState>>,
  _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for MemoryResource<E> {
  fn clone(&self) -> Self {
    Self {
      state: self.state.clone(),
      _entity: PhantomData,
    }
  }
}

impl<E: Entity> MemoryResource<E> {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(MemoryState {
        next_id: 1,
        ..Default::default()
      })),
      _entity: PhantomData,
    }
  }

  /// Every call sleeps this long before touching the rows
  pub fn with_delay(self, delay: Duration) -> Self {
    lock(&self.state).delay = delay;
    self
  }

  /// Seed a row as the server would return it.
  pub fn insert(&self, row: Value) {
    let mut state = lock(&self.state);
    let id = row["id"].as_u64().unwrap_or(state.next_id);
    state.next_id = state.next_id.max(id + 1);
    state.rows.insert(id, row);
  }

  /// The next call fails with `err`
  pub fn fail_next(&self, err: ApiError) {
    lock(&self.state).fail_next = Some(err);
  }

  pub fn list_calls(&self) -> usize {
    lock(&self.state).list_calls
  }

  /// create + update + delete calls that reached the "server"
  pub fn mutation_calls(&self) -> usize {
    lock(&self.state).mutation_calls
  }

  async fn pause(&self) -> Result<(), ApiError> {
    let delay = lock(&self.state).delay;
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    match lock(&self.state).fail_next.take() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn decode(row: &Value) -> Result<E, ApiError> {
    serde_json::from_value(row.clone()).map_err(|e| ApiError::Decode(e.to_string()))
  }

  fn encode(payload: &E::Payload) -> Result<serde_json::Map<String, Value>, ApiError> {
    match serde_json::to_value(payload) {
      Ok(Value::Object(map)) => Ok(map),
      Ok(other) => Err(ApiError::Decode(format!("payload is not an object: {}", other))),
      Err(e) => Err(ApiError::Decode(e.to_string())),
    }
  }
}

impl<E: Entity> Resource<E> for MemoryResource<E> {
  async fn list(&self, params: ListParams) -> Result<Vec<E>, ApiError> {
    self.pause().await?;
    let mut state = lock(&self.state);
    state.list_calls += 1;
    let store = params.get("store_id").map(String::from);
    state
      .rows
      .values()
      .filter(|row| match (&store, row.get("store_id").and_then(Value::as_u64)) {
        (Some(wanted), Some(actual)) => wanted == &actual.to_string(),
        _ => true,
      })
      .map(Self::decode)
      .collect()
  }

  async fn get(&self, id: u64) -> Result<E, ApiError> {
    self.pause().await?;
    let state = lock(&self.state);
    let row = state
      .rows
      .get(&id)
      .ok_or_else(|| ApiError::NotFound("Record not found.".into()))?;
    Self::decode(row)
  }

  async fn create(&self, payload: &E::Payload) -> Result<E, ApiError> {
    self.pause().await?;
    let mut map = Self::encode(payload)?;
    let mut state = lock(&self.state);
    state.mutation_calls += 1;
    let id = state.next_id;
    state.next_id += 1;
    map.insert("id".into(), Value::from(id));
    let row = Value::Object(map);
    let record = Self::decode(&row)?;
    state.rows.insert(id, row);
    Ok(record)
  }

  async fn update(&self, id: u64, payload: &E::Payload) -> Result<E, ApiError> {
    self.pause().await?;
    let changes = Self::encode(payload)?;
    let mut state = lock(&self.state);
    state.mutation_calls += 1;
    let row = state
      .rows
      .get_mut(&id)
      .ok_or_else(|| ApiError::NotFound("Record not found.".into()))?;
    if let Value::Object(map) = row {
      map.extend(changes);
    }
    Self::decode(row)
  }

  async fn delete(&self, id: u64) -> Result<(), ApiError> {
    self.pause().await?;
    let mut state = lock(&self.state);
    state.mutation_calls += 1;
    state
      .rows
      .remove(&id)
      .map(|_| ())
      .ok_or_else(|| ApiError::NotFound("Record not found.".into()))
  }
}

// ============================================================================
// Kiosk
// ============================================================================

#[derive(Default)]
struct KioskState {
  carts: BTreeMap<u64, Cart>,
  prices: BTreeMap<u64, Decimal>,
  next_id: u64,
  create_calls: usize,
  checkout_calls: usize,
  fail_checkout: Option<ApiError>,
}

/// Kiosk backend that prices lines from a fixed menu and totals carts itself.
#[derive(Clone, Default)]
pub struct FakeKiosk {
  state: Arc<Mutex<KioskState>>,
  create_delay: Duration,
}

impl FakeKiosk {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_price(self, menu_item_id: u64, price: Decimal) -> Self {
    lock(&self.state).prices.insert(menu_item_id, price);
    self
  }

  pub fn with_create_delay(mut self, delay: Duration) -> Self {
    self.create_delay = delay;
    self
  }

  /// Server-side expiry of a cart
  pub fn expire(&self, cart_id: u64) {
    lock(&self.state).carts.remove(&cart_id);
  }

  pub fn fail_checkout(&self, err: ApiError) {
    lock(&self.state).fail_checkout = Some(err);
  }

  pub fn create_calls(&self) -> usize {
    lock(&self.state).create_calls
  }

  pub fn checkout_calls(&self) -> usize {
    lock(&self.state).checkout_calls
  }

  pub fn cart_ids(&self) -> Vec<u64> {
    lock(&self.state).carts.keys().copied().collect()
  }

  fn next_id(state: &mut KioskState) -> u64 {
    state.next_id += 1;
    state.next_id
  }

  fn retotal(cart: &mut Cart) {
    let total = cart
      .items
      .iter()
      .filter_map(|i| i.total_price)
      .sum::<Decimal>();
    cart.total = Some(total);
  }

  fn not_found() -> ApiError {
    ApiError::NotFound("Record not found.".into())
  }
}

impl KioskBackend for FakeKiosk {
  async fn list_active_carts(&self, store_id: Option<u64>) -> Result<Vec<Cart>, ApiError> {
    let state = lock(&self.state);
    Ok(
      state
        .carts
        .values()
        .filter(|c| c.status == "active")
        .filter(|c| store_id.is_none() || c.store_id == store_id)
        .cloned()
        .collect(),
    )
  }

  async fn create_cart(&self, cart: &NewCart) -> Result<Cart, ApiError> {
    if !self.create_delay.is_zero() {
      tokio::time::sleep(self.create_delay).await;
    }
    let mut state = lock(&self.state);
    state.create_calls += 1;
    let id = Self::next_id(&mut state);
    let created = Cart {
      id,
      cart_code: cart.cart_code.clone(),
      table_number: cart.table_number.clone(),
      status: cart.status.clone(),
      total: Some(cart.total),
      store_id: cart.store_id,
      items: Vec::new(),
    };
    state.carts.insert(id, created.clone());
    Ok(created)
  }

  async fn get_cart(&self, cart_id: u64) -> Result<Cart, ApiError> {
    lock(&self.state)
      .carts
      .get(&cart_id)
      .cloned()
      .ok_or_else(Self::not_found)
  }

  async fn add_item(&self, cart_id: u64, item: &ApiCartItemRequest) -> Result<(), ApiError> {
    let mut state = lock(&self.state);
    let price = state
      .prices
      .get(&item.menu_item_id)
      .copied()
      .unwrap_or_default();
    let line_id = Self::next_id(&mut state);
    let cart = state.carts.get_mut(&cart_id).ok_or_else(Self::not_found)?;
    cart.items.push(CartItem {
      id: line_id,
      menu_item_id: item.menu_item_id,
      quantity: item.quantity,
      total_price: Some(price * Decimal::from(item.quantity)),
      menu_item: None,
    });
    Self::retotal(cart);
    Ok(())
  }

  async fn remove_item(&self, cart_id: u64, item_id: u64) -> Result<(), ApiError> {
    let mut state = lock(&self.state);
    let cart = state.carts.get_mut(&cart_id).ok_or_else(Self::not_found)?;
    let before = cart.items.len();
    cart.items.retain(|i| i.id != item_id);
    if cart.items.len() == before {
      return Err(Self::not_found());
    }
    Self::retotal(cart);
    Ok(())
  }

  async fn checkout(&self, request: &ApiCheckoutRequest) -> Result<ApiPlacedOrder, ApiError> {
    let mut state = lock(&self.state);
    state.checkout_calls += 1;
    if let Some(err) = state.fail_checkout.take() {
      return Err(err);
    }
    let cart = state
      .carts
      .remove(&request.cart_id)
      .ok_or_else(Self::not_found)?;
    let id = Self::next_id(&mut state);
    Ok(ApiPlacedOrder {
      id,
      bill_no: Some(format!("B-{:05}", id)),
      net_amount: cart.total,
    })
  }
}

/// Session store that lives as long as the test.
#[derive(Clone, Default)]
pub struct MemorySessionStore(Arc<Mutex<Option<u64>>>);

impl SessionStore for MemorySessionStore {
  fn load(&self) -> Option<u64> {
    *lock(&self.0)
  }

  fn save(&self, cart_id: Option<u64>) {
    *lock(&self.0) = cart_id;
  }
}
