use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::api::api_types::{ApiCartItemRequest, ApiCheckoutRequest};
use crate::api::types::{Cart, NewCart};
use crate::api::{ApiError, FieldErrors, KioskBackend};
use crate::cache::{QueryCache, QueryKey};
use crate::notify::Notification;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KioskError {
  /// The stored cart no longer exists on the server; it has been forgotten.
  #[error("cart expired")]
  Expired,
  /// Checkout input rejected before any request was made.
  #[error("invalid checkout")]
  Validation(FieldErrors),
  /// Checkout failed for another reason; the cart has been forgotten.
  #[error("checkout failed: {0}")]
  Checkout(ApiError),
  #[error(transparent)]
  Api(#[from] ApiError),
}

impl KioskError {
  pub fn notification(&self) -> Notification {
    match self {
      KioskError::Expired => Notification::warning("Cart expired. Please try again."),
      KioskError::Validation(fields) => Notification::warning(
        fields
          .values()
          .next()
          .cloned()
          .unwrap_or_else(|| "Please check the checkout details.".into()),
      ),
      KioskError::Checkout(_) => Notification::error("Checkout failed. Cart may have expired."),
      KioskError::Api(e) => e.notification(),
    }
  }
}

/// For the cart query, which only carries API errors.
impl From<KioskError> for ApiError {
  fn from(err: KioskError) -> Self {
    match err {
      KioskError::Expired => ApiError::NotFound("Cart expired. Please try again.".into()),
      KioskError::Validation(fields) => ApiError::Validation {
        message: "invalid checkout".into(),
        fields: fields.into_iter().map(|(k, v)| (k, vec![v])).collect(),
      },
      KioskError::Checkout(e) | KioskError::Api(e) => e,
    }
  }
}

/// What the customer picked in the checkout dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
  pub order_type_id: Option<u64>,
  pub customer_id: Option<u64>,
  pub address_id: Option<u64>,
  pub zone_id: Option<u64>,
}

/// The order created by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
  pub order_id: u64,
  pub bill_no: String,
  pub net_amount: Option<Decimal>,
}

/// Cache key covering the kiosk's cart data.
pub fn cart_key() -> QueryKey {
  QueryKey::resource("cart")
}

fn carts_key() -> QueryKey {
  QueryKey::resource("carts")
}

/// The kiosk's in-progress order: a persisted cart id plus the rules for
/// acquiring, mutating, recovering and checking out that cart.
///
/// Cheap to clone; clones share state, so at most one cart creation is in
/// flight per session.
pub struct KioskSession<B, S> {
  inner: Arc<Inner<B, S>>,
}

struct Inner<B, S> {
  backend: B,
  store: S,
  cache: QueryCache,
  store_id: Option<u64>,
  acquire_lock: Mutex<()>,
}

impl<B, S> Clone for KioskSession<B, S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<B: KioskBackend, S: SessionStore> KioskSession<B, S> {
  pub fn new(backend: B, store: S, cache: QueryCache, store_id: Option<u64>) -> Self {
    Self {
      inner: Arc::new(Inner {
        backend,
        store,
        cache,
        store_id,
        acquire_lock: Mutex::new(()),
      }),
    }
  }

  /// Currently stored cart id, without touching the network.
  pub fn current(&self) -> Option<u64> {
    self.inner.store.load()
  }

  /// Stored cart, else the store's first active cart, else a new one.
  pub async fn acquire(&self) -> Result<u64, KioskError> {
    let _guard = self.inner.acquire_lock.lock().await;

    if let Some(id) = self.inner.store.load() {
      return Ok(id);
    }

    let active = self.inner.backend.list_active_carts(self.inner.store_id).await?;
    if let Some(cart) = active.first() {
      debug!(cart_id = cart.id, "adopting active cart");
      self.inner.store.save(Some(cart.id));
      return Ok(cart.id);
    }

    let new_cart = NewCart {
      cart_code: format!("KIOSK-{}", Utc::now().timestamp_millis()),
      table_number: None,
      status: "active".into(),
      total: Decimal::ZERO,
      store_id: self.inner.store_id,
    };
    let cart = self.inner.backend.create_cart(&new_cart).await?;
    info!(cart_id = cart.id, code = %cart.cart_code, "created kiosk cart");
    self.inner.store.save(Some(cart.id));
    self.inner.cache.invalidate(&carts_key());
    Ok(cart.id)
  }

  /// Forget `cart_id` after the server reported it missing.
  fn expire(&self, cart_id: u64) -> KioskError {
    warn!(cart_id, "kiosk cart expired");
    self.forget(cart_id);
    KioskError::Expired
  }

  fn forget(&self, cart_id: u64) {
    // a newer cart may already have replaced it
    if self.inner.store.load() == Some(cart_id) {
      self.inner.store.save(None);
    }
    self.invalidate_cart();
  }

  fn invalidate_cart(&self) {
    self.inner.cache.invalidate(&cart_key());
    self.inner.cache.invalidate(&carts_key());
  }

  /// Load the current cart, acquiring one if needed.
  pub async fn cart(&self) -> Result<Cart, KioskError> {
    let cart_id = self.acquire().await?;
    match self.inner.backend.get_cart(cart_id).await {
      Ok(cart) => Ok(cart),
      Err(e) if e.is_not_found() => Err(self.expire(cart_id)),
      Err(e) => Err(e.into()),
    }
  }

  pub async fn add_item(&self, menu_item_id: u64, quantity: u32) -> Result<(), KioskError> {
    let cart_id = self.acquire().await?;
    let request = ApiCartItemRequest {
      menu_item_id,
      quantity,
    };
    match self.inner.backend.add_item(cart_id, &request).await {
      Ok(()) => {
        self.inner.cache.invalidate(&cart_key());
        Ok(())
      }
      Err(e) if e.is_not_found() => Err(self.expire(cart_id)),
      Err(e) => Err(e.into()),
    }
  }

  pub async fn remove_item(&self, item_id: u64) -> Result<(), KioskError> {
    let Some(cart_id) = self.current() else {
      return Err(KioskError::Expired);
    };
    match self.inner.backend.remove_item(cart_id, item_id).await {
      Ok(()) => {
        self.inner.cache.invalidate(&cart_key());
        Ok(())
      }
      Err(e) if e.is_not_found() => Err(self.expire(cart_id)),
      Err(e) => Err(e.into()),
    }
  }

  /// Place the order for the current cart.
  ///
  /// The cart id is forgotten whatever the outcome, so the next interaction
  /// starts from a fresh or adopted cart.
  pub async fn checkout(&self, request: CheckoutRequest) -> Result<PlacedOrder, KioskError> {
    let Some(order_type_id) = request.order_type_id else {
      return Err(KioskError::Validation(FieldErrors::from([(
        "order_type_id".to_string(),
        "Please select an order type".to_string(),
      )])));
    };
    let Some(cart_id) = self.current() else {
      return Err(KioskError::Expired);
    };

    let body = ApiCheckoutRequest {
      cart_id,
      order_type_id,
      customer_id: request.customer_id,
      store_id: self.inner.store_id,
      address_id: request.address_id,
      zone_id: request.zone_id,
    };

    match self.inner.backend.checkout(&body).await {
      Ok(order) => {
        info!(cart_id, order_id = order.id, "kiosk checkout");
        self.forget(cart_id);
        for resource in ["orders", "kitchen-tickets"] {
          self.inner.cache.invalidate(&QueryKey::resource(resource));
        }
        Ok(PlacedOrder {
          order_id: order.id,
          bill_no: order.bill_no.unwrap_or_else(|| format!("#{}", order.id)),
          net_amount: order.net_amount,
        })
      }
      Err(e) if e.is_not_found() => Err(self.expire(cart_id)),
      Err(e) => {
        warn!(cart_id, error = %e, "kiosk checkout failed");
        self.forget(cart_id);
        Err(KioskError::Checkout(e))
      }
    }
  }
}
