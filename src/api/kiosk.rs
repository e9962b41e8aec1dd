//! Cart and checkout calls used by the kiosk session.

use std::future::Future;

use super::api_types::{ApiCartItemRequest, ApiCheckoutRequest, ApiCheckoutResponse, ApiPlacedOrder};
use super::client::ApiClient;
use super::error::ApiError;
use super::resource::ListParams;
use super::types::{Cart, NewCart};

/// Backend operations the kiosk needs on top of plain CRUD.
pub trait KioskBackend: Clone + Send + Sync + 'static {
  /// Carts with `status=active` for a store (or all stores)
  fn list_active_carts(
    &self,
    store_id: Option<u64>,
  ) -> impl Future<Output = Result<Vec<Cart>, ApiError>> + Send;

  fn create_cart(&self, cart: &NewCart) -> impl Future<Output = Result<Cart, ApiError>> + Send;

  fn get_cart(&self, cart_id: u64) -> impl Future<Output = Result<Cart, ApiError>> + Send;

  fn add_item(
    &self,
    cart_id: u64,
    item: &ApiCartItemRequest,
  ) -> impl Future<Output = Result<(), ApiError>> + Send;

  fn remove_item(
    &self,
    cart_id: u64,
    item_id: u64,
  ) -> impl Future<Output = Result<(), ApiError>> + Send;

  fn checkout(
    &self,
    request: &ApiCheckoutRequest,
  ) -> impl Future<Output = Result<ApiPlacedOrder, ApiError>> + Send;
}

impl KioskBackend for ApiClient {
  async fn list_active_carts(&self, store_id: Option<u64>) -> Result<Vec<Cart>, ApiError> {
    let mut params = ListParams::new();
    if let Some(id) = store_id {
      params = params.with("store_id", id);
    }
    self.get("v1/carts", &params.with("status", "active")).await
  }

  async fn create_cart(&self, cart: &NewCart) -> Result<Cart, ApiError> {
    self.post("v1/carts", cart).await
  }

  async fn get_cart(&self, cart_id: u64) -> Result<Cart, ApiError> {
    self
      .get(&format!("v1/carts/{}", cart_id), &ListParams::new())
      .await
  }

  async fn add_item(&self, cart_id: u64, item: &ApiCartItemRequest) -> Result<(), ApiError> {
    // response is the created line; the cart is refetched instead
    let _: serde_json::Value = self
      .post(&format!("v1/carts/{}/items", cart_id), item)
      .await?;
    Ok(())
  }

  async fn remove_item(&self, cart_id: u64, item_id: u64) -> Result<(), ApiError> {
    self
      .delete(&format!("v1/carts/{}/items/{}", cart_id, item_id))
      .await
  }

  async fn checkout(&self, request: &ApiCheckoutRequest) -> Result<ApiPlacedOrder, ApiError> {
    let response: ApiCheckoutResponse = self.post("v1/checkout", request).await?;
    response
      .order
      .ok_or_else(|| ApiError::Decode("checkout response has no order".into()))
  }
}
