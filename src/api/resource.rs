//! The uniform CRUD surface every resource shares.

use std::future::Future;
use std::marker::PhantomData;

use super::client::ApiClient;
use super::error::ApiError;
use super::schema::Entity;

/// Query parameters for list calls, passed through as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListParams(Vec<(String, String)>);

impl ListParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: &str, value: impl ToString) -> Self {
    self.0.push((key.to_string(), value.to_string()));
    self
  }

  pub fn pairs(&self) -> &[(String, String)] {
    &self.0
  }

  #[cfg(test)]
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .0
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// `{list, get, create, update, delete}` for one collection.
///
/// Implementations only talk to the network; cache invalidation is the
/// caller's job.
pub trait Resource<E: Entity>: Clone + Send + Sync + 'static {
  fn list(&self, params: ListParams) -> impl Future<Output = Result<Vec<E>, ApiError>> + Send;

  fn get(&self, id: u64) -> impl Future<Output = Result<E, ApiError>> + Send;

  fn create(&self, payload: &E::Payload) -> impl Future<Output = Result<E, ApiError>> + Send;

  fn update(
    &self,
    id: u64,
    payload: &E::Payload,
  ) -> impl Future<Output = Result<E, ApiError>> + Send;

  fn delete(&self, id: u64) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// `Resource` backed by the REST client at `/v1/{E::RESOURCE}`.
pub struct RestResource<E> {
  client: ApiClient,
  _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for RestResource<E> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      _entity: PhantomData,
    }
  }
}

impl<E: Entity> RestResource<E> {
  pub fn new(client: ApiClient) -> Self {
    Self {
      client,
      _entity: PhantomData,
    }
  }

  fn collection() -> String {
    format!("v1/{}", E::RESOURCE)
  }

  fn member(id: u64) -> String {
    format!("v1/{}/{}", E::RESOURCE, id)
  }
}

impl<E: Entity> Resource<E> for RestResource<E> {
  async fn list(&self, params: ListParams) -> Result<Vec<E>, ApiError> {
    self.client.get(&Self::collection(), &params).await
  }

  async fn get(&self, id: u64) -> Result<E, ApiError> {
    self.client.get(&Self::member(id), &ListParams::new()).await
  }

  async fn create(&self, payload: &E::Payload) -> Result<E, ApiError> {
    self.client.post(&Self::collection(), payload).await
  }

  async fn update(&self, id: u64, payload: &E::Payload) -> Result<E, ApiError> {
    self.client.put(&Self::member(id), payload).await
  }

  async fn delete(&self, id: u64) -> Result<(), ApiError> {
    self.client.delete(&Self::member(id)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::MenuItem;

  #[test]
  fn test_list_params() {
    let params = ListParams::new().with("store_id", 3).with("status", "active");
    assert_eq!(params.get("status"), Some("active"));
    assert_eq!(params.get("missing"), None);
    assert_eq!(params.pairs().len(), 2);
  }

  #[test]
  fn test_paths() {
    assert_eq!(RestResource::<MenuItem>::collection(), "v1/menu-items");
    assert_eq!(RestResource::<MenuItem>::member(9), "v1/menu-items/9");
  }
}
