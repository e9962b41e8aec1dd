use std::sync::Arc;

use color_eyre::Result;

use crate::api::{ApiClient, Entity, ListParams, LookupOption, RestResource, Scope};
use crate::cache::QueryCache;
use crate::config::Config;
use crate::event::Notifier;
use crate::notify::Notification;

/// Everything a view needs, handed down explicitly from `App`.
///
/// Clones share the HTTP client, the query cache and the notification channel.
#[derive(Clone)]
pub struct AppContext {
  pub config: Arc<Config>,
  pub api: ApiClient,
  pub cache: QueryCache,
  pub scope: Scope,
  notifier: Notifier,
}

impl AppContext {
  pub fn new(config: Config, notifier: Notifier) -> Result<Self> {
    let api = ApiClient::new(&config)?;
    tracing::debug!(base_url = %api.base_url(), "api client ready");
    let cache = QueryCache::from_config(&config.cache);
    let scope = Scope::new(config.store_id);
    Ok(Self {
      config: Arc::new(config),
      api,
      cache,
      scope,
      notifier,
    })
  }

  /// REST endpoints of `E`.
  pub fn resource<E: Entity>(&self) -> RestResource<E> {
    RestResource::new(self.api.clone())
  }

  /// List params for `E` in the current store.
  pub fn list_params<E: Entity>(&self) -> ListParams {
    self.scope.list_params(E::SCOPED)
  }

  /// Options for a reference field. Failures are reported and yield nothing.
  pub async fn lookup(&self, resource: &str) -> Vec<LookupOption> {
    let params = self
      .scope
      .list_params(crate::api::types::is_scoped(resource));
    match self.api.lookup(resource, &params).await {
      Ok(options) => options,
      Err(e) => {
        tracing::warn!(resource, error = %e, "lookup failed");
        Vec::new()
      }
    }
  }

  pub fn notify(&self, notification: Notification) {
    self.notifier.notify(notification);
  }
}
