use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::api_types::{ApiLookupRow, Envelope};
use super::error::ApiError;
use super::resource::ListParams;
use super::schema::LookupOption;
use crate::config::Config;

/// REST client for the restaurant backend.
///
/// Cheap to clone; all clones share one connection pool and the auth header.
#[derive(Clone)]
pub struct ApiClient {
  inner: Arc<Inner>,
}

struct Inner {
  http: reqwest::Client,
  base: Url,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_token(&config.api.url, Config::get_api_token())
  }

  /// Build a client for `base_url`; the token, if any, is sent as a bearer header
  /// on every request.
  pub fn with_token(base_url: &str, token: Option<String>) -> Result<Self> {
    // join() drops the last segment unless the base ends with a slash
    let base = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base = Url::parse(&base).map_err(|e| eyre!("Invalid API url {}: {}", base_url, e))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
      let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| eyre!("Invalid API token: {}", e))?;
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      inner: Arc::new(Inner { http, base }),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.inner.base
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    self
      .inner
      .base
      .join(path)
      .map_err(|e| ApiError::Network(format!("invalid path {}: {}", path, e)))
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
    let url = self.url(path)?;
    debug!(%method, %url, "api request");
    Ok(self.inner.http.request(method, url))
  }

  /// Send and unwrap the `{data: ...}` envelope.
  async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
    let body = Self::execute(request).await?;
    let envelope: Envelope<T> =
      serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(envelope.data)
  }

  /// Send and return the raw body of a success response.
  async fn execute(request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
    let response = request.send().await.map_err(|e| {
      warn!(error = %e, "api request failed");
      ApiError::from(e)
    })?;

    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
      let err = ApiError::from_status(status.as_u16(), &body);
      warn!(status = status.as_u16(), error = %err, "api error response");
      return Err(err);
    }

    Ok(body.to_vec())
  }

  pub async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    params: &ListParams,
  ) -> Result<T, ApiError> {
    let mut request = self.request(Method::GET, path)?;
    if !params.is_empty() {
      request = request.query(params.pairs());
    }
    self.send(request).await
  }

  pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let request = self.request(Method::POST, path)?.json(body);
    self.send(request).await
  }

  pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let request = self.request(Method::PUT, path)?.json(body);
    self.send(request).await
  }

  /// DELETE; the response body (if any) is ignored.
  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    let request = self.request(Method::DELETE, path)?;
    Self::execute(request).await?;
    Ok(())
  }

  /// `{id, label}` options for a reference field backed by `resource`.
  pub async fn lookup(
    &self,
    resource: &str,
    params: &ListParams,
  ) -> Result<Vec<LookupOption>, ApiError> {
    let rows: Vec<ApiLookupRow> = self.get(&format!("v1/{}", resource), params).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| LookupOption {
          id: row.id,
          label: row.label(),
        })
        .collect(),
    )
  }
}
