use std::fmt;

use crate::api::ListParams;

/// Hierarchical cache key, e.g. `products:store_id=2`.
///
/// Invalidation works on prefixes: invalidating `products` also hits
/// `products:store_id=2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  /// Key covering everything cached for a resource
  pub fn resource(name: &str) -> Self {
    Self(vec![name.to_string()])
  }

  /// Key of one list call: resource plus its query params in order
  pub fn list(resource: &str, params: &ListParams) -> Self {
    let mut segments = vec![resource.to_string()];
    segments.extend(params.pairs().iter().map(|(k, v)| format!("{}={}", k, v)));
    Self(segments)
  }

  pub fn child(mut self, segment: impl ToString) -> Self {
    self.0.push(segment.to_string());
    self
  }

  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.join(":"))
  }
}
