use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Store the console works in; scoped resources are filtered by it
  pub store_id: Option<u64>,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub kiosk: KioskConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL; resources live under `{url}/v1/`
  #[serde(default = "default_api_url")]
  pub url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
    }
  }
}

fn default_api_url() -> String {
  "http://127.0.0.1:8000/api".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before a fetched collection is refetched on next read
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Seconds an unobserved entry is kept before collection
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }

  pub fn gc_time(&self) -> Duration {
    Duration::from_secs(self.gc_secs)
  }
}

fn default_stale_secs() -> u64 {
  60
}

fn default_gc_secs() -> u64 {
  300
}

#[derive(Debug, Clone, Deserialize)]
pub struct KioskConfig {
  /// Name of this terminal; one cart session is kept per terminal and store
  #[serde(default = "default_terminal")]
  pub terminal: String,
}

impl Default for KioskConfig {
  fn default() -> Self {
    Self {
      terminal: default_terminal(),
    }
  }
}

fn default_terminal() -> String {
  "kiosk".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./restodesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/restodesk/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("restodesk.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("restodesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // an empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Get the API bearer token from environment variables.
  ///
  /// Checks RESTODESK_API_TOKEN first, then RESTO_API_TOKEN as fallback.
  /// No token means requests go out unauthenticated.
  pub fn get_api_token() -> Option<String> {
    std::env::var("RESTODESK_API_TOKEN")
      .or_else(|_| std::env::var("RESTO_API_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Header title: configured title, else the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.api.url.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.url, "http://127.0.0.1:8000/api");
    assert_eq!(config.cache.stale_time(), Duration::from_secs(60));
    assert_eq!(config.cache.gc_time(), Duration::from_secs(300));
    assert_eq!(config.kiosk.terminal, "kiosk");
    assert_eq!(config.store_id, None);
  }

  #[test]
  fn test_partial_file() {
    let config = Config::parse("store_id: 3\ncache:\n  stale_secs: 5\n").unwrap();
    assert_eq!(config.store_id, Some(3));
    assert_eq!(config.cache.stale_secs, 5);
    assert_eq!(config.cache.gc_secs, 300);
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  url: https://pos.example.com/api\ntitle: Main St").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.api.url, "https://pos.example.com/api");
    assert_eq!(config.display_title(), "Main St");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/restodesk.yaml"))).is_err());
  }

  #[test]
  fn test_display_title_falls_back_to_host() {
    let config = Config::default();
    assert_eq!(config.display_title(), "127.0.0.1");
  }
}
