//! Where the kiosk remembers its current cart between restarts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Load/save hooks for the current cart id.
pub trait SessionStore: Send + Sync + 'static {
  fn load(&self) -> Option<u64>;

  /// Store a new id, or forget the current one with `None`.
  fn save(&self, cart_id: Option<u64>);
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
  cart_id: u64,
  #[serde(default)]
  store_id: Option<u64>,
}

/// JSON file under the user's runtime dir, one per terminal and store.
///
/// The runtime dir is cleared at logout, so a cart survives restarts of the
/// console but not a new login session. Falls back to the temp dir where no
/// runtime dir exists.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
  path: PathBuf,
  store_id: Option<u64>,
}

impl FileSessionStore {
  pub fn new(dir: &Path, terminal: &str, store_id: Option<u64>) -> Self {
    let store = store_id
      .map(|id| id.to_string())
      .unwrap_or_else(|| "all".into());
    let terminal: String = terminal
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
      .collect();
    Self {
      path: dir.join(format!("kiosk-{}-{}.json", terminal, store)),
      store_id,
    }
  }

  /// Store in `$XDG_RUNTIME_DIR/restodesk/`.
  pub fn for_terminal(terminal: &str, store_id: Option<u64>) -> Self {
    let base = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
    Self::new(&base.join("restodesk"), terminal, store_id)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl SessionStore for FileSessionStore {
  fn load(&self) -> Option<u64> {
    let contents = std::fs::read_to_string(&self.path).ok()?;
    match serde_json::from_str::<StoredSession>(&contents) {
      Ok(session) if session.store_id == self.store_id => Some(session.cart_id),
      Ok(_) => None,
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "ignoring unreadable kiosk session");
        None
      }
    }
  }

  fn save(&self, cart_id: Option<u64>) {
    let result = match cart_id {
      Some(cart_id) => {
        let session = StoredSession {
          cart_id,
          store_id: self.store_id,
        };
        self
          .path
          .parent()
          .map(std::fs::create_dir_all)
          .unwrap_or(Ok(()))
          .and_then(|_| {
            let json = serde_json::to_string(&session)?;
            std::fs::write(&self.path, json)
          })
      }
      None => match std::fs::remove_file(&self.path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
      },
    };

    if let Err(e) = result {
      warn!(path = %self.path.display(), error = %e, "failed to write kiosk session");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(&dir.path().join("nested"), "front desk", Some(2));
    assert_eq!(store.load(), None);

    store.save(Some(41));
    assert_eq!(store.load(), Some(41));
    assert!(store.path().ends_with("kiosk-front_desk-2.json"));

    store.save(None);
    assert_eq!(store.load(), None);
    // clearing twice is fine
    store.save(None);
  }

  #[test]
  fn test_sessions_are_per_store() {
    let dir = tempfile::tempdir().unwrap();
    let a = FileSessionStore::new(dir.path(), "kiosk", Some(1));
    let b = FileSessionStore::new(dir.path(), "kiosk", Some(2));
    a.save(Some(10));
    assert_eq!(b.load(), None);
    assert_eq!(a.load(), Some(10));
  }

  #[test]
  fn test_corrupt_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path(), "kiosk", None);
    std::fs::write(store.path(), "not json").unwrap();
    assert_eq!(store.load(), None);
  }
}
