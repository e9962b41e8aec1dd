//! Kiosk ordering: a persisted cart per terminal with expiry recovery.

mod menu;
mod session;
mod store;

pub use menu::{needs_zone, orderable};
pub use session::{cart_key, CheckoutRequest, KioskError, KioskSession, PlacedOrder};
pub use store::{FileSessionStore, SessionStore};
