//! In-memory query cache shared by every view.
//!
//! This module provides a TanStack-Query-like cache that:
//! - Stores fetched collections under hierarchical keys
//! - De-duplicates concurrent fetches of the same key
//! - Invalidates by key prefix after mutations, with generation counters so
//!   superseded fetch results are dropped
//! - Garbage-collects entries nobody subscribes to any more

mod key;
mod result;
mod store;

pub use key::QueryKey;
pub use result::FetchError;
pub use store::{QueryCache, Subscription};
