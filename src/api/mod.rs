//! Typed access to the restaurant backend's REST API.

pub mod api_types;
pub mod client;
pub mod error;
pub mod kiosk;
pub mod resource;
pub mod schema;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use kiosk::KioskBackend;
pub use resource::{ListParams, Resource, RestResource};
pub use schema::{Draft, Editable, Entity, FieldErrors, FieldKind, FieldSpec, LookupOption, Scope};
