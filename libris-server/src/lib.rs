//! # libris-server — HTTP JSON API for the author/book store
//!
//! ```text
//! ┌──────────────┐   HTTP/JSON   ┌───────────────┐      ┌─────────────────┐
//! │ client       │ ◄───────────► │ CatalogServer │ ───► │ BookAuthorStore │
//! └──────────────┘               │ (axum)        │      │ (libris-core)   │
//!                                └───────────────┘      └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] — `ServerConfig` with `LIBRIS_*` environment overrides
//! - [`routes`] — URL dispatch, body decoding, status policy
//! - [`server`] — listener lifecycle and graceful shutdown
//! - [`error`] — `ApiError` → HTTP response mapping

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use routes::EntityKind;
pub use server::CatalogServer;
