//! # libris-core — author/book relation store
//!
//! Tracks a many-to-many relation between authors and books, each keyed by
//! a natural (label, year) pair. An entity exists only while it has at least
//! one relation to the other kind.
//!
//! ```text
//! ┌─────────────────┐   records ⇄ keys   ┌───────────────┐
//! │ BookAuthorStore │ ─────────────────► │ RelationStore │
//! │ (facade)        │                    │ RwLock<       │
//! └─────────────────┘                    │   left,right> │
//!                                        └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`key`] — `EntityKey` and `RelationSet`
//! - [`relation`] — mirrored tables: upsert, read, delete, rank
//! - [`catalog`] — author/book record translation
//! - [`error`] — `RelationError`

pub mod catalog;
pub mod error;
pub mod key;
pub mod relation;

pub use catalog::{AuthorRecord, BookAuthorStore, BookRecord, Ranked};
pub use error::{RelationError, Result};
pub use key::{EntityKey, RelationSet};
pub use relation::{RelationStore, RelationTable, Side, StoreStats, UpsertOutcome};
