//! File-backed document store: one JSON file per named table.

mod document;
mod error;

pub use document::{DocumentStore, default_root};
pub use error::{StoreError, StoreResult};
