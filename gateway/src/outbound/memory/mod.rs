//! In-process adapters.
//!
//! Used by the integration tests and by `founding-load` when no database is
//! configured. Every adapter here honours the same port contracts as the
//! PostgreSQL ones, including change notification.

mod catalog;
mod document_store;
mod identity_provider;

pub use catalog::MemoryCatalog;
pub use document_store::MemoryDocumentStore;
pub use identity_provider::{MemoryIdentityDirectory, MemoryIdentityProvider};
