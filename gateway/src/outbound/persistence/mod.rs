//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! These adapters implement the profile and founding-counter ports against
//! PostgreSQL via `diesel-async` with `bb8` connection pooling.
//!
//! - **Thin adapters**: Repository implementations translate between Diesel
//!   rows and domain types; merge rules stay in the domain.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Database errors are mapped to the port error
//!   types, with serialization failures reported as transient.
//!
//! # Example
//!
//! ```ignore
//! use gateway::outbound::persistence::{
//!     DbPool, DieselFoundingCounterStore, DieselProfileRepository, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/gateway")).await?;
//! let profiles = DieselProfileRepository::new(pool.clone());
//! let counter = DieselFoundingCounterStore::new(pool);
//! ```

mod diesel_error_mapping;
mod diesel_founding_counter_store;
mod diesel_profile_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_founding_counter_store::{
    DEFAULT_SERIALIZABLE_ATTEMPTS, DieselFoundingCounterStore, FOUNDING_COUNTER_NAME,
};
pub use diesel_profile_repository::DieselProfileRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
