//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **memory**: in-process document store, identity directory and catalog
//! - **persistence**: PostgreSQL-backed profile and counter stores using Diesel
//! - **payment**: simulated payment confirmation
//! - **change_feed**: process-local commit notifications shared by the stores
//!
//! Adapters are thin translators between domain types and storage. Merge and
//! allocation rules stay in the domain.

pub mod change_feed;
pub mod memory;
pub mod payment;
pub mod persistence;
