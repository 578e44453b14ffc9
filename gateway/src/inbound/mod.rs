//! Inbound adapters that translate visitor events into domain calls while
//! keeping presentation details at the edge.
//!
//! The [`client`] adapter models one connected visitor (a browser tab): it
//! owns the visitor's session, route guard, checkout attempt and catalog
//! subscription.

pub mod client;
