//! Membership gateway library.
//!
//! Hexagonal layout: `domain` holds types, services and ports; `outbound`
//! implements the ports against in-memory and PostgreSQL storage; `inbound`
//! turns per-visitor events into domain calls. `wiring` assembles them.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wiring;

pub use settings::{GatewaySettings, LogFormat};
