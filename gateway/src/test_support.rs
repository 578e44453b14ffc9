//! Test utilities for the gateway crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::GatewaySettings;

/// Clock frozen at a settable instant.
#[derive(Debug, Clone)]
pub struct FixtureClock {
    utc_now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixtureClock {
    /// Freeze the clock at `utc_now`.
    pub fn at(utc_now: DateTime<Utc>) -> Self {
        Self {
            utc_now: Arc::new(Mutex::new(utc_now)),
        }
    }

    /// Move the clock to `utc_now`.
    pub fn set(&self, utc_now: DateTime<Utc>) {
        if let Ok(mut guard) = self.utc_now.lock() {
            *guard = utc_now;
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.utc_now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}

/// Instant used by [`fixture_clock`].
pub fn fixture_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Shared fixed clock for services under test.
pub fn fixture_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixtureClock::at(fixture_instant()))
}

/// Settings with defaults apart from instant payment confirmation and short
/// reconnect delays.
pub fn fast_settings() -> GatewaySettings {
    GatewaySettings {
        founding_baseline: 142,
        founding_capacity: 200,
        allocation_max_attempts: 5,
        allocation_backoff_ms: 1,
        payment_delay_ms: 0,
        sync_initial_backoff_ms: 1,
        sync_max_backoff_ms: 10,
        expiring_window_hours: 72,
        database_url: None,
        log_format: None,
    }
}
