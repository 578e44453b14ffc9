//! Gateway configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `GATEWAY_*` environment variables, a config
//! file and finally the defaults below. The domain only sees the converted
//! structs ([`AllocatorConfig`], [`Backoff`], [`CatalogDisplayPolicy`]).

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{AllocatorConfig, Backoff, CatalogDisplayPolicy};

const ALLOCATION_MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Parse a format name; unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Runtime settings for the gateway.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GATEWAY")]
pub struct GatewaySettings {
    /// Counter value before the first allocation.
    #[ortho_config(default = 142)]
    pub founding_baseline: u64,
    /// Advertised founding cohort size.
    #[ortho_config(default = 200)]
    pub founding_capacity: u64,
    /// Counter transactions attempted per allocation.
    #[ortho_config(default = 5)]
    pub allocation_max_attempts: u32,
    /// First retry delay for allocation, in milliseconds.
    #[ortho_config(default = 25)]
    pub allocation_backoff_ms: u64,
    /// Simulated payment confirmation delay, in milliseconds.
    #[ortho_config(default = 900)]
    pub payment_delay_ms: u64,
    /// First catalog reconnect delay, in milliseconds.
    #[ortho_config(default = 250)]
    pub sync_initial_backoff_ms: u64,
    /// Catalog reconnect delay cap, in milliseconds.
    #[ortho_config(default = 10_000)]
    pub sync_max_backoff_ms: u64,
    /// Hours before expiry at which catalog entries are flagged.
    #[ortho_config(default = 72)]
    pub expiring_window_hours: i64,
    /// PostgreSQL URL; in-memory storage is used when unset.
    pub database_url: Option<String>,
    /// `json` or `pretty`.
    pub log_format: Option<String>,
}

impl GatewaySettings {
    /// Allocation tuning.
    pub fn allocator_config(&self) -> AllocatorConfig {
        let initial = Duration::from_millis(self.allocation_backoff_ms);
        AllocatorConfig {
            baseline: self.founding_baseline,
            capacity: self.founding_capacity,
            max_attempts: self.allocation_max_attempts.max(1),
            backoff: Backoff {
                initial,
                max: ALLOCATION_MAX_BACKOFF.max(initial),
            },
        }
    }

    /// Catalog reconnect backoff.
    pub fn sync_backoff(&self) -> Backoff {
        let initial = Duration::from_millis(self.sync_initial_backoff_ms);
        Backoff {
            initial,
            max: Duration::from_millis(self.sync_max_backoff_ms).max(initial),
        }
    }

    /// Catalog badge rules.
    pub fn display_policy(&self) -> CatalogDisplayPolicy {
        CatalogDisplayPolicy {
            expiring_window: chrono::Duration::hours(self.expiring_window_hours),
        }
    }

    /// Simulated payment delay.
    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }

    /// Log format, falling back to JSON for missing or unknown names.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default()
    }
}
