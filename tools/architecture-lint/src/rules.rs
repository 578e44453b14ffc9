//! The gateway's module boundaries, as data.

use std::fmt;

/// Something a source file may be forbidden to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A module of the gateway crate, given as its path below the crate root.
    Module(&'static [&'static str]),
    /// An external crate.
    Crate(&'static str),
    /// A function matched by the trailing segments of any path naming it.
    Call(&'static [&'static str]),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(segments) => write!(f, "crate::{}", segments.join("::")),
            Self::Crate(name) => write!(f, "external crate `{name}`"),
            Self::Call(segments) => write!(f, "`{}`", segments.join("::")),
        }
    }
}

/// A boundary: code under `scope` must not name `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub scope: &'static [&'static str],
    pub target: Target,
    pub hint: &'static str,
}

impl Rule {
    const fn new(scope: &'static [&'static str], target: Target, hint: &'static str) -> Self {
        Self {
            scope,
            target,
            hint,
        }
    }

    /// Whether this rule governs code in `module`.
    pub fn applies_to(&self, module: &[String]) -> bool {
        module.len() >= self.scope.len()
            && self
                .scope
                .iter()
                .zip(module)
                .all(|(expected, actual)| *expected == actual)
    }
}

const ADAPTERS: &str = "adapters are chosen in wiring";
const STORAGE: &str = "storage belongs to outbound::persistence";
const PROCESS: &str = "process setup belongs to the binary";
const CLOCK: &str = "read time from the injected Clock";
const BLOCKING: &str = "blocks a runtime worker; await a Sleeper instead";

/// Every boundary the gateway crate keeps.
pub const RULES: &[Rule] = &[
    // The domain only sees its own ports.
    Rule::new(&["domain"], Target::Module(&["inbound"]), ADAPTERS),
    Rule::new(&["domain"], Target::Module(&["outbound"]), ADAPTERS),
    Rule::new(&["domain"], Target::Module(&["wiring"]), ADAPTERS),
    Rule::new(&["domain"], Target::Module(&["settings"]), PROCESS),
    Rule::new(&["domain"], Target::Module(&["telemetry"]), PROCESS),
    Rule::new(&["domain"], Target::Crate("diesel"), STORAGE),
    Rule::new(&["domain"], Target::Crate("diesel_async"), STORAGE),
    Rule::new(&["domain"], Target::Crate("diesel_migrations"), STORAGE),
    Rule::new(&["domain"], Target::Crate("ortho_config"), PROCESS),
    Rule::new(&["domain"], Target::Crate("tracing_subscriber"), PROCESS),
    Rule::new(&["domain"], Target::Crate("clap"), PROCESS),
    Rule::new(&["domain"], Target::Call(&["Utc", "now"]), CLOCK),
    Rule::new(&["domain"], Target::Call(&["Local", "now"]), CLOCK),
    Rule::new(&["domain"], Target::Call(&["SystemTime", "now"]), CLOCK),
    Rule::new(&["domain"], Target::Call(&["thread", "sleep"]), BLOCKING),
    // The client drives domain services and never reaches storage.
    Rule::new(&["inbound"], Target::Module(&["outbound"]), ADAPTERS),
    Rule::new(&["inbound"], Target::Module(&["wiring"]), ADAPTERS),
    Rule::new(&["inbound"], Target::Crate("diesel"), STORAGE),
    Rule::new(&["inbound"], Target::Crate("diesel_async"), STORAGE),
    Rule::new(&["inbound"], Target::Crate("diesel_migrations"), STORAGE),
    Rule::new(&["inbound"], Target::Crate("ortho_config"), PROCESS),
    Rule::new(&["inbound"], Target::Crate("tracing_subscriber"), PROCESS),
    Rule::new(&["inbound"], Target::Call(&["thread", "sleep"]), BLOCKING),
    // Adapters implement ports and know nothing of their callers.
    Rule::new(&["outbound"], Target::Module(&["inbound"]), ADAPTERS),
    Rule::new(&["outbound"], Target::Module(&["wiring"]), ADAPTERS),
    Rule::new(&["outbound"], Target::Module(&["settings"]), PROCESS),
    Rule::new(&["outbound"], Target::Call(&["thread", "sleep"]), BLOCKING),
    // The two storage backends are interchangeable, so neither leans on the other.
    Rule::new(
        &["outbound", "memory"],
        Target::Module(&["outbound", "persistence"]),
        "the in-memory store must run without PostgreSQL",
    ),
    Rule::new(
        &["outbound", "memory"],
        Target::Crate("diesel"),
        "the in-memory store must run without PostgreSQL",
    ),
    Rule::new(
        &["outbound", "memory"],
        Target::Crate("diesel_async"),
        "the in-memory store must run without PostgreSQL",
    ),
    Rule::new(
        &["outbound", "persistence"],
        Target::Module(&["outbound", "memory"]),
        "PostgreSQL adapters must not fall back to process memory",
    ),
];

/// Top-level modules whose files are linted. A file outside them has no rules.
pub const LAYERS: &[&str] = &["domain", "inbound", "outbound"];
