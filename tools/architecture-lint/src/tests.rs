//! Unit tests for the boundary rules and path resolution.

use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};

use super::paths::{Resolved, module_of, resolve};
use super::*;

#[derive(Clone, Copy)]
struct LintSingle;

impl LintSingle {
    fn lint(self, file: &str, contents: &str) -> Result<(), ArchitectureLintError> {
        lint_sources(&[LintSource {
            file: PathBuf::from(file),
            contents: contents.to_owned(),
        }])
    }

    fn messages(self, file: &str, contents: &str) -> Vec<String> {
        match self.lint(file, contents) {
            Ok(()) => Vec::new(),
            Err(ArchitectureLintError::Violations(violations)) => {
                violations.into_iter().map(|v| v.message).collect()
            }
            Err(other) => panic!("expected violations, got {other:?}"),
        }
    }
}

#[fixture]
fn lint_single() -> LintSingle {
    LintSingle
}

fn owned(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|segment| (*segment).to_owned()).collect()
}

#[rstest]
#[case("domain/session.rs", &["domain", "session"])]
#[case("domain/activation/mod.rs", &["domain", "activation"])]
#[case("domain/catalog_sync/tests.rs", &["domain", "catalog_sync", "tests"])]
#[case("outbound/memory/document_store.rs", &["outbound", "memory", "document_store"])]
fn files_map_to_the_module_they_define(#[case] file: &str, #[case] module: &[&str]) {
    assert_eq!(module_of(Path::new(file)), owned(module));
}

#[rstest]
#[case(&["crate", "outbound", "memory"], Some(Resolved::Internal(owned(&["outbound", "memory"]))))]
#[case(&["super", "change_feed", "ChangeFeed"], Some(Resolved::Internal(owned(&["outbound", "memory", "change_feed", "ChangeFeed"]))))]
#[case(&["super", "super", "persistence"], Some(Resolved::Internal(owned(&["outbound", "persistence"]))))]
#[case(&["self", "profiles"], Some(Resolved::Internal(owned(&["outbound", "memory", "document_store", "profiles"]))))]
#[case(&["super", "super", "super", "super", "wiring"], None)]
#[case(&["chrono", "Utc", "now"], Some(Resolved::External(owned(&["chrono", "Utc", "now"]))))]
#[case(&["MemoryDocumentStore"], None)]
fn paths_resolve_against_the_enclosing_module(
    #[case] written: &[&str],
    #[case] expected: Option<Resolved>,
) {
    let module = owned(&["outbound", "memory", "document_store"]);
    assert_eq!(resolve(&module, &owned(written)), expected);
}

#[rstest]
#[case("inbound/client/mod.rs", "use crate::domain::SessionStore; fn connect() { let _ = SessionStore::spawn; }")]
#[case("domain/founding_counter.rs", "use crate::domain::ports::FoundingCounterStore; use tracing::info; fn allocate() { info!(\"ok\"); }")]
#[case("domain/retry.rs", "async fn pause(d: std::time::Duration) { tokio::time::sleep(d).await; }")]
#[case("domain/session.rs", "fn spawn() { tokio::spawn(async {}); }")]
#[case("domain/session.rs", "fn now(clock: &dyn mockable::Clock) -> chrono::DateTime<chrono::Utc> { clock.utc() }")]
#[case("outbound/memory/document_store.rs", "use super::super::change_feed::ChangeFeed; fn feed() {}")]
#[case("outbound/persistence/pool.rs", "use diesel_async::AsyncPgConnection; use crate::domain::ports::ProfileRepository; fn pool() {}")]
fn boundaries_that_hold_pass(lint_single: LintSingle, #[case] file: &str, #[case] contents: &str) {
    let result = lint_single.lint(file, contents);
    assert!(result.is_ok(), "result: {result:?}");
}

#[rstest]
#[case("inbound/client/mod.rs", "use crate::outbound::memory::MemoryDocumentStore; fn connect() {}", "inbound must not depend on crate::outbound")]
#[case("inbound/client/mod.rs", "use gateway::wiring::Storage; fn connect() {}", "inbound must not depend on crate::wiring")]
#[case("inbound/client/messages.rs", "use diesel::prelude::*; fn connect() {}", "inbound must not depend on external crate `diesel`")]
#[case("domain/founding_counter.rs", "use super::super::inbound::client; fn allocate() {}", "domain must not depend on crate::inbound")]
#[case("domain/session.rs", "use crate::settings::GatewaySettings; fn read() {}", "domain must not depend on crate::settings")]
#[case("domain/session.rs", "fn init() { tracing_subscriber::fmt().init(); }", "domain must not depend on external crate `tracing_subscriber`")]
#[case("domain/profile.rs", "use chrono::Utc; fn stamp() { let _ = Utc::now(); }", "domain must not call `Utc::now`")]
#[case("domain/retry.rs", "fn pause() { std::thread::sleep(std::time::Duration::from_millis(5)); }", "domain must not call `thread::sleep`")]
#[case("domain/catalog.rs", "fn stamp() { let _ = std::time::SystemTime::now(); }", "domain must not call `SystemTime::now`")]
#[case("outbound/memory/catalog.rs", "use crate::outbound::persistence::DbPool; fn pool() {}", "outbound::memory must not depend on crate::outbound::persistence")]
#[case("outbound/memory/identity_provider.rs", "use diesel_async::AsyncPgConnection; fn pool() {}", "outbound::memory must not depend on external crate `diesel_async`")]
#[case("outbound/persistence/pool.rs", "use super::super::memory::MemoryDocumentStore; fn fallback() {}", "outbound::persistence must not depend on crate::outbound::memory")]
#[case("outbound/payment.rs", "use crate::inbound::client::MemberClient; fn pay() {}", "outbound must not depend on crate::inbound")]
fn broken_boundaries_are_reported(
    lint_single: LintSingle,
    #[case] file: &str,
    #[case] contents: &str,
    #[case] expected: &str,
) {
    let messages = lint_single.messages(file, contents);
    assert!(
        messages.iter().any(|message| message.starts_with(expected)),
        "{messages:?} has no message starting with {expected:?}"
    );
}

#[rstest]
fn test_only_code_is_exempt(lint_single: LintSingle) {
    let contents = r"
        fn live() {}

        #[cfg(test)]
        mod tests {
            use crate::outbound::memory::MemoryDocumentStore;

            fn stamp() { let _ = chrono::Utc::now(); }
        }

        #[cfg(test)]
        fn helper() { std::thread::sleep(std::time::Duration::ZERO); }
    ";
    assert!(lint_single.lint("domain/session.rs", contents).is_ok());
}

#[rstest]
fn files_loaded_by_test_modules_are_exempt() {
    let sources = [
        LintSource {
            file: PathBuf::from("domain/session.rs"),
            contents: "pub fn live() {}\n#[cfg(test)]\nmod tests;".to_owned(),
        },
        LintSource {
            file: PathBuf::from("domain/session/tests.rs"),
            contents: "use crate::outbound::memory::MemoryDocumentStore; fn t() { let _ = chrono::Utc::now(); }".to_owned(),
        },
    ];
    assert!(lint_sources(&sources).is_ok());
}

#[rstest]
fn a_tests_file_without_a_test_declaration_is_linted() {
    let sources = [
        LintSource {
            file: PathBuf::from("domain/session.rs"),
            contents: "pub mod tests;".to_owned(),
        },
        LintSource {
            file: PathBuf::from("domain/session/tests.rs"),
            contents: "fn t() { let _ = chrono::Utc::now(); }".to_owned(),
        },
    ];
    let result = lint_sources(&sources);
    assert!(matches!(result, Err(ArchitectureLintError::Violations(ref v)) if v.len() == 1), "{result:?}");
}

#[rstest]
fn inline_modules_shift_super(lint_single: LintSingle) {
    // From `domain::session::inner`, `super::super` is `domain`, not the crate root.
    let contents = "mod inner { use super::super::ports::ProfileRepository; }";
    assert!(lint_single.lint("domain/session.rs", contents).is_ok());

    let escaping = "mod inner { use super::super::super::outbound::memory; }";
    assert!(lint_single.lint("domain/session.rs", escaping).is_err());
}

#[rstest]
fn files_outside_the_layers_are_rejected(lint_single: LintSingle) {
    let result = lint_single.lint("wiring.rs", "fn wire() {}");
    assert!(matches!(result, Err(ArchitectureLintError::Unscoped(_))));
}

#[rstest]
fn each_rule_is_reported_once_per_file(lint_single: LintSingle) {
    let result = lint_single.lint(
        "domain/session.rs",
        "use diesel::prelude::*; use diesel::result::Error; fn read() {}",
    );
    let Err(ArchitectureLintError::Violations(violations)) = result else {
        panic!("expected violations, got {result:?}");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].to_string(),
        "domain/session.rs: domain must not depend on external crate `diesel` \
         (storage belongs to outbound::persistence)"
    );
}

#[rstest]
fn nested_scopes_add_rules_to_their_layer(lint_single: LintSingle) {
    // A memory adapter reaching into persistence breaks only the sibling rule;
    // the same import from payment is fine.
    let import = "use crate::outbound::persistence::DbPool; fn f() {}";
    assert_eq!(lint_single.messages("outbound/memory/catalog.rs", import).len(), 1);
    assert!(lint_single.messages("outbound/payment.rs", import).is_empty());
}
