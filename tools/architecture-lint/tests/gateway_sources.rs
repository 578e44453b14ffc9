//! Lint runs over source trees on disk.

use std::fs;
use std::path::{Path, PathBuf};

use architecture_lint::{ArchitectureLintError, collect_lint_sources, lint_gateway_sources};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    fn write(&self, relative: &str, contents: &str) -> &Self {
        let path = self.dir.path().join("src").join(relative);
        let parent = path.parent().expect("source file has a parent");
        fs::create_dir_all(parent).expect("create source directory");
        fs::write(path, contents).expect("write source file");
        self
    }

    fn lint(&self) -> Result<(), ArchitectureLintError> {
        lint_gateway_sources(self.dir.path())
    }
}

#[fixture]
fn tree() -> SourceTree {
    SourceTree {
        dir: TempDir::new().expect("temp dir"),
    }
}

#[rstest]
fn the_gateway_crate_respects_its_boundaries() {
    let gateway_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../gateway");
    let result = lint_gateway_sources(&gateway_dir);
    assert!(
        result.is_ok(),
        "{}",
        result.err().map(|err| err.to_string()).unwrap_or_default()
    );
}

#[rstest]
fn the_gateway_test_files_are_collected_but_exempt() {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../gateway/src");
    let sources = collect_lint_sources(&src).expect("gateway sources");
    assert!(
        sources
            .iter()
            .any(|source| source.file == Path::new("domain/session/tests.rs"))
    );
    assert!(sources.iter().all(|source| source.file != Path::new("wiring.rs")));
}

#[rstest]
fn violations_in_nested_modules_are_found(tree: SourceTree) {
    tree.write("domain/mod.rs", "pub mod session;")
        .write(
            "domain/session.rs",
            "use crate::outbound::memory::MemoryDocumentStore; fn spawn() {}",
        )
        .write("wiring.rs", "use crate::outbound::memory; fn wire() {}");

    let Err(ArchitectureLintError::Violations(violations)) = tree.lint() else {
        panic!("expected violations");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].file, PathBuf::from("domain/session.rs"));
}

#[rstest]
fn wall_clock_reads_outside_tests_are_found(tree: SourceTree) {
    tree.write(
        "domain/founding_counter.rs",
        "pub fn stamp() -> chrono::DateTime<chrono::Utc> { chrono::Utc::now() }\n\
         #[cfg(test)]\nmod tests;",
    )
    .write(
        "domain/founding_counter/tests.rs",
        "fn fixed() { let _ = chrono::Utc::now(); }",
    );

    let Err(ArchitectureLintError::Violations(violations)) = tree.lint() else {
        panic!("expected violations");
    };
    let files: Vec<_> = violations.iter().map(|v| v.file.clone()).collect();
    assert_eq!(files, [PathBuf::from("domain/founding_counter.rs")]);
}

#[rstest]
fn storage_backends_stay_apart(tree: SourceTree) {
    tree.write(
        "outbound/memory/document_store.rs",
        "use crate::outbound::persistence::DieselProfileRepository; pub struct Store;",
    )
    .write(
        "outbound/persistence/pool.rs",
        "use super::super::memory::MemoryDocumentStore; pub struct Pool;",
    )
    .write(
        "outbound/payment.rs",
        "use crate::outbound::memory::MemoryDocumentStore; pub struct Payments;",
    );

    let Err(ArchitectureLintError::Violations(violations)) = tree.lint() else {
        panic!("expected violations");
    };
    let files: Vec<_> = violations.iter().map(|v| v.file.clone()).collect();
    assert_eq!(
        files,
        [
            PathBuf::from("outbound/memory/document_store.rs"),
            PathBuf::from("outbound/persistence/pool.rs"),
        ]
    );
}

#[rstest]
fn a_tree_without_layers_passes(tree: SourceTree) {
    tree.write("lib.rs", "pub fn noop() {}");
    assert!(tree.lint().is_ok());
}
