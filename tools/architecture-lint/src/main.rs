//! `architecture-lint [GATEWAY_DIR]`
//!
//! Lints the gateway crate at `GATEWAY_DIR`, defaulting to the sibling
//! `gateway/` directory of this workspace. Exits non-zero on any violation.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let gateway_dir = std::env::args_os()
        .nth(1)
        .map_or_else(default_gateway_dir, PathBuf::from);

    let outcome = architecture_lint::lint_gateway_sources(&gateway_dir);
    let mut stderr = io::stderr().lock();
    match outcome {
        Ok(()) => {
            let _ = writeln!(
                stderr,
                "{}: {} boundary rules hold",
                gateway_dir.display(),
                architecture_lint::RULES.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = write!(stderr, "{}: {err}", gateway_dir.display());
            ExitCode::FAILURE
        }
    }
}

fn default_gateway_dir() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .unwrap_or(manifest)
        .join("gateway")
}
