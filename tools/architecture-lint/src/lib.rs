//! Boundary lint for the gateway crate.
//!
//! Each file under `gateway/src/{domain,inbound,outbound}` is parsed with
//! `syn`, every path it names is resolved to a crate-relative module path,
//! and the result is checked against [`RULES`]. Code compiled only for tests
//! is skipped: `#[cfg(test)]` items and the files such modules load.
//!
//! Run it with `cargo run -p architecture-lint`.

mod paths;
mod rules;

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use rules::{LAYERS, RULES, Rule, Target};

use paths::Resolved;

/// A rule broken by one file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `gateway/src`.
    pub file: PathBuf,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

#[derive(Debug)]
pub enum ArchitectureLintError {
    Io(io::Error),
    Parse { file: PathBuf, message: String },
    /// The file lies outside every linted layer.
    Unscoped(PathBuf),
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reading gateway sources failed: {err}"),
            Self::Parse { file, message } => {
                write!(f, "{} does not parse: {message}", file.display())
            }
            Self::Unscoped(file) => write!(
                f,
                "{} is not under any of {}",
                file.display(),
                LAYERS.join(", ")
            ),
            Self::Violations(violations) => {
                writeln!(f, "{} boundary violation(s):", violations.len())?;
                for violation in violations {
                    writeln!(f, "- {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `gateway/src`.
    pub file: PathBuf,
    pub contents: String,
}

/// Lint the crate rooted at `gateway_dir` (the directory holding its
/// `Cargo.toml`).
pub fn lint_gateway_sources(gateway_dir: &Path) -> Result<(), ArchitectureLintError> {
    let sources = collect_lint_sources(&gateway_dir.join("src"))?;
    lint_sources(&sources)
}

/// Lint sources already in memory.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut parsed = Vec::with_capacity(sources.len());
    for source in sources {
        let module = paths::module_of(&source.file);
        if !module
            .first()
            .is_some_and(|layer| LAYERS.contains(&layer.as_str()))
        {
            return Err(ArchitectureLintError::Unscoped(source.file.clone()));
        }
        let file =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        let found = paths::collect(&file, module.clone());
        parsed.push((source, module, found));
    }

    let test_modules: Vec<Vec<String>> = parsed
        .iter()
        .flat_map(|(_, _, found)| found.test_modules.iter().cloned())
        .collect();

    let mut violations = BTreeSet::new();
    for (source, module, found) in &parsed {
        if test_modules.iter().any(|test| module.starts_with(test)) {
            continue;
        }
        for rule in RULES.iter().filter(|rule| rule.applies_to(module)) {
            if found.paths.iter().any(|path| breaks(rule, path)) {
                violations.insert(Violation {
                    file: source.file.clone(),
                    message: describe(rule),
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(
            violations.into_iter().collect(),
        ))
    }
}

fn breaks(rule: &Rule, path: &Resolved) -> bool {
    match (rule.target, path) {
        (Target::Module(forbidden), Resolved::Internal(segments)) => {
            segments.len() >= forbidden.len()
                && forbidden.iter().zip(segments).all(|(f, s)| *f == s)
        }
        (Target::Crate(name), Resolved::External(segments)) => {
            segments.first().is_some_and(|first| first == name)
        }
        (Target::Call(call), path) => ends_with(path.segments(), call),
        _ => false,
    }
}

fn ends_with(segments: &[String], suffix: &[&str]) -> bool {
    segments.len() >= suffix.len()
        && segments
            .iter()
            .rev()
            .zip(suffix.iter().rev())
            .all(|(segment, expected)| segment == expected)
}

fn describe(rule: &Rule) -> String {
    let verb = match rule.target {
        Target::Call(_) => "call",
        Target::Module(_) | Target::Crate(_) => "depend on",
    };
    format!(
        "{} must not {verb} {} ({})",
        rule.scope.join("::"),
        rule.target,
        rule.hint
    )
}

/// Every `.rs` file under the layer directories of `src_dir`, sorted by path.
pub fn collect_lint_sources(src_dir: &Path) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let mut sources = Vec::new();
    for layer in LAYERS {
        let dir = src_dir.join(layer);
        if dir.is_dir() {
            walk(src_dir, &dir, &mut sources)?;
        }
    }
    sources.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(sources)
}

fn walk(
    src_dir: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(src_dir, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src_dir)
                .map_or_else(|_| path.clone(), Path::to_path_buf);
            let contents = fs::read_to_string(&path)?;
            sources.push(LintSource { file, contents });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
