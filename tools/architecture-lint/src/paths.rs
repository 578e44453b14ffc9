//! Path collection and resolution for one source file.
//!
//! Every path a file names is resolved against the module the file defines,
//! so `super::` and `self::` land on the same crate-relative path as the
//! equivalent `crate::` spelling.

use std::path::{Component, Path};

use syn::visit::{self, Visit};

/// Where a path points once `crate`, `self` and `super` are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Inside the gateway crate, as segments below the crate root.
    Internal(Vec<String>),
    /// Through an external crate; the first segment is the crate name.
    External(Vec<String>),
}

impl Resolved {
    pub fn segments(&self) -> &[String] {
        match self {
            Self::Internal(segments) | Self::External(segments) => segments,
        }
    }
}

/// What one file names, ignoring anything compiled only for tests.
#[derive(Debug, Default)]
pub struct FilePaths {
    pub paths: Vec<Resolved>,
    /// Modules declared `#[cfg(test)] mod name;` whose bodies live in other files.
    pub test_modules: Vec<Vec<String>>,
}

/// The module a source file defines, from its path below `src/`.
///
/// `domain/session.rs` and `domain/session/mod.rs` both define
/// `domain::session`.
pub fn module_of(file: &Path) -> Vec<String> {
    let mut module: Vec<String> = file
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str().map(str::to_owned),
            _ => None,
        })
        .collect();
    if let Some(last) = module.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last);
        if !matches!(stem, "mod" | "lib" | "main") {
            module.push(stem.to_owned());
        }
    }
    module
}

pub fn collect(file: &syn::File, module: Vec<String>) -> FilePaths {
    let mut collector = Collector {
        module,
        found: FilePaths::default(),
    };
    collector.visit_file(file);
    collector.found
}

struct Collector {
    /// Module currently being visited, including inline `mod` blocks.
    module: Vec<String>,
    found: FilePaths,
}

impl Collector {
    fn record<I, S>(&mut self, segments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if let Some(resolved) = resolve(&self.module, &segments) {
            self.found.paths.push(resolved);
        }
    }

    fn record_use_tree(&mut self, prefix: &mut Vec<String>, tree: &syn::UseTree) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(prefix, &path.tree);
                prefix.pop();
            }
            syn::UseTree::Name(name) => self.record_leaf(prefix, name.ident.to_string()),
            syn::UseTree::Rename(rename) => self.record_leaf(prefix, rename.ident.to_string()),
            syn::UseTree::Glob(_) => self.record(prefix.clone()),
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(prefix, item);
                }
            }
        }
    }

    fn record_leaf(&mut self, prefix: &[String], leaf: String) {
        let mut segments = prefix.to_vec();
        if leaf != "self" || segments.is_empty() {
            segments.push(leaf);
        }
        self.record(segments);
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_item(&mut self, item: &'ast syn::Item) {
        if !is_test_only(item_attrs(item)) {
            visit::visit_item(self, item);
            return;
        }
        if let syn::Item::Mod(declared) = item {
            if declared.content.is_none() {
                let mut module = self.module.clone();
                module.push(declared.ident.to_string());
                self.found.test_modules.push(module);
            }
        }
    }

    fn visit_item_mod(&mut self, item: &'ast syn::ItemMod) {
        if item.content.is_none() {
            return;
        }
        self.module.push(item.ident.to_string());
        visit::visit_item_mod(self, item);
        self.module.pop();
    }

    fn visit_impl_item_fn(&mut self, item: &'ast syn::ImplItemFn) {
        if !is_test_only(&item.attrs) {
            visit::visit_impl_item_fn(self, item);
        }
    }

    fn visit_item_use(&mut self, item: &'ast syn::ItemUse) {
        self.record_use_tree(&mut Vec::new(), &item.tree);
    }

    fn visit_path(&mut self, path: &'ast syn::Path) {
        self.record(path.segments.iter().map(|segment| segment.ident.to_string()));
        visit::visit_path(self, path);
    }
}

/// Resolve `segments`, as written in `module`, to a crate-relative path.
///
/// Single-segment paths are locals, prelude items or imported names and
/// carry no boundary information, so they resolve to nothing.
pub fn resolve(module: &[String], segments: &[String]) -> Option<Resolved> {
    let (first, rest) = segments.split_first()?;
    match first.as_str() {
        "crate" | "gateway" => Some(Resolved::Internal(rest.to_vec())),
        "self" => Some(Resolved::Internal(joined(module, rest))),
        "super" => {
            let ups = segments.iter().take_while(|segment| *segment == "super").count();
            let base = module.len().checked_sub(ups)?;
            Some(Resolved::Internal(joined(&module[..base], &segments[ups..])))
        }
        "Self" => None,
        _ if rest.is_empty() => None,
        layer if crate::rules::LAYERS.contains(&layer) => {
            Some(Resolved::Internal(segments.to_vec()))
        }
        _ => Some(Resolved::External(segments.to_vec())),
    }
}

fn joined(base: &[String], rest: &[String]) -> Vec<String> {
    base.iter().chain(rest).cloned().collect()
}

fn is_test_only(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Path>()
                .is_ok_and(|predicate| predicate.is_ident("test"))
    })
}

fn item_attrs(item: &syn::Item) -> &[syn::Attribute] {
    match item {
        syn::Item::Const(item) => &item.attrs,
        syn::Item::Enum(item) => &item.attrs,
        syn::Item::ExternCrate(item) => &item.attrs,
        syn::Item::Fn(item) => &item.attrs,
        syn::Item::ForeignMod(item) => &item.attrs,
        syn::Item::Impl(item) => &item.attrs,
        syn::Item::Macro(item) => &item.attrs,
        syn::Item::Mod(item) => &item.attrs,
        syn::Item::Static(item) => &item.attrs,
        syn::Item::Struct(item) => &item.attrs,
        syn::Item::Trait(item) => &item.attrs,
        syn::Item::TraitAlias(item) => &item.attrs,
        syn::Item::Type(item) => &item.attrs,
        syn::Item::Union(item) => &item.attrs,
        syn::Item::Use(item) => &item.attrs,
        _ => &[],
    }
}
