//! Repo-local architectural lint for enforcing hexagonal boundaries.
//!
//! The harvester crate keeps its fetch engine in `domain` (with the driven
//! ports), operator input in `inbound`, and HTTP, file, and telemetry adapters
//! in `outbound`. This crate parses those modules with `syn` and:
//!
//! - forbids `domain` code from depending on adapter modules (`inbound`,
//!   `outbound`) or on transport, filesystem, telemetry, and configuration
//!   crates
//! - forbids `inbound` adapters from importing `outbound` modules or the
//!   crates those adapters wrap
//! - forbids `outbound` adapters from importing `inbound` modules or the
//!   command-line and configuration crates
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use cap_std::ambient_authority;
use cap_std::fs::{Dir, DirEntry};
use syn::visit::Visit;
use thiserror::Error;

/// Name the harvester crate is imported under from its binaries and tests.
const CRATE_NAME: &str = "harvester";

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `harvester/src`.
    pub file: PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug, Error)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    #[error("I/O error while linting architecture: {0}")]
    Io(#[from] io::Error),
    /// Rust source parsing failed, or the file sits outside a known layer.
    #[error("failed to lint {}: {message}", .file.display())]
    Parse {
        /// Offending file, relative to `harvester/src`.
        file: PathBuf,
        /// Parser or layout message.
        message: String,
    },
    /// One or more boundary violations were found.
    #[error("architecture boundary violations:\n{}", render(.0))]
    Violations(Vec<Violation>),
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("- {violation}\n"))
        .collect()
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `harvester/src`.
    pub file: PathBuf,
    /// Rust source text.
    pub contents: String,
}

/// Hexagon layers, in the order their directories are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    const fn name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.name() == name)
    }

    fn of_file(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?;
        Self::from_name(first.as_os_str().to_str()?)
    }

    /// Sibling layers this layer must not import.
    const fn forbidden_layers(self) -> &'static [Self] {
        match self {
            Self::Domain => &[Self::Inbound, Self::Outbound],
            Self::Inbound => &[Self::Outbound],
            Self::Outbound => &[Self::Inbound],
        }
    }

    /// External crates this layer must not import.
    const fn forbidden_crates(self) -> &'static [&'static str] {
        match self {
            Self::Domain => &[
                "cap_std",
                "clap",
                "ortho_config",
                "prometheus",
                "reqwest",
                "tracing",
                "tracing_subscriber",
            ],
            Self::Inbound => &["cap_std", "prometheus", "reqwest"],
            Self::Outbound => &["clap", "ortho_config"],
        }
    }
}

/// Lint the harvester crate sources on disk.
///
/// `crate_dir` must be the `harvester/` directory at the repository root.
pub fn lint_harvester_sources(crate_dir: &Path) -> Result<(), ArchitectureLintError> {
    let sources = collect_lint_sources(&crate_dir.join("src"))?;
    lint_sources(&sources)
}

/// Lint the provided Rust sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of_file(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not under domain/, inbound/ or outbound/".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(check_file(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        violations.sort();
        Err(ArchitectureLintError::Violations(violations))
    }
}

fn check_file(file: &Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let mut collector = ImportCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for import in &collector.paths {
        if let Some(target) = import
            .internal_layer()
            .filter(|target| layer.forbidden_layers().contains(target))
        {
            messages.insert(format!(
                "{} module must not depend on crate::{}",
                layer.name(),
                target.name()
            ));
        }
        if let Some(root) = import
            .external_root()
            .filter(|root| layer.forbidden_crates().iter().any(|name| name == root))
        {
            messages.insert(format!(
                "{} module must not depend on external crate `{root}`",
                layer.name()
            ));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

/// One path mentioned by a file, split into identifier segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ImportPath(Vec<String>);

impl ImportPath {
    fn is_relative(segment: &str) -> bool {
        matches!(segment, "crate" | "self" | "super")
    }

    /// Layer named by a `crate::`, `super::`, `harvester::` or bare layer path.
    fn internal_layer(&self) -> Option<Layer> {
        let mut segments = self.0.iter().map(String::as_str).peekable();
        let first = *segments.peek()?;
        if first == CRATE_NAME {
            segments.next();
        } else {
            while segments.peek().is_some_and(|segment| Self::is_relative(segment)) {
                segments.next();
            }
        }
        Layer::from_name(segments.next()?)
    }

    /// First segment of a path that names another crate.
    fn external_root(&self) -> Option<&str> {
        let root = self.0.first()?.as_str();
        (!Self::is_relative(root) && root != CRATE_NAME).then_some(root)
    }
}

#[derive(Default)]
struct ImportCollector {
    paths: BTreeSet<ImportPath>,
}

impl ImportCollector {
    fn push(&mut self, segments: Vec<String>) {
        if !segments.is_empty() {
            self.paths.insert(ImportPath(segments));
        }
    }

    fn flatten_use(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.flatten_use(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.push(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.push(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.push(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.flatten_use(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for ImportCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        self.push(
            node.segments
                .iter()
                .map(|segment| segment.ident.to_string())
                .collect(),
        );
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.flatten_use(&node.tree, Vec::new());
    }
}

fn collect_lint_sources(src_dir: &Path) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let root = Dir::open_ambient_dir(src_dir, ambient_authority())?;
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        if !root.is_dir(layer.name()) {
            continue;
        }
        let dir = root.open_dir(layer.name())?;
        collect_sources_under(&dir, Path::new(layer.name()), &mut sources)?;
    }
    Ok(sources)
}

fn collect_sources_under(
    dir: &Dir,
    relative: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    let mut entries = dir.entries()?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(DirEntry::file_name);
    for entry in entries {
        let name = entry.file_name();
        let path = relative.join(&name);
        if entry.file_type()?.is_dir() {
            collect_sources_under(&entry.open_dir()?, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            sources.push(LintSource {
                contents: dir.read_to_string(&name)?,
                file: path,
            });
        }
    }
    Ok(())
}
