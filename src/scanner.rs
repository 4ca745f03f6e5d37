//! Best-effort discovery of source modules that use the registry.
//!
//! The scan is informational: emission never depends on it. Files that cannot be read or decoded, walk errors and
//! missing roots are logged and collected as [`ScanFailure`]s, and the scan carries on with the rest.

use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;

/// A path the scanner could not process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a scan. Partial results are normal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Module identifiers in walk order.
    pub modules: Vec<String>,
    pub failures: Vec<ScanFailure>,
}

/// Walks source roots looking for references to the registry identifier.
#[derive(Debug, Clone)]
pub struct ModuleScanner {
    roots: Vec<PathBuf>,
    identifier: String,
    extensions: Vec<String>,
}

impl ModuleScanner {
    pub fn new(roots: Vec<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            roots,
            identifier: identifier.into(),
            extensions: ScanConfig::default().extensions,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.roots.clone(), &config.identifier).with_extensions(config.extensions.clone())
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Walk every root in sorted order.
    ///
    /// ## Returns
    /// - (`ScanReport`): the module identifier of each matching file (path relative to its root, extension removed,
    ///   components joined with `::`, a trailing `mod` dropped) and every failure met on the way.
    #[tracing::instrument(skip_all, fields(identifier = %self.identifier, roots = self.roots.len()))]
    pub fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();
        for root in &self.roots {
            if !root.is_dir() {
                tracing::warn!(root = %root.display(), "scan root does not exist; skipping");
                report.failures.push(ScanFailure {
                    path: root.clone(),
                    reason: "not a directory".to_string(),
                });
                continue;
            }
            self.scan_root(root, &mut report);
        }
        tracing::debug!(
            modules = report.modules.len(),
            failures = report.failures.len(),
            "scan finished"
        );
        report
    }

    fn scan_root(&self, root: &Path, report: &mut ScanReport) {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    tracing::warn!(path = %path.display(), error = %err, "failed to walk");
                    report.failures.push(ScanFailure {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_source_extension(entry.path()) {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(text) if text.contains(&self.identifier) => {
                    if let Some(module) = module_id(root, entry.path()) {
                        report.modules.push(module);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(path = %entry.path().display(), error = %err, "failed to read module");
                    report.failures.push(ScanFailure {
                        path: entry.path().to_path_buf(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}

/// Hidden entries and build output are not scanned.
fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name == "target")
}

fn module_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let mut components: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if components.len() > 1 && components.last().is_some_and(|last| last == "mod") {
        components.pop();
    }
    if components.is_empty() {
        None
    } else {
        Some(components.join("::"))
    }
}
