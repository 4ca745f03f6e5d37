//! Project configuration loaded from `modulith.toml`.
//!
//! Every section and key is optional; a missing file yields [`ProjectConfig::default`]. Unknown keys are rejected so
//! typos surface instead of silently falling back to defaults.
//!
//! ```toml
//! [stubs]
//! path = "src/modulith/capability_registry.pyi"
//!
//! [scan]
//! roots = ["src"]
//!
//! [contracts]
//! root_package = "apps"
//! ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const FILE_NAME: &str = "modulith.toml";

/// Errors raised while loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(modulith::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}", path.display())]
    #[diagnostic(code(modulith::config::parse), help("see the [stubs], [scan] and [contracts] sections"))]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Top-level `modulith.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub stubs: StubsConfig,
    pub scan: ScanConfig,
    pub contracts: ContractsConfig,
}

/// `[stubs]`: where and how the declaration file is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StubsConfig {
    pub path: PathBuf,
    pub class_name: String,
    pub name_set_attribute: String,
}

impl Default for StubsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("src/modulith/capability_registry.pyi"),
            class_name: "CapabilityRegistry".to_string(),
            name_set_attribute: "_registered_capabilities".to_string(),
        }
    }
}

/// `[scan]`: module/consumer discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub identifier: String,
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("src"), PathBuf::from("tests")],
            identifier: "CapabilityRegistry".to_string(),
            extensions: vec!["rs".to_string(), "py".to_string()],
        }
    }
}

/// `[contracts]`: the import-linter contract file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractsConfig {
    pub file: PathBuf,
    pub root_package: String,
    pub include_external_packages: bool,
    pub contract_name: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(".importlinter"),
            root_package: "modules".to_string(),
            include_external_packages: false,
            contract_name: "Modulith modules are independent".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration text.
    ///
    /// ## Parameters
    /// - `text`: TOML source.
    /// - `path`: reported in errors only.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Load configuration from `path`, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load configuration from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_stub_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stubs.path = path.into();
        self
    }

    pub fn with_scan_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.scan.roots = roots;
        self
    }

    pub fn with_contract_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.contracts.file = file.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ProjectConfig::from_toml_str("", Path::new(FILE_NAME)).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.stubs.path, Path::new("src/modulith/capability_registry.pyi"));
        assert_eq!(config.contracts.root_package, "modules");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let text = "[stubs]\nclass_name = \"Services\"\n\n[scan]\nroots = [\"app\"]\n";
        let config = ProjectConfig::from_toml_str(text, Path::new(FILE_NAME)).unwrap();
        assert_eq!(config.stubs.class_name, "Services");
        assert_eq!(config.stubs.name_set_attribute, "_registered_capabilities");
        assert_eq!(config.scan.roots, [PathBuf::from("app")]);
        assert_eq!(config.scan.identifier, "CapabilityRegistry");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = ProjectConfig::from_toml_str("[stubs]\npaht = \"x\"\n", Path::new(FILE_NAME)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(ProjectConfig::from_toml_str("[extra]\n", Path::new(FILE_NAME)).is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_or_default(&dir.path().join(FILE_NAME)).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        std::fs::write(&path, "[contracts]\ninclude_external_packages = true\n").unwrap();
        let config = ProjectConfig::load(&path).unwrap();
        assert!(config.contracts.include_external_packages);
    }

    #[test]
    fn test_builders() {
        let config = ProjectConfig::default()
            .with_stub_path("out/registry.pyi")
            .with_contract_file("lint.ini");
        assert_eq!(config.stubs.path, Path::new("out/registry.pyi"));
        assert_eq!(config.contracts.file, Path::new("lint.ini"));
    }
}
