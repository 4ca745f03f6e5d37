//! The import-linter contract file declaring the project's independent modules.
//!
//! The file uses INI syntax:
//!
//! ```ini
//! [importlinter]
//! root_package = modules
//! include_external_packages = n
//!
//! [importlinter:contract:modulith_modules]
//! name = Modulith modules are independent
//! type = independence
//! modules =
//!     billing
//!     shipping
//! ```
//!
//! Only the `modules` list of the modulith contract is managed. Other sections and keys are kept as they are, in
//! their original order. Full-line `#`/`;` comments are kept in place; blank lines are normalized to one between
//! sections.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use modulith_core::signature::is_identifier;
use thiserror::Error;

use crate::atomic::write_atomic;
use crate::config::ContractsConfig;

pub const ROOT_SECTION: &str = "importlinter";
pub const CONTRACT_SECTION: &str = "importlinter:contract:modulith_modules";
const MODULES_KEY: &str = "modules";
const CONTINUATION_INDENT: &str = "    ";

#[derive(Debug, Error, Diagnostic)]
pub enum ContractError {
    #[error("failed to access {}", path.display())]
    #[diagnostic(code(modulith::contracts::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: cannot parse `{text}`")]
    #[diagnostic(
        code(modulith::contracts::syntax),
        help("expected `[section]`, `key = value` or an indented continuation")
    )]
    Syntax { line: usize, text: String },

    #[error("`{name}` is not a valid module name")]
    #[diagnostic(
        code(modulith::contracts::module_name),
        help("use a dotted Python identifier such as `billing` or `shop.orders`")
    )]
    InvalidModuleName { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// Multi-line values are stored with `\n` between lines; the first line may be empty.
    Entry { key: String, value: String },
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    items: Vec<Item>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            Item::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    fn set(&mut self, key: &str, value: String) {
        let existing = self.items.iter_mut().find_map(|item| match item {
            Item::Entry { key: k, value } if k == key => Some(value),
            _ => None,
        });
        match existing {
            Some(existing) => *existing = value,
            None => self.items.push(Item::Entry {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// An INI contract document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFile {
    /// Comments above the first section.
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl ContractFile {
    /// The document written when no contract file exists yet.
    pub fn from_config(config: &ContractsConfig) -> Self {
        let mut root = Section::new(ROOT_SECTION);
        root.set("root_package", config.root_package.clone());
        let external = if config.include_external_packages { "y" } else { "n" };
        root.set("include_external_packages", external.to_string());

        Self {
            preamble: Vec::new(),
            sections: vec![root, contract_section(config)],
        }
    }

    /// Parse INI text.
    ///
    /// ## Errors
    /// - [`ContractError::Syntax`] for a line that is neither a section header, an entry, a continuation, a comment
    ///   nor blank.
    pub fn parse(text: &str) -> Result<Self, ContractError> {
        let mut preamble = Vec::new();
        let mut sections: Vec<Section> = Vec::new();
        let mut last_key: Option<usize> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            // A comment inside a multi-line value does not end it; it is rendered after the entry.
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                match sections.last_mut() {
                    Some(section) => section.items.push(Item::Comment(trimmed.to_string())),
                    None => preamble.push(trimmed.to_string()),
                }
                continue;
            }
            let syntax = || ContractError::Syntax {
                line: index + 1,
                text: line.to_string(),
            };

            if line.starts_with(char::is_whitespace) {
                let Some(Item::Entry { value, .. }) =
                    last_key.and_then(|entry| sections.last_mut()?.items.get_mut(entry))
                else {
                    return Err(syntax());
                };
                value.push('\n');
                value.push_str(trimmed);
                continue;
            }

            if let Some(name) = trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                sections.push(Section::new(name.trim()));
                last_key = None;
                continue;
            }

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(syntax());
            };
            let Some(section) = sections.last_mut() else {
                return Err(syntax());
            };
            let key = trimmed[..split].trim();
            if key.is_empty() {
                return Err(syntax());
            }
            let value = trimmed[split + 1..].trim();
            section.items.push(Item::Entry {
                key: key.to_string(),
                value: value.to_string(),
            });
            last_key = Some(section.items.len() - 1);
        }

        Ok(Self { preamble, sections })
    }

    /// Render the document. Sections are separated by a blank line; continuation lines are indented.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for comment in &self.preamble {
            out.push_str(comment);
            out.push('\n');
        }
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section.name));
            for item in &section.items {
                let (key, value) = match item {
                    Item::Entry { key, value } => (key, value),
                    Item::Comment(comment) => {
                        out.push_str(comment);
                        out.push('\n');
                        continue;
                    }
                };
                let mut lines = value.split('\n');
                let first = lines.next().unwrap_or_default();
                if first.is_empty() {
                    out.push_str(&format!("{key} =\n"));
                } else {
                    out.push_str(&format!("{key} = {first}\n"));
                }
                for line in lines {
                    out.push_str(CONTINUATION_INDENT);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Load the contract file at `path`, or the default document if it does not exist.
    pub fn load_or_default(path: &Path, config: &ContractsConfig) -> Result<Self, ContractError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::from_config(config)),
            Err(source) => Err(ContractError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write the document atomically.
    pub fn save(&self, path: &Path) -> Result<(), ContractError> {
        write_atomic(path, &self.render()).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote contract file");
        Ok(())
    }

    /// Look up a raw value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.iter().find(|s| s.name == section)?.get(key)
    }

    /// Modules declared by the modulith contract, in file order.
    pub fn modules(&self) -> Vec<String> {
        self.get(CONTRACT_SECTION, MODULES_KEY)
            .map(|value| {
                value
                    .split('\n')
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append `name` to the contract's module list.
    ///
    /// The contract section is created from `config` if the document lacks it.
    ///
    /// ## Returns
    /// - (`bool`): `false` if the module was already declared.
    ///
    /// ## Errors
    /// - [`ContractError::InvalidModuleName`] unless `name` is a dotted identifier.
    pub fn add_module(&mut self, name: &str, config: &ContractsConfig) -> Result<bool, ContractError> {
        if name.is_empty() || !name.split('.').all(is_identifier) {
            return Err(ContractError::InvalidModuleName { name: name.to_string() });
        }
        let mut modules = self.modules();
        if modules.iter().any(|existing| existing == name) {
            return Ok(false);
        }
        modules.push(name.to_string());

        let index = match self.sections.iter().position(|s| s.name == CONTRACT_SECTION) {
            Some(index) => index,
            None => {
                self.sections.push(contract_section(config));
                self.sections.len() - 1
            }
        };
        self.sections[index].set(MODULES_KEY, format!("\n{}", modules.join("\n")));
        Ok(true)
    }
}

fn contract_section(config: &ContractsConfig) -> Section {
    let mut contract = Section::new(CONTRACT_SECTION);
    contract.set("name", config.contract_name.clone());
    contract.set("type", "independence".to_string());
    contract.set(MODULES_KEY, String::new());
    contract
}
