//! Stub emission: registry snapshot in, declaration file out.
//!
//! Emission runs in two stages. [`StubEmitter::collect`] introspects the registry (built-in members first, then
//! capabilities in registration order) into a [`StubPlan`] of normalized member declarations. Rendering the plan is
//! pure and lives in [`modulith_core::stub`]. [`StubEmitter::emit`] writes the rendered document atomically;
//! [`StubEmitter::check`] compares it with the file on disk instead.
//!
//! ## Examples
//! ```rust
//! use modulith::emit::StubEmitter;
//! use modulith::registry::Registry;
//!
//! let emitter = StubEmitter::new("capability_registry.pyi");
//! let text = emitter.render(&Registry::new()).unwrap();
//! assert!(text.contains("class CapabilityRegistry:"));
//! assert!(text.contains("def list_capabilities(cls) -> List[str]: ..."));
//! ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use modulith_core::signature::is_public_member;
use modulith_core::{MemberDecl, SignatureError, StubLayout, render_stub};
use thiserror::Error;

use crate::atomic::write_atomic;
use crate::config::StubsConfig;
use crate::registry::Registry;

/// Errors raised during stub emission. All of them abort generation.
#[derive(Debug, Error, Diagnostic)]
pub enum EmitError {
    #[error("cannot introspect member '{member}'")]
    #[diagnostic(code(modulith::emit::introspection))]
    Introspection {
        member: String,
        #[source]
        #[diagnostic_source]
        source: SignatureError,
    },

    #[error("failed to write {}", path.display())]
    #[diagnostic(code(modulith::emit::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is out of date", path.display())]
    #[diagnostic(code(modulith::emit::out_of_date), help("run `modulith stubs` to regenerate it"))]
    OutOfDate { path: PathBuf },
}

/// Introspected members, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubPlan {
    pub builtins: Vec<MemberDecl>,
    pub capabilities: Vec<MemberDecl>,
}

/// Result of a successful [`StubEmitter::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The file was created or its contents changed.
    Written,
    /// The file already held the rendered document; nothing was written.
    Unchanged,
}

/// Generates the registry's declaration file.
#[derive(Debug, Clone)]
pub struct StubEmitter {
    layout: StubLayout,
    path: PathBuf,
}

impl StubEmitter {
    /// Create an emitter writing to `path` with the default layout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            layout: StubLayout::default(),
            path: path.into(),
        }
    }

    /// Create an emitter from the `[stubs]` configuration section.
    pub fn from_config(config: &StubsConfig) -> Self {
        let layout = StubLayout::default()
            .with_class_name(&config.class_name)
            .with_name_set_attribute(&config.name_set_attribute);
        Self::new(&config.path).with_layout(layout)
    }

    pub fn with_layout(mut self, layout: StubLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Introspect the registry's members.
    ///
    /// ## Returns
    /// - (`StubPlan`): public built-ins (`__init__` always included) in declaration order, then every registered
    ///   capability in registration order.
    ///
    /// ## Errors
    /// - [`EmitError::Introspection`] naming the first member whose name or signature does not validate.
    #[tracing::instrument(skip_all, fields(capabilities = registry.len()))]
    pub fn collect(&self, registry: &Registry) -> Result<StubPlan, EmitError> {
        let builtins = registry
            .builtin_members()
            .into_iter()
            .filter(|member| is_public_member(member.name))
            .map(|member| declare(member.name, &member.signature))
            .collect::<Result<Vec<_>, _>>()?;

        let mut capabilities = Vec::new();
        for name in registry.list_capabilities() {
            let Some(signature) = registry.signature(&name) else {
                continue;
            };
            capabilities.push(declare(&name, &signature)?);
        }

        Ok(StubPlan { builtins, capabilities })
    }

    /// Render the declaration document for the registry's current contents.
    pub fn render(&self, registry: &Registry) -> Result<String, EmitError> {
        let plan = self.collect(registry)?;
        Ok(render_stub(&self.layout, &plan.builtins, &plan.capabilities))
    }

    /// Render and write the declaration file.
    ///
    /// The write is atomic and creates parent directories. A file that already holds the rendered document is left
    /// untouched.
    ///
    /// ## Errors
    /// - [`EmitError::Introspection`] if a member cannot be introspected; nothing is written.
    /// - [`EmitError::Io`] if the file cannot be written.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn emit(&self, registry: &Registry) -> Result<EmitOutcome, EmitError> {
        let rendered = self.render(registry)?;
        if std::fs::read_to_string(&self.path).is_ok_and(|existing| existing == rendered) {
            tracing::info!("stub file is up to date");
            return Ok(EmitOutcome::Unchanged);
        }
        write_atomic(&self.path, &rendered).map_err(|source| EmitError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(bytes = rendered.len(), "wrote stub file");
        Ok(EmitOutcome::Written)
    }

    /// Compare the rendered document with the file on disk without writing.
    ///
    /// ## Errors
    /// - [`EmitError::OutOfDate`] if the file is missing or differs.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn check(&self, registry: &Registry) -> Result<(), EmitError> {
        let rendered = self.render(registry)?;
        match std::fs::read_to_string(&self.path) {
            Ok(existing) if existing == rendered => Ok(()),
            _ => Err(EmitError::OutOfDate { path: self.path.clone() }),
        }
    }
}

fn declare(name: &str, signature: &modulith_core::Signature) -> Result<MemberDecl, EmitError> {
    MemberDecl::from_signature(name, signature).map_err(|source| EmitError::Introspection {
        member: name.to_string(),
        source,
    })
}
