//! Definition-time declarations and the process-wide registry.

use std::sync::OnceLock;

use super::{Capability, Registry, RegistryError};

/// A capability declared with `#[capability]`, collected at link time.
#[derive(Debug)]
pub struct DeclaredCapability {
    module_path: &'static str,
    line: u32,
    build: fn() -> Capability,
}

impl DeclaredCapability {
    #[doc(hidden)]
    pub const fn new(module_path: &'static str, line: u32, build: fn() -> Capability) -> Self {
        Self {
            module_path,
            line,
            build,
        }
    }

    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn build(&self) -> Capability {
        (self.build)()
    }
}

inventory::collect!(DeclaredCapability);

/// All declared capabilities, ordered by module path and then source line.
///
/// Link order is unspecified, so the sort is what makes registration order reproducible between builds.
pub fn declared_capabilities() -> Vec<&'static DeclaredCapability> {
    let mut declared: Vec<&'static DeclaredCapability> = inventory::iter::<DeclaredCapability>.into_iter().collect();
    declared.sort_by_key(|d| (d.module_path, d.line));
    declared
}

static GLOBAL: OnceLock<Result<Registry, RegistryError>> = OnceLock::new();

/// The process-wide registry.
///
/// Initialized on first access with every declared capability. Later calls return the same instance, so
/// registrations made through any handle are visible through all of them.
///
/// ## Errors
/// - [`RegistryError::DuplicateCapability`] if two declarations claim the same name. The failure is sticky: every
///   call reports it.
pub fn global() -> Result<&'static Registry, RegistryError> {
    GLOBAL.get_or_init(Registry::with_declared).as_ref().map_err(Clone::clone)
}
