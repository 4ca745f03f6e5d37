//! The capability registry.
//!
//! A [`Registry`] maps unique names to [`Capability`]s. Registered names are directly invokable members of the
//! registry: [`Registry::call`] binds the caller's arguments against the capability's signature and invokes the
//! callable with the registry itself as the implicit receiver.
//!
//! ## Notes
//! - The table is append-only. A name, once claimed, is never replaced; there is no way to unregister.
//! - Insertion order is preserved and drives the order of [`Registry::list_capabilities`] and of the emitted stub.
//! - The process-wide instance is obtained through [`global`]; independent instances can be built with
//!   [`Registry::new`] or [`Registry::with_declared`].
//! - The table sits behind a `RwLock` only so the process-wide instance can live in a `static`. Registration is
//!   expected during initialization, before the registry is read; concurrent registration is not a supported
//!   usage pattern.
//!
//! ## Examples
//! ```rust
//! use modulith::registry::{Capability, Registry};
//! use modulith::{Args, Parameter, Signature, Value};
//!
//! let registry = Registry::new();
//! let greet = Capability::new(
//!     "greet",
//!     Signature::new().param(Parameter::positional("name").annotated("str")).returns("str"),
//!     |_registry, bound| Ok(Value::from(format!("hello {}", bound.extract::<String>("name").unwrap()))),
//! );
//! registry.register(greet, None).unwrap();
//! assert_eq!(registry.call("greet", Args::new().arg("ada")).unwrap(), Value::from("hello ada"));
//! ```

pub mod builtins;
mod global;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use miette::Diagnostic;
use modulith_core::{Args, BindError, BoundArgs, Signature};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use builtins::{BuiltinMember, builtin_members};
pub use global::{DeclaredCapability, declared_capabilities, global};

/// Signature of the function behind a capability: the registry as receiver, then the bound arguments.
pub type Callable = dyn Fn(&Registry, &BoundArgs) -> Result<Value, CapabilityError> + Send + Sync;

/// A named callable with a declared signature.
#[derive(Clone)]
pub struct Capability {
    name: String,
    signature: Signature,
    callable: Arc<Callable>,
}

impl Capability {
    /// Create a capability.
    ///
    /// ## Parameters
    /// - `name`: the capability's own identifier, used when it is registered without an explicit name.
    /// - `signature`: parameters used to bind call arguments and to render the stub declaration.
    /// - `callable`: invoked with the registry as receiver and the bound arguments.
    pub fn new<F>(name: impl Into<String>, signature: Signature, callable: F) -> Self
    where
        F: Fn(&Registry, &BoundArgs) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            callable: Arc::new(callable),
        }
    }

    /// Create a capability that accepts any arguments: `(*args: Any, **kwargs: Any) -> Any`.
    ///
    /// The callable finds its arguments under the `args` and `kwargs` keys.
    pub fn variadic<F>(name: impl Into<String>, callable: F) -> Self
    where
        F: Fn(&Registry, &BoundArgs) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        Self::new(name, Signature::variadic(), callable)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bind `args` and call the capability with `registry` as receiver.
    ///
    /// ## Errors
    /// - [`CapabilityError::Arguments`] if the arguments do not fit the signature.
    /// - Whatever the callable itself returns.
    pub fn invoke(&self, registry: &Registry, args: Args) -> Result<Value, CapabilityError> {
        let bound = self
            .signature
            .bind(args)
            .map_err(|source| CapabilityError::arguments(&self.name, source))?;
        (self.callable)(registry, &bound)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Error raised by [`Registry::register`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RegistryError {
    #[error("capability '{name}' is already registered")]
    #[diagnostic(
        code(modulith::registry::duplicate_capability),
        help("capability names can be claimed once per process; register under another name")
    )]
    DuplicateCapability { name: String },
}

/// Error raised while calling a capability.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CapabilityError {
    #[error("no capability named '{name}' is registered")]
    #[diagnostic(code(modulith::call::unknown_capability))]
    UnknownCapability { name: String },

    #[error("invalid arguments for '{name}'")]
    #[diagnostic(code(modulith::call::arguments))]
    Arguments {
        name: String,
        #[source]
        #[diagnostic_source]
        source: BindError,
    },

    #[error("capability '{name}' failed: {message}")]
    #[diagnostic(code(modulith::call::failed))]
    Failed { name: String, message: String },

    #[error("capability '{name}' returned a value that cannot be represented: {message}")]
    #[diagnostic(code(modulith::call::return_value))]
    ReturnValue { name: String, message: String },
}

impl CapabilityError {
    pub fn arguments(name: &str, source: BindError) -> Self {
        Self::Arguments {
            name: name.to_string(),
            source,
        }
    }

    /// Wrap an error returned by the capability's own code.
    pub fn failed(name: &str, err: impl fmt::Display) -> Self {
        Self::Failed {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

/// Convert a capability's return value into a [`Value`].
///
/// ## Errors
/// - [`CapabilityError::ReturnValue`] if serialization fails (e.g. a map with non-string keys).
pub fn to_value<T: Serialize>(name: &str, value: T) -> Result<Value, CapabilityError> {
    serde_json::to_value(value).map_err(|e| CapabilityError::ReturnValue {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Table of named capabilities.
pub struct Registry {
    entries: RwLock<IndexMap<String, Capability>>,
    /// Number of entries present once initialization finished; the test reset hook truncates back to it.
    baseline: usize,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            baseline: 0,
        }
    }

    /// Create a registry holding every capability declared with `#[capability]` in this binary.
    ///
    /// Declarations are registered in a stable order: by module path, then by source line.
    ///
    /// ## Errors
    /// - [`RegistryError::DuplicateCapability`] if two declarations claim the same name.
    pub fn with_declared() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for declared in declared_capabilities() {
            registry.register(declared.build(), None)?;
        }
        registry.baseline = registry.len();
        tracing::debug!(count = registry.baseline, "installed declared capabilities");
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Capability>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Capability>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `capability` under `name`, or under its own name when `name` is `None`.
    ///
    /// The registration is visible to every holder of the registry as soon as this returns.
    ///
    /// ## Errors
    /// - [`RegistryError::DuplicateCapability`] if the name is taken. The registry is left unchanged.
    pub fn register(&self, mut capability: Capability, name: Option<&str>) -> Result<(), RegistryError> {
        if let Some(name) = name {
            capability.name = name.to_string();
        }
        let mut entries = self.write();
        if entries.contains_key(&capability.name) {
            return Err(RegistryError::DuplicateCapability { name: capability.name });
        }
        tracing::debug!(name = %capability.name, "registered capability");
        entries.insert(capability.name.clone(), capability);
        Ok(())
    }

    /// Names of all registered capabilities, in registration order.
    pub fn list_capabilities(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Capability> {
        self.read().get(name).cloned()
    }

    pub fn signature(&self, name: &str) -> Option<Signature> {
        self.read().get(name).map(|capability| capability.signature.clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Invoke the capability registered as `name`.
    ///
    /// The table lock is released before the callable runs, so capabilities may call or register others.
    ///
    /// ## Errors
    /// - [`CapabilityError::UnknownCapability`] if nothing is registered under `name`.
    /// - See [`Capability::invoke`].
    pub fn call(&self, name: &str, args: Args) -> Result<Value, CapabilityError> {
        let capability = self.get(name).ok_or_else(|| CapabilityError::UnknownCapability {
            name: name.to_string(),
        })?;
        capability.invoke(self, args)
    }

    /// The registry's own member surface, as reflected into the stub.
    pub fn builtin_members(&self) -> Vec<BuiltinMember> {
        builtin_members()
    }

    /// Drop every capability registered after initialization.
    ///
    /// Test-isolation hook only. Production code has no way to remove capabilities.
    #[doc(hidden)]
    pub fn __reset_for_tests(&self) {
        self.write().truncate(self.baseline);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("capabilities", &self.list_capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modulith_core::Parameter;

    fn constant(name: &str, value: &'static str) -> Capability {
        Capability::new(name, Signature::new().returns("str"), move |_, _| Ok(Value::from(value)))
    }

    #[test]
    fn test_register_under_own_name() {
        let registry = Registry::new();
        registry.register(constant("first", "1"), None).unwrap();
        assert!(registry.contains("first"));
        assert_eq!(registry.call("first", Args::new()).unwrap(), Value::from("1"));
    }

    #[test]
    fn test_register_under_override_name() {
        let registry = Registry::new();
        registry.register(constant("first", "1"), Some("renamed")).unwrap();
        assert_eq!(registry.list_capabilities(), ["renamed"]);
        assert_eq!(registry.get("renamed").unwrap().name(), "renamed");
    }

    #[test]
    fn test_duplicate_leaves_original() {
        let registry = Registry::new();
        registry.register(constant("dup", "first"), None).unwrap();
        let err = registry.register(constant("dup", "second"), None).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateCapability { name: "dup".into() });
        assert!(err.to_string().contains("is already registered"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.call("dup", Args::new()).unwrap(), Value::from("first"));
    }

    #[test]
    fn test_unknown_capability() {
        let err = Registry::new().call("missing", Args::new()).unwrap_err();
        assert_eq!(err, CapabilityError::UnknownCapability { name: "missing".into() });
    }

    #[test]
    fn test_argument_errors_name_the_capability() {
        let registry = Registry::new();
        let echo = Capability::new(
            "echo",
            Signature::new().param(Parameter::positional("value")),
            |_, bound| Ok(bound.get("value").cloned().unwrap_or(Value::Null)),
        );
        registry.register(echo, None).unwrap();
        let err = registry.call("echo", Args::new()).unwrap_err();
        assert!(matches!(err, CapabilityError::Arguments { ref name, .. } if name == "echo"));
    }

    #[test]
    fn test_capability_can_register_another_during_call() {
        let registry = Registry::new();
        let installer = Capability::new("installer", Signature::new(), |registry, _| {
            registry
                .register(constant("installed", "ok"), None)
                .map_err(|e| CapabilityError::failed("installer", e))?;
            registry.call("installed", Args::new())
        });
        registry.register(installer, None).unwrap();
        assert_eq!(registry.call("installer", Args::new()).unwrap(), Value::from("ok"));
        assert_eq!(registry.list_capabilities(), ["installer", "installed"]);
    }

    #[test]
    fn test_reset_truncates_to_baseline() {
        let registry = Registry::new();
        registry.register(constant("a", "a"), None).unwrap();
        registry.__reset_for_tests();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_to_value_rejects_non_string_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let err = to_value("bad", map).unwrap_err();
        assert!(matches!(err, CapabilityError::ReturnValue { .. }));
    }
}
