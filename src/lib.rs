#![forbid(unsafe_code)]
//! Process-wide capability registry with typing stub generation.
//!
//! A host application declares functions as named capabilities with `#[capability]`. They are installed in the
//! process-wide [`Registry`] when it is first accessed through [`registry::global`], and callers invoke them by
//! name through [`Registry::call`]. The [`emit`] module turns the registry's current contents into a typing stub
//! (`.pyi` syntax) that static analysis tools can check calls against.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//! - **True invariants**: use `.expect("INVARIANT: reason")` with a clear explanation.
//!
//! ## Examples
//! ```rust,ignore
//! use modulith::{Args, KwArgs, Registry, VarArgs, capability};
//!
//! #[capability]
//! fn greet(_registry: &Registry, name: String, #[default("!")] suffix: String) -> String {
//!     format!("hello {name}{suffix}")
//! }
//!
//! let registry = modulith::registry::global()?;
//! assert_eq!(registry.call("greet", Args::new().arg("ada"))?, "hello ada!");
//! ```

mod atomic;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod emit;
pub mod registry;
pub mod scanner;

pub use modulith_core::{
    Args, BindError, BoundArgs, MemberDecl, NormalizedSignature, ParamKind, Parameter, Signature, SignatureError,
    StubLayout, TypeParam, Variance,
};
pub use modulith_derive::capability;
pub use serde_json;
pub use serde_json::Value;

#[doc(hidden)]
pub use inventory;

pub use config::ProjectConfig;
pub use emit::{EmitError, StubEmitter};
pub use registry::{Capability, CapabilityError, Registry, RegistryError, global};

/// Extra positional arguments collected by a `*args` parameter.
pub type VarArgs = Vec<Value>;

/// Extra keyword arguments collected by a `**kwargs` parameter, in call order.
pub type KwArgs = serde_json::Map<String, Value>;
