//! Provide pure signature, type-parameter and stub rendering helpers for the modulith capability registry.
//!
//! This crate is intentionally small. It contains the deterministic pieces of stub generation that do not need a
//! live registry:
//! - the signature model, its normalized text rendering, and call-argument binding ([`signature`], [`binding`]),
//! - Python literal rendering for parameter defaults ([`literal`]),
//! - type-parameter inference from naming conventions ([`typevars`]),
//! - the stub document renderer ([`stub`]).
//!
//! ## Notes
//!
//! - **No IO** and no global state. The registry, the emitter (which writes files) and the CLI live in the
//!   `modulith` crate.
//! - Rendering is a pure function of hand-buildable inputs, so it can be tested without a registry.
//!
//! ## Examples
//! ```rust
//! use modulith_core::signature::{Parameter, Signature};
//!
//! let sig = Signature::new()
//!     .param(Parameter::positional("param").annotated("T"))
//!     .returns("T");
//! assert_eq!(sig.normalize().unwrap().to_string(), "(param: T) -> T");
//! ```

pub mod binding;
pub mod literal;
pub mod signature;
pub mod stub;
pub mod typevars;

pub use binding::{Args, BindError, BoundArgs};
pub use signature::{NormalizedSignature, ParamKind, Parameter, Signature, SignatureError};
pub use stub::{MemberDecl, StubLayout, render_stub};
pub use typevars::{TypeParam, Variance, extract_type_params};
