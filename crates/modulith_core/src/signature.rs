//! Signature model for registry members and its normalized text rendering.
//!
//! A [`Signature`] is what the stub generator knows about a callable: ordered parameters (name, kind, optional
//! annotation, optional default) plus a return annotation. Capabilities carry one from the moment they are
//! declared, and the registry's built-in members have fixed ones.
//!
//! [`Signature::normalize`] is the introspection step used by stub emission. It validates the parameter list and
//! renders each parameter as standalone declaration syntax, with implementation-only variance markers removed.
//!
//! ## Notes
//! - Annotations are free-form strings in the stub's target syntax (`str`, `List[int]`, `T_co`, ...).
//! - Defaults are JSON values and are rendered as Python literals (see [`crate::literal`]).
//!
//! ## Examples
//! ```rust
//! use modulith_core::signature::{Parameter, Signature};
//!
//! let sig = Signature::new()
//!     .param(Parameter::positional("required"))
//!     .param(Parameter::positional("optional").with_default("default"))
//!     .param(Parameter::var_positional("args"))
//!     .param(Parameter::var_keyword("kwargs"));
//! assert_eq!(
//!     sig.normalize().unwrap().to_string(),
//!     "(required, optional='default', *args, **kwargs)"
//! );
//! ```

use std::collections::HashSet;
use std::fmt;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::literal::py_literal;

/// Name of the constructor-equivalent member. It is emitted even though it starts with `_`.
pub const CONSTRUCTOR: &str = "__init__";

/// Check whether a member name belongs to the public stub surface.
///
/// ## Returns
/// - (`bool`): `true` unless the name starts with `_`; [`CONSTRUCTOR`] is always public.
pub fn is_public_member(name: &str) -> bool {
    name == CONSTRUCTOR || !name.starts_with('_')
}

/// Check whether `name` is a valid identifier (letter or `_`, then letters, digits or `_`).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Reserved words that cannot name a member or parameter in a declaration.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
    "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal",
    "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Check whether `name` can be declared: an identifier that is not a reserved word.
pub fn is_declarable(name: &str) -> bool {
    is_identifier(name) && !KEYWORDS.contains(&name)
}

/// How a parameter receives its argument.
///
/// Variants are declared in the only order they may appear in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKind {
    /// Filled by position or by keyword.
    PositionalOrKeyword,
    /// `*args`: collects extra positional arguments.
    VarPositional,
    /// Only fillable by keyword.
    KeywordOnly,
    /// `**kwargs`: collects extra keyword arguments.
    VarKeyword,
}

impl ParamKind {
    /// Check whether the parameter collects a variable number of arguments.
    pub fn is_variadic(self) -> bool {
        matches!(self, ParamKind::VarPositional | ParamKind::VarKeyword)
    }

    fn prefix(self) -> &'static str {
        match self {
            ParamKind::VarPositional => "*",
            ParamKind::VarKeyword => "**",
            ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => "",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::PositionalOrKeyword => "positional",
            ParamKind::VarPositional => "var-positional",
            ParamKind::KeywordOnly => "keyword-only",
            ParamKind::VarKeyword => "var-keyword",
        };
        f.write_str(s)
    }
}

/// One parameter of a [`Signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<String>,
    pub default: Option<Value>,
}

impl Parameter {
    fn with_kind(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            annotation: None,
            default: None,
        }
    }

    /// Create a positional-or-keyword parameter.
    pub fn positional(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::PositionalOrKeyword)
    }

    /// Create a keyword-only parameter.
    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::KeywordOnly)
    }

    /// Create a `*name` parameter.
    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::VarPositional)
    }

    /// Create a `**name` parameter.
    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::VarKeyword)
    }

    /// Set the type annotation.
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn render(&self) -> String {
        let mut out = format!("{}{}", self.kind.prefix(), self.name);
        let annotation = self.annotation.as_deref().map(normalize_annotation);
        if let Some(annotation) = &annotation {
            out.push_str(": ");
            out.push_str(annotation);
        }
        if let Some(default) = &self.default {
            out.push_str(if annotation.is_some() { " = " } else { "=" });
            out.push_str(&py_literal(default));
        }
        out
    }
}

/// Parameter and return description of a registry member.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Vec<Parameter>,
    returns: Option<String>,
}

impl Signature {
    /// Create an empty signature: `()` with no return annotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catch-all signature `(*args: Any, **kwargs: Any) -> Any`.
    ///
    /// Used for capabilities registered from plain closures that do not describe their parameters.
    pub fn variadic() -> Self {
        Self::new()
            .param(Parameter::var_positional("args").annotated("Any"))
            .param(Parameter::var_keyword("kwargs").annotated("Any"))
            .returns("Any")
    }

    /// Append a parameter.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Set the return annotation.
    pub fn returns(mut self, annotation: impl Into<String>) -> Self {
        self.returns = Some(annotation.into());
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn return_annotation(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    /// Validate the parameter list.
    ///
    /// ## Errors
    /// - [`SignatureError::InvalidName`] for names that are not identifiers or are reserved words.
    /// - [`SignatureError::DuplicateParameter`] when a name repeats.
    /// - [`SignatureError::KindOrder`] when kinds are out of order (positional, `*args`, keyword-only, `**kwargs`).
    /// - [`SignatureError::RepeatedVariadic`] for a second `*args` or `**kwargs`.
    /// - [`SignatureError::NonDefaultAfterDefault`] for a required positional after a defaulted one.
    /// - [`SignatureError::VariadicDefault`] for a default on a variadic parameter.
    /// - [`SignatureError::EmptyAnnotation`] for blank annotations.
    pub fn validate(&self) -> Result<(), SignatureError> {
        let mut seen = HashSet::new();
        let mut previous: Option<ParamKind> = None;
        let mut saw_default = false;

        for param in &self.params {
            if !is_declarable(&param.name) {
                return Err(SignatureError::InvalidName {
                    name: param.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(SignatureError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
            if let Some(prev) = previous {
                if param.kind < prev {
                    return Err(SignatureError::KindOrder {
                        name: param.name.clone(),
                        kind: param.kind,
                        previous: prev,
                    });
                }
                if param.kind == prev && param.kind.is_variadic() {
                    return Err(SignatureError::RepeatedVariadic {
                        name: param.name.clone(),
                        kind: param.kind,
                    });
                }
            }
            if param.kind.is_variadic() && param.default.is_some() {
                return Err(SignatureError::VariadicDefault {
                    name: param.name.clone(),
                });
            }
            if param.kind == ParamKind::PositionalOrKeyword {
                if param.default.is_some() {
                    saw_default = true;
                } else if saw_default {
                    return Err(SignatureError::NonDefaultAfterDefault {
                        name: param.name.clone(),
                    });
                }
            }
            if param.annotation.as_deref().is_some_and(|a| a.trim().is_empty()) {
                return Err(SignatureError::EmptyAnnotation {
                    name: param.name.clone(),
                });
            }
            previous = Some(param.kind);
        }

        if self.returns.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(SignatureError::EmptyAnnotation {
                name: "return".to_string(),
            });
        }
        Ok(())
    }

    /// Validate and render the signature in normalized form.
    ///
    /// ## Returns
    /// - (`NormalizedSignature`): one rendered entry per parameter (plus a bare `*` separator before the first
    ///   keyword-only parameter when there is no `*args`), and the normalized return annotation.
    ///
    /// ## Errors
    /// - Any [`SignatureError`] reported by [`Signature::validate`].
    pub fn normalize(&self) -> Result<NormalizedSignature, SignatureError> {
        self.validate()?;

        let mut params = Vec::with_capacity(self.params.len() + 1);
        let mut star_emitted = false;
        for param in &self.params {
            match param.kind {
                ParamKind::VarPositional => star_emitted = true,
                ParamKind::KeywordOnly if !star_emitted => {
                    params.push("*".to_string());
                    star_emitted = true;
                }
                _ => {}
            }
            params.push(param.render());
        }

        Ok(NormalizedSignature {
            params,
            returns: self.returns.as_deref().map(normalize_annotation),
        })
    }
}

/// Errors raised while introspecting a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SignatureError {
    #[error("parameter name `{name}` is not a valid identifier")]
    #[diagnostic(code(modulith::signature::invalid_name))]
    InvalidName { name: String },

    #[error("member name `{name}` is not a valid identifier")]
    #[diagnostic(
        code(modulith::signature::invalid_member_name),
        help("register the capability under an identifier that is not a reserved word")
    )]
    InvalidMemberName { name: String },

    #[error("parameter `{name}` is declared more than once")]
    #[diagnostic(code(modulith::signature::duplicate_parameter))]
    DuplicateParameter { name: String },

    #[error("{kind} parameter `{name}` cannot follow a {previous} parameter")]
    #[diagnostic(
        code(modulith::signature::kind_order),
        help("order parameters as: positional, *args, keyword-only, **kwargs")
    )]
    KindOrder {
        name: String,
        kind: ParamKind,
        previous: ParamKind,
    },

    #[error("second {kind} parameter `{name}`")]
    #[diagnostic(code(modulith::signature::repeated_variadic))]
    RepeatedVariadic { name: String, kind: ParamKind },

    #[error("parameter `{name}` without a default follows a parameter with a default")]
    #[diagnostic(code(modulith::signature::non_default_after_default))]
    NonDefaultAfterDefault { name: String },

    #[error("variadic parameter `{name}` cannot have a default")]
    #[diagnostic(code(modulith::signature::variadic_default))]
    VariadicDefault { name: String },

    #[error("annotation of `{name}` is empty")]
    #[diagnostic(code(modulith::signature::empty_annotation))]
    EmptyAnnotation { name: String },
}

/// A validated, rendered signature ready to embed in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedSignature {
    params: Vec<String>,
    returns: Option<String>,
}

impl NormalizedSignature {
    /// Build a normalized signature from already-rendered parts.
    ///
    /// Renderer tests use this to work from hand-built member lists.
    pub fn new(params: Vec<String>, returns: Option<String>) -> Self {
        Self { params, returns }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn returns(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    /// Render with an explicit receiver as the first parameter, e.g. `(cls, param: T) -> T`.
    pub fn render_with_receiver(&self, receiver: &str) -> String {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(receiver);
        params.extend(self.params.iter().map(String::as_str));
        render_parts(&params, self.returns.as_deref())
    }
}

impl fmt::Display for NormalizedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(String::as_str).collect();
        f.write_str(&render_parts(&params, self.returns.as_deref()))
    }
}

fn render_parts(params: &[&str], returns: Option<&str>) -> String {
    let mut out = format!("({})", params.join(", "));
    if let Some(returns) = returns {
        out.push_str(" -> ");
        out.push_str(returns);
    }
    out
}

/// Normalize an annotation into standalone declaration syntax.
///
/// - `~` markers are dropped (`~T` becomes `T`).
/// - `+`/`-` variance prefixes on a type name are dropped (`+T_co` becomes `T_co`).
/// - Whitespace collapses to single spaces, with none inside brackets and exactly one after commas.
///
/// ## Examples
/// ```rust
/// use modulith_core::signature::normalize_annotation;
///
/// assert_eq!(normalize_annotation("Dict [ ~K , +V_co ]"), "Dict[K, V_co]");
/// ```
pub fn normalize_annotation(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty() && !out.ends_with(['[', '(']);
            continue;
        }
        if ch == '~' {
            continue;
        }
        if (ch == '+' || ch == '-')
            && at_token_start(&out)
            && chars.peek().is_some_and(|next| next.is_alphabetic() || *next == '_')
        {
            continue;
        }

        match ch {
            ',' => {
                out.push(',');
                pending_space = true;
            }
            '[' | ']' | ')' => {
                out.push(ch);
                pending_space = false;
            }
            _ => {
                if pending_space {
                    out.push(' ');
                }
                out.push(ch);
                pending_space = false;
            }
        }
    }
    out
}

fn at_token_start(out: &str) -> bool {
    match out.trim_end().chars().last() {
        None => true,
        Some(last) => matches!(last, '[' | '(' | ',' | '|'),
    }
}
