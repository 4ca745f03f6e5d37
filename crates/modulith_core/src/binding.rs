//! Bind call arguments to a [`Signature`].
//!
//! Capabilities are invoked with loose positional and keyword arguments. Binding maps them onto the declared
//! parameters the same way a Python call would, so a capability declared as
//! `(required, optional='default', *args, **kwargs)` sees extra arguments forwarded untouched:
//!
//! - positional values fill positional parameters in order, extras go to the `*args` parameter;
//! - keyword values fill positional or keyword-only parameters by name, extras go to the `**kwargs` parameter;
//! - unbound parameters fall back to their defaults.
//!
//! ## Examples
//! ```rust
//! use modulith_core::binding::Args;
//! use modulith_core::signature::{Parameter, Signature};
//!
//! let sig = Signature::new()
//!     .param(Parameter::positional("required"))
//!     .param(Parameter::positional("optional").with_default("default"))
//!     .param(Parameter::var_positional("args"));
//! let bound = sig.bind(Args::new().arg("req").arg("opt").arg("a1")).unwrap();
//! assert_eq!(bound.extract::<String>("optional").unwrap(), "opt");
//! assert_eq!(bound.extract::<Vec<String>>("args").unwrap(), vec!["a1".to_string()]);
//! ```

use indexmap::IndexMap;
use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::signature::{ParamKind, Signature};

/// Arguments of a single capability call, as given by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keywords: IndexMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument. Repeating a keyword replaces the earlier value.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }
}

/// Arguments after binding: one value per declared parameter, in declaration order.
///
/// `*args` parameters hold a JSON array and `**kwargs` parameters a JSON object in call order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: IndexMap<String, Value>,
}

impl BoundArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Decode the value bound to `name` into a Rust type.
    ///
    /// ## Errors
    /// - [`BindError::MissingArgument`] if the signature has no such parameter.
    /// - [`BindError::ArgumentType`] if the value does not decode into `T`.
    pub fn extract<T: DeserializeOwned>(&self, name: &str) -> Result<T, BindError> {
        let value = self.values.get(name).ok_or_else(|| BindError::MissingArgument {
            name: name.to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| BindError::ArgumentType {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Errors raised when call arguments do not fit a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BindError {
    #[error("takes {expected} positional argument(s) but {given} were given")]
    #[diagnostic(code(modulith::bind::too_many_positional))]
    TooManyPositional { expected: usize, given: usize },

    #[error("got multiple values for argument `{name}`")]
    #[diagnostic(code(modulith::bind::multiple_values))]
    MultipleValues { name: String },

    #[error("got an unexpected keyword argument `{name}`")]
    #[diagnostic(code(modulith::bind::unexpected_keyword))]
    UnexpectedKeyword { name: String },

    #[error("missing required argument `{name}`")]
    #[diagnostic(code(modulith::bind::missing_argument))]
    MissingArgument { name: String },

    #[error("argument `{name}` has the wrong type: {message}")]
    #[diagnostic(code(modulith::bind::argument_type))]
    ArgumentType { name: String, message: String },
}

impl Signature {
    /// Bind call arguments to this signature.
    ///
    /// ## Errors
    /// - [`BindError::TooManyPositional`] when extra positionals have no `*args` to land in.
    /// - [`BindError::MultipleValues`] when a keyword names a parameter already filled by position.
    /// - [`BindError::UnexpectedKeyword`] when an unknown keyword has no `**kwargs` to land in.
    /// - [`BindError::MissingArgument`] when a parameter without default stays unbound.
    pub fn bind(&self, args: Args) -> Result<BoundArgs, BindError> {
        let params = self.params();
        let Args { positional, keywords } = args;
        let given = positional.len();

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        let mut values = positional.into_iter();
        let mut expected = 0;
        for (slot, param) in slots.iter_mut().zip(params) {
            if param.kind != ParamKind::PositionalOrKeyword {
                continue;
            }
            expected += 1;
            if let Some(value) = values.next() {
                *slot = Some(value);
            }
        }

        let mut extra_positional: Vec<Value> = values.collect();
        let has_var_positional = params.iter().any(|p| p.kind == ParamKind::VarPositional);
        if !extra_positional.is_empty() && !has_var_positional {
            return Err(BindError::TooManyPositional { expected, given });
        }

        let has_var_keyword = params.iter().any(|p| p.kind == ParamKind::VarKeyword);
        let mut extra_keywords = Map::new();
        for (name, value) in keywords {
            let target = params.iter().position(|p| {
                p.name == name && matches!(p.kind, ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly)
            });
            match target {
                Some(index) if slots[index].is_some() => return Err(BindError::MultipleValues { name }),
                Some(index) => slots[index] = Some(value),
                None if has_var_keyword => {
                    extra_keywords.insert(name, value);
                }
                None => return Err(BindError::UnexpectedKeyword { name }),
            }
        }

        let mut bound = IndexMap::with_capacity(params.len());
        for (slot, param) in slots.into_iter().zip(params) {
            let value = match param.kind {
                ParamKind::VarPositional => Value::Array(std::mem::take(&mut extra_positional)),
                ParamKind::VarKeyword => Value::Object(std::mem::take(&mut extra_keywords)),
                ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => {
                    match slot.or_else(|| param.default.clone()) {
                        Some(value) => value,
                        None => {
                            return Err(BindError::MissingArgument {
                                name: param.name.clone(),
                            });
                        }
                    }
                }
            };
            bound.insert(param.name.clone(), value);
        }

        Ok(BoundArgs { values: bound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Parameter;
    use serde_json::json;

    fn complex() -> Signature {
        Signature::new()
            .param(Parameter::positional("required"))
            .param(Parameter::positional("optional").with_default("default"))
            .param(Parameter::var_positional("args"))
            .param(Parameter::var_keyword("kwargs"))
    }

    #[test]
    fn test_defaults_fill_unbound() {
        let bound = complex().bind(Args::new().arg("req")).unwrap();
        assert_eq!(bound.get("required"), Some(&json!("req")));
        assert_eq!(bound.get("optional"), Some(&json!("default")));
        assert_eq!(bound.get("args"), Some(&json!([])));
        assert_eq!(bound.get("kwargs"), Some(&json!({})));
    }

    #[test]
    fn test_extras_are_forwarded_in_order() {
        let bound = complex()
            .bind(Args::new().arg("req").arg("opt").arg("a1").arg(2))
            .unwrap();
        assert_eq!(bound.get("args"), Some(&json!(["a1", 2])));

        let bound = complex()
            .bind(Args::new().arg("req").kwarg("k2", "v2").kwarg("k1", "v1"))
            .unwrap();
        let kwargs: Vec<&String> = bound.get("kwargs").unwrap().as_object().unwrap().keys().collect();
        assert_eq!(kwargs, ["k2", "k1"]);
    }

    #[test]
    fn test_keyword_fills_named_parameter() {
        let bound = complex().bind(Args::new().kwarg("optional", "x").kwarg("required", "r")).unwrap();
        assert_eq!(bound.extract::<String>("required").unwrap(), "r");
        assert_eq!(bound.extract::<String>("optional").unwrap(), "x");
    }

    #[test]
    fn test_too_many_positional() {
        let sig = Signature::new().param(Parameter::positional("a"));
        let err = sig.bind(Args::new().arg(1).arg(2)).unwrap_err();
        assert_eq!(err, BindError::TooManyPositional { expected: 1, given: 2 });
    }

    #[test]
    fn test_multiple_values() {
        let sig = Signature::new().param(Parameter::positional("a"));
        let err = sig.bind(Args::new().arg(1).kwarg("a", 2)).unwrap_err();
        assert_eq!(err, BindError::MultipleValues { name: "a".into() });
    }

    #[test]
    fn test_unexpected_keyword() {
        let sig = Signature::new().param(Parameter::positional("a"));
        let err = sig.bind(Args::new().arg(1).kwarg("b", 2)).unwrap_err();
        assert_eq!(err, BindError::UnexpectedKeyword { name: "b".into() });
    }

    #[test]
    fn test_missing_argument() {
        let sig = Signature::new()
            .param(Parameter::positional("a"))
            .param(Parameter::keyword_only("b"));
        let err = sig.bind(Args::new().arg(1)).unwrap_err();
        assert_eq!(err, BindError::MissingArgument { name: "b".into() });
    }

    #[test]
    fn test_keyword_named_like_var_positional_goes_to_kwargs() {
        let bound = complex().bind(Args::new().arg("req").kwarg("args", 1)).unwrap();
        assert_eq!(bound.get("args"), Some(&json!([])));
        assert_eq!(bound.get("kwargs"), Some(&json!({"args": 1})));
    }

    #[test]
    fn test_extract_type_mismatch() {
        let sig = Signature::new().param(Parameter::positional("n"));
        let bound = sig.bind(Args::new().arg("not a number")).unwrap();
        let err = bound.extract::<i64>("n").unwrap_err();
        assert!(matches!(err, BindError::ArgumentType { ref name, .. } if name == "n"));
    }
}
