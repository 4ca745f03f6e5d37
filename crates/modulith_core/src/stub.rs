//! Render the registry's static-declaration document.
//!
//! This is the second, pure stage of stub generation. It takes already-normalized member signatures and produces
//! the document text:
//!
//! 1. the generated-file header and the `typing` import line,
//! 2. type-parameter declarations, if any were inferred (see [`crate::typevars`]),
//! 3. the class declaration with its class-scoped name-set attribute,
//! 4. one body-less `@classmethod` declaration per built-in member,
//! 5. one per capability, unless an identical declaration was already emitted.
//!
//! ## Notes
//! - Output depends only on the inputs and their order; rendering twice yields identical text.

use std::collections::HashSet;

use crate::signature::{NormalizedSignature, Signature, SignatureError, is_declarable};
use crate::typevars::extract_type_params;

/// The `typing` names used by generated declarations.
pub const TYPING_IMPORTS: &str =
    "from typing import Any, Callable, ClassVar, Dict, List, Optional, Set, Tuple, TypeVar";

/// Default header placed at the top of the document as `#` comments.
pub const GENERATED_HEADER: &str = "This file is generated by `modulith stubs`. Do not edit it by hand.";

/// Receiver name used for class-bound members.
const RECEIVER: &str = "cls";

const INDENT: &str = "    ";

/// Document-level settings that do not come from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubLayout {
    pub class_name: String,
    pub name_set_attribute: String,
    pub header: Option<String>,
}

impl Default for StubLayout {
    fn default() -> Self {
        Self {
            class_name: "CapabilityRegistry".to_string(),
            name_set_attribute: "_registered_capabilities".to_string(),
            header: Some(GENERATED_HEADER.to_string()),
        }
    }
}

impl StubLayout {
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_name_set_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.name_set_attribute = attribute.into();
        self
    }

    pub fn without_header(mut self) -> Self {
        self.header = None;
        self
    }
}

/// A member ready for rendering: its name and normalized signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub name: String,
    pub signature: NormalizedSignature,
}

impl MemberDecl {
    pub fn new(name: impl Into<String>, signature: NormalizedSignature) -> Self {
        Self {
            name: name.into(),
            signature,
        }
    }

    /// Normalize `signature` and wrap it as a member.
    ///
    /// ## Errors
    /// - [`SignatureError::InvalidMemberName`] if `name` is not an identifier or is a reserved word.
    /// - [`SignatureError`] if the signature does not validate.
    pub fn from_signature(name: impl Into<String>, signature: &Signature) -> Result<Self, SignatureError> {
        let name = name.into();
        if !is_declarable(&name) {
            return Err(SignatureError::InvalidMemberName { name });
        }
        Ok(Self::new(name, signature.normalize()?))
    }

    /// The member's declaration lines, each indented one level and newline-terminated.
    pub fn declaration(&self) -> String {
        format!(
            "{INDENT}@classmethod\n{INDENT}def {}{}: ...\n",
            self.name,
            self.signature.render_with_receiver(RECEIVER)
        )
    }
}

/// Render the full declaration document.
///
/// ## Parameters
/// - `layout`: class name, name-set attribute and header.
/// - `builtins`: the registry's public built-in members, in discovery order.
/// - `capabilities`: registered capabilities, in registration order.
///
/// ## Returns
/// - (`String`): the document text, newline-terminated.
pub fn render_stub(layout: &StubLayout, builtins: &[MemberDecl], capabilities: &[MemberDecl]) -> String {
    let type_params = extract_type_params(
        builtins
            .iter()
            .chain(capabilities)
            .map(|member| member.signature.to_string()),
    );

    let mut out = String::new();
    if let Some(header) = &layout.header {
        for line in header.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(TYPING_IMPORTS);
    out.push('\n');

    if !type_params.is_empty() {
        out.push('\n');
        for param in &type_params {
            out.push_str(&param.declaration());
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str(&format!("class {}:\n", layout.class_name));
    out.push_str(&format!("{INDENT}{}: ClassVar[Set[str]]\n", layout.name_set_attribute));
    out.push('\n');

    let mut emitted = HashSet::new();
    for member in builtins.iter().chain(capabilities) {
        let declaration = member.declaration();
        if emitted.insert(declaration.clone()) {
            out.push_str(&declaration);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, params: &[&str], returns: Option<&str>) -> MemberDecl {
        MemberDecl::new(
            name,
            NormalizedSignature::new(
                params.iter().map(|p| p.to_string()).collect(),
                returns.map(str::to_string),
            ),
        )
    }

    #[test]
    fn test_declaration_is_class_bound_and_body_less() {
        let decl = member("echo", &["value: str"], Some("str")).declaration();
        assert_eq!(decl, "    @classmethod\n    def echo(cls, value: str) -> str: ...\n");
    }

    #[test]
    fn test_render_without_type_params() {
        let layout = StubLayout::default().without_header();
        let out = render_stub(&layout, &[member("list_capabilities", &[], Some("List[str]"))], &[]);
        let expected = [
            TYPING_IMPORTS,
            "",
            "class CapabilityRegistry:",
            "    _registered_capabilities: ClassVar[Set[str]]",
            "",
            "    @classmethod",
            "    def list_capabilities(cls) -> List[str]: ...",
            "",
        ]
        .join("\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_with_type_params_and_header() {
        let layout = StubLayout::default().with_class_name("Services");
        let out = render_stub(&layout, &[], &[member("first", &["param: T"], Some("T_co"))]);
        assert!(out.starts_with(&format!("# {GENERATED_HEADER}\n\n{TYPING_IMPORTS}\n\n")));
        assert!(out.contains("T = TypeVar('T')\nT_co = TypeVar('T_co', covariant=True)\n\nclass Services:\n"));
    }

    #[test]
    fn test_identical_capability_declaration_is_skipped() {
        let builtin = member("list_capabilities", &[], Some("List[str]"));
        let out = render_stub(
            &StubLayout::default(),
            std::slice::from_ref(&builtin),
            &[builtin.clone(), member("other", &[], None)],
        );
        assert_eq!(out.matches("def list_capabilities").count(), 1);
        assert!(out.contains("def other(cls): ..."));
    }

    #[test]
    fn test_same_name_with_different_signature_is_kept() {
        let out = render_stub(
            &StubLayout::default(),
            &[member("register", &["func: Callable[..., Any]"], Some("None"))],
            &[member("register", &[], Some("str"))],
        );
        assert_eq!(out.matches("def register").count(), 2);
    }

    #[test]
    fn test_render_is_deterministic() {
        let builtins = [member("b", &["x: U"], None), member("a", &["y: T"], None)];
        let layout = StubLayout::default();
        assert_eq!(
            render_stub(&layout, &builtins, &[]),
            render_stub(&layout, &builtins, &[])
        );
    }
}
