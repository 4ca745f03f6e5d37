//! The registry's own members, as they appear to stub readers.
//!
//! Capabilities are reached through [`Registry::call`](super::Registry::call), but the generated declaration file
//! describes the registry as a class whose members are the capabilities plus these built-ins. Their signatures
//! mirror the Rust API: `register` takes a callable and an optional name, `list_capabilities` returns the names.
//!
//! Members are listed in name order, as a reflective scan would discover them. Private members (leading `_`) are
//! listed too and filtered out by the emitter, except the constructor.

use modulith_core::{Parameter, Signature};
use serde_json::Value;

/// A member defined by the registry itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinMember {
    pub name: &'static str,
    pub signature: Signature,
}

/// Every member the registry defines, sorted by name.
pub fn builtin_members() -> Vec<BuiltinMember> {
    let mut members = vec![
        BuiltinMember {
            name: "__init__",
            signature: Signature::new().returns("None"),
        },
        BuiltinMember {
            name: "__reset_for_tests",
            signature: Signature::new().returns("None"),
        },
        BuiltinMember {
            name: "list_capabilities",
            signature: Signature::new().returns("List[str]"),
        },
        BuiltinMember {
            name: "register",
            signature: Signature::new()
                .param(Parameter::positional("func").annotated("Callable[..., Any]"))
                .param(
                    Parameter::positional("name")
                        .annotated("Optional[str]")
                        .with_default(Value::Null),
                )
                .returns("None"),
        },
    ];
    members.sort_by_key(|member| member.name);
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_sorted_by_name() {
        let names: Vec<&str> = builtin_members().iter().map(|m| m.name).collect();
        assert_eq!(names, ["__init__", "__reset_for_tests", "list_capabilities", "register"]);
    }

    #[test]
    fn test_member_signatures_normalize() {
        for member in builtin_members() {
            member.signature.normalize().unwrap();
        }
    }
}
