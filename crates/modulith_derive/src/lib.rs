//! The `#[capability]` attribute for the modulith capability registry.
//!
//! The attribute leaves the decorated function untouched and declares it for registration:
//! - a hidden builder function describes the capability (name, signature, and an adapter closure that decodes
//!   bound arguments and calls the original function),
//! - an `inventory` submission makes the builder visible to `modulith::registry::global()`, which registers every
//!   declared capability exactly once when the process-wide registry is initialized.
//!
//! The signature is read from the function itself: parameter names, kinds and annotations inferred from the Rust
//! types, defaults from `#[default(...)]` parameter attributes.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    Attribute, FnArg, GenericArgument, ItemFn, LitStr, Pat, PathArguments, ReturnType, Type, parse_macro_input,
};

/// Declares a function as a registry capability.
///
/// The first parameter receives the registry (`&Registry`). Every other parameter becomes a signature parameter:
/// - a parameter typed `VarArgs` collects extra positional arguments (`*name`),
/// - a parameter typed `KwArgs` collects extra keyword arguments (`**name`),
/// - `#[default(<json>)]` sets a default, `#[annotation("...")]` overrides the inferred annotation.
///
/// Properties: `name = "..."` overrides the registered name (defaults to the function name), `returns = "..."`
/// overrides the inferred return annotation.
///
/// # Example
/// ```ignore
/// use modulith::{KwArgs, Registry, VarArgs, capability};
///
/// #[capability(name = "complex_interface")]
/// fn complex(
///     _registry: &Registry,
///     required: String,
///     #[default("default")] optional: String,
///     args: VarArgs,
///     kwargs: KwArgs,
/// ) -> String {
///     format!("{required}-{optional}-{}-{}", args.len(), kwargs.len())
/// }
///
/// // Declares: complex_interface(required: str, optional: str = 'default', *args: Any, **kwargs: Any) -> str
/// ```
#[proc_macro_attribute]
pub fn capability(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut name: Option<LitStr> = None;
    let mut returns: Option<LitStr> = None;
    let properties = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("returns") {
            returns = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported capability property; expected `name = \"...\"` or `returns = \"...\"`"))
        }
    });
    parse_macro_input!(attr with properties);

    let mut func = parse_macro_input!(item as ItemFn);
    match expand(name, returns, &mut func) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

enum Kind {
    Positional,
    VarPositional,
    VarKeyword,
}

struct Param {
    name: String,
    kind: Kind,
    annotation: String,
    default: Option<TokenStream2>,
    /// Owned type the bound value is decoded into.
    owned: Type,
    /// Whether the function takes the value by reference.
    by_ref: bool,
}

fn expand(name: Option<LitStr>, returns: Option<LitStr>, func: &mut ItemFn) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "generic capabilities are not supported; declare type parameters as aliases of `modulith::Value`",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "capabilities must be synchronous"));
    }

    let fn_ident = sig.ident.clone();
    let capability_name = name
        .map(|lit| lit.value())
        .unwrap_or_else(|| fn_ident.unraw().to_string());

    let mut inputs = func.sig.inputs.iter_mut();
    match inputs.next() {
        Some(FnArg::Typed(receiver)) if matches!(*receiver.ty, Type::Reference(_)) => {}
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new_spanned(
                receiver,
                "capabilities are free functions; take the registry as `&Registry` instead of `self`",
            ));
        }
        Some(other) => {
            return Err(syn::Error::new_spanned(
                other,
                "the first parameter of a capability must be the registry (`&Registry`)",
            ));
        }
        None => {
            return Err(syn::Error::new_spanned(
                &fn_ident,
                "a capability must take the registry (`&Registry`) as its first parameter",
            ));
        }
    }

    let mut params = Vec::new();
    for input in inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new(proc_macro2::Span::call_site(), "unexpected receiver"));
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "capability parameters must be plain identifiers",
            ));
        };
        let param_name = pat_ident.ident.unraw().to_string();

        let (default, annotation_override) = take_param_attrs(&mut pat_type.attrs)?;
        let ty = &*pat_type.ty;
        let kind = match last_ident(ty).as_deref() {
            Some("VarArgs") => Kind::VarPositional,
            Some("KwArgs") => Kind::VarKeyword,
            _ => Kind::Positional,
        };
        if default.is_some() && !matches!(kind, Kind::Positional) {
            return Err(syn::Error::new_spanned(ty, "variadic parameters cannot have a default"));
        }

        let (owned, by_ref) = owned_type(ty);
        params.push(Param {
            name: param_name,
            kind,
            annotation: annotation_override
                .map(|lit| lit.value())
                .unwrap_or_else(|| annotation_for(ty)),
            default,
            owned,
            by_ref,
        });
    }

    let (return_annotation, returns_result) = match &func.sig.output {
        ReturnType::Default => ("None".to_string(), false),
        ReturnType::Type(_, ty) => match result_ok_type(ty) {
            Some(ok) => (annotation_for(ok), true),
            None => (annotation_for(ty), false),
        },
    };
    let return_annotation = returns.map(|lit| lit.value()).unwrap_or(return_annotation);

    let signature_params = params.iter().map(|param| {
        let name = &param.name;
        let annotation = &param.annotation;
        let constructor = match param.kind {
            Kind::Positional => quote!(positional),
            Kind::VarPositional => quote!(var_positional),
            Kind::VarKeyword => quote!(var_keyword),
        };
        let default = param
            .default
            .as_ref()
            .map(|tokens| quote!(.with_default(::modulith::serde_json::json!(#tokens))));
        quote! {
            .param(::modulith::Parameter::#constructor(#name).annotated(#annotation) #default)
        }
    });

    let locals: Vec<_> = (0..params.len()).map(|i| format_ident!("__arg_{}", i)).collect();
    let extracts = params.iter().zip(&locals).map(|(param, local)| {
        let name = &param.name;
        let owned = &param.owned;
        quote! {
            let #local: #owned = __bound
                .extract(#name)
                .map_err(|err| ::modulith::registry::CapabilityError::arguments(#capability_name, err))?;
        }
    });
    let call_args = params.iter().zip(&locals).map(|(param, local)| {
        if param.by_ref { quote!(&#local) } else { quote!(#local) }
    });

    let call = quote!(#fn_ident(__registry, #(#call_args),*));
    let invoke = if matches!(func.sig.output, ReturnType::Default) {
        quote! {
            #call;
            ::std::result::Result::Ok(::modulith::Value::Null)
        }
    } else if returns_result {
        quote! {
            match #call {
                ::std::result::Result::Ok(value) => ::modulith::registry::to_value(#capability_name, value),
                ::std::result::Result::Err(err) => {
                    ::std::result::Result::Err(::modulith::registry::CapabilityError::failed(#capability_name, err))
                }
            }
        }
    } else {
        quote!(::modulith::registry::to_value(#capability_name, #call))
    };

    let builder = format_ident!("__modulith_capability_{}", fn_ident.unraw());

    Ok(quote! {
        #func

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #builder() -> ::modulith::registry::Capability {
            ::modulith::registry::Capability::new(
                #capability_name,
                ::modulith::Signature::new()
                    #(#signature_params)*
                    .returns(#return_annotation),
                |__registry: &::modulith::registry::Registry,
                 __bound: &::modulith::BoundArgs|
                 -> ::std::result::Result<::modulith::Value, ::modulith::registry::CapabilityError> {
                    #(#extracts)*
                    #invoke
                },
            )
        }

        ::modulith::inventory::submit! {
            ::modulith::registry::DeclaredCapability::new(module_path!(), line!(), #builder)
        }
    })
}

/// Remove `#[default(...)]` and `#[annotation("...")]` from a parameter, returning their contents.
fn take_param_attrs(attrs: &mut Vec<Attribute>) -> syn::Result<(Option<TokenStream2>, Option<LitStr>)> {
    let mut default = None;
    let mut annotation = None;
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident("default") {
            default = Some(attr.meta.require_list()?.tokens.clone());
        } else if attr.path().is_ident("annotation") {
            annotation = Some(attr.parse_args::<LitStr>()?);
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok((default, annotation))
}

fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|seg| seg.ident.to_string()),
        Type::Group(group) => last_ident(&group.elem),
        Type::Paren(paren) => last_ident(&paren.elem),
        _ => None,
    }
}

fn type_args(args: &PathArguments) -> Vec<&Type> {
    match args {
        PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `Result<T, E>` (or any `...Result<T, ...>` alias) yields `Some(T)`.
fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let last = path.path.segments.last()?;
    if !last.ident.to_string().ends_with("Result") {
        return None;
    }
    type_args(&last.arguments).into_iter().next()
}

/// The owned type a bound value decodes into, and whether the function takes it by reference.
fn owned_type(ty: &Type) -> (Type, bool) {
    let Type::Reference(reference) = ty else {
        return (ty.clone(), false);
    };
    let owned: Type = match &*reference.elem {
        Type::Path(path) if path.path.is_ident("str") => syn::parse_quote!(::std::string::String),
        Type::Slice(slice) => {
            let elem = &slice.elem;
            syn::parse_quote!(::std::vec::Vec<#elem>)
        }
        other => other.clone(),
    };
    (owned, true)
}

/// Infer the stub annotation for a Rust type.
fn annotation_for(ty: &Type) -> String {
    match ty {
        Type::Reference(reference) => annotation_for(&reference.elem),
        Type::Paren(paren) => annotation_for(&paren.elem),
        Type::Group(group) => annotation_for(&group.elem),
        Type::Slice(slice) => format!("List[{}]", annotation_for(&slice.elem)),
        Type::Array(array) => format!("List[{}]", annotation_for(&array.elem)),
        Type::Tuple(tuple) if tuple.elems.is_empty() => "None".to_string(),
        Type::Tuple(tuple) => {
            let elems: Vec<String> = tuple.elems.iter().map(annotation_for).collect();
            format!("Tuple[{}]", elems.join(", "))
        }
        Type::Path(path) if path.qself.is_none() => {
            let Some(last) = path.path.segments.last() else {
                return "Any".to_string();
            };
            let ident = last.ident.unraw().to_string();
            let args = type_args(&last.arguments);
            match (ident.as_str(), args.as_slice()) {
                ("String" | "str" | "char", _) => "str".to_string(),
                ("Cow", [inner]) => annotation_for(inner),
                (
                    "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128" | "usize",
                    [],
                ) => "int".to_string(),
                ("f32" | "f64", []) => "float".to_string(),
                ("bool", []) => "bool".to_string(),
                ("Vec" | "VecDeque" | "LinkedList", [inner]) => format!("List[{}]", annotation_for(inner)),
                ("Option", [inner]) => format!("Optional[{}]", annotation_for(inner)),
                ("HashMap" | "BTreeMap" | "IndexMap", [key, value, ..]) => {
                    format!("Dict[{}, {}]", annotation_for(key), annotation_for(value))
                }
                ("HashSet" | "BTreeSet" | "IndexSet", [inner, ..]) => format!("Set[{}]", annotation_for(inner)),
                ("Box" | "Rc" | "Arc", [inner]) => annotation_for(inner),
                ("Map", _) => "Dict[str, Any]".to_string(),
                ("Value" | "VarArgs" | "KwArgs", _) => "Any".to_string(),
                (_, []) => ident,
                (_, args) => {
                    let args: Vec<String> = args.iter().map(|arg| annotation_for(arg)).collect();
                    format!("{ident}[{}]", args.join(", "))
                }
            }
        }
        _ => "Any".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_scalar_annotations() {
        assert_eq!(annotation_for(&parse_quote!(String)), "str");
        assert_eq!(annotation_for(&parse_quote!(&str)), "str");
        assert_eq!(annotation_for(&parse_quote!(i64)), "int");
        assert_eq!(annotation_for(&parse_quote!(f64)), "float");
        assert_eq!(annotation_for(&parse_quote!(bool)), "bool");
        assert_eq!(annotation_for(&parse_quote!(())), "None");
    }

    #[test]
    fn test_container_annotations() {
        assert_eq!(annotation_for(&parse_quote!(Vec<String>)), "List[str]");
        assert_eq!(annotation_for(&parse_quote!(Option<i32>)), "Optional[int]");
        assert_eq!(
            annotation_for(&parse_quote!(std::collections::HashMap<String, Vec<u8>>)),
            "Dict[str, List[int]]"
        );
        assert_eq!(annotation_for(&parse_quote!(BTreeSet<String>)), "Set[str]");
        assert_eq!(annotation_for(&parse_quote!((i64, String))), "Tuple[int, str]");
        assert_eq!(annotation_for(&parse_quote!(&[bool])), "List[bool]");
        assert_eq!(annotation_for(&parse_quote!(Cow<'static, str>)), "str");
    }

    #[test]
    fn test_dynamic_and_alias_annotations() {
        assert_eq!(annotation_for(&parse_quote!(serde_json::Value)), "Any");
        assert_eq!(annotation_for(&parse_quote!(VarArgs)), "Any");
        assert_eq!(annotation_for(&parse_quote!(T)), "T");
        assert_eq!(annotation_for(&parse_quote!(T_co)), "T_co");
        assert_eq!(annotation_for(&parse_quote!(Vec<T_contra>)), "List[T_contra]");
        assert_eq!(annotation_for(&parse_quote!(Page<Item>)), "Page[Item]");
    }

    #[test]
    fn test_result_ok_type() {
        let ty: Type = parse_quote!(Result<Vec<String>, MyError>);
        assert_eq!(annotation_for(result_ok_type(&ty).unwrap()), "List[str]");
        let ty: Type = parse_quote!(CapabilityResult<i64>);
        assert_eq!(annotation_for(result_ok_type(&ty).unwrap()), "int");
        let ty: Type = parse_quote!(String);
        assert!(result_ok_type(&ty).is_none());
    }

    #[test]
    fn test_owned_type_for_references() {
        let (owned, by_ref) = owned_type(&parse_quote!(&str));
        assert!(by_ref);
        assert_eq!(quote!(#owned).to_string(), quote!(::std::string::String).to_string());

        let (owned, by_ref) = owned_type(&parse_quote!(&[i64]));
        assert!(by_ref);
        assert_eq!(quote!(#owned).to_string(), quote!(::std::vec::Vec<i64>).to_string());

        let (_, by_ref) = owned_type(&parse_quote!(String));
        assert!(!by_ref);
    }
}
