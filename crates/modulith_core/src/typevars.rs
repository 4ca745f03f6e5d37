//! Infer generic type parameters from rendered signatures.
//!
//! A type parameter is any whole token made of a single uppercase letter, optionally suffixed `_co` (covariant) or
//! `_contra` (contravariant). This is a naming heuristic: an ordinary single-letter identifier such as a type named
//! `X` is picked up too, and so is a single uppercase letter inside a default string.
//!
//! ## Examples
//! ```rust
//! use modulith_core::typevars::{Variance, extract_type_params};
//!
//! let params = extract_type_params(["(items: List[T_co]) -> T_co", "(key: K) -> T_contra"]);
//! let names: Vec<&str> = params.iter().map(|p| p.name()).collect();
//! assert_eq!(names, ["K", "T_co", "T_contra"]);
//! assert_eq!(params[1].variance(), Variance::Covariant);
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static TYPE_PARAM_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z](?:_contra|_co)?\b").expect("INVARIANT: type-parameter pattern is a valid regex")
});

const COVARIANT_SUFFIX: &str = "_co";
const CONTRAVARIANT_SUFFIX: &str = "_contra";

/// Variance of a type parameter, derived from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
}

/// A type parameter discovered in signature text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeParam {
    name: String,
    variance: Variance,
}

impl TypeParam {
    /// Classify a token by its suffix.
    pub fn classify(token: &str) -> Self {
        let variance = if token.ends_with(CONTRAVARIANT_SUFFIX) {
            Variance::Contravariant
        } else if token.ends_with(COVARIANT_SUFFIX) {
            Variance::Covariant
        } else {
            Variance::Invariant
        };
        Self {
            name: token.to_string(),
            variance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variance(&self) -> Variance {
        self.variance
    }

    /// Render the standalone declaration, e.g. `T_co = TypeVar('T_co', covariant=True)`.
    pub fn declaration(&self) -> String {
        let name = &self.name;
        match self.variance {
            Variance::Invariant => format!("{name} = TypeVar('{name}')"),
            Variance::Covariant => format!("{name} = TypeVar('{name}', covariant=True)"),
            Variance::Contravariant => format!("{name} = TypeVar('{name}', contravariant=True)"),
        }
    }
}

/// Collect the distinct type parameters referenced by `signatures`.
///
/// ## Returns
/// - (`Vec<TypeParam>`): sorted by name, independent of discovery order. Empty when no token matches.
pub fn extract_type_params<I, S>(signatures: I) -> Vec<TypeParam>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tokens = BTreeSet::new();
    for signature in signatures {
        for found in TYPE_PARAM_TOKEN.find_iter(signature.as_ref()) {
            tokens.insert(found.as_str().to_string());
        }
    }
    tokens.iter().map(|token| TypeParam::classify(token)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &[TypeParam]) -> Vec<&str> {
        params.iter().map(TypeParam::name).collect()
    }

    #[test]
    fn test_invariant() {
        let params = extract_type_params(["(param: T) -> T"]);
        assert_eq!(params, vec![TypeParam::classify("T")]);
        assert_eq!(params[0].variance(), Variance::Invariant);
        assert_eq!(params[0].declaration(), "T = TypeVar('T')");
    }

    #[test]
    fn test_covariant() {
        let params = extract_type_params(["() -> List[T_co]"]);
        assert_eq!(params[0].variance(), Variance::Covariant);
        assert_eq!(params[0].declaration(), "T_co = TypeVar('T_co', covariant=True)");
    }

    #[test]
    fn test_contravariant() {
        let params = extract_type_params(["(sink: Callable[[T_contra], None]) -> None"]);
        assert_eq!(names(&params), ["T_contra"]);
        assert_eq!(params[0].variance(), Variance::Contravariant);
        assert_eq!(
            params[0].declaration(),
            "T_contra = TypeVar('T_contra', contravariant=True)"
        );
    }

    #[test]
    fn test_no_tokens() {
        assert!(extract_type_params(["(a: str, b: List[int]) -> Dict[str, Any]"]).is_empty());
        assert!(extract_type_params(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_tokens_must_be_whole_words() {
        assert!(extract_type_params(["(x: T_cox, y: TT, z: Tx) -> _T"]).is_empty());
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let params = extract_type_params(["(v: V) -> T", "(t: T, k: K) -> V", "() -> T_co"]);
        assert_eq!(names(&params), ["K", "T", "T_co", "V"]);
    }
}
