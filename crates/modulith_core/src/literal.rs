//! Render JSON values as Python literals for parameter defaults.
//!
//! Strings follow Python's `repr` quoting: single quotes unless the text contains a single quote and no double
//! quote.

use serde_json::Value;

/// Render a value the way it would appear as a default in a stub.
///
/// ## Examples
/// ```rust
/// use modulith_core::literal::py_literal;
/// use serde_json::json;
///
/// assert_eq!(py_literal(&json!(null)), "None");
/// assert_eq!(py_literal(&json!("default")), "'default'");
/// assert_eq!(py_literal(&json!([1, true])), "[1, True]");
/// ```
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str_repr(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str_repr(k), py_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn py_str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(py_literal(&json!(true)), "True");
        assert_eq!(py_literal(&json!(false)), "False");
        assert_eq!(py_literal(&json!(42)), "42");
        assert_eq!(py_literal(&json!(-1.5)), "-1.5");
    }

    #[test]
    fn test_string_quoting() {
        assert_eq!(py_literal(&json!("it's")), "\"it's\"");
        assert_eq!(py_literal(&json!("say \"hi\" it's")), "'say \"hi\" it\\'s'");
        assert_eq!(py_literal(&json!("a\nb")), "'a\\nb'");
        assert_eq!(py_literal(&json!("back\\slash")), "'back\\\\slash'");
    }

    #[test]
    fn test_containers() {
        assert_eq!(py_literal(&json!({"k": null, "n": [1, "x"]})), "{'k': None, 'n': [1, 'x']}");
        assert_eq!(py_literal(&json!([])), "[]");
    }
}
