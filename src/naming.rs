//! Identifier mangling and string escaping shared by every backend.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref NON_IDENTIFIER_CHAR: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
    static ref STRING_ESCAPES: Regex = Regex::new(r#"[\\"\n\r]"#).unwrap();
}

/// Turns an arbitrary user name into a valid identifier fragment.
/// Alphanumerics are kept, every other character becomes `_<code>`, so two
/// different names never map to the same identifier.
pub fn mangle_name(name: &str) -> String {
    NON_IDENTIFIER_CHAR
        .replace_all(name, |caps: &Captures| {
            let c = caps[0].chars().next().unwrap_or('_');
            format!("_{}", c as u32)
        })
        .into_owned()
}

/// Name of the variable holding the list of `object_name` instances declared
/// at `depth`.
pub fn object_list_name(object_name: &str, depth: usize) -> String {
    format!("GD{}Objects{}", mangle_name(object_name), depth)
}

/// Escapes a raw string so it can be put between double quotes in JS or C++.
pub fn escape_string(raw: &str) -> String {
    STRING_ESCAPES
        .replace_all(raw, |caps: &Captures| match &caps[0] {
            "\\" => "\\\\",
            "\"" => "\\\"",
            "\n" => "\\n",
            _ => "\\r",
        })
        .into_owned()
}

/// `raw` as a double-quoted string literal.
pub fn quote(raw: &str) -> String {
    format!("\"{}\"", escape_string(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mangle_keeps_alphanumerics() {
        assert_eq!(mangle_name("Player2"), "Player2");
        assert_eq!(mangle_name("My Scene"), "My_32Scene");
        assert_ne!(mangle_name("a_b"), mangle_name("a b"));
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(quote("a\"b"), r#""a\"b""#);
        assert_eq!(quote("line\nnext\\"), r#""line\nnext\\""#);
        assert_eq!(escape_string("\r"), "\\r");
    }

    #[test]
    fn test_object_list_name() {
        assert_eq!(object_list_name("Player", 1), "GDPlayerObjects1");
    }
}
