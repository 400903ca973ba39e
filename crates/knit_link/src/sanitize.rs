//! Turning arbitrary local names into valid JavaScript identifiers.

use knit_common::hash::short_digest;

/// Returns `name` if it is already a valid identifier.
///
/// Otherwise every character that cannot appear in an identifier is replaced
/// with `_` (a character that may not start one is replaced too when it comes
/// first), and a base-36 digest of the original name is appended so distinct
/// inputs stay distinct.
pub fn sanitize_name(name: &str) -> String {
    if is_valid_identifier(name) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 14);
    for (i, c) in name.chars().enumerate() {
        let ok = if i == 0 { is_identifier_start(c) } else { is_identifier_part(c) };
        out.push(if ok { c } else { '_' });
    }
    out.push('_');
    out.push_str(&short_digest(name.as_bytes()));
    out
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_part),
        _ => false,
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers_are_untouched() {
        for name in ["foo", "_bar", "$baz", "a1", "Ünïcode"] {
            assert_eq!(sanitize_name(name), name);
        }
    }

    #[test]
    fn invalid_characters_are_replaced_and_suffixed() {
        let s = sanitize_name("foo-bar");
        assert!(s.starts_with("foo_bar_"), "{s}");
        assert!(is_valid_identifier(&s));
    }

    #[test]
    fn leading_digit_is_replaced() {
        let s = sanitize_name("1st");
        assert!(s.starts_with("_st_"), "{s}");
    }

    #[test]
    fn empty_name_becomes_identifier() {
        let s = sanitize_name("");
        assert!(s.starts_with('_'));
        assert!(is_valid_identifier(&s));
    }

    #[test]
    fn distinct_inputs_stay_distinct() {
        assert_ne!(sanitize_name("a-b"), sanitize_name("a.b"));
        assert_eq!(sanitize_name("a-b"), sanitize_name("a-b"));
    }
}
