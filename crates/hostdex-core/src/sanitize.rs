//! Cache-key sanitization.
//!
//! Raw query values flow into cache-key names; every character that could
//! collide with key syntax or shell/path conventions is replaced with `-`.

/// Characters that are never allowed inside a cache-key fragment.
const DISALLOWED: &[char] = &[
    '\\', '/', '(', ')', '\'', '"', '[', ']', ',', ';', ':', '#', '+', '~', '.', ' ',
];

/// Replace every disallowed character with a single `-`.
///
/// Deterministic (no locale dependence) and idempotent: `-` itself is
/// allowed, so sanitizing twice changes nothing.
#[must_use]
pub fn sanitize_key(text: &str) -> String {
    text.chars()
        .map(|c| if DISALLOWED.contains(&c) { '-' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_disallowed_characters() {
        assert_eq!(sanitize_key("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_key("10.0.0.1"), "10-0-0-1");
        assert_eq!(sanitize_key("2001:db8::1"), "2001-db8--1");
        assert_eq!(sanitize_key("foo (bar) [baz]"), "foo--bar---baz-");
        assert_eq!(sanitize_key("a'b\"c;d#e+f~g,h"), "a-b-c-d-e-f-g-h");
    }

    #[test]
    fn test_keeps_allowed_characters() {
        assert_eq!(sanitize_key("example-com_AS1234"), "example-com_AS1234");
    }

    #[test]
    fn test_idempotent() {
        for input in ["10.0.0.1", "a b:c", "already-clean", "", "///"] {
            let once = sanitize_key(input);
            assert_eq!(sanitize_key(&once), once);
        }
    }
}
