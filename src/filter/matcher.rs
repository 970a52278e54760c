//! Tag matchers: exact key, exact key+value, key prefix, and case-sensitive
//! wildcard (`*`/`?`) matching.

/// A single rule's left-hand side: decides whether a tag matches.
#[derive(Debug, Clone)]
pub enum Matcher {
    Key(String),
    KeyValue(String, String),
    KeyPrefix(String),
    Wildcard { key_pattern: String, value_pattern: String },
}

impl Matcher {
    pub fn key(key: impl Into<String>) -> Matcher {
        Matcher::Key(key.into())
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Matcher {
        Matcher::KeyValue(key.into(), value.into())
    }

    pub fn key_prefix(prefix: impl Into<String>) -> Matcher {
        Matcher::KeyPrefix(prefix.into())
    }

    pub fn wildcard(key_pattern: impl Into<String>, value_pattern: impl Into<String>) -> Matcher {
        Matcher::Wildcard {
            key_pattern: key_pattern.into(),
            value_pattern: value_pattern.into(),
        }
    }

    pub fn matches(&self, key: &str, value: &str) -> bool {
        match self {
            Matcher::Key(k) => k == key,
            Matcher::KeyValue(k, v) => k == key && v == value,
            Matcher::KeyPrefix(prefix) => key.starts_with(prefix.as_str()),
            Matcher::Wildcard { key_pattern, value_pattern } => {
                wild_match(key_pattern, key) && wild_match(value_pattern, value)
            }
        }
    }
}

/// Case-sensitive wildcard match. `*` matches any string (including the
/// empty string), `?` matches any single character, anything else must
/// match the character exactly.
pub fn wild_match(expr: &str, s: &str) -> bool {
    wild_match_bytes(expr.as_bytes(), s.as_bytes())
}

fn wild_match_bytes(mut expr: &[u8], s: &[u8]) -> bool {
    if expr.is_empty() && s.is_empty() {
        return true;
    }

    if expr.first() == Some(&b'*') {
        while expr.get(1) == Some(&b'*') {
            expr = &expr[1..];
        }
    }

    if expr.first() == Some(&b'*') && expr.len() > 1 && s.is_empty() {
        return false;
    }

    if let Some(&e0) = expr.first() {
        if e0 == b'?' || Some(&e0) == s.first() {
            if s.is_empty() {
                return false;
            }
            return wild_match_bytes(&expr[1..], &s[1..]);
        }

        if e0 == b'*' {
            return wild_match_bytes(&expr[1..], s) || (!s.is_empty() && wild_match_bytes(expr, &s[1..]));
        }
    }

    false
}
