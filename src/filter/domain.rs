//! `DomainMatcher`: OSM tags may contain name tags that refer to one of the
//! other tags in the tag set. For example, the name of a bridge is tagged
//! as `bridge:name=Foo` to avoid confusion with the name of the highway
//! going over the bridge. This matches a tag key against `<class>:name` or
//! `<class>:name:<lang>` and returns the suffix (`name` or `name:lang`).

pub struct DomainMatcher {
    domain: String,
}

impl DomainMatcher {
    pub fn new(class: impl Into<String>) -> DomainMatcher {
        DomainMatcher { domain: class.into() }
    }

    /// Returns `Some(suffix)` (`"name"` or `"name:lang"`) if `key` belongs
    /// to this matcher's domain, `None` otherwise.
    pub fn matches<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.domain.as_str())?;
        let suffix = rest.strip_prefix(':')?;
        if suffix == "name" || suffix.starts_with("name:") {
            Some(suffix)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_plain_name() {
        let m = DomainMatcher::new("bridge");
        assert_eq!(m.matches("bridge:name"), Some("name"));
    }

    #[test]
    fn matches_name_with_lang() {
        let m = DomainMatcher::new("bridge");
        assert_eq!(m.matches("bridge:name:de"), Some("name:de"));
    }

    #[test]
    fn rejects_unrelated_or_partial_prefix() {
        let m = DomainMatcher::new("bridge");
        assert_eq!(m.matches("bridgework:name"), None);
        assert_eq!(m.matches("bridge:namesake"), None);
        assert_eq!(m.matches("highway"), None);
    }
}
