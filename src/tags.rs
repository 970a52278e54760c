//! Tags: insertion-ordered (key, value) pairs with unique keys.

use indexmap::IndexMap;

pub type Tag = (String, String);

/// An insertion-ordered sequence of tags with unique keys.
///
/// The spec explicitly offers dropping the original system's global tag
/// interner in favor of owned strings, since geometry buffers dominate
/// memory, not tag text — that's what this does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    entries: IndexMap<String, String>,
}

impl TagList {
    pub fn new() -> TagList {
        TagList::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if this tag set marks the relation as a multipolygon
    /// candidate per spec section 4.4 (`type=multipolygon` or
    /// `type=boundary`).
    pub fn is_multipolygon_candidate(&self) -> bool {
        matches!(self.get("type"), Some("multipolygon") | Some("boundary"))
    }
}

impl FromIterator<(String, String)> for TagList {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut list = TagList::new();
        for (k, v) in iter {
            list.insert(k, v);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut tags = TagList::new();
        tags.insert("natural", "water");
        tags.insert("name", "Lake");
        let collected: Vec<_> = tags.iter().collect();
        assert_eq!(collected, vec![("natural", "water"), ("name", "Lake")]);
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut tags = TagList::new();
        tags.insert("a", "1");
        tags.insert("b", "2");
        tags.insert("a", "3");
        assert_eq!(tags.get("a"), Some("3"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn multipolygon_candidate_detection() {
        let mut tags = TagList::new();
        tags.insert("type", "multipolygon");
        assert!(tags.is_multipolygon_candidate());
        tags.insert("type", "route");
        assert!(!tags.is_multipolygon_candidate());
    }
}
