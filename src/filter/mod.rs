//! Tag classification: a first-match-wins list of `(matcher, outcome)`
//! rules, plus the node/way/relation classification rules from spec
//! section 4.4.

pub mod domain;
pub mod matcher;

pub use domain::DomainMatcher;
pub use matcher::Matcher;

use crate::tags::TagList;

/// A first-match-wins list of rules mapping tags to an outcome `T`.
///
/// Mirrors osmium's `TagsFilterBase<TResult>`: the default result is
/// returned when no rule matches.
#[derive(Clone)]
pub struct TagFilter<T: Clone> {
    rules: Vec<(Matcher, T)>,
    default: T,
}

impl<T: Clone> TagFilter<T> {
    pub fn new(default: T) -> TagFilter<T> {
        TagFilter { rules: Vec::new(), default }
    }

    pub fn add_rule(&mut self, matcher: Matcher, outcome: T) -> &mut Self {
        self.rules.push((matcher, outcome));
        self
    }

    pub fn classify(&self, key: &str, value: &str) -> T {
        for (matcher, outcome) in &self.rules {
            if matcher.matches(key, value) {
                return outcome.clone();
            }
        }
        self.default.clone()
    }

    /// Classifies every tag in `tags`, returning the first non-default
    /// outcome found, or the default if no tag matches any rule.
    pub fn classify_tags(&self, tags: &TagList) -> T {
        for (key, value) in tags.iter() {
            for (matcher, outcome) in &self.rules {
                if matcher.matches(key, value) {
                    return outcome.clone();
                }
            }
        }
        self.default.clone()
    }
}

/// Tags that don't by themselves make a node interesting as a point
/// feature (administrative/history bookkeeping keys).
const METADATA_KEYS: &[&str] = &["created_by", "source", "attribution", "converted_by"];

/// A node is a point candidate iff it carries at least one non-metadata tag.
pub fn is_point_candidate(tags: &TagList) -> bool {
    tags.iter().any(|(k, _)| !METADATA_KEYS.contains(&k))
}

/// A closed way is a polygon candidate iff the area filter marks it area;
/// otherwise it's a line.
pub fn is_area_way(area_filter: &TagFilter<bool>, tags: &TagList) -> bool {
    area_filter.classify_tags(tags)
}

/// A relation is a multipolygon candidate iff `type=multipolygon` or
/// `type=boundary`.
pub fn is_multipolygon_relation(tags: &TagList) -> bool {
    tags.is_multipolygon_candidate()
}

/// Builds the default area-tag filter: `area=no` wins over everything,
/// a handful of well-known polygon keys mark area, everything else
/// defaults to line.
pub fn default_area_filter() -> TagFilter<bool> {
    let mut filter = TagFilter::new(false);
    filter.add_rule(Matcher::key_value("area", "no"), false);
    filter.add_rule(Matcher::key_value("waterway", "stream"), false);
    for key in ["building", "natural", "landuse", "leisure", "amenity", "waterway"] {
        filter.add_rule(Matcher::key(key), true);
    }
    filter
}
