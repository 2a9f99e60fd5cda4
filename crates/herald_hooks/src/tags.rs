//! Ordered string sets for tags and dependency keys.
//!
//! [`NameSet`] is used for registration tags, hook tag vocabularies and
//! needs/provides dependency keys. It keeps its contents sorted so error
//! messages and debug output are stable.

use core::fmt;
use std::collections::BTreeSet;

/// A sorted set of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NameSet {
    names: BTreeSet<String>,
}

impl NameSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name, returning `true` if it was not present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Returns `true` if `name` is in the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the set has no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over the names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Returns `true` if the two sets share at least one name.
    #[must_use]
    pub fn intersects(&self, other: &NameSet) -> bool {
        !self.names.is_disjoint(&other.names)
    }

    /// Returns the names in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &NameSet) -> NameSet {
        NameSet {
            names: self.names.difference(&other.names).cloned().collect(),
        }
    }

    /// Adds every name from `other`.
    pub fn extend_from(&mut self, other: &NameSet) {
        self.names.extend(other.names.iter().cloned());
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for NameSet {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<String>> From<Vec<S>> for NameSet {
    fn from(names: Vec<S>) -> Self {
        names.into_iter().collect()
    }
}

impl fmt::Display for NameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "}}")
    }
}

/// Returns `true` if a registration tagged with `registered` should run for a
/// trigger carrying `requested`.
///
/// An empty request matches everything. Otherwise the registration needs at
/// least one of the requested tags.
#[must_use]
pub fn tags_match(registered: &NameSet, requested: Option<&NameSet>) -> bool {
    match requested {
        None => true,
        Some(requested) if requested.is_empty() => true,
        Some(requested) => registered.intersects(requested),
    }
}

/// Returns the tags in `tags` that fall outside `vocabulary`.
///
/// A hook without a vocabulary accepts no tags at all.
#[must_use]
pub fn unsupported_tags(tags: &NameSet, vocabulary: Option<&NameSet>) -> NameSet {
    match vocabulary {
        Some(vocabulary) => tags.difference(vocabulary),
        None => tags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_sorted() {
        let set = NameSet::from(["b", "a", "c"]);
        assert_eq!(set.to_string(), "{a, b, c}");
        assert_eq!(NameSet::new().to_string(), "{}");
    }

    #[test]
    fn empty_request_matches_everything() {
        let registered = NameSet::from(["fast"]);
        assert!(tags_match(&registered, None));
        assert!(tags_match(&registered, Some(&NameSet::new())));
        assert!(tags_match(&NameSet::new(), None));
    }

    #[test]
    fn request_needs_shared_tag() {
        let registered = NameSet::from(["fast", "db"]);
        assert!(tags_match(&registered, Some(&NameSet::from(["db"]))));
        assert!(tags_match(&registered, Some(&NameSet::from(["db", "net"]))));
        assert!(!tags_match(&registered, Some(&NameSet::from(["net"]))));
        assert!(!tags_match(&NameSet::new(), Some(&NameSet::from(["net"]))));
    }

    #[test]
    fn unsupported_tags_against_vocabulary() {
        let vocabulary = NameSet::from(["some_tag", "other_tag"]);
        let tags = NameSet::from(["some_tag", "fake_tag"]);
        assert_eq!(
            unsupported_tags(&tags, Some(&vocabulary)),
            NameSet::from(["fake_tag"])
        );
        assert!(unsupported_tags(&NameSet::from(["some_tag"]), Some(&vocabulary)).is_empty());
        assert_eq!(unsupported_tags(&tags, None), tags);
        assert!(unsupported_tags(&NameSet::new(), None).is_empty());
    }
}
