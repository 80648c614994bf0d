use core::hash::BuildHasherDefault;
use std::collections::{HashMap, HashSet};
use std::fmt;

use seahash::SeaHasher;

// used for every hashmap and hashset keyed by attributes, keys or branch paths
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- Attribute -------------
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct Attribute {
    key: String,
    value: String,
}

impl Attribute {
    pub fn new(key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self {
            key: key.as_ref().trim().to_owned(),
            value: value.as_ref().trim().to_owned(),
        }
    }
    // Like roles in a posit, the pair is only exposed through "getters"
    // so that an attribute is immutable once it labels a node.
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn same_key(&self, other: &Attribute) -> bool {
        self.key == other.key
    }
    pub fn same_value(&self, other: &Attribute) -> bool {
        self.value == other.value
    }
}
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}
impl<K: AsRef<str>, V: AsRef<str>> From<(K, V)> for Attribute {
    fn from((key, value): (K, V)) -> Self {
        Attribute::new(key, value)
    }
}

/// Builds an attribute list from `(key, value)` pairs, keeping their order.
pub fn attributes<K: AsRef<str>, V: AsRef<str>>(pairs: impl IntoIterator<Item = (K, V)>) -> Vec<Attribute> {
    pairs.into_iter().map(Attribute::from).collect()
}

/// Pairwise join test between two attribute lists.
///
/// Two documents are joinable when every key they have in common carries the
/// same value in both, and at least one attribute is shared exactly. This is
/// the quadratic reference the trie searches are measured against.
pub fn is_joinable(left: &[Attribute], right: &[Attribute]) -> bool {
    let values: HashMap<&str, &str, OtherHasher> =
        left.iter().map(|a| (a.key(), a.value())).collect();
    let mut shared = false;
    for attribute in right {
        match values.get(attribute.key()) {
            Some(value) if *value == attribute.value() => shared = true,
            Some(_) => return false,
            None => (),
        }
    }
    shared
}

/// The set of keys of an attribute list.
pub fn keys_of(attributes: &[Attribute]) -> HashSet<String, OtherHasher> {
    attributes.iter().map(|a| a.key().to_owned()).collect()
}
