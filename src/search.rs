//! Join search over a labeled [`Trie`].
//!
//! Every strategy answers the same question for a [`JoinQuery`]: which loaded
//! documents are joinable with the query document? A document is joinable when
//! no attribute on its chain *conflicts* with the query (the query has the key
//! but with another value) and the chain shares at least one attribute with
//! the query exactly. The query's own id is never part of an answer.
//!
//! * [`Trie::search_via_index`] jumps through the index to every node carrying
//!   one of the query's attributes, checks the ancestors for conflicts and
//!   collects the subtree, pruning branches it already settled.
//! * [`Trie::search_via_root_skip`] walks down from the root, skipping the
//!   levels of keys every document carries by direct lookup, and tracks the
//!   attributes shared along the current path while backtracking.
//! * [`Trie::search_hybrid`] takes the root-skip walk whenever the tree shape
//!   proves it safe and the index search otherwise.

use std::collections::{BTreeSet, HashSet};

use roaring::RoaringBitmap;
use tracing::{debug, trace, warn};

use crate::attribute::{Attribute, OtherHasher, keys_of};
use crate::branch::IgnoredBranches;
use crate::error::{JoinError, Result};
use crate::node::{NodeId, TrieNode};
use crate::trie::Trie;

// ------------- JoinQuery -------------
#[derive(Debug, Clone)]
pub struct JoinQuery {
    document: String,
    attributes: Vec<Attribute>,
    held: HashSet<Attribute, OtherHasher>,
    keys: HashSet<String, OtherHasher>,
}

impl JoinQuery {
    /// A query whose key set is the keys of its own attributes.
    pub fn new(document: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        let keys = keys_of(&attributes);
        Self::build(document.into(), attributes, keys)
    }
    pub fn with_keys<K: Into<String>>(
        document: impl Into<String>,
        attributes: Vec<Attribute>,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        let keys = keys.into_iter().map(Into::into).collect();
        Self::build(document.into(), attributes, keys)
    }
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(
        document: impl Into<String>,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self::new(document, crate::attribute::attributes(pairs))
    }
    fn build(document: String, attributes: Vec<Attribute>, keys: HashSet<String, OtherHasher>) -> Self {
        let held = attributes.iter().cloned().collect();
        Self {
            document,
            attributes,
            held,
            keys,
        }
    }
    pub fn document(&self) -> &str {
        &self.document
    }
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
    pub fn keys(&self) -> &HashSet<String, OtherHasher> {
        &self.keys
    }
    pub fn holds(&self, attribute: &Attribute) -> bool {
        self.held.contains(attribute)
    }
    pub fn conflicts(&self, node: &TrieNode) -> bool {
        node.conflicts_with(&self.held, &self.keys)
    }
}

// ------------- Strategy -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Index,
    RootSkip { ubiquitous_key_count: usize },
    Hybrid,
}

// Attributes shared with the query along the path currently being walked.
// Entering a node pushes its label, backtracking out of it pops it again.
#[derive(Debug, Default)]
struct SharedAttributes<'t> {
    stack: Vec<&'t Attribute>,
}

impl<'t> SharedAttributes<'t> {
    fn push(&mut self, attribute: &'t Attribute) {
        self.stack.push(attribute);
    }
    fn pop(&mut self) {
        self.stack.pop();
    }
    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

impl Trie {
    pub fn search(&self, query: &JoinQuery, strategy: Strategy) -> Result<BTreeSet<String>> {
        match strategy {
            Strategy::Index => self.search_via_index(query),
            Strategy::RootSkip {
                ubiquitous_key_count,
            } => self.search_via_root_skip(query, ubiquitous_key_count),
            Strategy::Hybrid => self.search_hybrid(query),
        }
    }

    /// Index-assisted search.
    ///
    /// For each query attribute, every node carrying it is a candidate. A
    /// candidate whose ancestors conflict with the query is dropped; otherwise
    /// its documents and those of every non-conflicting descendant are joinable.
    /// With [`Settings::prune_branches`](crate::settings::Settings) the search
    /// remembers conflicting and visited branches and skips them later on.
    pub fn search_via_index(&self, query: &JoinQuery) -> Result<BTreeSet<String>> {
        self.index_search(query, self.settings().prune_branches)
    }
    /// Index-assisted search that never prunes. Same answer, more work.
    pub fn search_via_index_unpruned(&self, query: &JoinQuery) -> Result<BTreeSet<String>> {
        self.index_search(query, false)
    }
    fn index_search(&self, query: &JoinQuery, prune: bool) -> Result<BTreeSet<String>> {
        self.ensure_labeled()?;
        let mut found = RoaringBitmap::new();
        let mut ignored = prune.then(IgnoredBranches::new);
        for attribute in query.attributes() {
            for &candidate in self.index_entries(attribute) {
                let node = self.get(candidate);
                if ignored
                    .as_ref()
                    .is_some_and(|ignored| ignored.is_ignored(node.branch_path()))
                {
                    trace!(candidate = %node, "candidate on an ignored branch");
                    continue;
                }
                if let Some(conflict) = self.ancestors(candidate).find(|a| query.conflicts(a)) {
                    trace!(candidate = %node, conflict = %conflict, "ancestor conflicts");
                    if let Some(ignored) = ignored.as_mut() {
                        ignored.ignore(conflict.branch_path());
                    }
                    continue;
                }
                self.collect_subtree(candidate, query, &mut found, ignored.as_mut());
            }
        }
        debug!(
            document = query.document(),
            found = found.len(),
            ignored = ignored.as_ref().map_or(0, IgnoredBranches::len),
            "index search done"
        );
        Ok(self.answer(query, found))
    }
    // The node itself was checked by the caller. A node is only marked as
    // ignored once its whole subtree has been collected.
    fn collect_subtree(
        &self,
        node: NodeId,
        query: &JoinQuery,
        found: &mut RoaringBitmap,
        mut ignored: Option<&mut IgnoredBranches>,
    ) {
        let current = self.get(node);
        *found |= current.documents();
        for &child in current.children() {
            let child = self.get(child);
            if ignored
                .as_deref()
                .is_some_and(|ignored| ignored.is_ignored(child.branch_path()))
            {
                continue;
            }
            if query.conflicts(child) {
                if let Some(ignored) = ignored.as_deref_mut() {
                    ignored.ignore(child.branch_path());
                }
                continue;
            }
            self.collect_subtree(child.node_id(), query, found, ignored.as_deref_mut());
        }
        if let Some(ignored) = ignored {
            ignored.ignore(current.branch_path());
        }
    }

    /// Top-down search skipping the levels of ubiquitous keys.
    ///
    /// `ubiquitous_key_count` is the number of leading keys of the global
    /// order that every loaded document carries; the query's first that many
    /// attributes are then looked up level by level instead of searched for.
    /// Below the landing node the walk never enters a conflicting child and
    /// collects documents only once the path shares an attribute with the
    /// query. When a skipped attribute has no node, or nothing is skipped, every
    /// child of the root is walked the same way.
    ///
    /// The count is only trusted as far as the loaded documents back it up:
    /// skipping stops at the first key some document lacks, that is not one of
    /// the query's keys, or whose level also holds other keys, and a warning is
    /// logged. Under
    /// `strict_ubiquity` a missing key is rejected with
    /// [`JoinError::NotUbiquitous`] instead.
    pub fn search_via_root_skip(
        &self,
        query: &JoinQuery,
        ubiquitous_key_count: usize,
    ) -> Result<BTreeSet<String>> {
        self.ensure_labeled()?;
        let depth = self.verified_skip_depth(query, ubiquitous_key_count)?;
        self.root_skip(query, depth)
    }
    fn root_skip(&self, query: &JoinQuery, depth: usize) -> Result<BTreeSet<String>> {
        let mut found = RoaringBitmap::new();
        let landing = match self.descend(&query.attributes()[..depth]) {
            Ok(landing) => landing,
            Err(JoinError::UnknownIndexLookup { attribute }) => {
                debug!(%attribute, "ubiquitous attribute not in the tree, scanning from the root");
                NodeId::ROOT
            }
            Err(e) => return Err(e),
        };
        // everything on the skipped chain is one of the query's own attributes
        for node in self.ancestors(landing) {
            found |= node.documents();
        }
        let mut shared = SharedAttributes::default();
        if let Some(label) = self.get(landing).label() {
            shared.push(label);
        }
        self.collect_shared(landing, query, &mut shared, &mut found);
        debug!(
            document = query.document(),
            depth,
            landing = %landing,
            found = found.len(),
            "root-skip search done"
        );
        Ok(self.answer(query, found))
    }
    // Longest leading run of the requested count backed by the key counts and
    // the tree shape: every skipped level holds only children with the skipped
    // key, so each sibling left behind conflicts with the query. A missing
    // child is left to the descent, which then scans from the root.
    fn verified_skip_depth(&self, query: &JoinQuery, requested: usize) -> Result<usize> {
        if self.documents().is_empty() {
            return Ok(0);
        }
        let requested = requested.min(query.attributes().len());
        let mut current = Some(self.root());
        for (depth, attribute) in query.attributes()[..requested].iter().enumerate() {
            let key = attribute.key();
            if !query.keys().contains(key) {
                warn!(key, depth, requested, "not one of the query's keys, skipping stops here");
                return Ok(depth);
            }
            if !self.documents().is_ubiquitous(key) {
                if self.settings().strict_ubiquity {
                    return Err(JoinError::NotUbiquitous { key: key.to_owned() });
                }
                warn!(
                    key,
                    documents = self.documents().documents_with_key(key),
                    of = self.document_count(),
                    depth,
                    requested,
                    "key not carried by every document, skipping stops here"
                );
                return Ok(depth);
            }
            if let Some(node) = current {
                if !self.keyed_alike(node, attribute) {
                    warn!(key, depth, requested, "level mixes keys, skipping stops here");
                    return Ok(depth);
                }
                current = node.lookup_child(attribute).map(|child| self.get(child));
            }
        }
        Ok(requested)
    }
    fn keyed_alike(&self, node: &TrieNode, attribute: &Attribute) -> bool {
        node.children().iter().all(|&child| {
            self.get(child)
                .label()
                .is_some_and(|label| label.same_key(attribute))
        })
    }
    fn collect_shared<'t>(
        &'t self,
        node: NodeId,
        query: &JoinQuery,
        shared: &mut SharedAttributes<'t>,
        found: &mut RoaringBitmap,
    ) {
        let current = self.get(node);
        if !shared.is_empty() {
            *found |= current.documents();
        }
        for &child in current.children() {
            let child = self.get(child);
            if query.conflicts(child) {
                continue;
            }
            let held = child.label().filter(|label| query.holds(label));
            if let Some(label) = held {
                shared.push(label);
            }
            self.collect_shared(child.node_id(), query, shared, found);
            if held.is_some() {
                shared.pop();
            }
        }
    }

    /// Root-skip search when the tree proves it safe, index search otherwise.
    ///
    /// The skip depth is not taken on trust: a level is skipped only when the
    /// query's attribute labels a child there, every child at that point
    /// carries the same key, and that key is one of the query's keys, so each
    /// sibling left behind conflicts with the query. Both searches give the
    /// same answer; this one only picks the cheaper walk.
    pub fn search_hybrid(&self, query: &JoinQuery) -> Result<BTreeSet<String>> {
        self.ensure_labeled()?;
        let depth = self.safe_skip_depth(query);
        debug!(document = query.document(), depth, "hybrid search");
        if depth > 0 {
            self.root_skip(query, depth)
        } else {
            self.search_via_index(query)
        }
    }
    /// Number of leading query attributes that can be looked up instead of
    /// searched for.
    pub fn safe_skip_depth(&self, query: &JoinQuery) -> usize {
        let mut current = self.root();
        let mut depth = 0;
        for attribute in query.attributes() {
            if !query.keys().contains(attribute.key()) {
                break;
            }
            match current.lookup_child(attribute) {
                Some(child) if self.keyed_alike(current, attribute) => {
                    current = self.get(child);
                    depth += 1;
                }
                _ => break,
            }
        }
        depth
    }

    fn answer(&self, query: &JoinQuery, mut found: RoaringBitmap) -> BTreeSet<String> {
        if let Some(own) = self.documents().get(query.document()) {
            found.remove(own);
        }
        self.documents().resolve(&found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::attributes;
    use crate::settings::Settings;

    fn names(found: &BTreeSet<String>) -> Vec<&str> {
        found.iter().map(String::as_str).collect()
    }

    fn sample(settings: Settings) -> Trie {
        let mut trie = Trie::with_settings(settings);
        trie.insert_pairs("d1", [("a", "1"), ("b", "2")]).unwrap();
        trie.insert_pairs("d2", [("a", "1"), ("b", "2"), ("c", "9")]).unwrap();
        trie.insert_pairs("d3", [("a", "1"), ("b", "5")]).unwrap();
        trie.insert_pairs("d4", [("x", "7")]).unwrap();
        trie.label_branches();
        trie
    }

    fn d1() -> JoinQuery {
        JoinQuery::with_keys("d1", attributes([("a", "1"), ("b", "2")]), ["a", "b"])
    }

    #[test]
    fn every_strategy_answers_the_worked_example() {
        let trie = sample(Settings::default());
        let query = d1();
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), vec!["d2"]);
        assert_eq!(names(&trie.search_via_index_unpruned(&query).unwrap()), vec!["d2"]);
        assert_eq!(names(&trie.search_via_root_skip(&query, 0).unwrap()), vec!["d2"]);
        assert_eq!(names(&trie.search_hybrid(&query).unwrap()), vec!["d2"]);
    }

    #[test]
    fn searches_refuse_stale_labels() {
        let mut trie = sample(Settings::default());
        trie.insert_pairs("d5", [("a", "1")]).unwrap();
        let query = d1();
        for strategy in [
            Strategy::Index,
            Strategy::RootSkip { ubiquitous_key_count: 1 },
            Strategy::Hybrid,
        ] {
            assert_eq!(trie.search(&query, strategy), Err(JoinError::StaleLabeling));
        }
        trie.label_branches();
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), vec!["d2", "d5"]);
    }

    #[test]
    fn missing_skip_child_falls_back_to_the_root() {
        let trie = sample(Settings::default());
        // no document has a:3, yet d4 and nothing else has to be found for x:7
        let query = JoinQuery::from_pairs("q", [("a", "3"), ("x", "7")]);
        assert_eq!(names(&trie.search_via_root_skip(&query, 1).unwrap()), vec!["d4"]);
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), vec!["d4"]);
        // here a is everywhere, so the lookup of a:3 really happens and fails
        let mut trie = Trie::new();
        trie.insert_pairs("p1", [("a", "1"), ("b", "1")]).unwrap();
        trie.insert_pairs("p2", [("a", "2")]).unwrap();
        trie.label_branches();
        let query = JoinQuery::from_pairs("q", [("a", "3"), ("b", "1")]);
        assert!(trie.descend(&query.attributes()[..1]).is_err());
        assert!(trie.search_via_root_skip(&query, 1).unwrap().is_empty());
        assert!(trie.search_via_index(&query).unwrap().is_empty());
    }

    #[test]
    fn skip_count_stops_at_mixed_levels() {
        let mut trie = Trie::new();
        trie.insert_pairs("q", [("k0", "0"), ("k2", "0")]).unwrap();
        trie.insert_pairs("p", [("k0", "0"), ("k1", "1"), ("k2", "0")]).unwrap();
        trie.label_branches();
        // k0 and k2 are both everywhere, but below k0:0 the level mixes k1 and k2
        let query = JoinQuery::from_pairs("q", [("k0", "0"), ("k2", "0")]);
        assert_eq!(names(&trie.search_via_root_skip(&query, 2).unwrap()), vec!["p"]);
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), vec!["p"]);
    }

    #[test]
    fn strict_ubiquity_rejects_partial_keys() {
        let settings = Settings {
            strict_ubiquity: true,
            ..Settings::default()
        };
        let trie = sample(settings);
        // d4 has no key a
        assert_eq!(
            trie.search_via_root_skip(&d1(), 1),
            Err(JoinError::NotUbiquitous { key: "a".into() })
        );
        assert!(trie.search_via_root_skip(&d1(), 0).is_ok());
    }

    #[test]
    fn overstated_skip_count_is_clamped() {
        let mut trie = Trie::new();
        trie.insert_pairs("p1", [("a", "1"), ("b", "2")]).unwrap();
        trie.insert_pairs("p2", [("b", "2")]).unwrap();
        trie.label_branches();
        // p2 has no key a, so a:1 must not be looked up past b:2
        let query = JoinQuery::from_pairs("q", [("a", "1"), ("b", "2")]);
        let expected = trie.search_via_index(&query).unwrap();
        assert_eq!(names(&expected), vec!["p1", "p2"]);
        for count in 0..=3 {
            assert_eq!(trie.search_via_root_skip(&query, count).unwrap(), expected, "count {count}");
        }
        // the worked example: d4 lacks a
        let trie = sample(Settings::default());
        assert_eq!(names(&trie.search_via_root_skip(&d1(), 2).unwrap()), vec!["d2"]);
    }

    #[test]
    fn skip_count_stops_at_keys_outside_the_query() {
        let mut trie = Trie::new();
        trie.insert_pairs("p1", [("a", "1"), ("b", "1")]).unwrap();
        trie.insert_pairs("p2", [("a", "2"), ("b", "1")]).unwrap();
        trie.label_branches();
        // a is ubiquitous, but without it among the keys a:2 does not conflict
        let query = JoinQuery::with_keys("q", attributes([("a", "1"), ("b", "1")]), ["b"]);
        let found = trie.search_via_root_skip(&query, 2).unwrap();
        assert_eq!(names(&found), vec!["p1", "p2"]);
        assert_eq!(found, trie.search_via_index(&query).unwrap());
    }

    #[test]
    fn root_skip_over_ubiquitous_keys() {
        let mut trie = Trie::new();
        trie.insert_pairs("p1", [("a", "1"), ("b", "1"), ("c", "1")]).unwrap();
        trie.insert_pairs("p2", [("a", "1"), ("b", "1")]).unwrap();
        trie.insert_pairs("p3", [("a", "1"), ("b", "2"), ("c", "1")]).unwrap();
        trie.insert_pairs("p4", [("a", "2"), ("b", "1")]).unwrap();
        trie.insert_pairs("p5", [("a", "1"), ("b", "1"), ("c", "3")]).unwrap();
        trie.label_branches();
        let query = JoinQuery::from_pairs("p1", [("a", "1"), ("b", "1"), ("c", "1")]);
        let expected = vec!["p2"];
        assert_eq!(names(&trie.search_via_root_skip(&query, 2).unwrap()), expected);
        assert_eq!(names(&trie.search_via_root_skip(&query, 0).unwrap()), expected);
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), expected);
        assert_eq!(trie.safe_skip_depth(&query), 3);
        assert_eq!(names(&trie.search_hybrid(&query).unwrap()), expected);
    }

    #[test]
    fn skip_depth_stops_at_mixed_levels() {
        let trie = sample(Settings::default());
        // root has children keyed a and x
        assert_eq!(trie.safe_skip_depth(&d1()), 0);
        let mut trie = Trie::new();
        trie.insert_pairs("p1", [("a", "1"), ("b", "1")]).unwrap();
        trie.insert_pairs("p2", [("a", "1"), ("c", "1")]).unwrap();
        trie.label_branches();
        let query = JoinQuery::from_pairs("q", [("a", "1"), ("b", "1")]);
        assert_eq!(trie.safe_skip_depth(&query), 1);
        // a key outside the query's key set is never skipped
        let query = JoinQuery::with_keys("q", attributes([("a", "1"), ("b", "1")]), ["b"]);
        assert_eq!(trie.safe_skip_depth(&query), 0);
    }

    #[test]
    fn explicit_keys_decide_conflicts() {
        let trie = sample(Settings::default());
        // without b among the keys, b:5 no longer conflicts
        let query = JoinQuery::with_keys("d1", attributes([("a", "1"), ("b", "2")]), ["a"]);
        assert_eq!(names(&trie.search_via_index(&query).unwrap()), vec!["d2", "d3"]);
        assert_eq!(names(&trie.search_via_root_skip(&query, 0).unwrap()), vec!["d2", "d3"]);
    }

    #[test]
    fn queries_without_attributes_find_nothing() {
        let trie = sample(Settings::default());
        let query = JoinQuery::new("q", Vec::new());
        assert!(trie.search_via_index(&query).unwrap().is_empty());
        assert!(trie.search_via_root_skip(&query, 3).unwrap().is_empty());
        assert!(trie.search_hybrid(&query).unwrap().is_empty());
    }

    #[test]
    fn empty_trie_answers_empty() {
        let trie = Trie::new();
        assert!(trie.search_via_index(&d1()).unwrap().is_empty());
        assert!(trie.search_via_root_skip(&d1(), 2).unwrap().is_empty());
    }
}
