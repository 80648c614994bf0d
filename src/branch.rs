//! Branch paths and the per-query set of ignored branches.
//!
//! A [`BranchPath`] names a node by the 1-based ranks of the siblings on its
//! way down from the root. Ranks are stored root first, so the path of every
//! ancestor is a prefix of the path of its descendants, and "this subtree was
//! already handled" becomes a prefix test.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use crate::attribute::OtherHasher;

// ------------- BranchPath -------------
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug, Default)]
pub struct BranchPath(Vec<u32>);

impl BranchPath {
    /// The path of the root.
    pub fn root() -> Self {
        Self(Vec::new())
    }
    /// The path of the `rank`-th child of the node at this path.
    pub fn child(&self, rank: u32) -> Self {
        let mut ranks = Vec::with_capacity(self.0.len() + 1);
        ranks.extend_from_slice(&self.0);
        ranks.push(rank);
        Self(ranks)
    }
    pub fn ranks(&self) -> &[u32] {
        &self.0
    }
    /// Ranks from the node itself up to the root's child, i.e. the node's own
    /// rank first followed by its parent's path.
    pub fn ranks_upward(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().rev().copied()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl Borrow<[u32]> for BranchPath {
    fn borrow(&self) -> &[u32] {
        &self.0
    }
}
impl From<Vec<u32>> for BranchPath {
    fn from(ranks: Vec<u32>) -> Self {
        Self(ranks)
    }
}
impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ranks: Vec<String> = self.ranks_upward().map(|r| r.to_string()).collect();
        write!(f, "[{}]", ranks.join("_"))
    }
}

// ------------- IgnoredBranches -------------
/// Branches a single search already proved non-joinable or fully explored.
///
/// Owned by one search call; never shared between concurrent queries.
#[derive(Debug, Default)]
pub struct IgnoredBranches {
    paths: HashSet<BranchPath, OtherHasher>,
}

impl IgnoredBranches {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn ignore(&mut self, path: &BranchPath) {
        if !self.paths.contains(path) {
            self.paths.insert(path.clone());
        }
    }
    /// Whether `path` itself or the path of any of its ancestors was ignored.
    pub fn is_ignored(&self, path: &BranchPath) -> bool {
        if self.paths.is_empty() {
            return false;
        }
        let ranks = path.ranks();
        (1..=ranks.len()).any(|end| self.paths.contains(&ranks[..end]))
    }
    pub fn len(&self) -> usize {
        self.paths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
