//! fpjoin – join candidate search over a shared prefix tree of documents.
//!
//! Documents are ordered lists of attributes, i.e. `(key, value)` pairs. Two
//! documents are *joinable* when every key they have in common carries the
//! same value in both (an equi-join on the intersection of their schemas) and
//! they share at least one attribute exactly. Rather than comparing every pair
//! of documents, their attribute chains are merged into one FP-tree-style
//! trie where common prefixes are stored once, and join partners are found by
//! walking that tree.
//!
//! ## Modules
//! * [`attribute`] – The [`attribute::Attribute`] label type and the pairwise
//!   join test used as a reference.
//! * [`document`] – The [`document::DocumentKeeper`] mapping external document
//!   ids to dense ids, plus per-key document counts.
//! * [`node`] – [`node::TrieNode`] and [`node::NodeId`].
//! * [`branch`] – Branch paths and the per-query set of ignored branches.
//! * [`trie`] – The [`trie::Trie`]: insertion, the attribute index and the
//!   branch labeling pass.
//! * [`search`] – [`search::JoinQuery`] and the search strategies.
//! * [`settings`] – [`settings::Settings`] read with the `config` crate.
//!
//! ## Phases
//! A trie is filled by repeated [`trie::Trie::insert`] calls, frozen by one
//! [`trie::Trie::label_branches`] call, and then searched any number of times.
//! Searching a trie whose labels are older than its last insertion fails with
//! [`JoinError::StaleLabeling`] instead of giving a wrong answer. Searches take
//! `&Trie` and keep all of their working state on their own stack, so a
//! labeled trie can be searched from many threads at once.
//!
//! ## Attribute order
//! Every document must list its attributes in one global key order (commonly
//! the keys sorted by how many documents carry them). The trie cannot check
//! this; with inconsistent orders nothing gets shared and the root-skip search
//! loses its footing.
//!
//! ## Quick Start
//! ```
//! use fpjoin::{JoinQuery, Trie};
//! let mut trie = Trie::new();
//! trie.insert_pairs("d1", [("a", "1"), ("b", "2")]).unwrap();
//! trie.insert_pairs("d2", [("a", "1"), ("b", "2"), ("c", "9")]).unwrap();
//! trie.insert_pairs("d3", [("a", "1"), ("b", "5")]).unwrap();
//! trie.insert_pairs("d4", [("x", "7")]).unwrap();
//! trie.label_branches();
//! let query = JoinQuery::from_pairs("d1", [("a", "1"), ("b", "2")]);
//! let joinable = trie.search_via_index(&query).unwrap();
//! assert_eq!(joinable.into_iter().collect::<Vec<_>>(), vec!["d2"]);
//! ```
//!
//! ## Logging
//! The crate emits `tracing` events (`debug` per insertion and search, `trace`
//! per search candidate, `warn` on a questionable root-skip) and leaves
//! installing a subscriber to the application.

pub mod attribute;
pub mod branch;
pub mod document;
pub mod error;
pub mod node;
pub mod search;
pub mod settings;
pub mod trie;

pub use attribute::Attribute;
pub use error::{JoinError, Result};
pub use node::{NodeId, TrieNode};
pub use search::{JoinQuery, Strategy};
pub use settings::Settings;
pub use trie::Trie;
