use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::attribute::{Attribute, OtherHasher};
use crate::document::DocumentKeeper;
use crate::error::{JoinError, Result};
use crate::node::{NodeId, TrieNode};
use crate::settings::Settings;

// ------------- Trie -------------
/// A prefix tree over the attribute chains of every loaded document.
///
/// The trie owns its nodes in an arena; a node's id is its slot, handed out in
/// creation order, so the id counter is simply the arena length and lives and
/// dies with this instance. Besides the tree it owns the index (every node
/// carrying a given attribute, in creation order) and the document keeper.
///
/// The life of a trie has three phases:
/// 1. documents are [inserted](Trie::insert), all using one global key order,
/// 2. [`Trie::label_branches`] assigns depths and branch paths,
/// 3. searches run against `&Trie`, from as many threads as needed.
///
/// Inserting again after labeling makes the labels stale, and searches refuse
/// to run until the labeling pass is repeated.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    index: HashMap<Attribute, Vec<NodeId>, OtherHasher>,
    documents: DocumentKeeper,
    labeled: bool,
    settings: Settings,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            nodes: vec![TrieNode::root()],
            index: HashMap::default(),
            documents: DocumentKeeper::new(),
            labeled: true,
            settings,
        }
    }

    /// Merges the attribute chain of a document into the tree and returns the
    /// node the document was attached to.
    ///
    /// The longest prefix of `attributes` already present as a path from the
    /// root is shared; the remaining suffix becomes one new chain below it.
    /// Callers must order every document's attributes by the same global key
    /// order, otherwise nothing gets shared.
    ///
    /// Nothing is mutated when the input is rejected: an empty list, a key
    /// repeated within the document, or an id already attached to a different
    /// node. Inserting a document again with the same chain is a no-op.
    pub fn insert(&mut self, document: &str, attributes: &[Attribute]) -> Result<NodeId> {
        if let Some(node) = self.validate(document, attributes)? {
            trace!(document, node = %node, "document already kept along this chain");
            return Ok(node);
        }
        let mut current = NodeId::ROOT;
        let mut shared = 0;
        for attribute in attributes {
            match self.get(current).lookup_child(attribute) {
                Some(child) => {
                    current = child;
                    shared += 1;
                }
                None => break,
            }
        }
        for attribute in &attributes[shared..] {
            current = self.create_node(current, attribute)?;
        }
        let (id, _) = self.documents.keep(document, current, attributes)?;
        self.nodes[current.0].add_document(id);
        self.labeled = false;
        debug!(
            document,
            shared,
            created = attributes.len() - shared,
            node = %current,
            "inserted document"
        );
        Ok(current)
    }
    pub fn insert_pairs<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        document: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<NodeId> {
        let attributes = crate::attribute::attributes(pairs);
        self.insert(document, &attributes)
    }
    // Returns the placement of a document re-inserted along its own chain.
    fn validate(&self, document: &str, attributes: &[Attribute]) -> Result<Option<NodeId>> {
        if attributes.is_empty() {
            return Err(JoinError::EmptyAttributeList {
                document: document.to_owned(),
            });
        }
        let mut keys = HashSet::<&str, OtherHasher>::default();
        for attribute in attributes {
            if !keys.insert(attribute.key()) {
                return Err(JoinError::DuplicateKey {
                    document: document.to_owned(),
                    key: attribute.key().to_owned(),
                });
            }
        }
        let placement = self
            .documents
            .get(document)
            .and_then(|id| self.documents.placement(id));
        match placement {
            None => {
                self.documents.next_id(document)?;
                Ok(None)
            }
            Some(placement) => match self.descend(attributes) {
                Ok(node) if node == placement => Ok(Some(node)),
                _ => Err(JoinError::DuplicateDocument {
                    document: document.to_owned(),
                }),
            },
        }
    }
    fn create_node(&mut self, parent: NodeId, label: &Attribute) -> Result<NodeId> {
        let node_id = NodeId(self.nodes.len());
        self.nodes[parent.0].add_child(label, node_id)?;
        self.nodes
            .push(TrieNode::child_of(parent, node_id, label.clone()));
        self.index.entry(label.clone()).or_default().push(node_id);
        Ok(node_id)
    }

    /// Assigns every node its depth and branch path.
    ///
    /// Siblings are ranked from 1 in the order they were created, and a node's
    /// path is its parent's path extended by its own rank. The walk keeps an
    /// explicit stack, so tree depth is not limited by the call stack.
    pub fn label_branches(&mut self) {
        let mut stack = vec![NodeId::ROOT];
        while let Some(parent) = stack.pop() {
            let depth = self.nodes[parent.0].depth() + 1;
            let path = self.nodes[parent.0].branch_path().clone();
            let children = self.nodes[parent.0].children().to_vec();
            for (rank, child) in children.into_iter().enumerate() {
                self.nodes[child.0].set_position(depth, path.child(rank as u32 + 1));
                stack.push(child);
            }
        }
        self.labeled = true;
        debug!(nodes = self.nodes.len(), "labeled branches");
    }
    pub fn is_labeled(&self) -> bool {
        self.labeled
    }
    pub(crate) fn ensure_labeled(&self) -> Result<()> {
        if self.labeled {
            Ok(())
        } else {
            Err(JoinError::StaleLabeling)
        }
    }

    /// Follows `attributes` from the root by exact child lookups.
    pub fn descend(&self, attributes: &[Attribute]) -> Result<NodeId> {
        attributes.iter().try_fold(NodeId::ROOT, |current, attribute| {
            self.get(current)
                .lookup_child(attribute)
                .ok_or_else(|| JoinError::UnknownIndexLookup {
                    attribute: attribute.to_string(),
                })
        })
    }

    // ids handed to this function always come from this trie
    pub(crate) fn get(&self, node: NodeId) -> &TrieNode {
        &self.nodes[node.0]
    }
    pub fn node(&self, node: NodeId) -> Result<&TrieNode> {
        self.nodes.get(node.0).ok_or(JoinError::UnknownNode(node))
    }
    pub fn root(&self) -> &TrieNode {
        self.get(NodeId::ROOT)
    }
    /// All nodes, root first, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &TrieNode> {
        self.nodes.iter()
    }
    /// Parent, grandparent and so on up to and including the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = &TrieNode> {
        std::iter::successors(self.get(node).parent(), |id| self.get(*id).parent())
            .map(|id| self.get(id))
    }
    /// The attributes on the path from the root down to `node`.
    pub fn chain(&self, node: NodeId) -> Vec<Attribute> {
        let mut chain: Vec<Attribute> = std::iter::once(self.get(node))
            .chain(self.ancestors(node))
            .filter_map(|n| n.label().cloned())
            .collect();
        chain.reverse();
        chain
    }
    /// Every node labeled with `attribute`, in creation order.
    pub fn index_entries(&self, attribute: &Attribute) -> &[NodeId] {
        self.index.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }
    /// The node a document is attached to.
    pub fn placement(&self, document: &str) -> Option<NodeId> {
        self.documents
            .get(document)
            .and_then(|id| self.documents.placement(id))
    }
    /// External ids of the documents attached to `node`.
    pub fn documents_at(&self, node: NodeId) -> BTreeSet<String> {
        self.documents.resolve(self.get(node).documents())
    }
    pub fn documents(&self) -> &DocumentKeeper {
        &self.documents
    }
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// True while no document has been inserted.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
