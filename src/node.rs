use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::hash::BuildHasher;

use roaring::RoaringBitmap;

use crate::attribute::{Attribute, OtherHasher};
use crate::branch::BranchPath;
use crate::document::DocumentId;
use crate::error::{JoinError, Result};

// ------------- NodeId -------------
/// Identity of a node within one trie. Ids are handed out in creation order
/// and double as the node's slot in the trie's arena; the root is `NodeId(0)`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ------------- TrieNode -------------
/// One vertex of the trie.
///
/// Children are owned by the trie's arena and referenced by id; `parent` is a
/// plain back-reference used for upward conflict walks and never owns anything.
#[derive(Debug)]
pub struct TrieNode {
    node_id: NodeId,
    // None only for the root sentinel, so no real attribute can collide with it
    label: Option<Attribute>,
    parent: Option<NodeId>,
    children: HashMap<Attribute, NodeId, OtherHasher>,
    // insertion order of the children, which fixes their sibling ranks
    order: Vec<NodeId>,
    documents: RoaringBitmap,
    depth: usize,
    branch_path: BranchPath,
}

impl TrieNode {
    pub(crate) fn root() -> Self {
        Self::new(NodeId::ROOT, None, None)
    }
    pub(crate) fn child_of(parent: NodeId, node_id: NodeId, label: Attribute) -> Self {
        Self::new(node_id, Some(label), Some(parent))
    }
    fn new(node_id: NodeId, label: Option<Attribute>, parent: Option<NodeId>) -> Self {
        Self {
            node_id,
            label,
            parent,
            children: HashMap::default(),
            order: Vec::new(),
            documents: RoaringBitmap::new(),
            depth: 0,
            branch_path: BranchPath::root(),
        }
    }
    /// Registers `child` under `label`. A label may only be used once among
    /// siblings, so callers look the label up with [`TrieNode::lookup_child`]
    /// before creating a node for it.
    pub fn add_child(&mut self, label: &Attribute, child: NodeId) -> Result<()> {
        if self.children.contains_key(label) {
            return Err(JoinError::DuplicateLabelInsertion {
                label: label.to_string(),
            });
        }
        self.children.insert(label.clone(), child);
        self.order.push(child);
        Ok(())
    }
    pub fn lookup_child(&self, label: &Attribute) -> Option<NodeId> {
        self.children.get(label).copied()
    }
    /// Returns true if the document was not already attached here.
    pub fn add_document(&mut self, document: DocumentId) -> bool {
        self.documents.insert(document)
    }
    pub(crate) fn set_position(&mut self, depth: usize, branch_path: BranchPath) {
        self.depth = depth;
        self.branch_path = branch_path;
    }
    /// A node conflicts with a query document when the document has the
    /// node's key but not with the node's value. The root never conflicts.
    pub fn conflicts_with<S: BuildHasher, T: BuildHasher>(
        &self,
        attributes: &HashSet<Attribute, S>,
        keys: &HashSet<String, T>,
    ) -> bool {
        match &self.label {
            Some(label) => keys.contains(label.key()) && !attributes.contains(label),
            None => false,
        }
    }
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }
    pub fn label(&self) -> Option<&Attribute> {
        self.label.as_ref()
    }
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    /// Children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.order
    }
    pub fn documents(&self) -> &RoaringBitmap {
        &self.documents
    }
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn branch_path(&self) -> &BranchPath {
        &self.branch_path
    }
    pub fn is_root(&self) -> bool {
        self.label.is_none()
    }
}
impl fmt::Display for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} {} {}", self.node_id, self.branch_path, label),
            None => write!(f, "{} root", self.node_id),
        }
    }
}
