use std::collections::{BTreeSet, HashMap};

// used to keep the one-to-one mapping between external ids and dense document ids
use bimap::BiMap;
// node membership and join results are sets of dense document ids
use roaring::RoaringBitmap;

use crate::attribute::{Attribute, OtherHasher};
use crate::error::{JoinError, Result};
use crate::node::NodeId;

// ------------- DocumentId -------------
pub type DocumentId = u32;

/// Keeps every loaded document: the external string id, the dense id it was
/// given, and the node its attribute chain ends in.
///
/// Dense ids are handed out in first-insertion order, which is what lets node
/// membership live in a `RoaringBitmap`. The keeper also counts, per key, how
/// many documents carry it; a key counted for every document is ubiquitous.
#[derive(Debug)]
pub struct DocumentKeeper {
    kept: BiMap<String, DocumentId>,
    placements: Vec<NodeId>,
    documents_with_key: HashMap<String, u32, OtherHasher>,
}

impl DocumentKeeper {
    pub fn new() -> Self {
        Self {
            kept: BiMap::new(),
            placements: Vec::new(),
            documents_with_key: HashMap::default(),
        }
    }
    /// Keeps a document placed at `placement`. Returns the dense id and whether
    /// the document was previously kept, in which case nothing changes.
    pub fn keep(
        &mut self,
        document: &str,
        placement: NodeId,
        attributes: &[Attribute],
    ) -> Result<(DocumentId, bool)> {
        if let Some(id) = self.kept.get_by_left(document) {
            return Ok((*id, true));
        }
        let id = self.next_id(document)?;
        self.kept.insert(document.to_owned(), id);
        self.placements.push(placement);
        for attribute in attributes {
            *self
                .documents_with_key
                .entry(attribute.key().to_owned())
                .or_insert(0) += 1;
        }
        Ok((id, false))
    }
    /// The dense id the next new document would get.
    pub fn next_id(&self, document: &str) -> Result<DocumentId> {
        dense_id(self.placements.len(), document)
    }
    pub fn get(&self, document: &str) -> Option<DocumentId> {
        self.kept.get_by_left(document).copied()
    }
    pub fn name(&self, id: DocumentId) -> Option<&str> {
        self.kept.get_by_right(&id).map(String::as_str)
    }
    pub fn placement(&self, id: DocumentId) -> Option<NodeId> {
        self.placements.get(id as usize).copied()
    }
    pub fn documents_with_key(&self, key: &str) -> usize {
        self.documents_with_key.get(key).copied().unwrap_or(0) as usize
    }
    /// Whether every kept document carries `key`. Nothing is ubiquitous in an
    /// empty keeper.
    pub fn is_ubiquitous(&self, key: &str) -> bool {
        !self.is_empty() && self.documents_with_key(key) == self.len()
    }
    /// Translates a set of dense ids back into external ids.
    pub fn resolve(&self, ids: &RoaringBitmap) -> BTreeSet<String> {
        ids.iter()
            .filter_map(|id| self.name(id))
            .map(str::to_owned)
            .collect()
    }
    pub fn len(&self) -> usize {
        self.placements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

fn dense_id(kept: usize, document: &str) -> Result<DocumentId> {
    DocumentId::try_from(kept).map_err(|_| JoinError::DocumentLimit {
        document: document.to_owned(),
    })
}
