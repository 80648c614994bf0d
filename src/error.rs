use thiserror::Error;

use crate::node::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("Duplicate label: a child labeled {label} already exists")]
    DuplicateLabelInsertion { label: String },
    #[error("Stale labeling: run label_branches() after inserting and before searching")]
    StaleLabeling,
    #[error("Empty attribute list for document {document}")]
    EmptyAttributeList { document: String },
    #[error("Unknown index lookup: no child labeled {attribute}")]
    UnknownIndexLookup { attribute: String },
    #[error("Duplicate key {key} in document {document}")]
    DuplicateKey { document: String, key: String },
    #[error("Duplicate document: {document} is already attached to another node")]
    DuplicateDocument { document: String },
    #[error("Key {key} is not present in every loaded document")]
    NotUbiquitous { key: String },
    #[error("Document limit: no dense id left for document {document}")]
    DocumentLimit { document: String },
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JoinError>;

// Helper conversions
impl From<config::ConfigError> for JoinError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
