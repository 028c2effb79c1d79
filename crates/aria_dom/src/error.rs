//! Error types for aria_dom

use thiserror::Error;

use crate::document::NodeId;

/// A selector failed to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid selector `{selector}` at offset {offset}: {message}")]
pub struct SelectorError {
    /// The selector source text
    pub selector: String,
    /// Byte offset where parsing stopped
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

/// Errors from document mutation APIs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node id does not refer to a live node
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The insertion would create a cycle or move a root node
    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    /// A selector passed to a query did not parse
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Result type for aria_dom operations
pub type Result<T> = std::result::Result<T, DomError>;
