//! # Framegraph - Frame-semantic annotation graph engine
//!
//! In-memory representation of a single sentence's syntactic parse tree
//! overlaid with frame-semantic role annotation.
//!
//! Framegraph provides:
//! - A syntax graph: dominance tree over terminals and nonterminals,
//!   with splitword parts attached beneath terminals
//! - A semantic graph: frames, targets and frame elements pointing into
//!   the syntax graph by node ID, plus underspecification blocks
//! - Lossless round-trip serialization of the sentence markup format,
//!   including verbatim passthrough of unrecognized elements
//! - Maximal-constituent projection: the smallest set of constituents
//!   whose combined yield exactly covers an annotated word set

pub mod corpus;
pub mod markup;
pub mod node;
pub mod order;
pub mod project;
pub mod sem;
pub mod sentence;
pub mod syn;

// Re-exports for convenient access
pub use node::NodeBase;
pub use project::{max_constituents_for_nodes, max_constituents_smc};
pub use sem::{FeNode, FrameNode, SemNode, SentenceFlag, UspKind, UspNode};
pub use sentence::Sentence;
pub use syn::{SynGraph, SynKind, SynNode};

/// Result type alias for framegraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for framegraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Sentence {sentence}: no node with ID {id}, referenced by {context}")]
    UnknownNode {
        sentence: String,
        id: String,
        context: String,
    },

    #[error("Frame {0} already has a target")]
    DuplicateTarget(String),

    #[error("Text node {0} cannot carry attributes")]
    TextAttribute(String),

    #[error("Node {0} stands in for another sentence and cannot take children")]
    OutsideSentence(String),

    #[error("Node {id} is not a {expected}")]
    NodeKind { id: String, expected: &'static str },

    #[error("New syntactic nodes must be terminals or nonterminals")]
    SyntaxNodeKind,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
