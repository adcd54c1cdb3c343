//! Error types for report document assembly.

use thiserror::Error;

/// Errors raised by [`crate::ReportBuilder`] misuse or serialization failures.
#[derive(Error, Debug)]
pub enum DocError {
    /// `new_document` was called while a previous document is still open.
    #[error("a document is already open on this builder")]
    AlreadyOpen,

    /// An operation needed an open document but none exists.
    #[error("no document is open")]
    NoDocument,

    /// `close_block` was called with no open block.
    #[error("no open blocks to close")]
    NoOpenBlock,

    /// `close` was called while blocks are still open.
    #[error("{0} open block(s) at close")]
    UnclosedBlocks(usize),

    /// `close` was called twice.
    #[error("document already closed")]
    AlreadyClosed,

    /// Element or attribute name that is not a valid XML name.
    #[error("invalid element or attribute name: {0:?}")]
    InvalidName(String),

    /// `serialize` was called before `close`.
    #[error("document is not closed")]
    NotClosed,

    /// Output transform failure.
    #[error("transform error: {0}")]
    Transform(String),

    /// IO error while writing the document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for DocError {
    fn from(err: serde_json::Error) -> Self {
        DocError::Transform(err.to_string())
    }
}
