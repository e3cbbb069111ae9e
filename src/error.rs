//! Error types for the mauve-rs library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mauve-rs operations.
pub type Result<T> = std::result::Result<T, MauveError>;

/// Errors that can occur while parsing alignments or running the aligner.
#[derive(Error, Debug)]
pub enum MauveError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A `>` header line could not be parsed (strict header policy only)
    #[error("Malformed XMFA header on line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    /// Input ended while a region or LCB was still open
    #[error("XMFA document ended without a terminator; {regions} region(s) not flushed")]
    IncompleteDocument { regions: usize },

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Aligner executable could not be located
    #[error("Aligner binary not found: {0}")]
    BinaryNotFound(String),

    /// Aligner ran but exited unsuccessfully
    #[error("Aligner execution failed: {0}")]
    AlignerFailed(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for MauveError {
    fn from(e: tempfile::PersistError) -> Self {
        MauveError::IoError(e.error)
    }
}

/// A non-fatal problem noticed while parsing or scanning.
///
/// Diagnostics never stop processing. They are logged at WARN level when
/// produced and kept so callers can inspect them afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Character outside `{a, t, g, c, n, -}` (case-insensitive), 1-based position
    #[error("invalid sequence character {character:?} at position {position}")]
    InvalidCharacter { position: usize, character: char },

    /// Header block index (field 0) disagrees with the index before the colon
    #[error("line {line}: header block index {declared} disagrees with {secondary} before ':'")]
    LcbIndexMismatch {
        line: usize,
        declared: u32,
        secondary: u32,
    },

    /// Sequence data appeared with no open region to receive it
    #[error("line {line}: sequence data outside of any region")]
    OrphanSequenceLine { line: usize },

    /// Header was unusable and its region will be dropped
    #[error("line {line}: header discarded ({reason})")]
    DiscardedHeader { line: usize, reason: String },
}
