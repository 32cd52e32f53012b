//! Error types for readmark operations.
//!
//! [`ReadmarkError`] covers every failure the extraction pipeline, the
//! Markdown serializer and the optional fetch helpers can report.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::{Document, ReadmarkError, Readability};
//!
//! let doc = Document::parse("<html><body><nav>menu</nav></body></html>").unwrap();
//! match Readability::new().extract(&doc) {
//!     Ok(article) => println!("{}", article.metadata.title),
//!     Err(ReadmarkError::NoCandidateFound { text_length, threshold }) => {
//!         println!("only {text_length} of {threshold} characters, use the fallback");
//!     }
//!     Err(e) => println!("Error: {e}"),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::dom_tree::NodeId;

/// Main error type for extraction and serialization.
#[derive(Error, Debug)]
pub enum ReadmarkError {
    /// The input has no root element to extract from.
    #[error("Input is not a document: no root element found")]
    NotADocument,

    /// Scoring found no eligible node, or the best attempt is too short.
    ///
    /// This is the signal to run the fallback extractor; it never aborts a
    /// conversion on its own.
    #[error("No content candidate found ({text_length} characters, threshold {threshold})")]
    NoCandidateFound { text_length: usize, threshold: usize },

    /// The serializer was handed something it cannot walk.
    #[error("Invalid serializer input: {0}")]
    InvalidSerializerInput(String),

    /// A custom rule filter is neither a tag name, a tag list, nor a predicate.
    #[error("Invalid filter for rule '{rule}': {reason}")]
    RuleFilter { rule: String, reason: String },

    /// A node could not be removed because it is no longer in a tree.
    ///
    /// Cleaning passes recover from this locally.
    #[error("Node {0} is detached from the tree")]
    DetachedNode(NodeId),

    /// The document exceeds the configured element budget.
    #[error("Aborting parsing document; {found} elements found (maximum {max})")]
    TooManyElements { found: usize, max: usize },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML could not be parsed.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read or write errors.
    #[error("I/O error: {0}")]
    WriteError(#[from] std::io::Error),

    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[cfg(feature = "fetch")]
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },
}

/// Result type alias for ReadmarkError.
pub type Result<T> = std::result::Result<T, ReadmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidate_display() {
        let err = ReadmarkError::NoCandidateFound { text_length: 120, threshold: 500 };
        assert!(err.to_string().contains("120"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_rule_filter_display() {
        let err = ReadmarkError::RuleFilter { rule: "iframe".to_string(), reason: "empty tag name".to_string() };
        assert!(err.to_string().contains("iframe"));
        assert!(err.to_string().contains("empty tag name"));
    }

    #[test]
    fn test_too_many_elements_display() {
        let err = ReadmarkError::TooManyElements { found: 12, max: 10 };
        assert_eq!(err.to_string(), "Aborting parsing document; 12 elements found (maximum 10)");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::other("disk full");
        let err: ReadmarkError = io.into();
        assert!(matches!(err, ReadmarkError::WriteError(_)));
    }
}
