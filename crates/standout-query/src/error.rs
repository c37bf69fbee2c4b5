//! Error types for the query crate.

use thiserror::Error;

/// Errors reported by terminal evaluators and source adaptation.
///
/// Deferred operators never fail on their own: a failure surfaces only when a
/// terminal pulls far enough to reach the element that causes it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The value handed to [`Query::from_any`](crate::Query::from_any) is not
    /// a recognized sequence shape.
    #[error("unsupported source: expected a sequence of {item}")]
    UnsupportedSource { item: &'static str },

    /// Two elements produced the same key while building a map without a
    /// merge strategy.
    #[error("duplicate key produced by element at position {position}")]
    DuplicateKey { position: usize },

    /// A numeric or positional terminal ran over zero elements and has no
    /// identity value to fall back on.
    #[error("{op} called on an empty sequence")]
    EmptySequence { op: &'static str },

    /// No element satisfied a `first`/`last`/`single` style terminal.
    #[error("{op} found no matching element")]
    NotFound { op: &'static str },

    /// A `single` style terminal found more than one matching element.
    #[error("{op} found more than one matching element")]
    MoreThanOne { op: &'static str },

    /// Positional access past the end of the sequence.
    #[error("index {index} is out of range for a sequence of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
