//! Error types for jsonbc encoding, decoding and traversal.

use thiserror::Error;

/// Result type for jsonbc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for jsonbc operations.
///
/// None of these are retried internally. They are reported to the immediate
/// caller and abort the operation in progress.
#[derive(Error, Debug)]
pub enum Error {
    /// A string, array, object or container payload does not fit the
    /// length or count fields of the format.
    #[error("{what} exceeds the maximum allowed ({limit})")]
    ResourceLimitExceeded { what: &'static str, limit: usize },

    /// Unexpected token sequence, unknown type tag, truncated buffer, or a
    /// container where a scalar was required (or the reverse).
    #[error("Malformed jsonbc input: {0}")]
    MalformedInput(String),

    /// A key id read from a container has no name in the dictionary.
    #[error("Key id {0} not found in the key dictionary")]
    DictionaryLookupFailure(i32),

    /// Nesting is deeper than the traversal is allowed to recurse.
    #[error("Nesting depth exceeds the maximum of {0} levels")]
    RecursionLimitExceeded(usize),

    /// The wire form carries a version tag this build does not understand.
    #[error("Unsupported jsonbc version number {0}")]
    UnsupportedVersion(u8),

    /// I/O failure in a dictionary backing store.
    #[error("Key dictionary store: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::MalformedInput`].
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedInput(msg.into())
    }

    /// Shorthand for [`Error::ResourceLimitExceeded`].
    pub(crate) fn limit(what: &'static str, limit: usize) -> Self {
        tracing::debug!(what, limit, "jsonbc resource limit exceeded");
        Error::ResourceLimitExceeded { what, limit }
    }
}
