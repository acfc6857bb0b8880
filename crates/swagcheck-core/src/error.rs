//! Errors raised while reading an API description

/// A problem with the API description itself.
///
/// These are authoring errors in the description, not conditions that
/// synthesis recovers from. They propagate to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    /// Reference string is not a local JSON pointer (`#/...`)
    #[error("malformed reference {0:?}: expected a local pointer like \"#/definitions/Name\"")]
    MalformedReference(String),
    /// A pointer segment does not exist in the document
    #[error("unresolved reference {0:?}")]
    UnresolvedReference(String),
    /// The document does not have the shape of an API description
    #[error("invalid description: {0}")]
    InvalidDescription(String),
}
