//! Error types for the model layer

/// Errors raised while validating entities or mapping documents
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Segment with an empty name
    #[error("segment names cannot be empty")]
    EmptySegmentName,

    /// Two segments share a name
    #[error("duplicate segment name: {0}")]
    DuplicateSegment(String),

    /// Molecule type outside the allowed set
    #[error("unknown molecule type: {0}")]
    UnknownMolecule(String),

    /// Document could not be mapped to or from its typed form
    #[error("document mapping failed: {0}")]
    Document(#[from] serde_json::Error),
}
