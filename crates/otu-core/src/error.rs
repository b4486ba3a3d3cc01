//! Error types for the OTU service
//!
//! Every failure a caller can see is an [`OtuError`]. Store failures that
//! carry domain meaning (lost version races, unique index hits) are mapped
//! to their domain variants on the way out.

use otu_model::{ChangeId, IsolateId, ModelError, OtuId, RefId, SequenceId};
use otu_store::{Collection, StoreError, UniqueField};
use std::fmt::{self, Display, Formatter};

/// Resource a lookup failed to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Reference
    Reference(RefId),
    /// OTU
    Otu(OtuId),
    /// Isolate within an OTU
    Isolate(IsolateId),
    /// Sequence within an isolate
    Sequence(SequenceId),
    /// History record
    History(ChangeId),
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(id) => write!(f, "reference {id}"),
            Self::Otu(id) => write!(f, "otu {id}"),
            Self::Isolate(id) => write!(f, "isolate {id}"),
            Self::Sequence(id) => write!(f, "sequence {id}"),
            Self::History(id) => write!(f, "change {id}"),
        }
    }
}

/// Field a uniqueness check failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictField {
    /// OTU name (case-insensitive, per reference)
    Name,
    /// OTU abbreviation (per reference)
    Abbreviation,
    /// Both OTU name and abbreviation
    NameAndAbbreviation,
    /// Sequence accession (global)
    Accession,
}

impl ConflictField {
    /// Combine separate name and abbreviation hits
    #[must_use]
    pub fn from_hits(name: bool, abbreviation: bool) -> Option<Self> {
        match (name, abbreviation) {
            (true, true) => Some(Self::NameAndAbbreviation),
            (true, false) => Some(Self::Name),
            (false, true) => Some(Self::Abbreviation),
            (false, false) => None,
        }
    }
}

impl Display for ConflictField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "Name already exists",
            Self::Abbreviation => "Abbreviation already exists",
            Self::NameAndAbbreviation => "Name and abbreviation already exist",
            Self::Accession => "Sequence id already exists",
        })
    }
}

impl From<UniqueField> for ConflictField {
    fn from(field: UniqueField) -> Self {
        match field {
            UniqueField::Name => Self::Name,
            UniqueField::Abbreviation => Self::Abbreviation,
            UniqueField::NameAndAbbreviation => Self::NameAndAbbreviation,
        }
    }
}

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum OtuError {
    /// Referenced resource does not exist
    #[error("not found: {0}")]
    NotFound(Resource),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(ConflictField),

    /// Isolate source type not allowed by the reference
    #[error("source type {0} is not allowed")]
    InvalidSourceType(String),

    /// Sequence segment not declared in the OTU schema
    #[error("segment {0} is not in the otu schema")]
    InvalidSegment(String),

    /// Patch carried no fields
    #[error("empty input")]
    EmptyInput,

    /// Field failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Actor may not modify OTUs in the reference
    #[error("insufficient rights")]
    InsufficientRights,

    /// Another writer committed first
    #[error("otu {otu_id} was modified concurrently (expected version {expected_version})")]
    ConcurrentModification {
        /// OTU written
        otu_id: OtuId,
        /// Version this writer read
        expected_version: u64,
    },

    /// Unmapped store failure
    #[error("store error: {0}")]
    Store(StoreError),

    /// Entity validation or document mapping failure
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl OtuError {
    /// Status code for the HTTP layer
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) | Self::ConcurrentModification { .. } => 409,
            Self::InvalidSourceType(_)
            | Self::InvalidSegment(_)
            | Self::EmptyInput
            | Self::InvalidInput(_)
            | Self::Model(_) => 400,
            Self::InsufficientRights => 403,
            Self::Store(_) => 500,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StoreError> for OtuError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionMismatch { id, expected, .. } => Self::ConcurrentModification {
                otu_id: id,
                expected_version: expected,
            },
            StoreError::UniqueViolation { field, .. } => Self::Conflict(field.into()),
            StoreError::DuplicateKey {
                collection: Collection::Sequences,
                ..
            } => Self::Conflict(ConflictField::Accession),
            other => Self::Store(other),
        }
    }
}
