//! Store error types

use otu_model::{OtuId, RefId};
use std::fmt::{self, Display, Formatter};

/// Stored collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Reference documents
    References,
    /// OTU documents
    Otus,
    /// Sequence documents
    Sequences,
    /// History records
    History,
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::References => "references",
            Self::Otus => "otus",
            Self::Sequences => "sequences",
            Self::History => "history",
        })
    }
}

/// Unique OTU field that a write collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    /// Case-insensitive name
    Name,
    /// Non-empty abbreviation
    Abbreviation,
    /// Both name and abbreviation
    NameAndAbbreviation,
}

impl Display for UniqueField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Abbreviation => "abbreviation",
            Self::NameAndAbbreviation => "name and abbreviation",
        })
    }
}

/// Errors raised by [`crate::OtuStore`] implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Compare-and-set on the OTU version failed
    #[error("version mismatch for otu {id}: expected {expected}, found {actual}")]
    VersionMismatch {
        /// OTU written
        id: OtuId,
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Insert of a key that already exists
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey {
        /// Target collection
        collection: Collection,
        /// Offending key
        key: String,
    },

    /// Name or abbreviation already used in the reference
    #[error("{field} already used in reference {reference}")]
    UniqueViolation {
        /// Colliding field(s)
        field: UniqueField,
        /// Reference scope
        reference: RefId,
    },

    /// Write targets a document that does not exist
    #[error("missing document in {collection}: {key}")]
    Missing {
        /// Target collection
        collection: Collection,
        /// Missing key
        key: String,
    },

    /// Document could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn duplicate(collection: Collection, key: impl Display) -> Self {
        Self::DuplicateKey {
            collection,
            key: key.to_string(),
        }
    }

    pub(crate) fn missing(collection: Collection, key: impl Display) -> Self {
        Self::Missing {
            collection,
            key: key.to_string(),
        }
    }
}
