//! Atomic write batches
//!
//! A [`WriteBatch`] carries everything one mutation persists: the OTU write,
//! any sequence writes and exactly one history record. Stores apply a batch
//! entirely or not at all.

use otu_model::{HistoryRecord, Otu, OtuId, Sequence, SequenceId};

/// Write to the OTU collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtuWrite {
    /// New document; fails if the id exists
    Insert(Otu),
    /// Replace if the stored version equals `expected_version`
    Replace {
        /// New document
        otu: Otu,
        /// Version the writer read
        expected_version: u64,
    },
    /// Delete if the stored version equals `expected_version`
    Delete {
        /// OTU to delete
        id: OtuId,
        /// Version the writer read
        expected_version: u64,
    },
}

impl OtuWrite {
    /// Id of the written OTU
    #[must_use]
    pub fn otu_id(&self) -> &OtuId {
        match self {
            Self::Insert(otu) | Self::Replace { otu, .. } => &otu.id,
            Self::Delete { id, .. } => id,
        }
    }
}

/// Write to the sequence collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceWrite {
    /// New sequence; fails if the accession exists
    Insert(Sequence),
    /// Replace an existing sequence
    Replace(Sequence),
    /// Delete one sequence
    Delete(SequenceId),
    /// Delete every sequence of an OTU
    DeleteForOtu(OtuId),
}

/// One atomic unit of persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    /// OTU document write
    pub otu: OtuWrite,
    /// Sequence writes, applied in order
    pub sequences: Vec<SequenceWrite>,
    /// Audit record for the mutation
    pub history: HistoryRecord,
}

impl WriteBatch {
    /// Batch with no sequence writes
    #[must_use]
    pub fn new(otu: OtuWrite, history: HistoryRecord) -> Self {
        Self {
            otu,
            sequences: Vec::new(),
            history,
        }
    }

    /// Append sequence writes
    #[must_use]
    pub fn with_sequences(mut self, writes: impl IntoIterator<Item = SequenceWrite>) -> Self {
        self.sequences.extend(writes);
        self
    }

    /// Id of the OTU this batch writes
    #[inline]
    #[must_use]
    pub fn otu_id(&self) -> &OtuId {
        self.otu.otu_id()
    }
}
