//! Persistence port
//!
//! The storage engine is external; the aggregate service only sees this
//! trait. Reads return owned snapshots. All writes go through
//! [`OtuStore::commit`].

use crate::batch::WriteBatch;
use crate::error::StoreError;
use crate::filter::{HistoryFilter, OtuFilter, SequenceFilter};
use async_trait::async_trait;
use otu_model::{ChangeId, HistoryRecord, Otu, OtuId, RefId, Reference, Sequence, SequenceId};

/// Document store for references, OTUs, sequences and history
#[async_trait]
pub trait OtuStore: Send + Sync + std::fmt::Debug {
    /// Look up a reference
    async fn get_reference(&self, id: &RefId) -> Result<Option<Reference>, StoreError>;

    /// Add a reference; fails on duplicate id
    async fn insert_reference(&self, reference: Reference) -> Result<(), StoreError>;

    /// Look up an OTU
    async fn get_otu(&self, id: &OtuId) -> Result<Option<Otu>, StoreError>;

    /// OTUs matching `filter`, in insertion order
    async fn find_otus(&self, filter: &OtuFilter) -> Result<Vec<Otu>, StoreError>;

    /// Number of OTUs matching `filter`
    async fn count_otus(&self, filter: &OtuFilter) -> Result<usize, StoreError>;

    /// Look up a sequence by accession
    async fn get_sequence(&self, id: &SequenceId) -> Result<Option<Sequence>, StoreError>;

    /// Sequences matching `filter`, in insertion order
    async fn find_sequences(&self, filter: &SequenceFilter) -> Result<Vec<Sequence>, StoreError>;

    /// Number of sequences matching `filter`
    async fn count_sequences(&self, filter: &SequenceFilter) -> Result<usize, StoreError>;

    /// Look up a history record
    async fn get_history(&self, id: &ChangeId) -> Result<Option<HistoryRecord>, StoreError>;

    /// History records matching `filter`, ascending by version
    async fn find_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Apply a batch atomically
    ///
    /// Fails without applying anything on a version mismatch, a duplicate
    /// key, a unique name/abbreviation violation or a missing target.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
