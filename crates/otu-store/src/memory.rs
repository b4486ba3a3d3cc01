//! In-memory store
//!
//! Collections live in insertion-ordered maps behind one lock. A commit
//! validates the whole batch under the write lock before touching anything,
//! so a failed batch leaves no trace.

use crate::batch::{OtuWrite, SequenceWrite, WriteBatch};
use crate::error::{Collection, StoreError, UniqueField};
use crate::filter::{HistoryFilter, OtuFilter, SequenceFilter};
use crate::port::OtuStore;
use async_trait::async_trait;
use indexmap::IndexMap;
use otu_model::{ChangeId, HistoryRecord, Otu, OtuId, RefId, Reference, Sequence, SequenceId};
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Collections {
    references: IndexMap<RefId, Reference>,
    otus: IndexMap<OtuId, Otu>,
    sequences: IndexMap<SequenceId, Sequence>,
    history: IndexMap<ChangeId, HistoryRecord>,
}

impl Collections {
    fn unique_violation(&self, candidate: &Otu) -> Option<UniqueField> {
        let mut name = false;
        let mut abbreviation = false;

        for other in self
            .otus
            .values()
            .filter(|other| other.id != candidate.id && other.reference == candidate.reference)
        {
            name |= other.lower_name == candidate.lower_name;
            abbreviation |=
                !candidate.abbreviation.is_empty() && other.abbreviation == candidate.abbreviation;
        }

        match (name, abbreviation) {
            (true, true) => Some(UniqueField::NameAndAbbreviation),
            (true, false) => Some(UniqueField::Name),
            (false, true) => Some(UniqueField::Abbreviation),
            (false, false) => None,
        }
    }

    fn check_version(&self, id: &OtuId, expected: u64) -> Result<(), StoreError> {
        let stored = self
            .otus
            .get(id)
            .ok_or_else(|| StoreError::missing(Collection::Otus, id))?;
        if stored.version != expected {
            return Err(StoreError::VersionMismatch {
                id: id.clone(),
                expected,
                actual: stored.version,
            });
        }
        Ok(())
    }

    fn check_otu_write(&self, write: &OtuWrite) -> Result<(), StoreError> {
        let candidate = match write {
            OtuWrite::Insert(otu) => {
                if self.otus.contains_key(&otu.id) {
                    return Err(StoreError::duplicate(Collection::Otus, &otu.id));
                }
                otu
            }
            OtuWrite::Replace {
                otu,
                expected_version,
            } => {
                self.check_version(&otu.id, *expected_version)?;
                otu
            }
            OtuWrite::Delete {
                id,
                expected_version,
            } => return self.check_version(id, *expected_version),
        };

        match self.unique_violation(candidate) {
            Some(field) => Err(StoreError::UniqueViolation {
                field,
                reference: candidate.reference.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_sequence_writes(&self, writes: &[SequenceWrite]) -> Result<(), StoreError> {
        let mut inserted = HashSet::new();

        for write in writes {
            match write {
                SequenceWrite::Insert(sequence) => {
                    if self.sequences.contains_key(&sequence.id) || !inserted.insert(&sequence.id) {
                        return Err(StoreError::duplicate(Collection::Sequences, &sequence.id));
                    }
                }
                SequenceWrite::Replace(sequence) => {
                    if !self.sequences.contains_key(&sequence.id) && !inserted.contains(&sequence.id) {
                        return Err(StoreError::missing(Collection::Sequences, &sequence.id));
                    }
                }
                SequenceWrite::Delete(id) => {
                    if !self.sequences.contains_key(id) && !inserted.contains(id) {
                        return Err(StoreError::missing(Collection::Sequences, id));
                    }
                }
                SequenceWrite::DeleteForOtu(_) => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, batch: WriteBatch) {
        match batch.otu {
            OtuWrite::Insert(otu) | OtuWrite::Replace { otu, .. } => {
                self.otus.insert(otu.id.clone(), otu);
            }
            OtuWrite::Delete { id, .. } => {
                self.otus.shift_remove(&id);
            }
        }

        for write in batch.sequences {
            match write {
                SequenceWrite::Insert(sequence) | SequenceWrite::Replace(sequence) => {
                    self.sequences.insert(sequence.id.clone(), sequence);
                }
                SequenceWrite::Delete(id) => {
                    self.sequences.shift_remove(&id);
                }
                SequenceWrite::DeleteForOtu(otu_id) => {
                    self.sequences.retain(|_, sequence| sequence.otu_id != otu_id);
                }
            }
        }

        self.history.insert(batch.history.id.clone(), batch.history);
    }
}

/// Store holding every collection in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `references`
    #[must_use]
    pub fn with_references(references: impl IntoIterator<Item = Reference>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for reference in references {
                inner.references.insert(reference.id.clone(), reference);
            }
        }
        store
    }

    /// Number of stored history records
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.read().history.len()
    }
}

#[async_trait]
impl OtuStore for MemoryStore {
    async fn get_reference(&self, id: &RefId) -> Result<Option<Reference>, StoreError> {
        Ok(self.inner.read().references.get(id).cloned())
    }

    async fn insert_reference(&self, reference: Reference) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.references.contains_key(&reference.id) {
            return Err(StoreError::duplicate(Collection::References, &reference.id));
        }
        inner.references.insert(reference.id.clone(), reference);
        Ok(())
    }

    async fn get_otu(&self, id: &OtuId) -> Result<Option<Otu>, StoreError> {
        Ok(self.inner.read().otus.get(id).cloned())
    }

    async fn find_otus(&self, filter: &OtuFilter) -> Result<Vec<Otu>, StoreError> {
        Ok(self
            .inner
            .read()
            .otus
            .values()
            .filter(|otu| filter.matches(otu))
            .cloned()
            .collect())
    }

    async fn count_otus(&self, filter: &OtuFilter) -> Result<usize, StoreError> {
        Ok(self.inner.read().otus.values().filter(|otu| filter.matches(otu)).count())
    }

    async fn get_sequence(&self, id: &SequenceId) -> Result<Option<Sequence>, StoreError> {
        Ok(self.inner.read().sequences.get(id).cloned())
    }

    async fn find_sequences(&self, filter: &SequenceFilter) -> Result<Vec<Sequence>, StoreError> {
        Ok(self
            .inner
            .read()
            .sequences
            .values()
            .filter(|sequence| filter.matches(sequence))
            .cloned()
            .collect())
    }

    async fn count_sequences(&self, filter: &SequenceFilter) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .read()
            .sequences
            .values()
            .filter(|sequence| filter.matches(sequence))
            .count())
    }

    async fn get_history(&self, id: &ChangeId) -> Result<Option<HistoryRecord>, StoreError> {
        Ok(self.inner.read().history.get(id).cloned())
    }

    async fn find_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, StoreError> {
        let mut records: Vec<HistoryRecord> = self
            .inner
            .read()
            .history
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by_key(HistoryRecord::version);
        Ok(records)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        inner.check_otu_write(&batch.otu)?;
        inner.check_sequence_writes(&batch.sequences)?;
        if inner.history.contains_key(&batch.history.id) {
            return Err(StoreError::duplicate(Collection::History, &batch.history.id));
        }

        tracing::debug!(
            otu_id = %batch.otu_id(),
            change_id = %batch.history.id,
            sequence_writes = batch.sequences.len(),
            "committing batch"
        );
        inner.apply(batch);
        Ok(())
    }
}
