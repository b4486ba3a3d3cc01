//! History recording
//!
//! Builds the write-once audit record for a mutation. Creation and removal
//! store a full snapshot of the new or old document; updates store the
//! structural diff between the two.

use crate::describe::Change;
use chrono::{DateTime, Utc};
use otu_model::{
    diff, ChangeId, HistoryDiff, HistoryRecord, IndexRef, JoinedOtu, ModelError, OtuStamp, UserId,
};

/// Before and after states of one mutation
#[derive(Debug, Clone, Copy)]
pub enum Transition<'a> {
    Created(&'a JoinedOtu),
    Updated {
        old: &'a JoinedOtu,
        new: &'a JoinedOtu,
    },
    Removed(&'a JoinedOtu),
}

impl Transition<'_> {
    /// Version the OTU reaches with this change
    #[must_use]
    pub fn version(&self) -> u64 {
        match *self {
            Self::Created(new) | Self::Updated { new, .. } => new.version,
            Self::Removed(old) => old.version + 1,
        }
    }

    fn subject(&self) -> &JoinedOtu {
        match *self {
            Self::Created(new) | Self::Updated { new, .. } => new,
            Self::Removed(old) => old,
        }
    }
}

/// Build a record stamped with the current time
///
/// # Errors
/// Returns [`ModelError::Document`] if a document cannot be serialized
pub fn record(
    change: &Change,
    transition: Transition<'_>,
    user: &UserId,
) -> Result<HistoryRecord, ModelError> {
    record_at(change, transition, user, Utc::now())
}

/// Build a record stamped with `at`
///
/// # Errors
/// Returns [`ModelError::Document`] if a document cannot be serialized
pub fn record_at(
    change: &Change,
    transition: Transition<'_>,
    user: &UserId,
    at: DateTime<Utc>,
) -> Result<HistoryRecord, ModelError> {
    let diff = match transition {
        Transition::Created(new) => HistoryDiff::Snapshot(new.to_document()?),
        Transition::Removed(old) => HistoryDiff::Snapshot(old.to_document()?),
        Transition::Updated { old, new } => {
            HistoryDiff::Changes(diff(&old.to_document()?, &new.to_document()?))
        }
    };

    let subject = transition.subject();
    let version = transition.version();

    Ok(HistoryRecord {
        id: ChangeId::for_version(&subject.id, version),
        method_name: change.method(),
        description: change.describe(),
        diff,
        otu: OtuStamp {
            id: subject.id.clone(),
            name: subject.name.clone(),
            version,
        },
        reference: subject.reference.clone(),
        index: IndexRef::unbuilt(),
        user: user.clone(),
        created_at: at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use otu_model::{apply, HistoryMethod, Otu, OtuId, RefId};
    use pretty_assertions::assert_eq;

    fn joined(version: u64, abbreviation: &str) -> JoinedOtu {
        let mut otu = Otu::new(OtuId::new("o1"), RefId::new("r1"), "Tobacco mosaic virus", abbreviation);
        otu.version = version;
        JoinedOtu::join(&otu, &[])
    }

    #[test]
    fn created_record_snapshots_new_document() {
        let new = joined(0, "");
        let change = Change::Create {
            name: new.name.clone(),
            abbreviation: String::new(),
        };
        let record = record(&change, Transition::Created(&new), &UserId::new("bob")).unwrap();

        assert_eq!(record.id.as_str(), "o1.0");
        assert_eq!(record.description, "Created Tobacco mosaic virus");
        assert_eq!(record.diff, HistoryDiff::Snapshot(new.to_document().unwrap()));
        assert!(record.index.is_unbuilt());
    }

    #[test]
    fn updated_record_diff_replays() {
        let old = joined(0, "");
        let new = joined(1, "TMV");
        let change = Change::Edit {
            name: None,
            abbreviation: Some("TMV".to_string()),
            old_abbreviation: String::new(),
            schema_changed: false,
        };
        let record = record(
            &change,
            Transition::Updated { old: &old, new: &new },
            &UserId::new("bob"),
        )
        .unwrap();

        assert_eq!(record.id.as_str(), "o1.1");
        assert_eq!(record.method_name, HistoryMethod::Edit);
        assert_eq!(record.description, "Added abbreviation TMV");

        let HistoryDiff::Changes(ops) = &record.diff else {
            panic!("expected change list");
        };
        assert_eq!(
            apply(&old.to_document().unwrap(), ops).unwrap(),
            new.to_document().unwrap()
        );
    }

    #[test]
    fn removed_record_uses_next_version() {
        let old = joined(4, "TMV");
        let change = Change::Remove {
            name: old.name.clone(),
            abbreviation: old.abbreviation.clone(),
        };
        let record = record(&change, Transition::Removed(&old), &UserId::new("bob")).unwrap();

        assert_eq!(record.id.as_str(), "o1.5");
        assert_eq!(record.otu.version, 5);
        assert_eq!(record.description, "Removed Tobacco mosaic virus (TMV)");
        assert_eq!(record.diff, HistoryDiff::Snapshot(old.to_document().unwrap()));
    }
}
