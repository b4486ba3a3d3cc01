//! Entity formatting
//!
//! Converts joined OTUs to the caller-facing view: `_id` becomes `id`,
//! internal fields (`lower_name`, sequence back-references) are dropped and
//! the most recent change and computed issues are attached.
//! [`OtuView::to_joined`] reverses the mapping.

use crate::verify::Issues;
use chrono::{DateTime, Utc};
use otu_model::{
    ChangeId, HistoryMethod, HistoryRecord, Isolate, IsolateId, JoinedIsolate, JoinedOtu, OtuId,
    RefId, Segment, Sequence, SequenceId, UserId,
};
use serde::{Deserialize, Serialize};

/// Sequence as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceView {
    pub id: SequenceId,
    pub definition: String,
    pub host: String,
    pub sequence: String,
    pub segment: Option<String>,
}

impl From<&Sequence> for SequenceView {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.id.clone(),
            definition: sequence.definition.clone(),
            host: sequence.host.clone(),
            sequence: sequence.sequence.clone(),
            segment: sequence.segment.clone(),
        }
    }
}

/// Isolate with its sequences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolateView {
    pub id: IsolateId,
    pub source_type: String,
    pub source_name: String,
    pub default: bool,
    pub sequences: Vec<SequenceView>,
}

impl From<&JoinedIsolate> for IsolateView {
    fn from(joined: &JoinedIsolate) -> Self {
        Self {
            id: joined.isolate.id.clone(),
            source_type: joined.isolate.source_type.clone(),
            source_name: joined.isolate.source_name.clone(),
            default: joined.isolate.default,
            sequences: joined.sequences.iter().map(SequenceView::from).collect(),
        }
    }
}

/// History record summary without its diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChange {
    pub id: ChangeId,
    pub method_name: HistoryMethod,
    pub description: String,
    #[serde(with = "otu_model::serde_link")]
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&HistoryRecord> for RecentChange {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: record.id.clone(),
            method_name: record.method_name,
            description: record.description.clone(),
            user: record.user.clone(),
            created_at: record.created_at,
        }
    }
}

/// OTU as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuView {
    pub id: OtuId,
    pub name: String,
    pub abbreviation: String,
    #[serde(with = "otu_model::serde_link")]
    pub reference: RefId,
    pub version: u64,
    pub verified: bool,
    pub last_indexed_version: Option<u64>,
    pub imported: bool,
    pub schema: Vec<Segment>,
    pub isolates: Vec<IsolateView>,
    pub most_recent_change: Option<RecentChange>,
    pub issues: Option<Issues>,
}

/// Build the caller-facing view of a joined OTU
#[must_use]
pub fn format_otu(
    joined: &JoinedOtu,
    most_recent_change: Option<RecentChange>,
    issues: Option<Issues>,
) -> OtuView {
    OtuView {
        id: joined.id.clone(),
        name: joined.name.clone(),
        abbreviation: joined.abbreviation.clone(),
        reference: joined.reference.clone(),
        version: joined.version,
        verified: joined.verified,
        last_indexed_version: joined.last_indexed_version,
        imported: joined.imported,
        schema: joined.schema.clone(),
        isolates: joined.isolates.iter().map(IsolateView::from).collect(),
        most_recent_change,
        issues,
    }
}

impl OtuView {
    /// Re-derive the stored joined shape
    #[must_use]
    pub fn to_joined(&self) -> JoinedOtu {
        let isolates = self
            .isolates
            .iter()
            .map(|view| JoinedIsolate {
                isolate: Isolate {
                    id: view.id.clone(),
                    source_type: view.source_type.clone(),
                    source_name: view.source_name.clone(),
                    default: view.default,
                },
                sequences: view
                    .sequences
                    .iter()
                    .map(|sequence| Sequence {
                        id: sequence.id.clone(),
                        otu_id: self.id.clone(),
                        isolate_id: view.id.clone(),
                        reference: self.reference.clone(),
                        definition: sequence.definition.clone(),
                        host: sequence.host.clone(),
                        sequence: sequence.sequence.clone(),
                        segment: sequence.segment.clone(),
                    })
                    .collect(),
            })
            .collect();

        JoinedOtu {
            id: self.id.clone(),
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
            lower_name: self.name.to_lowercase(),
            reference: self.reference.clone(),
            version: self.version,
            verified: self.verified,
            last_indexed_version: self.last_indexed_version,
            imported: self.imported,
            schema: self.schema.clone(),
            isolates,
        }
    }

    /// Find an isolate view by id
    #[must_use]
    pub fn isolate(&self, id: &IsolateId) -> Option<&IsolateView> {
        self.isolates.iter().find(|isolate| &isolate.id == id)
    }

    /// The default isolate view, if any
    #[must_use]
    pub fn default_isolate(&self) -> Option<&IsolateView> {
        self.isolates.iter().find(|isolate| isolate.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::verify;
    use otu_model::Otu;
    use pretty_assertions::assert_eq;

    fn joined() -> JoinedOtu {
        let mut otu = Otu::new(OtuId::new("o1"), RefId::new("r1"), "Prunus virus F", "PVF");
        otu.isolates.push(Isolate::new(IsolateId::new("i1"), "isolate", "8816-v2", true));
        let sequence = Sequence {
            id: SequenceId::new("KX269872"),
            otu_id: otu.id.clone(),
            isolate_id: IsolateId::new("i1"),
            reference: otu.reference.clone(),
            definition: "Prunus virus F isolate 8816-s2 segment RNA2".to_string(),
            host: "sweet cherry".to_string(),
            sequence: "TGTTTAAGAGATTAAACAACCGCTTTC".to_string(),
            segment: None,
        };
        JoinedOtu::join(&otu, &[sequence])
    }

    #[test]
    fn view_strips_internal_fields() {
        let view = format_otu(&joined(), None, None);
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["id"], "o1");
        assert!(value.get("_id").is_none());
        assert!(value.get("lower_name").is_none());

        let sequence = &value["isolates"][0]["sequences"][0];
        assert_eq!(sequence["id"], "KX269872");
        assert!(sequence.get("otu_id").is_none());
        assert!(sequence.get("isolate_id").is_none());
        assert!(sequence.get("reference").is_none());
        assert_eq!(value["most_recent_change"], serde_json::Value::Null);
    }

    #[test]
    fn view_round_trips_to_joined() {
        let original = joined();
        let view = format_otu(&original, None, verify(&original));
        assert_eq!(view.to_joined(), original);
    }
}
