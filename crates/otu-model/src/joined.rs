//! Joined OTU documents
//!
//! A joined OTU embeds each isolate's sequences. This is the shape stored in
//! history diffs and returned to callers after formatting.

use crate::entity::{Isolate, Otu, Segment, Sequence};
use crate::error::ModelError;
use crate::ids::{OtuId, RefId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Isolate with its sequences embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedIsolate {
    #[serde(flatten)]
    pub isolate: Isolate,
    #[serde(default)]
    pub sequences: Vec<Sequence>,
}

/// OTU with all sequences embedded under their isolates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedOtu {
    #[serde(rename = "_id")]
    pub id: OtuId,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    pub lower_name: String,
    #[serde(with = "crate::serde_link")]
    pub reference: RefId,
    pub version: u64,
    pub verified: bool,
    #[serde(default)]
    pub last_indexed_version: Option<u64>,
    #[serde(default)]
    pub imported: bool,
    #[serde(default)]
    pub schema: Vec<Segment>,
    #[serde(default)]
    pub isolates: Vec<JoinedIsolate>,
}

impl JoinedOtu {
    /// Embed `sequences` under their isolates
    ///
    /// Sequences naming another OTU or an isolate the OTU does not have are
    /// dropped. Per-isolate order follows `sequences`.
    #[must_use]
    pub fn join(otu: &Otu, sequences: &[Sequence]) -> Self {
        let isolates = otu
            .isolates
            .iter()
            .map(|isolate| JoinedIsolate {
                isolate: isolate.clone(),
                sequences: sequences
                    .iter()
                    .filter(|sequence| sequence.belongs_to(&otu.id, &isolate.id))
                    .cloned()
                    .collect(),
            })
            .collect();

        Self {
            id: otu.id.clone(),
            name: otu.name.clone(),
            abbreviation: otu.abbreviation.clone(),
            lower_name: otu.lower_name.clone(),
            reference: otu.reference.clone(),
            version: otu.version,
            verified: otu.verified,
            last_indexed_version: otu.last_indexed_version,
            imported: otu.imported,
            schema: otu.schema.clone(),
            isolates,
        }
    }

    /// Separate back into the OTU document and its sequences
    #[must_use]
    pub fn split(&self) -> (Otu, Vec<Sequence>) {
        let otu = Otu {
            id: self.id.clone(),
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
            lower_name: self.lower_name.clone(),
            reference: self.reference.clone(),
            version: self.version,
            verified: self.verified,
            last_indexed_version: self.last_indexed_version,
            imported: self.imported,
            schema: self.schema.clone(),
            isolates: self.isolates.iter().map(|joined| joined.isolate.clone()).collect(),
        };
        let sequences = self.sequences().cloned().collect();
        (otu, sequences)
    }

    /// All embedded sequences in isolate order
    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.isolates.iter().flat_map(|joined| joined.sequences.iter())
    }

    /// Number of embedded sequences
    #[must_use]
    pub fn sequence_count(&self) -> usize {
        self.isolates.iter().map(|joined| joined.sequences.len()).sum()
    }

    /// Map to the stored JSON document
    ///
    /// # Errors
    /// Returns [`ModelError::Document`] if serialization fails
    pub fn to_document(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Map a stored JSON document back to typed form
    ///
    /// # Errors
    /// Returns [`ModelError::Document`] if the document is malformed
    pub fn from_document(document: Value) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{IsolateId, SequenceId};
    use pretty_assertions::assert_eq;

    fn otu() -> Otu {
        let mut otu = Otu::new(OtuId::new("o1"), RefId::new("r1"), "Tobacco mosaic virus", "TMV");
        otu.isolates.push(Isolate::new(IsolateId::new("i1"), "isolate", "A", true));
        otu.isolates.push(Isolate::new(IsolateId::new("i2"), "isolate", "B", false));
        otu
    }

    fn sequence(id: &str, otu_id: &str, isolate_id: &str) -> Sequence {
        Sequence {
            id: SequenceId::new(id),
            otu_id: OtuId::new(otu_id),
            isolate_id: IsolateId::new(isolate_id),
            reference: RefId::new("r1"),
            definition: "TMV genome".to_string(),
            host: String::new(),
            sequence: "ATGC".to_string(),
            segment: None,
        }
    }

    #[test]
    fn join_groups_by_isolate_and_drops_orphans() {
        let sequences = vec![
            sequence("s1", "o1", "i2"),
            sequence("s2", "o1", "i1"),
            sequence("s3", "o1", "missing"),
            sequence("s4", "other", "i1"),
        ];
        let joined = JoinedOtu::join(&otu(), &sequences);

        assert_eq!(joined.isolates[0].sequences, vec![sequence("s2", "o1", "i1")]);
        assert_eq!(joined.isolates[1].sequences, vec![sequence("s1", "o1", "i2")]);
        assert_eq!(joined.sequence_count(), 2);
    }

    #[test]
    fn document_embeds_isolate_fields_flat() {
        let joined = JoinedOtu::join(&otu(), &[sequence("s1", "o1", "i1")]);
        let document = joined.to_document().unwrap();

        let isolate = &document["isolates"][0];
        assert_eq!(isolate["id"], "i1");
        assert_eq!(isolate["default"], true);
        assert_eq!(isolate["sequences"][0]["_id"], "s1");
        assert_eq!(isolate["sequences"][0]["reference"], serde_json::json!({"id": "r1"}));

        assert_eq!(JoinedOtu::from_document(document).unwrap(), joined);
    }
}
