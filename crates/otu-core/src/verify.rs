//! Consistency checking
//!
//! An OTU is verified when [`verify`] finds no issues. The result is
//! persisted as the `verified` flag after every structural mutation.

use otu_model::{IsolateId, JoinedOtu, SequenceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Problem with the default isolate flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultIsolateIssue {
    /// Isolates exist but none is default
    Missing,
    /// More than one isolate is default
    Multiple,
}

/// Required segment without a sequence in one isolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingSegment {
    pub isolate_id: IsolateId,
    pub segment: String,
}

/// Structured summary of everything wrong with an OTU
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issues {
    /// OTU has no isolates
    pub empty_otu: bool,
    pub default_isolate: Option<DefaultIsolateIssue>,
    /// Isolates without sequences
    pub empty_isolates: Vec<IsolateId>,
    /// Sequences whose sequence text is empty
    pub empty_sequences: Vec<SequenceId>,
    /// Required schema segments missing per isolate
    pub missing_segments: Vec<MissingSegment>,
    /// Sequences naming a segment absent from the schema
    pub unknown_segments: Vec<SequenceId>,
}

impl Issues {
    /// Whether nothing was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.empty_otu
            && self.default_isolate.is_none()
            && self.empty_isolates.is_empty()
            && self.empty_sequences.is_empty()
            && self.missing_segments.is_empty()
            && self.unknown_segments.is_empty()
    }
}

/// Check a joined OTU; `None` means verified
#[must_use]
pub fn verify(otu: &JoinedOtu) -> Option<Issues> {
    let mut issues = Issues {
        empty_otu: otu.isolates.is_empty(),
        ..Issues::default()
    };

    let defaults = otu.isolates.iter().filter(|joined| joined.isolate.default).count();
    issues.default_isolate = match defaults {
        0 if !otu.isolates.is_empty() => Some(DefaultIsolateIssue::Missing),
        0 | 1 => None,
        _ => Some(DefaultIsolateIssue::Multiple),
    };

    let declared: HashSet<&str> = otu.schema.iter().map(|segment| segment.name.as_str()).collect();

    for joined in &otu.isolates {
        if joined.sequences.is_empty() {
            issues.empty_isolates.push(joined.isolate.id.clone());
        }

        for sequence in &joined.sequences {
            if sequence.sequence.is_empty() {
                issues.empty_sequences.push(sequence.id.clone());
            }
            if let Some(segment) = &sequence.segment {
                if !declared.contains(segment.as_str()) {
                    issues.unknown_segments.push(sequence.id.clone());
                }
            }
        }

        let present: HashSet<&str> = joined
            .sequences
            .iter()
            .filter_map(|sequence| sequence.segment.as_deref())
            .collect();

        issues.missing_segments.extend(
            otu.schema
                .iter()
                .filter(|segment| segment.required && !present.contains(segment.name.as_str()))
                .map(|segment| MissingSegment {
                    isolate_id: joined.isolate.id.clone(),
                    segment: segment.name.clone(),
                }),
        );
    }

    if issues.is_empty() {
        None
    } else {
        Some(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otu_model::{Isolate, JoinedIsolate, Otu, OtuId, RefId, Segment, Sequence};
    use pretty_assertions::assert_eq;

    fn sequence(id: &str, isolate: &str, segment: Option<&str>) -> Sequence {
        Sequence {
            id: SequenceId::new(id),
            otu_id: OtuId::new("o1"),
            isolate_id: IsolateId::new(isolate),
            reference: RefId::new("r1"),
            definition: "test".to_string(),
            host: String::new(),
            sequence: "ATGC".to_string(),
            segment: segment.map(str::to_string),
        }
    }

    fn joined(isolates: &[(&str, bool)], sequences: &[Sequence], schema: Vec<Segment>) -> JoinedOtu {
        let mut otu = Otu::new(OtuId::new("o1"), RefId::new("r1"), "Virus", "");
        otu.schema = schema;
        otu.isolates = isolates
            .iter()
            .map(|(id, default)| Isolate::new(IsolateId::new(*id), "isolate", *id, *default))
            .collect();
        JoinedOtu::join(&otu, sequences)
    }

    #[test]
    fn empty_otu() {
        let issues = verify(&joined(&[], &[], Vec::new())).unwrap();
        assert!(issues.empty_otu);
        assert_eq!(issues.default_isolate, None);
    }

    #[test]
    fn complete_otu_is_verified() {
        let otu = joined(&[("a", true)], &[sequence("s1", "a", None)], Vec::new());
        assert_eq!(verify(&otu), None);
    }

    #[test]
    fn default_flag_problems() {
        let none = joined(&[("a", false)], &[sequence("s1", "a", None)], Vec::new());
        assert_eq!(verify(&none).unwrap().default_isolate, Some(DefaultIsolateIssue::Missing));

        let mut two = joined(&[("a", true), ("b", true)], &[], Vec::new());
        two.isolates.push(JoinedIsolate {
            isolate: Isolate::new(IsolateId::new("c"), "", "", false),
            sequences: Vec::new(),
        });
        let issues = verify(&two).unwrap();
        assert_eq!(issues.default_isolate, Some(DefaultIsolateIssue::Multiple));
        assert_eq!(
            issues.empty_isolates,
            vec![IsolateId::new("a"), IsolateId::new("b"), IsolateId::new("c")]
        );
    }

    #[test]
    fn schema_segments() {
        let schema = vec![Segment::new("RNA1"), Segment::new("RNA2"), Segment::new("RNA3").optional()];
        let otu = joined(
            &[("a", true)],
            &[sequence("s1", "a", Some("RNA1")), sequence("s2", "a", Some("DNA A"))],
            schema,
        );

        let issues = verify(&otu).unwrap();
        assert_eq!(
            issues.missing_segments,
            vec![MissingSegment {
                isolate_id: IsolateId::new("a"),
                segment: "RNA2".to_string()
            }]
        );
        assert_eq!(issues.unknown_segments, vec![SequenceId::new("s2")]);
    }
}
