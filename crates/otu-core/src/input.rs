//! Mutation inputs
//!
//! Patches carry only the fields to change; `None` leaves a field alone.

use otu_model::Segment;
use serde::{Deserialize, Serialize};

/// Changes to an OTU's own fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtuPatch {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub schema: Option<Vec<Segment>>,
}

impl OtuPatch {
    #[inline]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn schema(mut self, schema: Vec<Segment>) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Changes to an isolate's source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolatePatch {
    pub source_type: Option<String>,
    pub source_name: Option<String>,
}

impl IsolatePatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_type.is_none() && self.source_name.is_none()
    }
}

/// A sequence to add to an isolate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSequence {
    /// Accession, used as the sequence id
    pub accession: String,
    pub definition: String,
    #[serde(default)]
    pub host: String,
    pub sequence: String,
    #[serde(default)]
    pub segment: Option<String>,
}

impl NewSequence {
    /// Sequence without host or segment
    #[must_use]
    pub fn new(
        accession: impl Into<String>,
        definition: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            accession: accession.into(),
            definition: definition.into(),
            host: String::new(),
            sequence: sequence.into(),
            segment: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }
}

/// Changes to a sequence
///
/// An empty `segment` string clears the segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencePatch {
    pub definition: Option<String>,
    pub host: Option<String>,
    pub sequence: Option<String>,
    pub segment: Option<String>,
}

impl SequencePatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definition.is_none() && self.host.is_none() && self.sequence.is_none() && self.segment.is_none()
    }
}
