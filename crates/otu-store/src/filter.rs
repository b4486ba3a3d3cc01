//! Query filters
//!
//! Every set field must match (logical AND). Unset fields match anything.

use otu_model::{HistoryRecord, IsolateId, Otu, OtuId, RefId, Sequence};
use regex::Regex;

/// Filter over OTU documents
#[derive(Debug, Clone, Default)]
pub struct OtuFilter {
    /// Owning reference
    pub reference: Option<RefId>,
    /// Exact lower-cased name
    pub lower_name: Option<String>,
    /// Exact abbreviation
    pub abbreviation: Option<String>,
    /// OTU to leave out (the one being edited)
    pub exclude: Option<OtuId>,
    /// Verified flag
    pub verified: Option<bool>,
    /// Pattern tested against name and abbreviation
    pub pattern: Option<Regex>,
}

impl OtuFilter {
    /// Empty filter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one reference
    #[inline]
    #[must_use]
    pub fn in_reference(mut self, reference: RefId) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Case-insensitive name match
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.lower_name = Some(name.to_lowercase());
        self
    }

    /// Exact abbreviation match
    #[inline]
    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    /// Leave out one OTU
    #[inline]
    #[must_use]
    pub fn excluding(mut self, id: OtuId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// Verified flag match
    #[inline]
    #[must_use]
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    /// Name-or-abbreviation pattern
    #[inline]
    #[must_use]
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Whether `otu` passes the filter
    #[must_use]
    pub fn matches(&self, otu: &Otu) -> bool {
        if self.reference.as_ref().is_some_and(|reference| reference != &otu.reference) {
            return false;
        }
        if self.lower_name.as_ref().is_some_and(|name| name != &otu.lower_name) {
            return false;
        }
        if self
            .abbreviation
            .as_ref()
            .is_some_and(|abbreviation| abbreviation != &otu.abbreviation)
        {
            return false;
        }
        if self.exclude.as_ref().is_some_and(|id| id == &otu.id) {
            return false;
        }
        if self.verified.is_some_and(|verified| verified != otu.verified) {
            return false;
        }
        match &self.pattern {
            Some(pattern) => pattern.is_match(&otu.name) || pattern.is_match(&otu.abbreviation),
            None => true,
        }
    }
}

/// Filter over sequence documents
#[derive(Debug, Clone, Default)]
pub struct SequenceFilter {
    /// Owning OTU
    pub otu_id: Option<OtuId>,
    /// Owning isolate
    pub isolate_id: Option<IsolateId>,
}

impl SequenceFilter {
    /// All sequences of an OTU
    #[must_use]
    pub fn for_otu(otu_id: OtuId) -> Self {
        Self {
            otu_id: Some(otu_id),
            isolate_id: None,
        }
    }

    /// All sequences of one isolate
    #[must_use]
    pub fn for_isolate(otu_id: OtuId, isolate_id: IsolateId) -> Self {
        Self {
            otu_id: Some(otu_id),
            isolate_id: Some(isolate_id),
        }
    }

    /// Whether `sequence` passes the filter
    #[must_use]
    pub fn matches(&self, sequence: &Sequence) -> bool {
        self.otu_id.as_ref().map_or(true, |id| id == &sequence.otu_id)
            && self.isolate_id.as_ref().map_or(true, |id| id == &sequence.isolate_id)
    }
}

/// Filter over history records
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// OTU the records describe
    pub otu_id: Option<OtuId>,
    /// Reference the OTU belonged to
    pub reference: Option<RefId>,
}

impl HistoryFilter {
    /// All records of one OTU
    #[must_use]
    pub fn for_otu(otu_id: OtuId) -> Self {
        Self {
            otu_id: Some(otu_id),
            reference: None,
        }
    }

    /// Whether `record` passes the filter
    #[must_use]
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        self.otu_id.as_ref().map_or(true, |id| id == &record.otu.id)
            && self.reference.as_ref().map_or(true, |id| id == &record.reference)
    }
}
