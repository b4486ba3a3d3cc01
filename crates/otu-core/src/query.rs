//! Find queries and their results

use otu_model::{Otu, OtuId, RefId};
use serde::{Deserialize, Serialize};

/// OTU search parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindQuery {
    /// Case-insensitive literal matched against name and abbreviation
    pub term: Option<String>,
    pub verified: Option<bool>,
    /// Return every match as `{id, name}` without paging
    pub names: bool,
    pub reference: Option<RefId>,
    /// 1-based page number
    pub page: usize,
    pub per_page: Option<usize>,
}

impl FindQuery {
    /// Query matching everything, first page
    #[must_use]
    pub fn new() -> Self {
        Self {
            page: 1,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    #[inline]
    #[must_use]
    pub fn in_reference(mut self, reference: RefId) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Ask for names only
    #[inline]
    #[must_use]
    pub fn names_only(mut self) -> Self {
        self.names = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_page(mut self, page: usize, per_page: usize) -> Self {
        self.page = page;
        self.per_page = Some(per_page);
        self
    }
}

/// Short OTU form used in listings and notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuSummary {
    pub id: OtuId,
    pub name: String,
    pub abbreviation: String,
    pub verified: bool,
    pub version: u64,
}

impl From<&Otu> for OtuSummary {
    fn from(otu: &Otu) -> Self {
        Self {
            id: otu.id.clone(),
            name: otu.name.clone(),
            abbreviation: otu.abbreviation.clone(),
            verified: otu.verified,
            version: otu.version,
        }
    }
}

/// Id and name pair returned by a names-only query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuName {
    pub id: OtuId,
    pub name: String,
}

impl From<&Otu> for OtuName {
    fn from(otu: &Otu) -> Self {
        Self {
            id: otu.id.clone(),
            name: otu.name.clone(),
        }
    }
}

/// One page of matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuPage {
    pub documents: Vec<OtuSummary>,
    /// Matches for the query
    pub found_count: usize,
    /// OTUs in scope before term and verified filtering
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
    pub page_count: usize,
}

/// Result of [`crate::OtuService::find`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindResult {
    Names(Vec<OtuName>),
    Page(OtuPage),
}
