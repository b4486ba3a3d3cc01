//! History record types
//!
//! One record is written per committed mutation and never updated.

use crate::diff::DiffOp;
use crate::ids::{OtuId, RefId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Kind of mutation a history record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMethod {
    Create,
    Edit,
    Remove,
    AddIsolate,
    EditIsolate,
    SetAsDefault,
    RemoveIsolate,
    CreateSequence,
    EditSequence,
    RemoveSequence,
}

impl HistoryMethod {
    /// Stored method name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Remove => "remove",
            Self::AddIsolate => "add_isolate",
            Self::EditIsolate => "edit_isolate",
            Self::SetAsDefault => "set_as_default",
            Self::RemoveIsolate => "remove_isolate",
            Self::CreateSequence => "create_sequence",
            Self::EditSequence => "edit_sequence",
            Self::RemoveSequence => "remove_sequence",
        }
    }
}

impl Display for HistoryMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// History record id, `{otu_id}.{version}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    /// Id of the record produced when `otu` reached `version`
    #[must_use]
    pub fn for_version(otu: &OtuId, version: u64) -> Self {
        Self(format!("{otu}.{version}"))
    }

    /// Wrap an existing id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index build a change was included in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRef {
    pub id: String,
    pub version: String,
}

impl IndexRef {
    /// Placeholder for changes not yet part of any index build
    #[must_use]
    pub fn unbuilt() -> Self {
        Self {
            id: "unbuilt".to_string(),
            version: "unbuilt".to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_unbuilt(&self) -> bool {
        self.id == "unbuilt"
    }
}

/// Stored diff: a change list, or a full snapshot for creation and removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryDiff {
    Changes(Vec<DiffOp>),
    Snapshot(Value),
}

/// OTU summary embedded in a history record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtuStamp {
    pub id: OtuId,
    pub name: String,
    pub version: u64,
}

/// Write-once audit record of one committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "_id")]
    pub id: ChangeId,
    pub method_name: HistoryMethod,
    pub description: String,
    pub diff: HistoryDiff,
    pub otu: OtuStamp,
    #[serde(with = "crate::serde_link")]
    pub reference: RefId,
    pub index: IndexRef,
    #[serde(with = "crate::serde_link")]
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Version the OTU reached with this change
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.otu.version
    }
}
