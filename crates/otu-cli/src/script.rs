//! Replay scripts
//!
//! A script seeds references and then lists service operations in order.
//! Operations that create something may name the result with `as:` so
//! later steps can refer to it instead of the generated id.
//!
//! ```yaml
//! user: bob
//! references:
//!   - _id: hxn167
//!     name: Plant viruses
//! steps:
//!   - op: create
//!     reference: hxn167
//!     name: Tobacco mosaic virus
//!     as: tmv
//!   - op: add_isolate
//!     otu: tmv
//!     source_type: isolate
//!     source_name: A
//!     as: a
//! ```

use anyhow::Context;
use otu_model::{Reference, Segment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

fn default_user() -> String {
    "replay".to_string()
}

/// Parsed replay script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Acting user for every step
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse YAML (JSON is accepted too)
    ///
    /// # Errors
    /// Malformed documents or unknown operations
    pub fn from_yaml_str(source: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(source).context("invalid replay script")
    }

    /// Read and parse a script file
    ///
    /// # Errors
    /// Unreadable or malformed files
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_yaml_str(&source).with_context(|| format!("in {}", path.display()))
    }
}

/// One service operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        reference: String,
        name: String,
        #[serde(default)]
        abbreviation: String,
        #[serde(default)]
        schema: Vec<Segment>,
        #[serde(default, rename = "as")]
        label: Option<String>,
    },
    Edit {
        otu: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        abbreviation: Option<String>,
        #[serde(default)]
        schema: Option<Vec<Segment>>,
    },
    Remove {
        otu: String,
    },
    AddIsolate {
        otu: String,
        #[serde(default)]
        source_type: String,
        #[serde(default)]
        source_name: String,
        #[serde(default)]
        default: bool,
        #[serde(default, rename = "as")]
        label: Option<String>,
    },
    EditIsolate {
        otu: String,
        isolate: String,
        #[serde(default)]
        source_type: Option<String>,
        #[serde(default)]
        source_name: Option<String>,
    },
    SetDefaultIsolate {
        otu: String,
        isolate: String,
    },
    RemoveIsolate {
        otu: String,
        isolate: String,
    },
    CreateSequence {
        otu: String,
        isolate: String,
        accession: String,
        definition: String,
        #[serde(default)]
        host: String,
        sequence: String,
        #[serde(default)]
        segment: Option<String>,
    },
    EditSequence {
        otu: String,
        isolate: String,
        accession: String,
        #[serde(default)]
        definition: Option<String>,
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        sequence: Option<String>,
        #[serde(default)]
        segment: Option<String>,
    },
    RemoveSequence {
        otu: String,
        isolate: String,
        accession: String,
    },
}

impl Step {
    /// Operation name as written in scripts
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Edit { .. } => "edit",
            Self::Remove { .. } => "remove",
            Self::AddIsolate { .. } => "add_isolate",
            Self::EditIsolate { .. } => "edit_isolate",
            Self::SetDefaultIsolate { .. } => "set_default_isolate",
            Self::RemoveIsolate { .. } => "remove_isolate",
            Self::CreateSequence { .. } => "create_sequence",
            Self::EditSequence { .. } => "edit_sequence",
            Self::RemoveSequence { .. } => "remove_sequence",
        }
    }

    /// Label the step's result is stored under
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Create { label, .. } | Self::AddIsolate { label, .. } => label.as_deref(),
            _ => None,
        }
    }
}

/// `as:` names bound to generated ids
#[derive(Debug, Clone, Default)]
pub struct Labels {
    bound: HashMap<String, String>,
}

impl Labels {
    pub fn bind(&mut self, label: &str, id: impl Into<String>) {
        self.bound.insert(label.to_string(), id.into());
    }

    /// Id bound to `raw`, or `raw` itself when it is not a label
    #[must_use]
    pub fn resolve(&self, raw: &str) -> String {
        self.bound.get(raw).cloned().unwrap_or_else(|| raw.to_string())
    }
}
