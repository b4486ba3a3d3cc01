//! Change descriptions
//!
//! Every history record carries a human-readable description. Each
//! [`Change`] variant knows its history method and how to phrase itself.

use otu_model::HistoryMethod;

/// A described mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Create {
        name: String,
        abbreviation: String,
    },
    Edit {
        /// New name, when it changed
        name: Option<String>,
        /// New abbreviation, when it changed
        abbreviation: Option<String>,
        old_abbreviation: String,
        schema_changed: bool,
    },
    Remove {
        name: String,
        abbreviation: String,
    },
    AddIsolate {
        isolate_name: String,
        default: bool,
    },
    EditIsolate {
        old_name: String,
        new_name: String,
    },
    SetAsDefault {
        isolate_name: String,
    },
    RemoveIsolate {
        isolate_name: String,
        /// Isolate that became default in its place
        promoted: Option<String>,
    },
    CreateSequence {
        accession: String,
        isolate_name: String,
    },
    EditSequence {
        accession: String,
        isolate_name: String,
    },
    RemoveSequence {
        accession: String,
        isolate_name: String,
    },
}

fn with_abbreviation(verb: &str, name: &str, abbreviation: &str) -> String {
    if abbreviation.is_empty() {
        format!("{verb} {name}")
    } else {
        format!("{verb} {name} ({abbreviation})")
    }
}

impl Change {
    /// History method recorded for this change
    #[must_use]
    pub fn method(&self) -> HistoryMethod {
        match self {
            Self::Create { .. } => HistoryMethod::Create,
            Self::Edit { .. } => HistoryMethod::Edit,
            Self::Remove { .. } => HistoryMethod::Remove,
            Self::AddIsolate { .. } => HistoryMethod::AddIsolate,
            Self::EditIsolate { .. } => HistoryMethod::EditIsolate,
            Self::SetAsDefault { .. } => HistoryMethod::SetAsDefault,
            Self::RemoveIsolate { .. } => HistoryMethod::RemoveIsolate,
            Self::CreateSequence { .. } => HistoryMethod::CreateSequence,
            Self::EditSequence { .. } => HistoryMethod::EditSequence,
            Self::RemoveSequence { .. } => HistoryMethod::RemoveSequence,
        }
    }

    /// Human-readable description
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Create { name, abbreviation } => with_abbreviation("Created", name, abbreviation),
            Self::Edit {
                name,
                abbreviation,
                old_abbreviation,
                schema_changed,
            } => compose_edit_description(
                name.as_deref(),
                abbreviation.as_deref(),
                old_abbreviation,
                *schema_changed,
            ),
            Self::Remove { name, abbreviation } => with_abbreviation("Removed", name, abbreviation),
            Self::AddIsolate {
                isolate_name,
                default,
            } => {
                if *default {
                    format!("Added {isolate_name} as default")
                } else {
                    format!("Added {isolate_name}")
                }
            }
            Self::EditIsolate { old_name, new_name } => format!("Renamed {old_name} to {new_name}"),
            Self::SetAsDefault { isolate_name } => format!("Set {isolate_name} as default"),
            Self::RemoveIsolate {
                isolate_name,
                promoted,
            } => match promoted {
                Some(promoted) => format!("Removed {isolate_name} and set {promoted} as default"),
                None => format!("Removed {isolate_name}"),
            },
            Self::CreateSequence {
                accession,
                isolate_name,
            } => format!("Created new sequence {accession} in {isolate_name}"),
            Self::EditSequence {
                accession,
                isolate_name,
            } => format!("Edited sequence {accession} in {isolate_name}"),
            Self::RemoveSequence {
                accession,
                isolate_name,
            } => format!("Removed sequence {accession} from {isolate_name}"),
        }
    }
}

fn capitalize_first(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Describe an OTU edit
///
/// `name` and `abbreviation` are the new values of fields that changed.
/// A schema change on its own produces an empty description.
#[must_use]
pub fn compose_edit_description(
    name: Option<&str>,
    abbreviation: Option<&str>,
    old_abbreviation: &str,
    _schema_changed: bool,
) -> String {
    let name_clause = name.map(|name| format!("Changed name to {name}"));

    let abbreviation_clause = abbreviation.map(|abbreviation| {
        if abbreviation.is_empty() && !old_abbreviation.is_empty() {
            format!("removed abbreviation {old_abbreviation}")
        } else if old_abbreviation.is_empty() {
            format!("added abbreviation {abbreviation}")
        } else {
            format!("changed abbreviation to {abbreviation}")
        }
    });

    match (name_clause, abbreviation_clause) {
        (Some(name), Some(abbreviation)) => format!("{name} and {abbreviation}"),
        (Some(name), None) => name,
        (None, Some(abbreviation)) => capitalize_first(&abbreviation),
        (None, None) => String::new(),
    }
}
