//! OTU, isolate, sequence and reference entities
//!
//! These are the persisted shapes. Field renames (`_id`, `{"id": ..}` links)
//! make `serde_json::to_value` produce the stored document directly.

use crate::error::ModelError;
use crate::ids::{IsolateId, OtuId, RefId, SequenceId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Molecule type of a genome segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Molecule {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "ssDNA")]
    SsDna,
    #[serde(rename = "dsDNA")]
    DsDna,
    #[serde(rename = "ssRNA")]
    SsRna,
    #[serde(rename = "ssRNA+")]
    SsRnaPositive,
    #[serde(rename = "ssRNA-")]
    SsRnaNegative,
    #[serde(rename = "dsRNA")]
    DsRna,
}

impl Molecule {
    /// Stored string form
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::SsDna => "ssDNA",
            Self::DsDna => "dsDNA",
            Self::SsRna => "ssRNA",
            Self::SsRnaPositive => "ssRNA+",
            Self::SsRnaNegative => "ssRNA-",
            Self::DsRna => "dsRNA",
        }
    }
}

impl Display for Molecule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Molecule {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Unspecified),
            "ssDNA" => Ok(Self::SsDna),
            "dsDNA" => Ok(Self::DsDna),
            "ssRNA" => Ok(Self::SsRna),
            "ssRNA+" => Ok(Self::SsRnaPositive),
            "ssRNA-" => Ok(Self::SsRnaNegative),
            "dsRNA" => Ok(Self::DsRna),
            other => Err(ModelError::UnknownMolecule(other.to_string())),
        }
    }
}

fn required_default() -> bool {
    true
}

/// Declared genome segment in an OTU schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    #[serde(default = "required_default")]
    pub required: bool,
    #[serde(default)]
    pub molecule: Molecule,
}

impl Segment {
    /// Required segment with unspecified molecule
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            molecule: Molecule::Unspecified,
        }
    }

    /// Mark as optional
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set molecule type
    #[inline]
    #[must_use]
    pub fn with_molecule(mut self, molecule: Molecule) -> Self {
        self.molecule = molecule;
        self
    }
}

/// Check segment names are non-empty and unique
///
/// # Errors
/// Returns the first empty or repeated name
pub fn validate_schema(schema: &[Segment]) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for segment in schema {
        if segment.name.trim().is_empty() {
            return Err(ModelError::EmptySegmentName);
        }
        if !seen.insert(segment.name.as_str()) {
            return Err(ModelError::DuplicateSegment(segment.name.clone()));
        }
    }
    Ok(())
}

/// Reference collection scoping OTU names and source types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_id")]
    pub id: RefId,
    pub name: String,
    #[serde(default)]
    pub restrict_source_types: bool,
    #[serde(default)]
    pub source_types: Vec<String>,
}

impl Reference {
    /// Unrestricted reference
    #[inline]
    #[must_use]
    pub fn new(id: RefId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            restrict_source_types: false,
            source_types: Vec::new(),
        }
    }

    /// Restrict isolate source types to `allowed`
    #[must_use]
    pub fn restricted_to<I, T>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.restrict_source_types = true;
        self.source_types = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// Whether an isolate may use `source_type` (already lower-cased)
    ///
    /// Empty and `unknown` source types are always accepted.
    #[must_use]
    pub fn allows_source_type(&self, source_type: &str) -> bool {
        if source_type.is_empty() || source_type == "unknown" || !self.restrict_source_types {
            return true;
        }
        self.source_types.iter().any(|allowed| allowed == source_type)
    }
}

/// Isolate embedded in an OTU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Isolate {
    pub id: IsolateId,
    pub source_type: String,
    pub source_name: String,
    pub default: bool,
}

impl Isolate {
    /// Create isolate; source type is stored lower-cased
    #[must_use]
    pub fn new(
        id: IsolateId,
        source_type: impl AsRef<str>,
        source_name: impl Into<String>,
        default: bool,
    ) -> Self {
        Self {
            id,
            source_type: source_type.as_ref().to_lowercase(),
            source_name: source_name.into(),
            default,
        }
    }

    /// Display name, falling back to the owning OTU's name
    #[inline]
    #[must_use]
    pub fn display_name(&self, otu_name: &str) -> String {
        isolate_display_name(&self.source_type, &self.source_name, otu_name)
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"{Source type} {source name}"`, or the OTU name when both are empty
#[must_use]
pub fn isolate_display_name(source_type: &str, source_name: &str, otu_name: &str) -> String {
    match (source_type.is_empty(), source_name.is_empty()) {
        (true, true) => otu_name.to_string(),
        (false, true) => title_case(source_type),
        (true, false) => source_name.to_string(),
        (false, false) => format!("{} {}", title_case(source_type), source_name),
    }
}

/// Operational taxonomic unit
///
/// # Invariants
/// - `lower_name == name.to_lowercase()`
/// - when `isolates` is non-empty exactly one isolate is default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otu {
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
    pub isolates: Vec<Isolate>,
}

impl Otu {
    /// Fresh OTU at version 0 with no isolates
    #[must_use]
    pub fn new(
        id: OtuId,
        reference: RefId,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            lower_name: name.to_lowercase(),
            name,
            abbreviation: abbreviation.into(),
            reference,
            version: 0,
            verified: false,
            last_indexed_version: None,
            imported: false,
            schema: Vec::new(),
            isolates: Vec::new(),
        }
    }

    /// Rename, keeping `lower_name` in step
    #[inline]
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.lower_name = self.name.to_lowercase();
    }

    /// Find isolate by id
    #[must_use]
    pub fn isolate(&self, id: &IsolateId) -> Option<&Isolate> {
        self.isolates.iter().find(|isolate| &isolate.id == id)
    }

    /// Find isolate by id, mutably
    pub fn isolate_mut(&mut self, id: &IsolateId) -> Option<&mut Isolate> {
        self.isolates.iter_mut().find(|isolate| &isolate.id == id)
    }

    /// The default isolate, if any
    #[must_use]
    pub fn default_isolate(&self) -> Option<&Isolate> {
        self.isolates.iter().find(|isolate| isolate.default)
    }

    /// Whether the schema declares `segment`
    #[must_use]
    pub fn has_segment(&self, segment: &str) -> bool {
        self.schema.iter().any(|declared| declared.name == segment)
    }

    /// Display name of an isolate of this OTU
    #[inline]
    #[must_use]
    pub fn isolate_name(&self, isolate: &Isolate) -> String {
        isolate.display_name(&self.name)
    }
}

/// Genomic sequence record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(rename = "_id")]
    pub id: SequenceId,
    pub otu_id: OtuId,
    pub isolate_id: IsolateId,
    #[serde(with = "crate::serde_link")]
    pub reference: RefId,
    pub definition: String,
    #[serde(default)]
    pub host: String,
    pub sequence: String,
    #[serde(default)]
    pub segment: Option<String>,
}

impl Sequence {
    /// Whether this sequence belongs to the given OTU isolate
    #[inline]
    #[must_use]
    pub fn belongs_to(&self, otu_id: &OtuId, isolate_id: &IsolateId) -> bool {
        &self.otu_id == otu_id && &self.isolate_id == isolate_id
    }
}

/// Strip all whitespace (including newlines) from raw sequence text
#[must_use]
pub fn clean_sequence(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn otu_document_shape() {
        let mut otu = Otu::new(OtuId::new("6116cba1"), RefId::new("hxn167"), "Prunus virus F", "PVF");
        otu.isolates.push(Isolate::new(IsolateId::new("cab8b360"), "Isolate", "8816-v2", true));

        let value = serde_json::to_value(&otu).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "_id": "6116cba1",
                "name": "Prunus virus F",
                "abbreviation": "PVF",
                "lower_name": "prunus virus f",
                "reference": {"id": "hxn167"},
                "version": 0,
                "verified": false,
                "last_indexed_version": null,
                "imported": false,
                "schema": [],
                "isolates": [{
                    "id": "cab8b360",
                    "source_type": "isolate",
                    "source_name": "8816-v2",
                    "default": true
                }]
            })
        );
    }

    #[test]
    fn set_name_updates_lower_name() {
        let mut otu = Otu::new(OtuId::new("a"), RefId::new("r"), "Tobacco mosaic virus", "");
        otu.set_name("Tomato Mosaic Virus");
        assert_eq!(otu.lower_name, "tomato mosaic virus");
    }

    #[test]
    fn display_names() {
        assert_eq!(isolate_display_name("isolate", "8816-v2", "PVF"), "Isolate 8816-v2");
        assert_eq!(isolate_display_name("", "", "Prunus virus F"), "Prunus virus F");
        assert_eq!(isolate_display_name("strain", "", "x"), "Strain");
        assert_eq!(isolate_display_name("", "A", "x"), "A");
        assert_eq!(isolate_display_name("field isolate", "b", "x"), "Field Isolate b");
    }

    #[test]
    fn segment_defaults_on_deserialize() {
        let segment: Segment = serde_json::from_value(serde_json::json!({"name": "RNA1"})).unwrap();
        assert!(segment.required);
        assert_eq!(segment.molecule, Molecule::Unspecified);
    }

    #[test]
    fn schema_validation() {
        assert!(validate_schema(&[Segment::new("RNA1"), Segment::new("RNA2")]).is_ok());
        assert!(matches!(
            validate_schema(&[Segment::new("RNA1"), Segment::new("RNA1")]),
            Err(ModelError::DuplicateSegment(name)) if name == "RNA1"
        ));
        assert!(matches!(
            validate_schema(&[Segment::new(" ")]),
            Err(ModelError::EmptySegmentName)
        ));
    }

    #[test]
    fn molecule_parsing() {
        assert_eq!("ssRNA+".parse::<Molecule>().unwrap(), Molecule::SsRnaPositive);
        assert!("RNA".parse::<Molecule>().is_err());
        assert_eq!(
            serde_json::to_value(Molecule::DsDna).unwrap(),
            serde_json::json!("dsDNA")
        );
    }

    #[test]
    fn source_type_restrictions() {
        let open = Reference::new(RefId::new("r"), "Plant viruses");
        assert!(open.allows_source_type("anything"));

        let restricted = open.restricted_to(["isolate", "strain"]);
        assert!(restricted.allows_source_type("isolate"));
        assert!(restricted.allows_source_type(""));
        assert!(restricted.allows_source_type("unknown"));
        assert!(!restricted.allows_source_type("variant"));
    }

    #[test]
    fn clean_sequence_strips_whitespace() {
        assert_eq!(clean_sequence("ATG C\nGT\r\nA "), "ATGCGTA");
    }
}
