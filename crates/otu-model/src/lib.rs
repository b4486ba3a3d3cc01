//! OTU Model
//!
//! Typed entities for the OTU reference registry plus the mapping layer to
//! and from the persisted document shape.
//!
//! # Core Concepts
//!
//! - [`Otu`]: a named taxonomic unit owning an ordered list of [`Isolate`]s
//! - [`Sequence`]: a genomic record keyed by accession, owned by one isolate
//! - [`JoinedOtu`]: an OTU with its sequences embedded under each isolate,
//!   the shape recorded in history and diffed between versions
//! - [`diff`]: order-independent structural comparison of two documents
//! - [`HistoryRecord`]: write-once audit record of one mutation
//!
//! # Example
//!
//! ```rust
//! use otu_model::{Otu, OtuId, RefId};
//!
//! let otu = Otu::new(OtuId::new("6116cba1"), RefId::new("hxn167"), "Prunus virus F", "PVF");
//! assert_eq!(otu.lower_name, "prunus virus f");
//! assert_eq!(otu.version, 0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod diff;
mod entity;
mod error;
mod history;
mod ids;
mod joined;
pub mod serde_link;

pub use diff::{apply, diff, DiffError, DiffOp, DiffPath, PathSegment};
pub use entity::{
    clean_sequence, isolate_display_name, validate_schema, Isolate, Molecule, Otu, Reference,
    Segment, Sequence,
};
pub use error::ModelError;
pub use history::{ChangeId, HistoryDiff, HistoryMethod, HistoryRecord, IndexRef, OtuStamp};
pub use ids::{random_id, unique_id, IsolateId, OtuId, RefId, SequenceId, UserId};
pub use joined::{JoinedIsolate, JoinedOtu};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
