//! OTU Store
//!
//! Persistence port for the OTU registry.
//!
//! # Overview
//!
//! - **OtuStore**: async trait the aggregate service persists through
//! - **WriteBatch**: OTU write + sequence writes + one history record,
//!   applied atomically with compare-and-set on the OTU version
//! - **MemoryStore**: in-process implementation used by tests and the CLI
//!
//! # Example
//!
//! ```rust
//! use otu_model::{RefId, Reference};
//! use otu_store::MemoryStore;
//!
//! let store = MemoryStore::with_references([Reference::new(RefId::new("hxn167"), "Plant viruses")]);
//! assert_eq!(store.history_len(), 0);
//! ```

#![warn(missing_docs)]

mod batch;
mod error;
mod filter;
mod memory;
mod port;

pub use batch::{OtuWrite, SequenceWrite, WriteBatch};
pub use error::{Collection, StoreError, UniqueField};
pub use filter::{HistoryFilter, OtuFilter, SequenceFilter};
pub use memory::MemoryStore;
pub use port::OtuStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store access
    pub use crate::{
        HistoryFilter, MemoryStore, OtuFilter, OtuStore, OtuWrite, SequenceFilter, SequenceWrite,
        StoreError, WriteBatch,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
