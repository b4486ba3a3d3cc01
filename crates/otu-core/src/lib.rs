//! OTU Core
//!
//! The aggregate-update and audit-history engine of the OTU registry:
//! - Validates and applies create/edit/remove of OTUs, isolates and sequences
//! - Keeps the default-isolate and version invariants
//! - Re-verifies every mutated OTU and persists the `verified` flag
//! - Records one write-once history record per committed mutation
//! - Serves the read-side queries that accompany them
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use otu_core::{OtuService, RequestContext};
//! use otu_model::{RefId, Reference};
//! use otu_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::with_references([Reference::new(RefId::new("hxn167"), "Plant viruses")]);
//! let service = OtuService::new(Arc::new(store));
//! let ctx = RequestContext::new("bob");
//!
//! let otu = service
//!     .create(&ctx, &RefId::new("hxn167"), "Tobacco mosaic virus", "", Vec::new())
//!     .await?;
//! let isolate = service.add_isolate(&ctx, &otu.id, "isolate", "A", false).await?;
//! assert!(isolate.default);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod context;
pub mod describe;
pub mod error;
pub mod format;
pub mod history;
pub mod input;
pub mod locks;
pub mod notify;
pub mod query;
pub mod service;
pub mod verify;

// Re-exports for convenience
pub use config::{ConfigError, ServiceConfig};
pub use context::{AllowAll, Authorizer, RequestContext, Right};
pub use describe::{compose_edit_description, Change};
pub use error::{ConflictField, OtuError, Resource};
pub use format::{format_otu, IsolateView, OtuView, RecentChange, SequenceView};
pub use history::Transition;
pub use input::{IsolatePatch, NewSequence, OtuPatch, SequencePatch};
pub use locks::{OtuGuard, OtuLocks};
pub use notify::{ChannelNotifier, Notification, NotificationData, Notifier, NullNotifier, Verb};
pub use query::{FindQuery, FindResult, OtuName, OtuPage, OtuSummary};
pub use service::OtuService;
pub use verify::{verify, DefaultIsolateIssue, Issues, MissingSegment};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the OTU service
    pub use crate::{
        FindQuery, FindResult, IsolatePatch, IsolateView, NewSequence, OtuError, OtuPatch,
        OtuService, OtuView, RequestContext, SequencePatch, SequenceView, ServiceConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
