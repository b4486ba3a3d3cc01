//! OTU command line tools
//!
//! Backs the `otu` binary:
//! - `verify`: consistency check of a joined OTU document
//! - `diff`: structural diff of two documents
//! - `replay`: run a YAML script of service operations against an
//!   in-memory store and report the resulting OTUs and history

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod inspect;
pub mod replay;
pub mod script;

pub use inspect::{diff_documents, load_json, verify_document};
pub use replay::{run_replay, ReplayReport, StepOutcome};
pub use script::{Labels, Script, Step};

use otu_core::ServiceConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Configuration from `path`, or defaults when no file is given
///
/// # Errors
/// Unreadable or invalid configuration files
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ServiceConfig> {
    match path {
        Some(path) => Ok(ServiceConfig::load(path)?),
        None => Ok(ServiceConfig::default()),
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured filter. Logs go to stderr so
/// command output on stdout stays parseable.
pub fn init_tracing(config: &ServiceConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
