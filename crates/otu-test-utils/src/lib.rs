//! Testing utilities for the OTU registry workspace
//!
//! Shared fixtures: references, services over a fresh `MemoryStore` and
//! helpers that build common OTU shapes.

#![allow(missing_docs)]

use otu_core::{
    ChannelNotifier, IsolateView, NewSequence, Notification, OtuService, OtuView, RequestContext,
};
use otu_model::{RefId, Reference};
use otu_store::MemoryStore;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

pub const REFERENCE_ID: &str = "hxn167";
pub const RESTRICTED_REFERENCE_ID: &str = "restricted";

pub fn reference() -> Reference {
    Reference::new(RefId::new(REFERENCE_ID), "Plant viruses")
}

pub fn restricted_reference() -> Reference {
    Reference::new(RefId::new(RESTRICTED_REFERENCE_ID), "Restricted viruses")
        .restricted_to(["isolate", "strain"])
}

pub fn reference_id() -> RefId {
    RefId::new(REFERENCE_ID)
}

pub fn ctx() -> RequestContext {
    RequestContext::new("test")
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_references([reference(), restricted_reference()]))
}

/// Service over a fresh store seeded with both fixture references
pub fn service() -> (OtuService, Arc<MemoryStore>) {
    let store = store();
    (OtuService::new(store.clone()), store)
}

/// Like [`service`] but also returns the notification receiver
pub fn service_with_notifications() -> (OtuService, UnboundedReceiver<Notification>) {
    let (notifier, rx) = ChannelNotifier::channel();
    (OtuService::new(store()).with_notifier(Arc::new(notifier)), rx)
}

/// Create "Tobacco mosaic virus" with no abbreviation
pub async fn create_tmv(service: &OtuService) -> OtuView {
    service
        .create(&ctx(), &reference_id(), "Tobacco mosaic virus", "", Vec::new())
        .await
        .unwrap()
}

pub async fn add_isolate(service: &OtuService, otu: &OtuView, source_name: &str, default: bool) -> IsolateView {
    service
        .add_isolate(&ctx(), &otu.id, "isolate", source_name, default)
        .await
        .unwrap()
}

pub fn sample_sequence(accession: &str) -> NewSequence {
    NewSequence::new(
        accession,
        "Tobacco mosaic virus complete genome",
        "GTATTTTTACAACAATTACCAACAACAACAAACAACAAACAACATTACAATTACTATTTACAATTACA\n",
    )
    .with_host("tobacco")
}
