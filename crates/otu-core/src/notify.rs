//! Change notifications
//!
//! Sent after a commit succeeds. Delivery is fire-and-forget: a failed
//! notification is logged and never undoes the write.

use crate::query::OtuSummary;
use otu_model::OtuId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Notification verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Insert,
    Update,
    Remove,
}

/// Notification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationData {
    /// Summary of an inserted or updated OTU
    Otu(OtuSummary),
    /// Ids of removed OTUs
    Removed(Vec<OtuId>),
}

/// One change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub interface: String,
    pub verb: Verb,
    pub data: NotificationData,
}

impl Notification {
    /// Insert or update event for an OTU
    #[must_use]
    pub fn otu(verb: Verb, summary: OtuSummary) -> Self {
        Self {
            interface: "otus".to_string(),
            verb,
            data: NotificationData::Otu(summary),
        }
    }

    /// Removal event
    #[must_use]
    pub fn removed(id: OtuId) -> Self {
        Self {
            interface: "otus".to_string(),
            verb: Verb::Remove,
            data: NotificationData::Removed(vec![id]),
        }
    }
}

/// Receives change notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Forwards notifications into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Notifier and the receiving end of its channel
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            tracing::warn!(verb = ?err.0.verb, "notification receiver dropped");
        }
    }
}
