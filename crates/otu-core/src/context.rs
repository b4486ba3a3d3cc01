//! Request context and authorization seam

use otu_model::{RefId, UserId};

/// Acting user of one service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// User recorded in history
    pub user_id: UserId,
}

impl RequestContext {
    /// Context for `user_id`
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Rights checked by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Right {
    /// Create, edit or remove OTUs and their children
    ModifyOtu,
}

/// Decides whether a user holds a right in a reference
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer: Send + Sync {
    /// Whether `user` holds `right` in `reference`
    fn may(&self, user: &UserId, right: Right, reference: &RefId) -> bool;
}

/// Grants every right to everyone
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn may(&self, _user: &UserId, _right: Right, _reference: &RefId) -> bool {
        true
    }
}
