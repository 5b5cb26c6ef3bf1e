//! Per-request viewer identity

use super::types::UserId;
use serde::{Deserialize, Serialize};

/// Who is asking.
///
/// Built once per request by the authentication layer and passed by value
/// into every core operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewerContext {
    /// Registered user id (None = anonymous)
    pub user_id: Option<UserId>,

    /// Email verification status
    pub verified: bool,

    /// Platform administrator
    pub admin: bool,
}

impl ViewerContext {
    /// An unauthenticated visitor
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A registered, unverified, non-admin user
    pub fn registered(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            verified: false,
            admin: false,
        }
    }

    /// Build from the serving layer's raw values, where id `0` (or any
    /// non-positive id) means anonymous.
    pub fn from_raw(user_id: i64, verified: bool, admin: bool) -> Self {
        Self {
            user_id: (user_id > 0).then_some(UserId(user_id)),
            verified,
            admin,
        }
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether this viewer owns something owned by `owner_id`
    pub fn is_owner_of(&self, owner_id: UserId) -> bool {
        self.user_id == Some(owner_id)
    }
}
