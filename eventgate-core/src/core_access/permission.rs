//! View and join decisions
//!
//! Pure functions over the event's privacy flags and the viewer. Precedence,
//! highest first: admin, public-to-everyone, owner, verification rule,
//! default allow.

use super::errors::DenyReason;
use crate::core_event::{Event, PrivacySettings, UserId, ViewerContext};
use serde::{Deserialize, Serialize};

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    /// The denial reason, if any
    pub fn denial(&self) -> Option<DenyReason> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(reason) => Some(*reason),
        }
    }
}

/// Whether `viewer` may see an event with these privacy flags
pub fn can_view(privacy: &PrivacySettings, viewer: &ViewerContext) -> AccessDecision {
    if viewer.admin || privacy.allow_unregistered_viewers {
        return AccessDecision::Allow;
    }

    if viewer.is_anonymous() {
        return AccessDecision::Deny(DenyReason::RegistrationRequired);
    }

    if privacy.require_verified_to_view && !viewer.verified {
        return AccessDecision::Deny(DenyReason::VerifiedEmailRequired);
    }

    AccessDecision::Allow
}

/// [`can_view`] with the owner bypass: the organizer always sees their own
/// event, verified or not
pub fn can_view_owned(
    privacy: &PrivacySettings,
    owner_id: UserId,
    viewer: &ViewerContext,
) -> AccessDecision {
    if viewer.is_owner_of(owner_id) {
        return AccessDecision::Allow;
    }
    can_view(privacy, viewer)
}

/// [`can_view_owned`] for a loaded event
pub fn can_view_event(event: &Event, viewer: &ViewerContext) -> AccessDecision {
    can_view_owned(&event.privacy, event.owner_id, viewer)
}

/// Whether `viewer` may join an event with these privacy flags.
///
/// Capacity and duplicate joins are decided at admission time, not here.
pub fn can_join(privacy: &PrivacySettings, viewer: &ViewerContext) -> AccessDecision {
    if viewer.admin {
        return AccessDecision::Allow;
    }

    if privacy.require_verified_to_join && !viewer.verified {
        return AccessDecision::Deny(DenyReason::VerifiedEmailRequired);
    }

    AccessDecision::Allow
}
