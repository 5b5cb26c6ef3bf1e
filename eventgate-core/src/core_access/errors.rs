//! Error taxonomy for access decisions and admission

use crate::metrics::{record_counter, STORE_FAILURES};
use crate::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a view or join was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    RegistrationRequired,
    VerifiedEmailRequired,
    AdminRequired,
}

impl DenyReason {
    /// Short machine-friendly reason
    pub fn reason(&self) -> &'static str {
        match self {
            DenyReason::RegistrationRequired => "registration required",
            DenyReason::VerifiedEmailRequired => "verified email required",
            DenyReason::AdminRequired => "admin privileges required",
        }
    }

    /// Sentence suitable for showing to the end user
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::RegistrationRequired => {
                "This event requires registration to view. Please create an account or log in."
            }
            DenyReason::VerifiedEmailRequired => {
                "A verified email address is required. Please verify your email first."
            }
            DenyReason::AdminRequired => "This action is restricted to administrators.",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// What could not be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotFoundKind {
    Event,
    User,
    Block,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotFoundKind::Event => "event",
            NotFoundKind::User => "user",
            NotFoundKind::Block => "block",
        })
    }
}

/// State conflicts other than a full event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    AlreadyJoined,
    AlreadyBlocked,
    NotParticipant,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::AlreadyJoined => "already joined",
            ConflictKind::AlreadyBlocked => "already blocked",
            ConflictKind::NotParticipant => "not a participant",
        })
    }
}

/// Errors returned by the access engine.
///
/// Everything except [`AccessError::StoreFailure`] is an expected business
/// outcome. Store failures never expose their detail through `Display`.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("permission denied: {0}")]
    PermissionDenied(DenyReason),

    #[error("{0} not found")]
    NotFound(NotFoundKind),

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("event is full")]
    CapacityExceeded,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal storage failure")]
    StoreFailure(#[source] StoreError),
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Text safe to return to an end user
    pub fn public_message(&self) -> String {
        match self {
            AccessError::PermissionDenied(reason) => reason.message().to_string(),
            AccessError::NotFound(NotFoundKind::Event) => "Event not found".to_string(),
            AccessError::NotFound(NotFoundKind::User) => "User not found".to_string(),
            AccessError::NotFound(NotFoundKind::Block) => "Block not found".to_string(),
            AccessError::Conflict(ConflictKind::AlreadyJoined) => {
                "Already joined this event".to_string()
            }
            AccessError::Conflict(ConflictKind::AlreadyBlocked) => {
                "User already blocked".to_string()
            }
            AccessError::Conflict(ConflictKind::NotParticipant) => {
                "Not a participant of this event".to_string()
            }
            AccessError::CapacityExceeded => "Event is full".to_string(),
            AccessError::InvalidRequest(message) => message.clone(),
            AccessError::StoreFailure(_) => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }

    /// Whether this is an infrastructure failure rather than a business outcome
    pub fn is_internal(&self) -> bool {
        matches!(self, AccessError::StoreFailure(_))
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store operation failed");
        record_counter(STORE_FAILURES, 1);
        AccessError::StoreFailure(err)
    }
}
