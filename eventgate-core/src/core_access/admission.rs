//! Capacity-checked join and leave
//!
//! The only component that mutates participation state. Permission is
//! re-checked on every call; the capacity check and the insert happen in a
//! single store operation (see [`ParticipationStore::admit`]).

use super::errors::{AccessError, AccessResult, ConflictKind, DenyReason, NotFoundKind};
use super::permission::{can_join, AccessDecision};
use crate::config::AdmissionConfig;
use crate::core_event::{EventId, Timestamp, ViewerContext};
use crate::metrics::{
    record_counter, record_rejection, ACCESS_DENIED, JOIN_ADMITTED, JOIN_REJECTED, LEAVE_TOTAL,
};
use crate::storage::{AdmitOutcome, EventStore, ParticipationStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AdmissionController {
    events: Arc<dyn EventStore>,
    participations: Arc<dyn ParticipationStore>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(
        events: Arc<dyn EventStore>,
        participations: Arc<dyn ParticipationStore>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            events,
            participations,
            config,
        }
    }

    /// Add the viewer to the event's participants.
    ///
    /// Checks run in order: registration, event existence, the event's join
    /// rule, the platform-wide verification rule, then capacity and
    /// duplicates atomically.
    pub fn join(&self, event_id: EventId, viewer: &ViewerContext) -> AccessResult<()> {
        let result = self.try_join(event_id, viewer);
        match &result {
            Ok(()) => record_counter(JOIN_ADMITTED, 1),
            Err(err) => record_rejection(JOIN_REJECTED, rejection_label(err)),
        }
        result
    }

    fn try_join(&self, event_id: EventId, viewer: &ViewerContext) -> AccessResult<()> {
        let Some(user_id) = viewer.user_id else {
            return Err(deny(DenyReason::RegistrationRequired));
        };

        let access = self
            .events
            .event_access(event_id)?
            .ok_or(AccessError::NotFound(NotFoundKind::Event))?;

        if let AccessDecision::Deny(reason) = can_join(&access.privacy, viewer) {
            debug!(%event_id, viewer = %user_id, %reason, "Join refused by event rule");
            return Err(deny(reason));
        }

        if self.config.require_verified_for_all_joins && !viewer.admin && !viewer.verified {
            debug!(%event_id, viewer = %user_id, "Join refused: unverified email");
            return Err(deny(DenyReason::VerifiedEmailRequired));
        }

        match self.participations.admit(event_id, user_id, Timestamp::now())? {
            AdmitOutcome::Admitted => {
                info!(%event_id, viewer = %user_id, "Joined event");
                Ok(())
            }
            AdmitOutcome::Full { capacity, count } => {
                info!(%event_id, viewer = %user_id, capacity, count, "Join refused: event is full");
                Err(AccessError::CapacityExceeded)
            }
            AdmitOutcome::AlreadyJoined => Err(AccessError::Conflict(ConflictKind::AlreadyJoined)),
            // Deleted between the access lookup and the transaction
            AdmitOutcome::EventNotFound => Err(AccessError::NotFound(NotFoundKind::Event)),
            AdmitOutcome::UnknownUser => {
                warn!(viewer = %user_id, "Join from a viewer with no user row");
                Err(AccessError::NotFound(NotFoundKind::User))
            }
        }
    }

    /// Remove the viewer from the event's participants
    pub fn leave(&self, event_id: EventId, viewer: &ViewerContext) -> AccessResult<()> {
        let Some(user_id) = viewer.user_id else {
            return Err(AccessError::Conflict(ConflictKind::NotParticipant));
        };

        if !self.participations.remove_participant(event_id, user_id)? {
            return Err(AccessError::Conflict(ConflictKind::NotParticipant));
        }

        info!(%event_id, viewer = %user_id, "Left event");
        record_counter(LEAVE_TOTAL, 1);
        Ok(())
    }
}

fn deny(reason: DenyReason) -> AccessError {
    record_counter(ACCESS_DENIED, 1);
    AccessError::PermissionDenied(reason)
}

fn rejection_label(err: &AccessError) -> &'static str {
    match err {
        AccessError::PermissionDenied(_) => "permission",
        AccessError::CapacityExceeded => "full",
        AccessError::Conflict(_) => "duplicate",
        AccessError::NotFound(_) => "not_found",
        AccessError::InvalidRequest(_) => "invalid",
        AccessError::StoreFailure(_) => "store",
    }
}
