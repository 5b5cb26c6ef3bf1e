//! Participant listing under the event's privacy policy

use super::errors::{AccessError, AccessResult, NotFoundKind};
use crate::core_event::{EventId, Participant, ViewerContext};
use crate::storage::{EventStore, ParticipationStore};
use std::sync::Arc;
use tracing::debug;

/// Lists an event's participants as a particular viewer may see them
pub struct RosterProjector {
    events: Arc<dyn EventStore>,
    participations: Arc<dyn ParticipationStore>,
}

impl RosterProjector {
    pub fn new(events: Arc<dyn EventStore>, participations: Arc<dyn ParticipationStore>) -> Self {
        Self {
            events,
            participations,
        }
    }

    /// Roster ordered by join time.
    ///
    /// Admins, the owner and participants see everyone with contact details.
    /// Other viewers see nothing when the roster is hidden until joining;
    /// otherwise they see everyone, minus emails if they are unverified.
    pub fn list_participants(
        &self,
        event_id: EventId,
        viewer: &ViewerContext,
    ) -> AccessResult<Vec<Participant>> {
        let access = self
            .events
            .event_access(event_id)?
            .ok_or(AccessError::NotFound(NotFoundKind::Event))?;

        let participant = match viewer.user_id {
            Some(user_id) => self.participations.is_participant(event_id, user_id)?,
            None => false,
        };

        if viewer.admin || viewer.is_owner_of(access.owner_id) || participant {
            return Ok(self.participations.participants(event_id)?);
        }

        if access.privacy.hide_participants_until_joined {
            debug!(%event_id, "Roster hidden from non-participant");
            return Ok(Vec::new());
        }

        let mut roster = self.participations.participants(event_id)?;
        if !viewer.verified {
            for entry in &mut roster {
                entry.email = None;
            }
        }
        Ok(roster)
    }
}
