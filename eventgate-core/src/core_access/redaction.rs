//! Per-viewer redaction of organizer identity and the embedded roster

use crate::core_event::{Event, ViewerContext};
use crate::storage::ParticipationStore;
use std::sync::Arc;
use tracing::warn;

/// Shapes an event for one viewer.
///
/// Works on per-request copies only; nothing is written back to the store.
pub struct PrivacyRedactor {
    participations: Arc<dyn ParticipationStore>,
    placeholder: String,
}

impl PrivacyRedactor {
    pub fn new(participations: Arc<dyn ParticipationStore>, placeholder: impl Into<String>) -> Self {
        Self {
            participations,
            placeholder: placeholder.into(),
        }
    }

    /// Text that replaces a hidden organizer's name
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Return a redacted copy of `event`
    pub fn apply(&self, event: &Event, viewer: &ViewerContext) -> Event {
        let mut view = event.clone();
        self.apply_in_place(&mut view, viewer);
        view
    }

    /// Redact a per-request event value. Applying twice changes nothing.
    pub fn apply_in_place(&self, event: &mut Event, viewer: &ViewerContext) {
        if viewer.admin || viewer.is_owner_of(event.owner_id) {
            return;
        }

        let participant = self.viewer_participates(event, viewer);
        event.viewer_is_participant = Some(participant);

        if event.privacy.hide_organizer_until_joined && !participant {
            event.organizer_name = self.placeholder.clone();
            event.organizer_email = None;
        } else if !viewer.verified {
            event.organizer_email = None;
        }

        if event.privacy.hide_participants_until_joined && !participant {
            event.participants.clear();
        }
    }

    fn viewer_participates(&self, event: &Event, viewer: &ViewerContext) -> bool {
        let Some(user_id) = viewer.user_id else {
            return false;
        };

        // A precomputed `false` may belong to another (or no) viewer
        if event.viewer_is_participant == Some(true) {
            return true;
        }

        match self.participations.is_participant(event.id, user_id) {
            Ok(participant) => participant,
            Err(err) => {
                // Redact as a non-participant rather than leak hidden fields
                warn!(
                    event_id = %event.id,
                    viewer = %user_id,
                    error = %err,
                    "Participation lookup failed during redaction"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_event::{EventId, Participant, PrivacySettings, Timestamp, UserId};
    use crate::storage::{AdmitOutcome, StoreError, StoreResult};

    /// Participation store with a fixed answer (or a fixed failure)
    struct FixedParticipation(Option<bool>);

    impl ParticipationStore for FixedParticipation {
        fn is_participant(&self, _: EventId, _: UserId) -> StoreResult<bool> {
            self.0
                .ok_or_else(|| StoreError::Task("connection reset".to_string()))
        }
        fn participants(&self, _: EventId) -> StoreResult<Vec<Participant>> {
            Ok(Vec::new())
        }
        fn participant_count(&self, _: EventId) -> StoreResult<u32> {
            Ok(0)
        }
        fn admit(&self, _: EventId, _: UserId, _: Timestamp) -> StoreResult<AdmitOutcome> {
            Ok(AdmitOutcome::Admitted)
        }
        fn remove_participant(&self, _: EventId, _: UserId) -> StoreResult<bool> {
            Ok(false)
        }
    }

    fn redactor(answer: Option<bool>) -> PrivacyRedactor {
        PrivacyRedactor::new(Arc::new(FixedParticipation(answer)), "Join to see organizer")
    }

    fn hidden_event() -> Event {
        Event {
            id: EventId(1),
            owner_id: UserId(1),
            slug: "secret-supper".to_string(),
            title: "Secret supper".to_string(),
            capacity: Some(8),
            privacy: PrivacySettings {
                hide_organizer_until_joined: true,
                hide_participants_until_joined: true,
                ..Default::default()
            },
            organizer_name: "Alice".to_string(),
            organizer_email: Some("alice@example.com".to_string()),
            participants: vec![Participant {
                user_id: UserId(2),
                name: "Bob".to_string(),
                email: Some("bob@example.com".to_string()),
                bio: None,
                languages: Some("en,de".to_string()),
                joined_at: Timestamp::from_millis(5),
            }],
            participant_count: 1,
            viewer_is_participant: None,
            created_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn test_owner_and_admin_see_everything() {
        let event = hidden_event();
        let r = redactor(Some(false));
        assert_eq!(r.apply(&event, &ViewerContext::registered(UserId(1))), event);
        assert_eq!(r.apply(&event, &ViewerContext::anonymous().admin()), event);
    }

    #[test]
    fn test_non_participant_gets_placeholder_and_no_roster() {
        let event = hidden_event();
        let view = redactor(Some(false)).apply(&event, &ViewerContext::registered(UserId(3)).verified());

        assert_eq!(view.organizer_name, "Join to see organizer");
        assert_eq!(view.organizer_email, None);
        assert!(view.participants.is_empty());
        assert_eq!(view.participant_count, 1);
        assert_eq!(view.viewer_is_participant, Some(false));
        // Source left untouched
        assert_eq!(event.organizer_name, "Alice");
    }

    #[test]
    fn test_verified_participant_sees_organizer() {
        let view = redactor(Some(true)).apply(&hidden_event(), &ViewerContext::registered(UserId(2)).verified());
        assert_eq!(view.organizer_name, "Alice");
        assert_eq!(view.organizer_email.as_deref(), Some("alice@example.com"));
        assert_eq!(view.participants.len(), 1);
    }

    #[test]
    fn test_unverified_participant_loses_only_contact() {
        let view = redactor(Some(true)).apply(&hidden_event(), &ViewerContext::registered(UserId(2)));
        assert_eq!(view.organizer_name, "Alice");
        assert_eq!(view.organizer_email, None);
        assert_eq!(view.participants.len(), 1);
    }

    #[test]
    fn test_precomputed_flag_wins_over_lookup() {
        let mut event = hidden_event();
        event.viewer_is_participant = Some(true);
        // The store would say "no", but the flag is trusted
        let view = redactor(Some(false)).apply(&event, &ViewerContext::registered(UserId(2)).verified());
        assert_eq!(view.organizer_name, "Alice");
    }

    #[test]
    fn test_precomputed_false_is_rechecked() {
        let mut event = hidden_event();
        event.viewer_is_participant = Some(false);
        let view = redactor(Some(true)).apply(&event, &ViewerContext::registered(UserId(2)).verified());
        assert_eq!(view.organizer_name, "Alice");
        assert_eq!(view.participants.len(), 1);
        assert_eq!(view.viewer_is_participant, Some(true));
    }

    #[test]
    fn test_lookup_failure_redacts_as_non_participant() {
        let view = redactor(None).apply(&hidden_event(), &ViewerContext::registered(UserId(2)).verified());
        assert_eq!(view.organizer_name, "Join to see organizer");
        assert!(view.participants.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let r = redactor(Some(false));
        let viewers = [
            ViewerContext::anonymous(),
            ViewerContext::registered(UserId(3)),
            ViewerContext::registered(UserId(3)).verified(),
            ViewerContext::registered(UserId(2)),
        ];
        for viewer in viewers {
            let once = r.apply(&hidden_event(), &viewer);
            let twice = r.apply(&once, &viewer);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_open_event_unverified_viewer() {
        let mut event = hidden_event();
        event.privacy = PrivacySettings::default();
        let view = redactor(Some(false)).apply(&event, &ViewerContext::anonymous());
        assert_eq!(view.organizer_name, "Alice");
        assert_eq!(view.organizer_email, None);
        assert_eq!(view.participants.len(), 1);
    }
}
