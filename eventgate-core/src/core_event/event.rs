//! Event data structures

use super::types::{EventId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Per-event privacy flags.
///
/// All flags default to `false`, which means: registered users can view and
/// join, and nothing is hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Anyone can view, including anonymous visitors
    pub allow_unregistered_viewers: bool,

    /// Registered viewers need a verified email to view
    pub require_verified_to_view: bool,

    /// Joining needs a verified email
    pub require_verified_to_join: bool,

    /// Organizer name and contact stay hidden until the viewer joins
    pub hide_organizer_until_joined: bool,

    /// Participant roster stays hidden until the viewer joins
    pub hide_participants_until_joined: bool,
}

/// A user as they appear on an event roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub name: String,

    /// Contact address; `None` once redacted
    pub email: Option<String>,

    pub bio: Option<String>,

    /// Comma-separated language codes
    pub languages: Option<String>,

    pub joined_at: Timestamp,
}

/// An event together with the fields the access engine reasons about.
///
/// `participant_count` and `viewer_is_participant` are computed when the
/// event is loaded; they are never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    /// Organizer (owning user)
    pub owner_id: UserId,

    /// Stable public identifier
    pub slug: String,

    pub title: String,

    /// Maximum number of participants (None = unbounded)
    pub capacity: Option<u32>,

    pub privacy: PrivacySettings,

    /// Organizer display name
    pub organizer_name: String,

    /// Organizer contact address; `None` once redacted
    pub organizer_email: Option<String>,

    /// Embedded roster, ordered by join time
    pub participants: Vec<Participant>,

    pub participant_count: u32,

    /// Whether the requesting viewer participates (None = not computed)
    pub viewer_is_participant: Option<bool>,

    pub created_at: Timestamp,
}

impl Event {
    /// Whether the event still has room for one more participant
    pub fn has_free_seat(&self) -> bool {
        match self.capacity {
            Some(capacity) => self.participant_count < capacity,
            None => true,
        }
    }

    /// Remaining seats, if the event is bounded
    pub fn free_seats(&self) -> Option<u32> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.participant_count))
    }
}

/// Subset of an event row needed for admission and roster decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventAccess {
    pub id: EventId,
    pub owner_id: UserId,
    pub capacity: Option<u32>,
    pub privacy: PrivacySettings,
}

/// One entry of a user's block list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: i64,
    pub blocked_id: UserId,
    pub name: String,
    pub email: String,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

/// Data needed to insert a user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub languages: Option<String>,
    pub email_verified: bool,
    pub is_admin: bool,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            bio: None,
            languages: None,
            email_verified: false,
            is_admin: false,
        }
    }

    pub fn verified(mut self) -> Self {
        self.email_verified = true;
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Data needed to insert an event row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub owner_id: UserId,
    pub slug: String,
    pub title: String,
    pub capacity: Option<u32>,
    pub privacy: PrivacySettings,
}

impl NewEvent {
    pub fn new(owner_id: UserId, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            owner_id,
            slug: slug.into(),
            title: title.into(),
            capacity: None,
            privacy: PrivacySettings::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacySettings) -> Self {
        self.privacy = privacy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(capacity: Option<u32>, count: u32) -> Event {
        Event {
            id: EventId(1),
            owner_id: UserId(1),
            slug: "board-games".to_string(),
            title: "Board games".to_string(),
            capacity,
            privacy: PrivacySettings::default(),
            organizer_name: "Alice".to_string(),
            organizer_email: Some("alice@example.com".to_string()),
            participants: Vec::new(),
            participant_count: count,
            viewer_is_participant: None,
            created_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn test_unbounded_event_always_has_seat() {
        let event = event_with(None, 500);
        assert!(event.has_free_seat());
        assert_eq!(event.free_seats(), None);
    }

    #[test]
    fn test_full_event_has_no_seat() {
        let event = event_with(Some(3), 3);
        assert!(!event.has_free_seat());
        assert_eq!(event.free_seats(), Some(0));
    }

    #[test]
    fn test_partial_privacy_json_fills_defaults() {
        let privacy: PrivacySettings =
            serde_json::from_str(r#"{"hide_organizer_until_joined": true}"#).unwrap();
        assert!(privacy.hide_organizer_until_joined);
        assert!(!privacy.allow_unregistered_viewers);
    }

    #[test]
    fn test_redacted_email_serializes_as_null() {
        let mut event = event_with(Some(2), 0);
        event.organizer_email = None;
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["organizer_email"].is_null());
        assert_eq!(value["capacity"], 2);
    }

    #[test]
    fn test_privacy_defaults_are_open_to_registered_users() {
        let privacy = PrivacySettings::default();
        assert!(!privacy.allow_unregistered_viewers);
        assert!(!privacy.hide_organizer_until_joined);
        assert!(!privacy.hide_participants_until_joined);
    }
}
