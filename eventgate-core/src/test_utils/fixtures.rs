//! Test fixtures for events, viewers and seeded stores

use crate::config::Config;
use crate::core_access::AccessService;
use crate::core_event::{
    Event, EventId, NewEvent, NewUser, Participant, PrivacySettings, Timestamp, UserId,
    ViewerContext,
};
use crate::storage::SqlStore;
use std::sync::Arc;

/// Every one of the 32 privacy flag combinations
pub fn all_privacy_settings() -> impl Iterator<Item = PrivacySettings> {
    (0u8..32).map(|bits| PrivacySettings {
        allow_unregistered_viewers: bits & 1 != 0,
        require_verified_to_view: bits & 2 != 0,
        require_verified_to_join: bits & 4 != 0,
        hide_organizer_until_joined: bits & 8 != 0,
        hide_participants_until_joined: bits & 16 != 0,
    })
}

/// Builder for in-memory [`Event`] values (no store involved)
pub struct TestEventBuilder {
    event: Event,
}

impl TestEventBuilder {
    pub fn new(id: i64, owner: i64) -> Self {
        Self {
            event: Event {
                id: EventId(id),
                owner_id: UserId(owner),
                slug: format!("event-{}", id),
                title: format!("Event {}", id),
                capacity: None,
                privacy: PrivacySettings::default(),
                organizer_name: format!("Organizer {}", owner),
                organizer_email: Some(format!("organizer{}@example.com", owner)),
                participants: Vec::new(),
                participant_count: 0,
                viewer_is_participant: None,
                created_at: Timestamp::from_millis(0),
            },
        }
    }

    pub fn with_privacy(mut self, privacy: PrivacySettings) -> Self {
        self.event.privacy = privacy;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.event.capacity = Some(capacity);
        self
    }

    /// Add a roster entry with a generated name and email
    pub fn with_participant(mut self, user_id: i64) -> Self {
        let joined_at = Timestamp::from_millis(self.event.participants.len() as u64 + 1);
        self.event.participants.push(Participant {
            user_id: UserId(user_id),
            name: format!("Participant {}", user_id),
            email: Some(format!("p{}@example.com", user_id)),
            bio: None,
            languages: None,
            joined_at,
        });
        self.event.participant_count = self.event.participants.len() as u32;
        self
    }

    pub fn viewer_is_participant(mut self, participant: bool) -> Self {
        self.event.viewer_is_participant = Some(participant);
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

/// In-memory store plus a service wired to it
pub struct TestWorld {
    pub store: Arc<SqlStore>,
    pub service: AccessService,
    next_user: usize,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(SqlStore::in_memory().expect("in-memory store"));
        Self::on_store(store, &config)
    }

    /// Wrap an already opened store (e.g. a file database)
    pub fn on_store(store: Arc<SqlStore>, config: &Config) -> Self {
        let service = AccessService::new(store.clone(), config);
        Self {
            store,
            service,
            next_user: 0,
        }
    }

    fn insert_user(&mut self, name: &str, verified: bool, admin: bool) -> ViewerContext {
        self.next_user += 1;
        let mut user = NewUser::new(name, format!("{}.{}@example.com", name, self.next_user));
        user.email_verified = verified;
        user.is_admin = admin;
        let id = self.store.insert_user(&user).expect("insert user");
        ViewerContext {
            user_id: Some(id),
            verified,
            admin,
        }
    }

    /// Registered user without a verified email
    pub fn user(&mut self, name: &str) -> ViewerContext {
        self.insert_user(name, false, false)
    }

    pub fn verified_user(&mut self, name: &str) -> ViewerContext {
        self.insert_user(name, true, false)
    }

    pub fn admin(&mut self, name: &str) -> ViewerContext {
        self.insert_user(name, true, true)
    }

    /// Insert an event owned by `owner`
    pub fn event(
        &self,
        owner: &ViewerContext,
        slug: &str,
        capacity: Option<u32>,
        privacy: PrivacySettings,
    ) -> EventId {
        let owner_id = owner.user_id.expect("event owner must be registered");
        let mut event = NewEvent::new(owner_id, slug, slug).with_privacy(privacy);
        event.capacity = capacity;
        self.store.insert_event(&event).expect("insert event")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_privacy_settings_are_distinct() {
        let all: std::collections::HashSet<_> = all_privacy_settings().collect();
        assert_eq!(all.len(), 32);
    }

    #[test]
    fn test_event_builder_counts_roster() {
        let event = TestEventBuilder::new(1, 10)
            .with_participant(2)
            .with_participant(3)
            .build();
        assert_eq!(event.participant_count, 2);
        assert!(event.participants[0].joined_at < event.participants[1].joined_at);
    }

    #[test]
    fn test_world_users_get_distinct_emails() {
        let mut world = TestWorld::new();
        let a = world.user("sam");
        let b = world.user("sam");
        assert_ne!(a.user_id, b.user_id);
    }
}
