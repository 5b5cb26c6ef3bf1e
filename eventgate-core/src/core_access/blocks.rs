//! Block relationships and result filtering
//!
//! Edges are stored one direction at a time, but every question asked here
//! is symmetric: if either user blocked the other, they disappear from each
//! other's results. Store failures propagate, so a failing store never lets
//! blocked content through.

use super::errors::{AccessError, AccessResult, ConflictKind, NotFoundKind};
use crate::core_event::{BlockSummary, Event, Participant, Timestamp, UserId, ViewerContext};
use crate::metrics::{record_counter, BLOCKS_CREATED, BLOCKS_REMOVED, BLOCK_FILTERED};
use crate::storage::{BlockInsert, RelationshipStore};
use std::sync::Arc;
use tracing::{debug, info};

pub struct BlockFilter {
    relationships: Arc<dyn RelationshipStore>,
}

impl BlockFilter {
    pub fn new(relationships: Arc<dyn RelationshipStore>) -> Self {
        Self { relationships }
    }

    /// Whether an edge exists in either direction
    pub fn are_blocked(&self, a: UserId, b: UserId) -> AccessResult<bool> {
        if a == b {
            return Ok(false);
        }
        Ok(self.relationships.is_blocked_either_way(a, b)?)
    }

    /// Drop events owned by anyone the viewer blocked or was blocked by.
    /// Order is preserved; anonymous viewers get the input back unchanged.
    pub fn filter_events(
        &self,
        events: Vec<Event>,
        viewer: &ViewerContext,
    ) -> AccessResult<Vec<Event>> {
        self.retain_visible(events, viewer, |event| event.owner_id)
    }

    /// Same rule as [`filter_events`](Self::filter_events), applied to a roster
    pub fn filter_participants(
        &self,
        participants: Vec<Participant>,
        viewer: &ViewerContext,
    ) -> AccessResult<Vec<Participant>> {
        self.retain_visible(participants, viewer, |participant| participant.user_id)
    }

    fn retain_visible<T>(
        &self,
        mut items: Vec<T>,
        viewer: &ViewerContext,
        owner_of: impl Fn(&T) -> UserId,
    ) -> AccessResult<Vec<T>> {
        let Some(viewer_id) = viewer.user_id else {
            return Ok(items);
        };

        let counterparts = self.relationships.block_counterparts(viewer_id)?;
        if counterparts.is_empty() {
            return Ok(items);
        }

        let before = items.len();
        items.retain(|item| !counterparts.contains(&owner_of(item)));

        let dropped = before - items.len();
        if dropped > 0 {
            debug!(viewer = %viewer_id, dropped, "Filtered blocked counterparts");
            record_counter(BLOCK_FILTERED, dropped as u64);
        }
        Ok(items)
    }

    /// Record that `blocker` blocks `blocked`
    pub fn block(&self, blocker: UserId, blocked: UserId, reason: Option<&str>) -> AccessResult<()> {
        if blocker == blocked {
            return Err(AccessError::InvalidRequest("Cannot block yourself".to_string()));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        match self
            .relationships
            .insert_block(blocker, blocked, reason, Timestamp::now())?
        {
            BlockInsert::Inserted => {
                info!(%blocker, %blocked, "User blocked");
                record_counter(BLOCKS_CREATED, 1);
                Ok(())
            }
            BlockInsert::Duplicate => Err(AccessError::Conflict(ConflictKind::AlreadyBlocked)),
            BlockInsert::UnknownUser => Err(AccessError::NotFound(NotFoundKind::User)),
        }
    }

    /// Remove the `blocker` -> `blocked` edge
    pub fn unblock(&self, blocker: UserId, blocked: UserId) -> AccessResult<()> {
        if !self.relationships.delete_block(blocker, blocked)? {
            return Err(AccessError::NotFound(NotFoundKind::Block));
        }
        info!(%blocker, %blocked, "User unblocked");
        record_counter(BLOCKS_REMOVED, 1);
        Ok(())
    }

    /// Users `blocker` has blocked, newest first
    pub fn list_blocked(&self, blocker: UserId) -> AccessResult<Vec<BlockSummary>> {
        Ok(self.relationships.blocks_by(blocker)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_event::{NewEvent, NewUser};
    use crate::storage::{EventStore, ParticipationStore, SqlStore, StoreError, StoreResult};
    use std::collections::HashSet;

    fn setup(n: usize) -> (Arc<SqlStore>, BlockFilter, Vec<UserId>) {
        let store = Arc::new(SqlStore::in_memory().unwrap());
        let users = (0..n)
            .map(|i| {
                store
                    .insert_user(&NewUser::new(format!("user{}", i), format!("u{}@example.com", i)))
                    .unwrap()
            })
            .collect();
        let filter = BlockFilter::new(store.clone());
        (store, filter, users)
    }

    fn event_owned_by(store: &SqlStore, owner: UserId, slug: &str) -> Event {
        let id = store.insert_event(&NewEvent::new(owner, slug, slug)).unwrap();
        store.event_by_id(id, None).unwrap().unwrap()
    }

    #[test]
    fn test_block_is_symmetric() {
        let (_, filter, users) = setup(3);
        filter.block(users[0], users[1], Some("spam")).unwrap();

        assert!(filter.are_blocked(users[0], users[1]).unwrap());
        assert!(filter.are_blocked(users[1], users[0]).unwrap());
        assert!(!filter.are_blocked(users[0], users[2]).unwrap());
    }

    #[test]
    fn test_block_side_rules() {
        let (_, filter, users) = setup(2);

        assert!(matches!(
            filter.block(users[0], users[0], None),
            Err(AccessError::InvalidRequest(_))
        ));
        assert!(matches!(
            filter.block(users[0], UserId(999), None),
            Err(AccessError::NotFound(NotFoundKind::User))
        ));

        filter.block(users[0], users[1], None).unwrap();
        assert!(matches!(
            filter.block(users[0], users[1], None),
            Err(AccessError::Conflict(ConflictKind::AlreadyBlocked))
        ));
    }

    #[test]
    fn test_unblock_missing_edge_is_not_found() {
        let (_, filter, users) = setup(2);
        assert!(matches!(
            filter.unblock(users[0], users[1]),
            Err(AccessError::NotFound(NotFoundKind::Block))
        ));

        filter.block(users[0], users[1], None).unwrap();
        // Only the blocker can lift their own edge
        assert!(filter.unblock(users[1], users[0]).is_err());
        filter.unblock(users[0], users[1]).unwrap();
        assert!(!filter.are_blocked(users[0], users[1]).unwrap());
    }

    #[test]
    fn test_filter_events_keeps_order_and_drops_both_directions() {
        let (store, filter, users) = setup(4);
        let viewer = users[0];
        let events = vec![
            event_owned_by(&store, users[1], "a"),
            event_owned_by(&store, users[2], "b"),
            event_owned_by(&store, users[3], "c"),
            event_owned_by(&store, users[1], "d"),
        ];

        // viewer blocks users[2]; users[3] blocks viewer
        filter.block(viewer, users[2], None).unwrap();
        filter.block(users[3], viewer, None).unwrap();

        let kept: Vec<String> = filter
            .filter_events(events.clone(), &ViewerContext::registered(viewer))
            .unwrap()
            .into_iter()
            .map(|e| e.slug)
            .collect();
        assert_eq!(kept, vec!["a", "d"]);

        let anonymous = filter.filter_events(events.clone(), &ViewerContext::anonymous()).unwrap();
        assert_eq!(anonymous, events);
    }

    #[test]
    fn test_filter_participants() {
        let (store, filter, users) = setup(3);
        let id = store.insert_event(&NewEvent::new(users[0], "e", "E")).unwrap();
        store.admit(id, users[1], Timestamp::from_millis(1)).unwrap();
        store.admit(id, users[2], Timestamp::from_millis(2)).unwrap();
        filter.block(users[2], users[0], None).unwrap();

        let roster = store.participants(id).unwrap();
        let kept = filter
            .filter_participants(roster, &ViewerContext::registered(users[0]))
            .unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].user_id, users[1]);
    }

    #[test]
    fn test_list_blocked_newest_first() {
        let (_, filter, users) = setup(3);
        filter.block(users[0], users[1], None).unwrap();
        filter.block(users[0], users[2], Some("  ")).unwrap();

        let listed = filter.list_blocked(users[0]).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].blocked_id, users[2]);
        assert_eq!(listed[0].reason, None);
    }

    /// Store whose every query fails
    struct BrokenStore;

    impl RelationshipStore for BrokenStore {
        fn insert_block(
            &self,
            _: UserId,
            _: UserId,
            _: Option<&str>,
            _: Timestamp,
        ) -> StoreResult<BlockInsert> {
            Err(StoreError::Task("down".to_string()))
        }
        fn delete_block(&self, _: UserId, _: UserId) -> StoreResult<bool> {
            Err(StoreError::Task("down".to_string()))
        }
        fn is_blocked_either_way(&self, _: UserId, _: UserId) -> StoreResult<bool> {
            Err(StoreError::Task("down".to_string()))
        }
        fn block_counterparts(&self, _: UserId) -> StoreResult<HashSet<UserId>> {
            Err(StoreError::Task("down".to_string()))
        }
        fn blocks_by(&self, _: UserId) -> StoreResult<Vec<BlockSummary>> {
            Err(StoreError::Task("down".to_string()))
        }
    }

    #[test]
    fn test_filter_fails_closed() {
        let filter = BlockFilter::new(Arc::new(BrokenStore));
        let result = filter.filter_participants(Vec::new(), &ViewerContext::registered(UserId(1)));
        assert!(matches!(result, Err(AccessError::StoreFailure(_))));
        assert!(filter.are_blocked(UserId(1), UserId(2)).unwrap_err().is_internal());
    }
}
