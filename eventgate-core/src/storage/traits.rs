//! Store seams
//!
//! Every engine component receives the store it needs through one of these
//! traits at construction time. [`SqlStore`](super::SqlStore) implements all
//! three.

use super::errors::StoreResult;
use crate::core_event::{
    BlockSummary, Event, EventAccess, EventId, Participant, Timestamp, UserId,
};
use std::collections::HashSet;

/// Outcome of an atomic admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Participation row inserted and committed
    Admitted,
    /// No event with that id
    EventNotFound,
    /// Capacity reached; nothing written
    Full { capacity: u32, count: u32 },
    /// The user already participates; nothing written
    AlreadyJoined,
    /// The user row does not exist; nothing written
    UnknownUser,
}

/// Outcome of a block insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockInsert {
    Inserted,
    /// Same ordered pair already stored
    Duplicate,
    /// One of the two users does not exist
    UnknownUser,
}

/// Read access to events
pub trait EventStore: Send + Sync {
    /// Owner, capacity and privacy flags of an event
    fn event_access(&self, event_id: EventId) -> StoreResult<Option<EventAccess>>;

    /// Full event by id, with `viewer_is_participant` computed for `viewer`
    /// (`None` when there is no viewer)
    fn event_by_id(&self, event_id: EventId, viewer: Option<UserId>) -> StoreResult<Option<Event>>;

    /// Full event by slug, with `viewer_is_participant` computed for `viewer`
    /// (`None` when there is no viewer)
    fn event_by_slug(&self, slug: &str, viewer: Option<UserId>) -> StoreResult<Option<Event>>;
}

/// Participation rows
pub trait ParticipationStore: Send + Sync {
    fn is_participant(&self, event_id: EventId, user_id: UserId) -> StoreResult<bool>;

    /// Roster ordered by join time
    fn participants(&self, event_id: EventId) -> StoreResult<Vec<Participant>>;

    fn participant_count(&self, event_id: EventId) -> StoreResult<u32>;

    /// Check capacity and insert the participation row as one serialized
    /// unit. Implementations must guarantee that two concurrent callers can
    /// never both observe the same pre-insert count.
    fn admit(
        &self,
        event_id: EventId,
        user_id: UserId,
        joined_at: Timestamp,
    ) -> StoreResult<AdmitOutcome>;

    /// Delete a participation row; `false` if there was none
    fn remove_participant(&self, event_id: EventId, user_id: UserId) -> StoreResult<bool>;
}

/// Directional block edges, queried symmetrically
pub trait RelationshipStore: Send + Sync {
    fn insert_block(
        &self,
        blocker: UserId,
        blocked: UserId,
        reason: Option<&str>,
        created_at: Timestamp,
    ) -> StoreResult<BlockInsert>;

    /// Delete the (blocker, blocked) edge; `false` if there was none
    fn delete_block(&self, blocker: UserId, blocked: UserId) -> StoreResult<bool>;

    /// Whether an edge exists in either direction
    fn is_blocked_either_way(&self, a: UserId, b: UserId) -> StoreResult<bool>;

    /// Everyone `user` has blocked or been blocked by
    fn block_counterparts(&self, user: UserId) -> StoreResult<HashSet<UserId>>;

    /// Edges created by `blocker`, newest first
    fn blocks_by(&self, blocker: UserId) -> StoreResult<Vec<BlockSummary>>;
}
