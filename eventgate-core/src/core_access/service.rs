//! Async facade over the access engine
//!
//! Store-backed calls run on tokio's blocking pool. A join that has started
//! runs to completion even if the calling future is dropped, so cancellation
//! never splits the admission transaction.

use super::admission::AdmissionController;
use super::blocks::BlockFilter;
use super::errors::{AccessError, AccessResult, NotFoundKind};
use super::permission::{self, AccessDecision};
use super::redaction::PrivacyRedactor;
use super::roster::RosterProjector;
use crate::config::Config;
use crate::core_event::{
    BlockSummary, Event, EventId, Participant, PrivacySettings, UserId, ViewerContext,
};
use crate::metrics::{record_counter, ACCESS_DENIED};
use crate::storage::{EventStore, SqlStore, StoreError};
use std::sync::Arc;
use tracing::debug;

/// One entry point for every access decision and mutation
#[derive(Clone)]
pub struct AccessService {
    events: Arc<dyn EventStore>,
    redactor: Arc<PrivacyRedactor>,
    roster: Arc<RosterProjector>,
    blocks: Arc<BlockFilter>,
    admission: Arc<AdmissionController>,
}

impl AccessService {
    /// Build every component on top of `store`
    pub fn new(store: Arc<SqlStore>, config: &Config) -> Self {
        Self {
            events: store.clone(),
            redactor: Arc::new(PrivacyRedactor::new(
                store.clone(),
                config.privacy.organizer_placeholder.clone(),
            )),
            roster: Arc::new(RosterProjector::new(store.clone(), store.clone())),
            blocks: Arc::new(BlockFilter::new(store.clone())),
            admission: Arc::new(AdmissionController::new(
                store.clone(),
                store,
                config.admission.clone(),
            )),
        }
    }

    /// Open the configured database and build the service on it
    pub fn open(config: &Config) -> AccessResult<Self> {
        let store = Arc::new(SqlStore::open(&config.store)?);
        Ok(Self::new(store, config))
    }

    async fn blocking<T, F>(task: F) -> AccessResult<T>
    where
        F: FnOnce() -> AccessResult<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::task::spawn_blocking(task).await {
            Ok(result) => result,
            Err(join_err) => Err(StoreError::from(join_err).into()),
        }
    }

    // ===== Decisions =====

    pub fn can_view(&self, privacy: &PrivacySettings, viewer: &ViewerContext) -> AccessDecision {
        permission::can_view(privacy, viewer)
    }

    pub fn can_join(&self, privacy: &PrivacySettings, viewer: &ViewerContext) -> AccessDecision {
        permission::can_join(privacy, viewer)
    }

    // ===== Reads =====

    /// Redacted copy of `event` for `viewer`
    pub async fn apply_privacy(&self, event: Event, viewer: ViewerContext) -> AccessResult<Event> {
        let redactor = self.redactor.clone();
        Self::blocking(move || {
            let mut event = event;
            redactor.apply_in_place(&mut event, &viewer);
            Ok(event)
        })
        .await
    }

    pub async fn list_participants(
        &self,
        event_id: EventId,
        viewer: ViewerContext,
    ) -> AccessResult<Vec<Participant>> {
        let roster = self.roster.clone();
        Self::blocking(move || roster.list_participants(event_id, &viewer)).await
    }

    /// Load an event by slug and shape it for `viewer`
    pub async fn view_event(&self, slug: &str, viewer: ViewerContext) -> AccessResult<Event> {
        let events = self.events.clone();
        let redactor = self.redactor.clone();
        let slug = slug.to_string();

        Self::blocking(move || {
            let mut event = events
                .event_by_slug(&slug, viewer.user_id)?
                .ok_or(AccessError::NotFound(NotFoundKind::Event))?;

            if let AccessDecision::Deny(reason) = permission::can_view_event(&event, &viewer) {
                debug!(event_id = %event.id, %reason, "View refused");
                record_counter(ACCESS_DENIED, 1);
                return Err(AccessError::PermissionDenied(reason));
            }

            redactor.apply_in_place(&mut event, &viewer);
            Ok(event)
        })
        .await
    }

    /// Shape a listing for `viewer`: drop what they may not see, drop
    /// blocked counterparts, redact the rest. Order is preserved.
    pub async fn browse(&self, events: Vec<Event>, viewer: ViewerContext) -> AccessResult<Vec<Event>> {
        let blocks = self.blocks.clone();
        let redactor = self.redactor.clone();

        Self::blocking(move || {
            let visible: Vec<Event> = events
                .into_iter()
                .filter(|event| permission::can_view_event(event, &viewer).is_allowed())
                .collect();

            let mut kept = blocks.filter_events(visible, &viewer)?;
            for event in &mut kept {
                redactor.apply_in_place(event, &viewer);
            }
            Ok(kept)
        })
        .await
    }

    // ===== Admission =====

    pub async fn join(&self, event_id: EventId, viewer: ViewerContext) -> AccessResult<()> {
        let admission = self.admission.clone();
        Self::blocking(move || admission.join(event_id, &viewer)).await
    }

    pub async fn leave(&self, event_id: EventId, viewer: ViewerContext) -> AccessResult<()> {
        let admission = self.admission.clone();
        Self::blocking(move || admission.leave(event_id, &viewer)).await
    }

    // ===== Blocks =====

    pub async fn are_blocked(&self, a: UserId, b: UserId) -> AccessResult<bool> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.are_blocked(a, b)).await
    }

    pub async fn filter_by_blocks(
        &self,
        events: Vec<Event>,
        viewer: ViewerContext,
    ) -> AccessResult<Vec<Event>> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.filter_events(events, &viewer)).await
    }

    pub async fn filter_participants(
        &self,
        participants: Vec<Participant>,
        viewer: ViewerContext,
    ) -> AccessResult<Vec<Participant>> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.filter_participants(participants, &viewer)).await
    }

    pub async fn block(
        &self,
        blocker: UserId,
        blocked: UserId,
        reason: Option<String>,
    ) -> AccessResult<()> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.block(blocker, blocked, reason.as_deref())).await
    }

    pub async fn unblock(&self, blocker: UserId, blocked: UserId) -> AccessResult<()> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.unblock(blocker, blocked)).await
    }

    pub async fn list_blocked(&self, blocker: UserId) -> AccessResult<Vec<BlockSummary>> {
        let blocks = self.blocks.clone();
        Self::blocking(move || blocks.list_blocked(blocker)).await
    }
}
