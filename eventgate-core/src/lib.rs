//! EventGate core
//!
//! Visibility, admission and relationship filtering for community events.
//! The serving layer resolves the viewer's identity and hands this crate a
//! [`ViewerContext`]; everything else (who may see an event, what gets
//! redacted, whether a join fits, which blocked users disappear) is decided
//! here.

pub mod config;
pub mod core_access;
pub mod core_event;
pub mod logging;
pub mod metrics;
pub mod storage;
pub mod test_utils;

pub use config::Config;
pub use core_access::{
    AccessDecision, AccessError, AccessResult, AccessService, AdmissionController, BlockFilter,
    ConflictKind, DenyReason, NotFoundKind, PrivacyRedactor, RosterProjector,
};
pub use core_event::{
    BlockSummary, Event, EventId, Participant, PrivacySettings, Timestamp, UserId, ViewerContext,
};
pub use logging::{init_logging, LogLevel};
pub use storage::{SqlStore, StoreError};
