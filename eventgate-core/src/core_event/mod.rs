//! Event data model
//!
//! Events, rosters, block summaries and the per-request [`ViewerContext`].

pub mod event;
pub mod types;
pub mod viewer;

pub use event::{
    BlockSummary, Event, EventAccess, NewEvent, NewUser, Participant, PrivacySettings,
};
pub use types::{EventId, Timestamp, UserId};
pub use viewer::ViewerContext;
