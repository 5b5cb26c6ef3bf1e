//! Persistence for events, participations and block edges
//!
//! Components depend on the traits in [`traits`]; [`SqlStore`] is the SQLite
//! implementation used in production and tests.

pub mod errors;
pub mod migrations;
pub mod sql_store;
pub mod traits;

pub use errors::{StoreError, StoreResult};
pub use migrations::{migrate, rollback_to, CURRENT_SCHEMA_VERSION};
pub use sql_store::SqlStore;
pub use traits::{AdmitOutcome, BlockInsert, EventStore, ParticipationStore, RelationshipStore};
