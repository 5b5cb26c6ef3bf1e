//! Visibility, redaction, block filtering and admission
//!
//! Every component receives its store through the traits in
//! [`crate::storage`]; [`AccessService`] wires them to one [`SqlStore`](crate::storage::SqlStore)
//! and exposes them as async calls.

pub mod admission;
pub mod blocks;
pub mod errors;
pub mod permission;
pub mod redaction;
pub mod roster;
pub mod service;

pub use admission::AdmissionController;
pub use blocks::BlockFilter;
pub use errors::{AccessError, AccessResult, ConflictKind, DenyReason, NotFoundKind};
pub use permission::{can_join, can_view, can_view_event, can_view_owned, AccessDecision};
pub use redaction::PrivacyRedactor;
pub use roster::RosterProjector;
pub use service::AccessService;
