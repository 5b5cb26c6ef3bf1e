//! Test utilities shared by unit and integration tests
//!
//! Fixtures build seeded stores and event values; assertions give readable
//! failures for the access error taxonomy.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
