//! Assertions for access results

use crate::core_access::{AccessError, AccessResult, ConflictKind, DenyReason, NotFoundKind};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that the call was denied for `reason`
pub fn assert_denied<T: Debug>(result: AccessResult<T>, reason: DenyReason) {
    match result {
        Err(AccessError::PermissionDenied(actual)) if actual == reason => {}
        other => panic!("Expected PermissionDenied({:?}), got {:?}", reason, other),
    }
}

/// Assert that the call failed with the given conflict
pub fn assert_conflict<T: Debug>(result: AccessResult<T>, kind: ConflictKind) {
    match result {
        Err(AccessError::Conflict(actual)) if actual == kind => {}
        other => panic!("Expected Conflict({:?}), got {:?}", kind, other),
    }
}

/// Assert that the call failed with the given not-found kind
pub fn assert_not_found<T: Debug>(result: AccessResult<T>, kind: NotFoundKind) {
    match result {
        Err(AccessError::NotFound(actual)) if actual == kind => {}
        other => panic!("Expected NotFound({:?}), got {:?}", kind, other),
    }
}

pub fn assert_full<T: Debug>(result: AccessResult<T>) {
    if !matches!(result, Err(AccessError::CapacityExceeded)) {
        panic!("Expected CapacityExceeded, got {:?}", result);
    }
}
