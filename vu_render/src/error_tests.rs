//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("mesh 12 not loaded".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("mesh 12"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no suitable GPU".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no suitable GPU");
}

#[test]
fn test_capacity_exceeded_display() {
    let err = Error::CapacityExceeded("positions pool full".to_string());
    assert_eq!(format!("{}", err), "Capacity exceeded: positions pool full");
}

#[test]
fn test_layout_mismatch_display() {
    let err = Error::LayoutMismatch("texture 64x64 vs 64x32".to_string());
    assert!(format!("{}", err).starts_with("Layout mismatch"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::CapacityExceeded("x".to_string()));
    assert!(debug.contains("CapacityExceeded"));
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::LayoutMismatch("count".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::OutOfMemory);
}

// ============================================================================
// RESULT TYPE
// ============================================================================

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::InvalidResource("missing".to_string()))
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert!(matches!(outer(), Err(Error::InvalidResource(_))));
}
