//! Error types for the vu renderer
//!
//! This module defines the error types used throughout the renderer,
//! including initialization, resource management and pool exhaustion.

use std::fmt;

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, lost device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown ID, malformed buffer, missing byte-code, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, passes)
    InitializationFailed(String),

    /// A fixed-size pool or budget is full (vertex pools, material slots, uniform regions)
    CapacityExceeded(String),

    /// New data does not match the shape of the data it replaces
    LayoutMismatch(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            Error::LayoutMismatch(msg) => write!(f, "Layout mismatch: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
