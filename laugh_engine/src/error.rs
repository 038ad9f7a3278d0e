//! Error types for the Laugh engine
//!
//! This module defines the error types used throughout the engine,
//! including device setup, resource creation, configuration and the
//! precompute cache.
//!
//! Swapchain staleness (out-of-date / suboptimal) is deliberately NOT an
//! error: it is reported through `AcquireOutcome` / `PresentOutcome`.

use std::fmt;

/// Result type for Laugh engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Laugh engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, render pass, pipeline, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, renderer, subsystems)
    InitializationFailed(String),

    /// Configuration rejected at startup
    InvalidConfig(String),

    /// A descriptor allocation would exceed the pool sized at load time
    DescriptorPoolExhausted(String),

    /// File system failure (precompute cache, config file)
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::DescriptorPoolExhausted(msg) => write!(f, "Descriptor pool exhausted: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` with the same message
///
/// # Example
///
/// ```no_run
/// # use laugh_engine::engine_err;
/// let err = engine_err!("laugh::PassGraph", "Pass {} not found", 3);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::laugh::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN and build an `Error::BackendError` with the same message
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::laugh::Error::BackendError(message)
    }};
}

/// Log a WARN and return `Err(Error::BackendError)` from the current function
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
