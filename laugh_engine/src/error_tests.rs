//! Unit tests for error.rs
//!
//! Tests all Error variants, their trait implementations and the error macros.

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
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("subpass 3 out of range".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("subpass 3"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no graphics queue".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("no graphics queue"));
}

#[test]
fn test_invalid_config_display() {
    let err = Error::InvalidConfig("lights must not be empty".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid configuration"));
    assert!(display.contains("lights"));
}

#[test]
fn test_descriptor_pool_exhausted_display() {
    let err = Error::DescriptorPoolExhausted("combined image samplers".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Descriptor pool exhausted"));
    assert!(display.contains("combined image samplers"));
}

#[test]
fn test_io_display() {
    let err = Error::Io("permission denied".to_string());
    assert_eq!(format!("{}", err), "I/O error: permission denied");
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
fn test_error_clone() {
    let err1 = Error::DescriptorPoolExhausted("sets".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

#[test]
fn test_error_from_io_error() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing brdf.dds");
    let err: Error = io.into();
    match err {
        Error::Io(msg) => assert!(msg.contains("missing brdf.dds")),
        other => panic!("unexpected variant: {:?}", other),
    }
}

// ============================================================================
// RESULT TYPE / MACRO TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::OutOfMemory)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(outer().is_err());
}

#[test]
fn test_engine_err_builds_backend_error() {
    let err = crate::engine_err!("laugh::test", "value {} rejected", 7);
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "value 7 rejected"),
        other => panic!("unexpected variant: {:?}", other),
    }
}

#[test]
fn test_engine_bail_returns_early() {
    fn check(value: u32) -> Result<u32> {
        if value > 3 {
            crate::engine_bail!("laugh::test", "value {} too large", value);
        }
        Ok(value)
    }

    assert_eq!(check(2).unwrap(), 2);
    assert!(check(9).is_err());
}

#[test]
fn test_engine_bail_warn_returns_early() {
    fn check(flag: bool) -> Result<()> {
        if flag {
            crate::engine_bail_warn!("laugh::test", "flag set");
        }
        Ok(())
    }

    assert!(check(false).is_ok());
    assert!(matches!(check(true), Err(Error::BackendError(_))));
}
