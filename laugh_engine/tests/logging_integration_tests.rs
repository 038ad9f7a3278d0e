//! Integration tests for the engine logging system
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use laugh_engine::laugh::Engine;
use laugh_engine::laugh::log::{Logger, LogEntry, LogSeverity};
use laugh_engine::laugh::{Error, RendererConfig};
use laugh_engine::{engine_bail, engine_error, engine_info, engine_warn};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "test::module");
    assert_eq!(captured[1].message, "Test warning message");
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_macros_route_through_engine() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    engine_info!("laugh::test", "Loaded {} model(s)", 2);
    engine_warn!("laugh::test", "Cache at {} ignored", "brdf.dds");
    engine_error!("laugh::test", "Device lost");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].message, "Loaded 2 model(s)");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert!(captured[2].file.is_some() && captured[2].line.is_some());
    assert!(captured[0].file.is_none());
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_bail_logs_and_returns_backend_error() {
    fn failing() -> laugh_engine::laugh::Result<()> {
        engine_bail!("laugh::test", "Queue {} unavailable", "compute");
    }

    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    match failing() {
        Err(Error::BackendError(msg)) => assert_eq!(msg, "Queue compute unavailable"),
        other => panic!("expected backend error, got {:?}", other),
    }
    assert_eq!(entries.lock().unwrap().len(), 1);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_config_errors_are_not_logged() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    // validation reports through the Result only
    let result = RendererConfig::from_toml_str("[window]\nwidth = 0\n");
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert!(entries.lock().unwrap().is_empty());

    Engine::reset_logger();
}
