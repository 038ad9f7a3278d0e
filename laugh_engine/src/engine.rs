/// Laugh Engine - global logger access
///
/// The engine keeps one process-wide logger behind a RwLock so every
/// subsystem (core and backend) can log through the `engine_*!` macros
/// without threading a logger handle around.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Error;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

/// Engine singleton access point
///
/// # Example
///
/// ```no_run
/// use laugh_engine::laugh::{Engine, log::{DefaultLogger, LogSeverity}};
///
/// Engine::set_logger(DefaultLogger::new(LogSeverity::Info));
/// ```
pub struct Engine;

impl Engine {
    /// Log an error with its category, then hand it back (for `map_err` chains)
    pub fn log_and_return_error(source: &str, error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!(source, "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!(source, "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!(source, "Engine error: {}", error);
            }
        }
        error
    }

    /// Replace the global logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use laugh_engine::laugh::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger, all severities)
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
