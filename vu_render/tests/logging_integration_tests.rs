//! Integration tests for the Engine logger registry and the engine_* macros
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use std::sync::{Arc, Mutex};
use serial_test::serial;
use vu_render::vu::log::{LogEntry, LogSeverity, Logger};
use vu_render::vu::{Engine, Error, Result};

// ============================================================================
// TEST LOGGER
// ============================================================================

/// Captures entries for inspection
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(Self { entries: entries.clone() });
        entries
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(LogEntry {
            severity: entry.severity,
            timestamp: entry.timestamp,
            source: entry.source.clone(),
            message: entry.message.clone(),
            file: entry.file,
            line: entry.line,
        });
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger_receives_all_severities() {
    let entries = TestLogger::install();

    Engine::log(LogSeverity::Trace, "test", "trace".to_string());
    Engine::log(LogSeverity::Debug, "test", "debug".to_string());
    Engine::log(LogSeverity::Info, "test", "info".to_string());
    Engine::log(LogSeverity::Warn, "test", "warn".to_string());
    Engine::log(LogSeverity::Error, "test", "error".to_string());

    let captured = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = captured.iter().map(|e| e.severity).collect();
    assert_eq!(severities, vec![
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ]);
    assert!(captured.iter().all(|e| e.source == "test" && e.file.is_none()));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let entries = TestLogger::install();
    Engine::log(LogSeverity::Info, "test", "captured".to_string());

    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "test", "to stdout".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
#[serial]
fn test_integration_error_macro_records_location() {
    let entries = TestLogger::install();

    vu_render::engine_error!("vu::test", "device lost after {} frames", 12);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, "vu::test");
    assert_eq!(captured[0].message, "device lost after 12 frames");
    assert!(captured[0].file.is_some_and(|f| f.ends_with("logging_integration_tests.rs")));
    assert!(captured[0].line.is_some());
    drop(captured);

    Engine::reset_logger();
}

fn failing_upload(size: u64) -> Result<()> {
    if size > 64 {
        vu_render::engine_bail!("vu::test", "upload of {} bytes rejected", size);
    }
    Ok(())
}

#[test]
#[serial]
fn test_integration_bail_logs_and_returns_backend_error() {
    let entries = TestLogger::install();

    assert!(failing_upload(16).is_ok());
    let err = failing_upload(128).unwrap_err();
    assert!(matches!(&err, Error::BackendError(msg) if msg == "upload of 128 bytes rejected"));

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_warn_err_logs_at_warn() {
    let entries = TestLogger::install();

    let err = vu_render::engine_warn_err!("vu::test", "shader '{}' not found", "sprite");
    assert!(matches!(err, Error::BackendError(_)));

    let captured = entries.lock().unwrap();
    assert_eq!(captured[0].severity, LogSeverity::Warn);
    assert_eq!(captured[0].message, "shader 'sprite' not found");
    drop(captured);

    Engine::reset_logger();
}
