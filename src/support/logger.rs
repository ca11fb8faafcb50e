//! The `Logger` collaborator named in spec.md §1 — a sink for structured
//! debug/info/warn/error messages. The executor and session depend on the
//! trait only; callers may plug in anything, including their own
//! application logger. [`NoopLogger`] is the default (spec.md §2 item 4);
//! [`TracingLogger`] forwards to the `tracing` macros the way the teacher's
//! `main.rs`/`stdio_service.rs` set up `tracing_subscriber`.

/// Sink for structured log messages emitted at the suspension points listed
/// in spec.md §5 (transport calls, login/logout callbacks, heartbeat fires,
/// redirect hops, decompression).
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Discards every message. Used when a session/executor is constructed
/// without an explicit logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Forwards to `tracing::{debug,info,warn,error}!` under the
/// `shadow_session` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "shadow_session", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "shadow_session", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "shadow_session", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "shadow_session", "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingLogger(Arc<Mutex<Vec<String>>>);

    impl Logger for RecordingLogger {
        fn debug(&self, message: &str) {
            self.0.lock().unwrap().push(format!("DEBUG {message}"));
        }
        fn info(&self, message: &str) {
            self.0.lock().unwrap().push(format!("INFO {message}"));
        }
        fn warn(&self, message: &str) {
            self.0.lock().unwrap().push(format!("WARN {message}"));
        }
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(format!("ERROR {message}"));
        }
    }

    #[test]
    fn noop_logger_swallows_everything() {
        let logger = NoopLogger;
        logger.debug("x");
        logger.info("x");
        logger.warn("x");
        logger.error("x");
    }

    #[test]
    fn custom_logger_receives_messages() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let logger = RecordingLogger(log.clone());
        logger.info("hello");
        logger.error("boom");
        assert_eq!(*log.lock().unwrap(), vec!["INFO hello", "ERROR boom"]);
    }
}
