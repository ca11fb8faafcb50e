//! Small cross-cutting helpers shared by the executor and the session:
//! a pluggable [`Logger`], and a log-friendly string truncator.

mod logger;
mod truncate;

pub use logger::{Logger, NoopLogger, TracingLogger};
pub use truncate::truncate_for_log;
