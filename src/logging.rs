use std::error::Error as StdError;
use tracing::{error, warn};

/// Sink for the generator's per-script diagnostics.
pub trait DiagnosticLogger: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str, err: &(dyn StdError + 'static));
}

/// Logger that forwards to `tracing`.
#[derive(Clone, Default)]
pub struct TracingLogger;

impl DiagnosticLogger for TracingLogger {
    fn warn(&self, message: &str) {
        warn!(target: "sightline::generator", "{message}");
    }

    fn error(&self, message: &str, err: &(dyn StdError + 'static)) {
        error!(target: "sightline::generator", error = %err, "{message}");
    }
}
