//! The exception funnel.

use std::{error::Error, sync::Arc};
use svcpool_core::ExceptionHandler;

/// Shared handle to the configured [`ExceptionHandler`].
#[derive(Clone)]
pub struct ExceptionFunnel {
    handler: Arc<dyn ExceptionHandler>,
}

impl ExceptionFunnel {
    /// Funnel every report into `handler`.
    pub fn new(handler: Arc<dyn ExceptionHandler>) -> Self {
        Self { handler }
    }

    /// Report one failure.
    ///
    /// A panicking handler is contained here so that reporting never takes the
    /// caller down with it.
    pub fn report(&self, error: &(dyn Error + 'static), message: &str) {
        let handler = &self.handler;
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.on_exception(error, message)
        }));
    }
}

impl Default for ExceptionFunnel {
    fn default() -> Self {
        Self::new(Arc::new(TracingHandler))
    }
}

/// Default handler: logs every failure at `warn` level.
///
/// Without the `tracing` feature, failures are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHandler;

impl ExceptionHandler for TracingHandler {
    fn on_exception(&self, error: &(dyn Error + 'static), message: &str) {
        #[cfg(feature = "tracing")]
        {
            tracing::warn!(error = %error, "{message}");
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = (error, message); // Suppress unused warning
        }
    }
}
