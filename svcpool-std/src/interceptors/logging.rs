//! Logging interceptor for call observation.

use svcpool_core::{Completion, Interceptor, Invocation};

/// An interceptor that logs every call and passes it on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, invocation: &Invocation, completion: Completion) {
        #[cfg(feature = "tracing")]
        {
            let method = invocation.method();
            tracing::info!(
                contract = method.contract(),
                method = method.name(),
                args = invocation.args().len(),
                "Invoking service"
            );
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = invocation; // Suppress unused warning
        }
        completion.next();
    }
}
