//! The exception funnel contract.

use std::error::Error;

/// Sink for every recoverable failure.
///
/// Bootstrap and resolution failures never reach the caller; they are reported
/// here instead. Failed proxied calls and failed combine attempts are reported here
/// as well as being returned. The host decides what to log or alert on.
///
/// Closures `Fn(&dyn Error, &str)` implement this trait.
pub trait ExceptionHandler: Send + Sync + 'static {
    /// Called once per failure. `message` names what was being done.
    fn on_exception(&self, error: &(dyn Error + 'static), message: &str);
}

impl<F> ExceptionHandler for F
where
    F: Fn(&(dyn Error + 'static), &str) + Send + Sync + 'static,
{
    fn on_exception(&self, error: &(dyn Error + 'static), message: &str) {
        self(error, message)
    }
}
