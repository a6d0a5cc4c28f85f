//! Closure-backed interceptor.

use std::fmt;
use svcpool_core::{BoxError, Completion, InterceptResult, Interceptor, Invocation};

/// An interceptor that decides synchronously through a closure.
///
/// # Example
///
/// ```rust,ignore
/// let deny_empty = FnInterceptor::new(|invocation: &Invocation| {
///     match invocation.arg::<String>(0) {
///         Some(name) if name.is_empty() => Err("empty name".into()),
///         _ => Ok(InterceptResult::Next),
///     }
/// });
/// ```
pub struct FnInterceptor<F> {
    decide: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(&Invocation) -> Result<InterceptResult, BoxError> + Send + Sync + 'static,
{
    /// Wrap `decide`.
    pub fn new(decide: F) -> Self {
        Self { decide }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&Invocation) -> Result<InterceptResult, BoxError> + Send + Sync + 'static,
{
    fn intercept(&self, invocation: &Invocation, completion: Completion) {
        completion.complete((self.decide)(invocation));
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").finish_non_exhaustive()
    }
}
