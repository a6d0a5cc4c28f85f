//! Interceptor that decides off the calling thread.

use std::{fmt, sync::Arc, thread};
use svcpool_core::{BoxError, Completion, InterceptResult, Interceptor, Invocation};

type Decide = dyn Fn(&Invocation) -> Result<InterceptResult, BoxError> + Send + Sync;

/// An interceptor whose decision is computed on a background thread.
///
/// The proxied call blocks until the background decision signals the
/// completion. Useful when the decision waits on something slow, such as a
/// remote permission check.
///
/// Every intercepted call spawns its own OS thread, and nothing bounds how many
/// run at once. Keep it off hot paths called from many threads.
#[derive(Clone)]
pub struct DeferredInterceptor {
    decide: Arc<Decide>,
}

impl DeferredInterceptor {
    /// Run `decide` on a new thread for every call.
    pub fn new<F>(decide: F) -> Self
    where
        F: Fn(&Invocation) -> Result<InterceptResult, BoxError> + Send + Sync + 'static,
    {
        Self {
            decide: Arc::new(decide),
        }
    }
}

impl Interceptor for DeferredInterceptor {
    fn intercept(&self, invocation: &Invocation, completion: Completion) {
        let decide = Arc::clone(&self.decide);
        let invocation = invocation.clone();
        // The completion moves over only once the thread exists, so a failed
        // spawn can still signal it.
        let (handoff_tx, handoff_rx) = crossbeam_channel::bounded::<Completion>(1);

        let spawned = thread::Builder::new()
            .name("svcpool-deferred".into())
            .spawn(move || {
                if let Ok(completion) = handoff_rx.recv() {
                    completion.complete(decide(&invocation));
                }
            });

        match spawned {
            Ok(_) => {
                let _ = handoff_tx.send(completion);
            }
            Err(err) => completion.fail(err),
        }
    }
}

impl fmt::Debug for DeferredInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredInterceptor").finish_non_exhaustive()
    }
}
