//! # Combine
//!
//! A [`CombineProxy`] fans one call out to every implementation of a contract
//! and reduces the results with a [`CombineStrategy`]:
//!
//! | Strategy | Result |
//! |---|---|
//! | `All` | every attempt, in priority order |
//! | `FirstSuccess` | the first success to complete |
//! | `Priority` | the highest-priority success |
//! | `Fastest` | the first attempt to complete, success or failure, unless all fail |
//!
//! Attempts run on the controller's [`CombineExecutor`]. Once the call is
//! decided, attempts still queued are skipped and late results are dropped.
//! Every failed attempt is reported to the exception handler exactly once, and
//! every strategy fails with `AllFailed` when no attempt succeeds.

mod executor;
mod reduce;

pub use executor::CombineExecutor;

use crate::{
    controller::index::ServiceEntry, factory, funnel::ExceptionFunnel, panic::panic_message,
};
use crossbeam_channel::{RecvTimeoutError, unbounded};
use reduce::Reducer;
use std::{
    any::type_name,
    fmt,
    marker::PhantomData,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};
use svcpool_core::{
    AttemptError, BoxError, CombineError, CombineStrategy, ImplementationId, Method,
    ResolutionError,
};

/// The result of one implementation's attempt.
#[derive(Debug)]
pub struct Attempt<R> {
    /// The implementation the attempt ran against.
    pub implementation: ImplementationId,
    /// Its descriptor priority.
    pub priority: i32,
    /// Its descriptor tag.
    pub tag: String,
    /// What the call returned.
    pub result: Result<R, AttemptError>,
}

impl<R> Attempt<R> {
    pub(crate) fn new(entry: &ServiceEntry, result: Result<R, AttemptError>) -> Self {
        let descriptor = entry.descriptor();
        Self {
            implementation: descriptor.implementation(),
            priority: descriptor.priority(),
            tag: descriptor.tag().to_owned(),
            result,
        }
    }

    /// The returned value, if the attempt succeeded.
    pub fn value(&self) -> Option<&R> {
        self.result.as_ref().ok()
    }

    /// Whether the attempt succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of a combine call.
#[derive(Debug)]
pub enum Combined<R> {
    /// Every attempt, in priority order (`All`).
    All(Vec<Attempt<R>>),
    /// The selected attempt (`FirstSuccess`, `Priority`, `Fastest`).
    One(Attempt<R>),
}

impl<R> Combined<R> {
    /// The attempts carried by this outcome.
    pub fn attempts(&self) -> &[Attempt<R>] {
        match self {
            Self::All(attempts) => attempts,
            Self::One(attempt) => std::slice::from_ref(attempt),
        }
    }

    /// Consume the outcome into its attempts.
    pub fn into_attempts(self) -> Vec<Attempt<R>> {
        match self {
            Self::All(attempts) => attempts,
            Self::One(attempt) => vec![attempt],
        }
    }

    /// The first successful value, in priority order for `All`.
    pub fn value(&self) -> Option<&R> {
        self.attempts().iter().find_map(Attempt::value)
    }

    /// Consume the outcome into its first successful value.
    pub fn into_value(self) -> Option<R> {
        self.into_attempts()
            .into_iter()
            .find_map(|attempt| attempt.result.ok())
    }

    /// Every successful value.
    pub fn successes(&self) -> impl Iterator<Item = &R> {
        self.attempts().iter().filter_map(Attempt::value)
    }
}

struct InFlight {
    settled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Fans calls out to every implementation of contract `C`.
pub struct CombineProxy<C: ?Sized> {
    participants: Vec<Arc<ServiceEntry>>,
    strategy: CombineStrategy,
    timeout: Option<Duration>,
    executor: Arc<CombineExecutor>,
    funnel: ExceptionFunnel,
    _contract: PhantomData<fn(&C)>,
}

impl<C> CombineProxy<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(
        participants: Vec<Arc<ServiceEntry>>,
        strategy: CombineStrategy,
        timeout: Option<Duration>,
        executor: Arc<CombineExecutor>,
        funnel: ExceptionFunnel,
    ) -> Self {
        Self {
            participants,
            strategy,
            timeout,
            executor,
            funnel,
            _contract: PhantomData,
        }
    }

    /// Use `strategy` for subsequent calls.
    pub fn with_strategy(mut self, strategy: CombineStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bound each attempt by `timeout`, measured from its submission.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The active strategy.
    pub fn strategy(&self) -> CombineStrategy {
        self.strategy
    }

    /// Number of participating implementations.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether no implementation participates.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Call `method` on every implementation and reduce the results.
    ///
    /// # Errors
    ///
    /// - [`CombineError::NoImplementations`] when nothing implements `C`.
    /// - [`CombineError::AllFailed`] when the strategy found no success; it
    ///   carries every underlying failure in priority order.
    pub fn invoke<R, F>(&self, method: &'static str, call: F) -> Result<Combined<R>, CombineError>
    where
        R: Send + 'static,
        F: Fn(&C) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        let contract = type_name::<C>();
        if self.participants.is_empty() {
            return Err(CombineError::NoImplementations { contract });
        }

        let method = Method::of::<C>(method);
        let call = Arc::new(call);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (results_tx, results_rx) = unbounded::<(usize, Result<R, AttemptError>)>();
        let mut reducer = Reducer::new(self.strategy, self.participants.len());
        let mut in_flight = Vec::with_capacity(self.participants.len());

        for (rank, entry) in self.participants.iter().enumerate() {
            let settled = Arc::new(AtomicBool::new(false));
            let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

            let job = {
                let entry = Arc::clone(entry);
                let call = Arc::clone(&call);
                let cancelled = Arc::clone(&cancelled);
                let settled = Arc::clone(&settled);
                let results_tx = results_tx.clone();
                let funnel = self.funnel.clone();
                move || {
                    if cancelled.load(Ordering::Acquire) {
                        return;
                    }
                    let result = run_attempt::<C, R, F>(&entry, &*call);
                    if settled.swap(true, Ordering::AcqRel) {
                        // The caller already gave up on this attempt.
                        return;
                    }
                    if let Err(err) = &result {
                        report_attempt(&funnel, method, &entry, err);
                    }
                    let _ = results_tx.send((rank, result));
                }
            };

            if self.executor.submit(job).is_err() {
                settled.store(true, Ordering::Release);
                let err = AttemptError::Rejected;
                report_attempt(&self.funnel, method, entry, &err);
                reducer.accept(rank, Err(err));
            }
            in_flight.push(InFlight { settled, deadline });
        }
        drop(results_tx);

        let verdict = loop {
            if let Some(verdict) = reducer.decide() {
                break verdict;
            }

            let next_deadline = in_flight
                .iter()
                .filter(|attempt| !attempt.settled.load(Ordering::Acquire))
                .filter_map(|attempt| attempt.deadline)
                .min();
            let received = match next_deadline {
                Some(deadline) => results_rx.recv_deadline(deadline),
                None => results_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok((rank, result)) => {
                    reducer.accept(rank, result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    let limit = self.timeout.unwrap_or_default();
                    for (rank, attempt) in in_flight.iter().enumerate() {
                        let expired = attempt.deadline.is_some_and(|deadline| deadline <= now);
                        if expired && !attempt.settled.swap(true, Ordering::AcqRel) {
                            let err = AttemptError::TimedOut(limit);
                            report_attempt(&self.funnel, method, &self.participants[rank], &err);
                            reducer.accept(rank, Err(err));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Every job is gone; whatever never settled was dropped unrun.
                    for (rank, attempt) in in_flight.iter().enumerate() {
                        if !attempt.settled.swap(true, Ordering::AcqRel) {
                            let err = AttemptError::Abandoned;
                            report_attempt(&self.funnel, method, &self.participants[rank], &err);
                            reducer.accept(rank, Err(err));
                        }
                    }
                }
            }
        };

        cancelled.store(true, Ordering::Release);
        drop(results_rx);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %method,
            strategy = ?self.strategy,
            participants = self.participants.len(),
            settled = reducer.settled(),
            "combine call decided"
        );

        reducer.finish(verdict, &self.participants, contract)
    }
}

impl<C: ?Sized> fmt::Debug for CombineProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombineProxy")
            .field("contract", &type_name::<C>())
            .field("participants", &self.participants.len())
            .field("strategy", &self.strategy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn run_attempt<C, R, F>(entry: &ServiceEntry, call: &F) -> Result<R, AttemptError>
where
    C: ?Sized + 'static,
    F: Fn(&C) -> Result<R, BoxError>,
{
    let descriptor = entry.descriptor();
    let instance = factory::obtain(entry)?;
    let target = descriptor
        .cast::<C>(&instance)
        .ok_or_else(|| ResolutionError::ContractMismatch {
            implementation: descriptor.implementation(),
            contract: type_name::<C>(),
        })?;
    match catch_unwind(AssertUnwindSafe(|| call(&*target))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AttemptError::Failed(err)),
        Err(payload) => Err(AttemptError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn report_attempt(funnel: &ExceptionFunnel, method: Method, entry: &ServiceEntry, err: &AttemptError) {
    let implementation = entry.descriptor().implementation();
    funnel.report(err, &format!("combining `{method}` on `{implementation}`"));
}
