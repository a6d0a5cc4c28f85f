//! Testing utilities for svcpool.
//!
//! This module provides helpers to observe what the controller does in tests.
//!
//! # Features
//!
//! - [`RecordingHandler`]: An exception handler that records every report
//! - [`RecordingInterceptor`]: An interceptor that logs its label and then passes,
//!   short-circuits or fails
//! - [`CountingFactory`]: Descriptor factories that count instantiations

use parking_lot::Mutex;
use std::{
    any::Any,
    error::Error,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use svcpool_core::{
    BoxError, Completion, DescriptorBuilder, ExceptionHandler, InterceptResult, Interceptor,
    Invocation, ServiceDescriptor,
};

// ============================================================================
// Recording Handler
// ============================================================================

/// An exception handler that records every report.
///
/// Clones share the same record.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// let controller = ServiceController::builder()
///     .exception_handler(recorder.clone())
///     .build();
///
/// controller.resolve::<dyn Printer>();
/// assert_eq!(recorder.count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct RecordingHandler {
    reports: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingHandler {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Rendered errors, in report order.
    pub fn errors(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Number of reports.
    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }

    /// Forget every report.
    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl ExceptionHandler for RecordingHandler {
    fn on_exception(&self, error: &(dyn Error + 'static), message: &str) {
        self.reports
            .lock()
            .push((message.to_owned(), error.to_string()));
    }
}

// ============================================================================
// Recording Interceptor
// ============================================================================

/// Shared, ordered log of interceptor labels.
pub type CallLog = Arc<Mutex<Vec<String>>>;

type MakeValue = dyn Fn() -> Box<dyn Any + Send> + Send + Sync;

enum Decision {
    Next,
    Stop(Arc<MakeValue>),
    Fail(String),
}

/// An interceptor that appends its label to a [`CallLog`], then decides.
///
/// # Example
///
/// ```rust,ignore
/// let log = RecordingInterceptor::log();
/// let chain: Vec<Arc<dyn Interceptor>> = vec![
///     Arc::new(RecordingInterceptor::passing("a", &log)),
///     Arc::new(RecordingInterceptor::passing("b", &log)),
/// ];
/// ```
pub struct RecordingInterceptor {
    label: String,
    log: CallLog,
    decision: Decision,
}

impl RecordingInterceptor {
    /// A fresh, empty log.
    pub fn log() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Log, then pass the call on.
    pub fn passing(label: impl Into<String>, log: &CallLog) -> Self {
        Self::with(label, log, Decision::Next)
    }

    /// Log, then short-circuit with a clone of `value`.
    pub fn stopping<T>(label: impl Into<String>, log: &CallLog, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let make = move || Box::new(value.clone()) as Box<dyn Any + Send>;
        Self::with(label, log, Decision::Stop(Arc::new(make)))
    }

    /// Log, then abort the call with `message`.
    pub fn failing(label: impl Into<String>, log: &CallLog, message: impl Into<String>) -> Self {
        Self::with(label, log, Decision::Fail(message.into()))
    }

    fn with(label: impl Into<String>, log: &CallLog, decision: Decision) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
            decision,
        }
    }
}

impl Interceptor for RecordingInterceptor {
    fn intercept(&self, _invocation: &Invocation, completion: Completion) {
        self.log.lock().push(self.label.clone());
        match &self.decision {
            Decision::Next => completion.next(),
            Decision::Stop(make) => completion.complete(Ok(InterceptResult::Return(make()))),
            Decision::Fail(message) => completion.fail(message.clone()),
        }
    }
}

// ============================================================================
// Counting Factory
// ============================================================================

/// Descriptor factories that count how often they instantiate.
///
/// Clones share the same counter.
#[derive(Clone, Default)]
pub struct CountingFactory {
    count: Arc<AtomicUsize>,
}

impl CountingFactory {
    /// Create a factory counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiations so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// A descriptor builder for `T` that counts `T::default()` calls.
    pub fn builder<T>(&self) -> DescriptorBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        self.builder_with(|| Ok(T::default()))
    }

    /// A descriptor builder for `T` that counts calls of `factory`.
    pub fn builder_with<T, F>(&self, factory: F) -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let count = Arc::clone(&self.count);
        ServiceDescriptor::builder(move || {
            count.fetch_add(1, Ordering::SeqCst);
            factory()
        })
    }
}
