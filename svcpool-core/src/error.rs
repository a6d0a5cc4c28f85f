//! Error types for svcpool.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`ServiceError`] - Top-level error type for all svcpool operations
//! - [`BootstrapError`] - Errors while loading descriptors and building the index
//! - [`ResolutionError`] - Errors while instantiating an implementation
//! - [`InvocationError`] - Errors raised through a proxied call
//! - [`CombineError`] - Errors from a combine call where no attempt succeeded

use crate::descriptor::ImplementationId;
use crate::interceptor::Method;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all svcpool operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Loading descriptors or building the index failed.
    #[error("bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// An implementation could not be instantiated.
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// A proxied call failed.
    #[error("invocation error: {0}")]
    Invocation(#[from] InvocationError),

    /// Every attempt of a combine call failed.
    #[error("combine error: {0}")]
    Combine(#[from] CombineError),
}

/// Errors that can occur while loading descriptors.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The descriptor source returned an error.
    #[error("descriptor source failed")]
    Source(#[source] BoxError),

    /// The descriptor source panicked.
    #[error("descriptor source panicked: {0}")]
    SourcePanicked(String),

    /// Descriptors were offered after the bootstrap phase closed.
    #[error("bootstrap phase already closed, {count} descriptor(s) ignored")]
    Closed {
        /// Number of rejected descriptors.
        count: usize,
    },

    /// The same implementation was registered twice; the later one is dropped.
    #[error("implementation `{0}` registered more than once")]
    DuplicateImplementation(ImplementationId),
}

/// Errors that can occur while producing an instance.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The implementation factory returned an error.
    #[error("failed to instantiate `{implementation}`")]
    Instantiation {
        /// The implementation being built.
        implementation: ImplementationId,
        /// The factory error.
        #[source]
        source: BoxError,
    },

    /// The implementation factory panicked.
    #[error("`{implementation}` panicked during instantiation: {message}")]
    Panicked {
        /// The implementation being built.
        implementation: ImplementationId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The descriptor does not bind the requested contract.
    #[error("`{implementation}` does not provide `{contract}`")]
    ContractMismatch {
        /// The implementation that was selected.
        implementation: ImplementationId,
        /// The requested contract.
        contract: &'static str,
    },

    /// No descriptor is indexed under the requested implementation.
    #[error("no implementation registered as `{0}`")]
    NotRegistered(ImplementationId),
}

/// Errors raised through a proxied call.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// An interceptor aborted the call.
    #[error("interceptor aborted `{method}`")]
    Interceptor {
        /// The intercepted method.
        method: Method,
        /// The interceptor's error.
        #[source]
        source: BoxError,
    },

    /// The wrapped method itself failed.
    #[error("`{method}` failed")]
    Target {
        /// The called method.
        method: Method,
        /// The method's own error.
        #[source]
        source: BoxError,
    },

    /// An interceptor or the wrapped method panicked.
    #[error("`{method}` panicked: {message}")]
    Panicked {
        /// The called method.
        method: Method,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// An interceptor dropped its completion without signalling it.
    #[error("interceptor dropped the completion of `{method}`")]
    Abandoned {
        /// The intercepted method.
        method: Method,
    },

    /// An interceptor short-circuited with a value of the wrong type.
    #[error("short-circuit value for `{method}` is not a `{expected}`")]
    ReturnType {
        /// The intercepted method.
        method: Method,
        /// The type the caller expected.
        expected: &'static str,
    },
}

impl InvocationError {
    /// The method the failed call was made on.
    pub fn method(&self) -> Method {
        match self {
            Self::Interceptor { method, .. }
            | Self::Target { method, .. }
            | Self::Panicked { method, .. }
            | Self::Abandoned { method }
            | Self::ReturnType { method, .. } => *method,
        }
    }

    /// Returns the wrapped method's own error, if the target failed.
    pub fn target_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Target { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Failure of a single combine attempt.
#[derive(Error, Debug)]
pub enum AttemptError {
    /// The call returned an error.
    #[error(transparent)]
    Failed(BoxError),

    /// The call panicked.
    #[error("attempt panicked: {0}")]
    Panicked(String),

    /// The call did not finish before its deadline.
    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    /// The implementation could not be instantiated.
    #[error("instance unavailable: {0}")]
    Resolution(#[from] ResolutionError),

    /// The worker pool refused the attempt.
    #[error("worker pool is shut down")]
    Rejected,

    /// The attempt was dropped without producing a result.
    #[error("attempt was dropped before completing")]
    Abandoned,
}

/// A failed attempt together with the implementation it ran against.
#[derive(Error, Debug)]
#[error("`{implementation}` (priority {priority}) failed: {error}")]
pub struct AttemptFailure {
    /// The implementation the attempt ran against.
    pub implementation: ImplementationId,
    /// The descriptor priority.
    pub priority: i32,
    /// What went wrong.
    #[source]
    pub error: AttemptError,
}

/// Errors that can occur in a combine call.
#[derive(Error, Debug)]
pub enum CombineError {
    /// The contract has no registered implementations.
    #[error("no implementations registered for `{contract}`")]
    NoImplementations {
        /// The contract that was combined.
        contract: &'static str,
    },

    /// Every attempt failed.
    #[error("all {} implementation(s) of `{contract}` failed", .failures.len())]
    AllFailed {
        /// The contract that was combined.
        contract: &'static str,
        /// Every underlying failure, in priority order.
        failures: Vec<AttemptFailure>,
    },
}

impl CombineError {
    /// Underlying failures, empty unless every attempt failed.
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::AllFailed { failures, .. } => failures,
            Self::NoImplementations { .. } => &[],
        }
    }
}
