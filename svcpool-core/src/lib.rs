//! # svcpool-core
//!
//! Core contracts for the svcpool service locator.
//!
//! This crate has minimal dependencies and is meant to be imported by crates that
//! only declare contracts, implementations and interceptors, without pulling in
//! the controller from `svcpool-std`.
//!
//! # Building Blocks
//!
//! - [`Contract`]: a capability type (usually `dyn Trait`) with a stand-in used
//!   when nothing is registered for it.
//! - [`ServiceDescriptor`]: immutable metadata for one implementation (contracts,
//!   priority, [`Scope`], tag, path) plus its zero-argument factory.
//! - [`DescriptorSource`]: whoever supplies the descriptor list at bootstrap.
//! - [`Interceptor`]: a hook around proxied calls, answering through a
//!   [`Completion`].
//! - [`ExceptionHandler`]: the funnel every recoverable failure is reported to.
//! - [`CombineStrategy`]: how the attempts of a combine call are reduced.
//!
//! # Error Types
//!
//! - [`ServiceError`] - Top-level error type
//! - [`BootstrapError`], [`ResolutionError`] - recovered locally and reported
//! - [`InvocationError`] - returned from proxied calls
//! - [`CombineError`] - returned when every combine attempt fails

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod contract;
mod descriptor;
mod error;
mod handler;
mod interceptor;
mod source;
mod strategy;

// Re-exports
pub use contract::Contract;
pub use descriptor::{
    ContractId, DescriptorBuilder, ImplementationId, Instance, Priority, Scope, ServiceDescriptor,
};
pub use error::{
    AttemptError, AttemptFailure, BootstrapError, BoxError, CombineError, InvocationError,
    ResolutionError, ServiceError,
};
pub use handler::ExceptionHandler;
pub use interceptor::{
    Arg, Completion, InterceptResult, Interceptor, Invocation, Method, PendingCompletion,
};
pub use source::DescriptorSource;
pub use strategy::CombineStrategy;
