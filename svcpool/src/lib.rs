//! # svcpool - Runtime Service Locator
//!
//! `svcpool` resolves a contract (usually a trait object) to the
//! highest-priority registered implementation at runtime. When nothing is
//! registered, or the implementation fails to build, callers get the contract's
//! stand-in instead of an error. Misconfiguration never crashes the host.
//!
//! On top of plain resolution it offers:
//!
//! - **Interceptor proxies**: wrap an instance with a chain of interceptors that
//!   can pass, short-circuit or fail each call, synchronously or later.
//! - **Combine calls**: fan one call out to every implementation and reduce the
//!   results with a [`CombineStrategy`].
//! - **Path registry**: look implementations up by a string path.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use svcpool::prelude::*;
//! use std::sync::Arc;
//!
//! pub trait Printer: Send + Sync {
//!     fn print(&self, line: &str) -> usize;
//! }
//!
//! struct SilentPrinter;
//! impl Printer for SilentPrinter {
//!     fn print(&self, _line: &str) -> usize { 0 }
//! }
//! contract!(dyn Printer => SilentPrinter);
//!
//! #[derive(Default)]
//! struct ConsolePrinter;
//! impl Printer for ConsolePrinter {
//!     fn print(&self, line: &str) -> usize { println!("{line}"); line.len() }
//! }
//!
//! let controller = ServiceController::builder()
//!     .source(vec![
//!         ServiceDescriptor::with_default::<ConsolePrinter>()
//!             .provides::<dyn Printer>(|s| s as Arc<dyn Printer>)
//!             .build(),
//!     ])
//!     .build();
//!
//! controller.resolve::<dyn Printer>().print("hello");
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use svcpool_core::{
    // Descriptor model
    Arg,
    // Errors
    AttemptError,
    AttemptFailure,
    BootstrapError,
    BoxError,
    CombineError,
    // Combine
    CombineStrategy,
    // Interception
    Completion,
    // Contracts
    Contract,
    ContractId,
    DescriptorBuilder,
    // Sources
    DescriptorSource,
    // Exception funnel
    ExceptionHandler,
    ImplementationId,
    Instance,
    InterceptResult,
    Interceptor,
    Invocation,
    InvocationError,
    Method,
    PendingCompletion,
    Priority,
    ResolutionError,
    Scope,
    ServiceDescriptor,
    ServiceError,
    args,
    contract,
};

// Controller
pub use svcpool_std::{
    Attempt, CombineExecutor, CombineProxy, Combined, ExceptionFunnel, PoolConfig,
    ServiceController, ServiceControllerBuilder, ServiceProxy, TracingHandler,
};

#[cfg(feature = "inventory")]
pub use svcpool_std::{InventorySource, ServiceRegistration};

/// Standard interceptor implementations.
pub mod interceptors {
    pub use svcpool_std::interceptors::{DeferredInterceptor, FnInterceptor, LoggingInterceptor};
}

/// Testing utilities.
pub mod testing {
    pub use svcpool_std::testing::{
        CallLog, CountingFactory, RecordingHandler, RecordingInterceptor,
    };
}

/// Prelude module - common imports for svcpool.
///
/// # Usage
///
/// ```rust,ignore
/// use svcpool::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Errors
        BoxError,
        // Combine
        CombineStrategy,
        Combined,
        // Interception
        Completion,
        // Core
        Contract,
        InterceptResult,
        Interceptor,
        Invocation,
        Priority,
        Scope,
        ServiceController,
        ServiceDescriptor,
        ServiceProxy,
        args,
        contract,
    };
}

#[cfg(feature = "macros")]
pub use svcpool_macros::service;

#[cfg(feature = "inventory")]
pub use inventory;
