//! # svcpool-std
//!
//! Standard implementations for the svcpool service registry.
//!
//! This crate provides:
//! - **Controller**: [`ServiceController`] with lazy bootstrap, priority
//!   resolution, stand-in fallback and the path registry
//! - **Proxies**: [`ServiceProxy`] for interceptor chains
//! - **Combine**: [`CombineProxy`] fan-out over a bounded worker pool
//! - **Standard interceptors**: Logging, Fn, Deferred
//! - **Link-time registration**: [`InventorySource`] (feature `inventory`)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use svcpool_core;

// Modules
pub mod combine;
pub mod config;
pub mod controller;
pub mod funnel;
pub mod interceptors;
#[cfg(feature = "inventory")]
pub mod loader;
pub mod proxy;
pub mod testing;

mod factory;
mod noop;
mod panic;

pub use combine::{Attempt, CombineExecutor, CombineProxy, Combined};
pub use config::PoolConfig;
pub use controller::{ServiceController, ServiceControllerBuilder};
pub use funnel::{ExceptionFunnel, TracingHandler};
pub use interceptors::{DeferredInterceptor, FnInterceptor, LoggingInterceptor};
#[cfg(feature = "inventory")]
pub use loader::{InventorySource, ServiceRegistration};
pub use proxy::ServiceProxy;

#[cfg(feature = "inventory")]
pub use inventory;
