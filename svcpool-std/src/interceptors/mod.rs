//! Standard interceptors.

mod deferred;
mod func;
mod logging;

pub use deferred::DeferredInterceptor;
pub use func::FnInterceptor;
pub use logging::LoggingInterceptor;
