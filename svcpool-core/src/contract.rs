//! Contracts and their stand-ins.

use std::sync::Arc;

/// A capability type that can be resolved from a controller.
///
/// Contracts are usually trait objects (`dyn Printer`), but a concrete type can be
/// a contract too when callers pin one implementation. Every contract names a
/// stand-in: a safe default returned when nothing is registered for it. A
/// stand-in must have no side effects and must never fail.
///
/// Use [`contract!`](crate::contract) to implement this trait.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a contract",
    label = "missing `Contract` implementation",
    note = "Declare the stand-in with `contract!({Self} => ...)`."
)]
pub trait Contract: Send + Sync + 'static {
    /// Build the stand-in returned when no implementation is registered.
    fn stand_in() -> Arc<Self>;
}

/// Declare a contract and its stand-in.
///
/// # Example
///
/// ```rust,ignore
/// pub trait Printer: Send + Sync {
///     fn print(&self, line: &str) -> usize;
/// }
///
/// #[derive(Default)]
/// struct SilentPrinter;
///
/// impl Printer for SilentPrinter {
///     fn print(&self, _line: &str) -> usize {
///         0
///     }
/// }
///
/// contract!(dyn Printer => SilentPrinter);
/// ```
#[macro_export]
macro_rules! contract {
    ($contract:ty => $stand_in:expr) => {
        impl $crate::Contract for $contract {
            fn stand_in() -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new($stand_in)
            }
        }
    };
}
