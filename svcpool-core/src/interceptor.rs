//! # Interception Layer
//!
//! Every call made through a proxy is described by an [`Invocation`] and offered
//! to each [`Interceptor`] of the chain in order. An interceptor answers through a
//! one-shot [`Completion`]:
//!
//! - [`Completion::next`]: pass the call on to the next interceptor, or to the
//!   real method when the chain is exhausted.
//! - [`Completion::stop`]: short-circuit with a final value; the remaining
//!   interceptors and the real method are skipped.
//! - [`Completion::fail`]: abort the call with an error.
//!
//! The completion may be signalled on the calling stack or later from another
//! thread, so an interceptor can defer its decision (for example while a
//! background check runs). Dropping it unsignalled aborts the call.

use crate::error::BoxError;
use futures::channel::oneshot;
use std::{any::Any, fmt, sync::Arc};

/// A type-erased call argument.
pub type Arg = Arc<dyn Any + Send + Sync>;

/// Build an argument vector for a proxied call.
///
/// ```rust,ignore
/// proxy.invoke("greet", args![name.to_string(), 3_u32], |g| g.greet(name, 3))
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$(::std::sync::Arc::new($arg) as $crate::Arg),*]
    };
}

/// Identity of a contract method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method {
    contract: &'static str,
    name: &'static str,
}

impl Method {
    /// A method identity from explicit names.
    pub const fn new(contract: &'static str, name: &'static str) -> Self {
        Self { contract, name }
    }

    /// Method `name` of contract `C`.
    pub fn of<C: ?Sized>(name: &'static str) -> Self {
        Self::new(std::any::type_name::<C>(), name)
    }

    /// The contract type name.
    pub fn contract(&self) -> &'static str {
        self.contract
    }

    /// The method name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.contract, self.name)
    }
}

/// One call travelling through an interceptor chain.
///
/// Cloning is cheap; an interceptor that defers its decision can move a clone to
/// another thread.
#[derive(Clone)]
pub struct Invocation {
    source: Arc<dyn Any + Send + Sync>,
    method: Method,
    args: Arc<[Arg]>,
}

impl Invocation {
    /// Describe a call of `method` on `source`.
    pub fn new<C>(source: Arc<C>, method: Method, args: Vec<Arg>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
            method,
            args: args.into(),
        }
    }

    /// The original target, if it is a `C`.
    pub fn source<C: ?Sized + 'static>(&self) -> Option<&Arc<C>> {
        self.source.downcast_ref::<Arc<C>>()
    }

    /// The method being called.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The argument vector.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Argument `index`, if it exists and is a `T`.
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        let arg = self.args.get(index)?;
        (**arg).downcast_ref::<T>()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method)
            .field("args", &self.args.len())
            .finish_non_exhaustive()
    }
}

/// Decision of a single interceptor.
pub enum InterceptResult {
    /// Continue with the next interceptor, or the real method.
    Next,
    /// Skip the rest of the chain and return this value.
    Return(Box<dyn Any + Send>),
}

impl InterceptResult {
    /// Short-circuit with `value`.
    pub fn returning<T: Any + Send>(value: T) -> Self {
        Self::Return(Box::new(value))
    }
}

impl fmt::Debug for InterceptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next => f.write_str("Next"),
            Self::Return(_) => f.write_str("Return(..)"),
        }
    }
}

/// One-shot continuation handed to an interceptor.
#[must_use = "an unsignalled completion aborts the call"]
pub struct Completion {
    sender: oneshot::Sender<Result<InterceptResult, BoxError>>,
}

/// The proxy's side of a [`Completion`].
pub struct PendingCompletion {
    receiver: oneshot::Receiver<Result<InterceptResult, BoxError>>,
}

impl Completion {
    /// Create a linked completion pair.
    pub fn channel() -> (Self, PendingCompletion) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, PendingCompletion { receiver })
    }

    /// Pass the call through.
    pub fn next(self) {
        self.complete(Ok(InterceptResult::Next));
    }

    /// Short-circuit the call with `value`.
    pub fn stop<T: Any + Send>(self, value: T) {
        self.complete(Ok(InterceptResult::returning(value)));
    }

    /// Abort the call.
    pub fn fail(self, error: impl Into<BoxError>) {
        self.complete(Err(error.into()));
    }

    /// Signal an already computed decision.
    pub fn complete(self, result: Result<InterceptResult, BoxError>) {
        // The proxy may have given up on the call.
        let _ = self.sender.send(result);
    }
}

impl PendingCompletion {
    /// Block until the interceptor signals.
    ///
    /// Returns `None` if the completion was dropped unsignalled.
    pub fn wait(self) -> Option<Result<InterceptResult, BoxError>> {
        futures::executor::block_on(self.receiver).ok()
    }
}

/// A hook around every proxied call.
///
/// Interceptors are ordinary services: registering a descriptor that provides
/// `dyn Interceptor` adds it to every chain built by the controller.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Interceptor`",
    label = "missing `Interceptor` implementation",
    note = "Interceptors must implement `intercept` and signal the completion."
)]
pub trait Interceptor: Send + Sync + 'static {
    /// Decide what happens to `invocation` and signal it through `completion`.
    fn intercept(&self, invocation: &Invocation, completion: Completion);
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn intercept(&self, invocation: &Invocation, completion: Completion) {
        (**self).intercept(invocation, completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_method_display() {
        let method = Method::new("Greeter", "greet");
        assert_eq!(method.to_string(), "Greeter::greet");
        assert!(Method::of::<dyn Greeter>("greet").contract().contains("Greeter"));
    }

    #[test]
    fn test_invocation_exposes_source_and_args() {
        let target: Arc<dyn Greeter> = Arc::new(English);
        let invocation = Invocation::new(
            target,
            Method::of::<dyn Greeter>("greet"),
            crate::args!["bob".to_string(), 3_u32],
        );

        let source = invocation.source::<dyn Greeter>().unwrap();
        assert_eq!(source.greet(), "hello");
        assert!(invocation.source::<English>().is_none());
        assert_eq!(invocation.args().len(), 2);
        assert_eq!(invocation.arg::<String>(0).map(String::as_str), Some("bob"));
        assert_eq!(invocation.arg::<u32>(1), Some(&3));
        assert!(invocation.arg::<u32>(0).is_none());
        assert!(invocation.arg::<u32>(5).is_none());
    }

    #[test]
    fn test_completion_same_thread() {
        let (completion, pending) = Completion::channel();
        completion.stop(42_i32);
        match pending.wait() {
            Some(Ok(InterceptResult::Return(value))) => {
                assert_eq!(*value.downcast::<i32>().unwrap(), 42)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_completion_from_another_thread() {
        let (completion, pending) = Completion::channel();
        let worker = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            completion.fail("denied");
        });
        match pending.wait() {
            Some(Err(err)) => assert_eq!(err.to_string(), "denied"),
            other => panic!("unexpected {other:?}"),
        }
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_completion_is_none() {
        let (completion, pending) = Completion::channel();
        drop(completion);
        assert!(pending.wait().is_none());
    }
}
