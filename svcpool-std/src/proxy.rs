//! Interceptor proxies.
//!
//! A [`ServiceProxy`] wraps one instance of a contract together with an
//! interceptor chain. Each call goes through [`ServiceProxy::invoke`], which
//! offers the invocation to every interceptor in order and runs the real method
//! only when the whole chain passed it on.

use crate::{funnel::ExceptionFunnel, panic::panic_message};
use std::{
    any::{Any, type_name},
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use svcpool_core::{
    Arg, BoxError, Completion, InterceptResult, Interceptor, Invocation, InvocationError, Method,
};

/// A contract instance behind an interceptor chain.
///
/// # Example
///
/// ```rust,ignore
/// let greeter = controller.proxy::<dyn Greeter>();
/// let line: String = greeter.invoke("greet", args!["bob".to_string()], |g| {
///     Ok(g.greet("bob"))
/// })?;
/// ```
pub struct ServiceProxy<C: ?Sized> {
    target: Arc<C>,
    chain: Arc<[Arc<dyn Interceptor>]>,
    funnel: ExceptionFunnel,
}

impl<C: ?Sized> Clone for ServiceProxy<C> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            chain: Arc::clone(&self.chain),
            funnel: self.funnel.clone(),
        }
    }
}

impl<C> ServiceProxy<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(
        target: Arc<C>,
        chain: impl IntoIterator<Item = Arc<dyn Interceptor>>,
        funnel: ExceptionFunnel,
    ) -> Self {
        Self {
            target,
            chain: chain.into_iter().collect(),
            funnel,
        }
    }

    /// The wrapped instance, bypassing every interceptor.
    pub fn target(&self) -> &Arc<C> {
        &self.target
    }

    /// Number of interceptors in the chain.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// Call `method` through the chain.
    ///
    /// `args` is what interceptors see; `call` performs the real method on the
    /// target. A short-circuit value must be an `R`, otherwise the call fails with
    /// [`InvocationError::ReturnType`]. Every failure is reported to the exception
    /// handler before it is returned.
    pub fn invoke<R, F>(
        &self,
        method: &'static str,
        args: Vec<Arg>,
        call: F,
    ) -> Result<R, InvocationError>
    where
        R: Any + Send,
        F: FnOnce(&C) -> Result<R, BoxError>,
    {
        let method = Method::of::<C>(method);
        let result = self.run(method, args, call);
        if let Err(err) = &result {
            self.funnel.report(err, &format!("invoking `{method}`"));
        }
        result
    }

    fn run<R, F>(&self, method: Method, args: Vec<Arg>, call: F) -> Result<R, InvocationError>
    where
        R: Any + Send,
        F: FnOnce(&C) -> Result<R, BoxError>,
    {
        if !self.chain.is_empty() {
            let invocation = Invocation::new(Arc::clone(&self.target), method, args);
            for interceptor in self.chain.iter() {
                let (completion, pending) = Completion::channel();
                catch_unwind(AssertUnwindSafe(|| {
                    interceptor.intercept(&invocation, completion)
                }))
                .map_err(|payload| InvocationError::Panicked {
                    method,
                    message: panic_message(payload.as_ref()),
                })?;

                match pending.wait() {
                    Some(Ok(InterceptResult::Next)) => {}
                    Some(Ok(InterceptResult::Return(value))) => {
                        return value
                            .downcast::<R>()
                            .map(|value| *value)
                            .map_err(|_| InvocationError::ReturnType {
                                method,
                                expected: type_name::<R>(),
                            });
                    }
                    Some(Err(source)) => return Err(InvocationError::Interceptor { method, source }),
                    None => return Err(InvocationError::Abandoned { method }),
                }
            }
        }

        match catch_unwind(AssertUnwindSafe(|| call(&*self.target))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(InvocationError::Target { method, source }),
            Err(payload) => Err(InvocationError::Panicked {
                method,
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl<C: ?Sized> fmt::Debug for ServiceProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("contract", &type_name::<C>())
            .field("interceptors", &self.chain.len())
            .finish_non_exhaustive()
    }
}
