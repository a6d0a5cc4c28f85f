//! # Service Controller
//!
//! The [`ServiceController`] owns the contract → descriptor index and answers
//! every resolution.
//!
//! # Lifecycle
//!
//! 1. **Bootstrap**: descriptors arrive from the configured
//!    [`DescriptorSource`] and from [`ServiceController::bootstrap`].
//! 2. **Load**: the first resolution from any thread (or an explicit
//!    [`ServiceController::load_finished`]) builds the index exactly once. Other
//!    threads block until it is published.
//! 3. **Serve**: the index is frozen. Reads take no lock; Global instances are
//!    built once per descriptor and cached until recycled.
//!
//! # Failure Model
//!
//! Bootstrap and instantiation failures never reach the caller. They are reported
//! to the [`ExceptionHandler`] and the resolution degrades to the contract's
//! stand-in (or the caller's default). Use [`ServiceController::contains`] to
//! tell a real implementation from a stand-in.
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = ServiceController::builder()
//!     .source(vec![
//!         ServiceDescriptor::with_default::<ConsolePrinter>()
//!             .provides::<dyn Printer>(|s| s as Arc<dyn Printer>)
//!             .build(),
//!     ])
//!     .build();
//!
//! let printer = controller.resolve::<dyn Printer>();
//! ```

pub(crate) mod index;
mod paths;

use crate::{
    combine::{CombineExecutor, CombineProxy},
    config::PoolConfig,
    factory,
    funnel::{ExceptionFunnel, TracingHandler},
    noop::StandIns,
    panic::panic_message,
    proxy::ServiceProxy,
};
use index::{ServiceEntry, ServiceIndex};
use parking_lot::{Mutex, RwLock};
use paths::PathRegistry;
use std::{
    any::{TypeId, type_name},
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};
use svcpool_core::{
    BootstrapError, CombineStrategy, Contract, DescriptorSource, ExceptionHandler,
    ImplementationId, Interceptor, ResolutionError, ServiceDescriptor,
};

#[derive(Default)]
struct Staging {
    descriptors: Vec<ServiceDescriptor>,
    closed: bool,
}

/// The service registry and resolution engine.
///
/// Share it by reference (or `Arc`) with the code that resolves services; there is
/// no global instance.
pub struct ServiceController {
    source: Mutex<Option<Box<dyn DescriptorSource>>>,
    staging: Mutex<Staging>,
    index: OnceLock<ServiceIndex>,
    // Failures found while loading, reported once the index is published so a
    // handler may call back into the controller.
    load_failures: Mutex<Vec<(BootstrapError, &'static str)>>,
    has_load_failures: AtomicBool,
    paths: RwLock<PathRegistry>,
    stand_ins: StandIns,
    funnel: ExceptionFunnel,
    config: PoolConfig,
    executor: OnceLock<Arc<CombineExecutor>>,
}

impl ServiceController {
    /// A controller with no source, the tracing handler and default config.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a controller.
    pub fn builder() -> ServiceControllerBuilder {
        ServiceControllerBuilder::default()
    }

    // ------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------

    /// Stage `descriptors` for the index.
    ///
    /// Returns `false` and reports [`BootstrapError::Closed`] once the index has
    /// been built; late descriptors are ignored.
    pub fn bootstrap(&self, descriptors: impl IntoIterator<Item = ServiceDescriptor>) -> bool {
        let mut staging = self.staging.lock();
        if staging.closed {
            drop(staging);
            let count = descriptors.into_iter().count();
            self.funnel.report(
                &BootstrapError::Closed { count },
                "descriptors registered after bootstrap",
            );
            return false;
        }
        staging.descriptors.extend(descriptors);
        true
    }

    /// Close the bootstrap phase and build the index now.
    ///
    /// Calling it again, or after a resolution already built the index, does
    /// nothing.
    pub fn load_finished(&self) {
        self.index();
    }

    /// Whether the index has been built.
    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    fn index(&self) -> &ServiceIndex {
        let index = self.index.get_or_init(|| self.load());
        if self.has_load_failures.load(Ordering::Acquire)
            && self.has_load_failures.swap(false, Ordering::AcqRel)
        {
            let failures = std::mem::take(&mut *self.load_failures.lock());
            for (err, message) in failures {
                self.funnel.report(&err, message);
            }
        }
        index
    }

    fn load(&self) -> ServiceIndex {
        let start = Instant::now();
        let mut descriptors = self.load_source();
        {
            let mut staging = self.staging.lock();
            staging.closed = true;
            descriptors.append(&mut staging.descriptors);
        }

        {
            let mut paths = self.paths.write();
            for descriptor in &descriptors {
                if let Some(path) = descriptor.path() {
                    paths.insert(path, descriptor.implementation());
                }
            }
        }

        let mut rejected = Vec::new();
        let index = ServiceIndex::build(descriptors, &mut rejected);
        self.defer_failures(rejected.into_iter().map(|err| (err, "indexing descriptors")));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            implementations = index.len(),
            paths = self.paths.read().len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "service index loaded"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = start;

        index
    }

    fn load_source(&self) -> Vec<ServiceDescriptor> {
        let source = self.source.lock().take();
        let Some(source) = source else {
            return Vec::new();
        };
        match catch_unwind(AssertUnwindSafe(|| source.list_descriptors())) {
            Ok(Ok(descriptors)) => descriptors,
            Ok(Err(err)) => {
                self.defer_failures([(BootstrapError::Source(err), "listing descriptors")]);
                Vec::new()
            }
            Err(payload) => {
                let err = BootstrapError::SourcePanicked(panic_message(payload.as_ref()));
                self.defer_failures([(err, "listing descriptors")]);
                Vec::new()
            }
        }
    }

    fn defer_failures(&self, failures: impl IntoIterator<Item = (BootstrapError, &'static str)>) {
        let mut pending = self.load_failures.lock();
        pending.extend(failures);
        if !pending.is_empty() {
            self.has_load_failures.store(true, Ordering::Release);
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve contract `C` to its highest-priority implementation.
    ///
    /// Falls back to the contract's stand-in when nothing is registered or the
    /// implementation cannot be built.
    pub fn resolve<C: Contract + ?Sized>(&self) -> Arc<C> {
        self.try_resolve::<C>()
            .unwrap_or_else(|| self.stand_ins.get::<C>())
    }

    /// Resolve contract `C`, or return `default` when it is unavailable.
    pub fn resolve_or<C>(&self, default: Arc<C>) -> Arc<C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.try_resolve::<C>().unwrap_or(default)
    }

    /// Resolve contract `C`, or `None` when it is unavailable.
    pub fn try_resolve<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let entry = self.index().top(TypeId::of::<C>())?;
        self.materialize::<C>(entry)
    }

    /// Resolve exactly implementation `T`, even when other implementations share
    /// its contracts.
    pub fn resolve_fixed<T: Contract>(&self) -> Arc<T> {
        self.index()
            .implementation(TypeId::of::<T>())
            .and_then(|entry| self.materialize::<T>(entry))
            .unwrap_or_else(|| self.stand_ins.get::<T>())
    }

    /// Resolve the highest-priority implementation of `C` tagged `tag`.
    pub fn resolve_tagged<C: Contract + ?Sized>(&self, tag: &str) -> Arc<C> {
        self.index()
            .candidates(TypeId::of::<C>())
            .iter()
            .find(|entry| entry.descriptor().tag() == tag)
            .and_then(|entry| self.materialize::<C>(entry))
            .unwrap_or_else(|| self.stand_ins.get::<C>())
    }

    /// Whether at least one real implementation is registered for `C`.
    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        !self.index().candidates(TypeId::of::<C>()).is_empty()
    }

    /// Whether `instance` is the stand-in handed out for `C`.
    pub fn is_stand_in<C: ?Sized + 'static>(&self, instance: &Arc<C>) -> bool {
        self.stand_ins.is_stand_in(instance)
    }

    /// Descriptors of `C`, in resolution order.
    pub fn descriptors<C: ?Sized + 'static>(&self) -> Vec<ServiceDescriptor> {
        self.index()
            .candidates(TypeId::of::<C>())
            .iter()
            .map(|entry| entry.descriptor().clone())
            .collect()
    }

    fn materialize<C>(&self, entry: &ServiceEntry) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let descriptor = entry.descriptor();
        let resolved = factory::obtain(entry).and_then(|instance| {
            descriptor
                .cast::<C>(&instance)
                .ok_or_else(|| ResolutionError::ContractMismatch {
                    implementation: descriptor.implementation(),
                    contract: type_name::<C>(),
                })
        });
        match resolved {
            Ok(instance) => Some(instance),
            Err(err) => {
                self.funnel
                    .report(&err, &format!("resolving `{}`", type_name::<C>()));
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    /// Bind registration paths to implementations. Later bindings replace earlier
    /// ones, including paths declared by descriptors.
    pub fn register_paths<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = (P, ImplementationId)>,
        P: Into<String>,
    {
        self.index();
        let mut registry = self.paths.write();
        for (path, implementation) in paths {
            registry.insert(path, implementation);
        }
    }

    /// The implementation registered under `path`.
    pub fn path_implementation(&self, path: &str) -> Option<ImplementationId> {
        self.index();
        self.paths.read().get(path)
    }

    /// Resolve the implementation registered under `path`, viewed as `C`.
    ///
    /// `C` is usually the concrete implementation type; any contract the
    /// implementation provides works too.
    pub fn resolve_by_path<C>(&self, path: &str) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let implementation = self.path_implementation(path)?;
        match self.index().implementation(implementation.type_id()) {
            Some(entry) => self.materialize::<C>(entry),
            None => {
                self.funnel.report(
                    &ResolutionError::NotRegistered(implementation),
                    &format!("resolving path `{path}`"),
                );
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Recycling
    // ------------------------------------------------------------------

    /// Evict cached Global instances for `K`.
    ///
    /// `K` is either an implementation type, or a contract whose implementations
    /// are all evicted. Returns the number of evicted instances.
    pub fn recycle<K: ?Sized + 'static>(&self) -> usize {
        let index = self.index();
        let key = TypeId::of::<K>();
        let evicted = match index.implementation(key) {
            Some(entry) => usize::from(factory::evict(entry)),
            None => index
                .candidates(key)
                .iter()
                .filter(|entry| factory::evict(entry))
                .count(),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(key = type_name::<K>(), evicted, "recycled service");

        evicted
    }

    /// Evict the cached Global instance of `implementation`.
    pub fn recycle_implementation(&self, implementation: ImplementationId) -> bool {
        self.index()
            .implementation(implementation.type_id())
            .is_some_and(|entry| factory::evict(entry))
    }

    // ------------------------------------------------------------------
    // Proxies
    // ------------------------------------------------------------------

    /// Resolve `C` and wrap it with every registered interceptor.
    pub fn proxy<C: Contract + ?Sized>(&self) -> ServiceProxy<C> {
        self.wrap(self.resolve::<C>(), self.interceptors())
    }

    /// Wrap `instance` with an explicit interceptor chain.
    pub fn wrap<C>(
        &self,
        instance: Arc<C>,
        chain: impl IntoIterator<Item = Arc<dyn Interceptor>>,
    ) -> ServiceProxy<C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        ServiceProxy::new(instance, chain, self.funnel.clone())
    }

    /// Every registered interceptor, in resolution order.
    pub fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.index()
            .candidates(TypeId::of::<dyn Interceptor>())
            .iter()
            .filter_map(|entry| self.materialize::<dyn Interceptor>(entry))
            .collect()
    }

    // ------------------------------------------------------------------
    // Combine
    // ------------------------------------------------------------------

    /// Fan calls out to every implementation of `C` with the default strategy.
    pub fn combine<C>(&self) -> CombineProxy<C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.combine_with(self.config.default_strategy)
    }

    /// Fan calls out to every implementation of `C` with `strategy`.
    pub fn combine_with<C>(&self, strategy: CombineStrategy) -> CombineProxy<C>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let participants = self.index().candidates(TypeId::of::<C>()).to_vec();
        CombineProxy::new(
            participants,
            strategy,
            self.config.call_timeout,
            self.executor(),
            self.funnel.clone(),
        )
    }

    fn executor(&self) -> Arc<CombineExecutor> {
        Arc::clone(
            self.executor
                .get_or_init(|| Arc::new(CombineExecutor::new(&self.config))),
        )
    }

    /// The active configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Stop the combine pool and drop every cached instance.
    ///
    /// Resolution keeps working afterwards; combine attempts are rejected.
    /// Stand-ins survive, so [`is_stand_in`](Self::is_stand_in) still recognises
    /// the ones handed out before.
    pub fn shutdown(&self) {
        let executor = self
            .executor
            .get_or_init(|| Arc::new(CombineExecutor::stopped()));
        executor.shutdown();
        if let Some(index) = self.index.get() {
            for entry in index.entries() {
                factory::evict(entry);
            }
        }
    }
}

impl Default for ServiceController {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ServiceController`].
#[derive(Default)]
pub struct ServiceControllerBuilder {
    source: Option<Box<dyn DescriptorSource>>,
    handler: Option<Arc<dyn ExceptionHandler>>,
    config: PoolConfig,
}

impl ServiceControllerBuilder {
    /// Load descriptors from `source` on first access.
    pub fn source(mut self, source: impl DescriptorSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Report failures to `handler` instead of the tracing handler.
    pub fn exception_handler(mut self, handler: impl ExceptionHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Use `config` for the combine pool.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller. Nothing is loaded until first access.
    pub fn build(self) -> ServiceController {
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(TracingHandler) as Arc<dyn ExceptionHandler>);
        ServiceController {
            source: Mutex::new(self.source),
            staging: Mutex::new(Staging::default()),
            index: OnceLock::new(),
            load_failures: Mutex::new(Vec::new()),
            has_load_failures: AtomicBool::new(false),
            paths: RwLock::new(PathRegistry::default()),
            stand_ins: StandIns::default(),
            funnel: ExceptionFunnel::new(handler),
            config: self.config,
            executor: OnceLock::new(),
        }
    }
}
