//! Implementation descriptors.
//!
//! A [`ServiceDescriptor`] is the immutable record of one implementation: which
//! contracts it satisfies, its priority, its scope and how to build it. Descriptors
//! are created once while the descriptor list is assembled and never change after
//! bootstrap.
//!
//! # Example
//!
//! ```rust,ignore
//! let descriptor = ServiceDescriptor::with_default::<ConsolePrinter>()
//!     .provides::<dyn Printer>(|s| s as Arc<dyn Printer>)
//!     .priority(Priority::HIGH)
//!     .scope(Scope::NewInstance)
//!     .tag("console")
//!     .build();
//! ```

use crate::error::BoxError;
use std::{
    any::{Any, TypeId},
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

/// A type-erased implementation object.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>;
type Caster = Arc<dyn Fn(Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Instance lifecycle policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One cached instance, owned by the controller until recycled.
    #[default]
    Global,
    /// A fresh instance per resolution, owned by the caller.
    NewInstance,
}

/// Conventional priority levels. Higher values win.
#[derive(Debug, Clone, Copy)]
pub struct Priority;

impl Priority {
    /// Fallback implementations.
    pub const LOW: i32 = -100;
    /// The default priority.
    pub const NORMAL: i32 = 0;
    /// Preferred implementations.
    pub const HIGH: i32 = 100;
}

/// Identity of a concrete implementation type.
#[derive(Clone, Copy)]
pub struct ImplementationId {
    type_id: TypeId,
    name: &'static str,
}

impl ImplementationId {
    /// The identity of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the implementation.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the implementation.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ImplementationId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ImplementationId {}

impl Hash for ImplementationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of a contract type, usually a `dyn Trait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId {
    type_id: TypeId,
    name: &'static str,
}

impl ContractId {
    /// The identity of contract `C`.
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    /// The `TypeId` of the contract.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the contract.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Clone)]
struct Binding {
    contract: ContractId,
    cast: Caster,
}

/// Immutable metadata for one implementation.
#[derive(Clone)]
pub struct ServiceDescriptor {
    implementation: ImplementationId,
    bindings: Vec<Binding>,
    priority: i32,
    scope: Scope,
    tag: Cow<'static, str>,
    path: Option<Cow<'static, str>>,
    factory: Factory,
}

impl ServiceDescriptor {
    /// Start a descriptor for `T`, built by `factory`.
    ///
    /// `T` itself is always bound, so it can be pinned with a fixed resolution.
    pub fn builder<T, F>(factory: F) -> DescriptorBuilder<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        DescriptorBuilder::new(factory)
    }

    /// Start a descriptor for `T`, built with `T::default()`.
    pub fn with_default<T>() -> DescriptorBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        DescriptorBuilder::new(|| Ok(T::default()))
    }

    /// The implementation this descriptor builds.
    pub fn implementation(&self) -> ImplementationId {
        self.implementation
    }

    /// Every contract this implementation satisfies, including itself.
    pub fn contracts(&self) -> impl Iterator<Item = ContractId> + '_ {
        self.bindings.iter().map(|b| b.contract)
    }

    /// Whether this descriptor binds `contract`.
    pub fn provides(&self, contract: TypeId) -> bool {
        self.bindings.iter().any(|b| b.contract.type_id == contract)
    }

    /// The resolution priority. Higher wins.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The instance lifecycle policy.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Free-form tag, empty by default.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Registration path, if the descriptor declared one.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Build a new instance through the factory.
    pub fn instantiate(&self) -> Result<Instance, BoxError> {
        (self.factory)()
    }

    /// View `instance` as contract `C`.
    ///
    /// Returns `None` if this descriptor does not bind `C` or the instance was not
    /// produced by this descriptor.
    pub fn cast<C: ?Sized + 'static>(&self, instance: &Instance) -> Option<Arc<C>> {
        let binding = self
            .bindings
            .iter()
            .find(|b| b.contract.type_id == TypeId::of::<C>())?;
        let erased = (binding.cast)(Arc::clone(instance))?;
        erased.downcast::<Arc<C>>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("implementation", &self.implementation)
            .field(
                "contracts",
                &self.bindings.iter().map(|b| b.contract.name).collect::<Vec<_>>(),
            )
            .field("priority", &self.priority)
            .field("scope", &self.scope)
            .field("tag", &self.tag)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceDescriptor`].
pub struct DescriptorBuilder<T> {
    descriptor: ServiceDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || factory().map(|value| Arc::new(value) as Instance));
        let descriptor = ServiceDescriptor {
            implementation: ImplementationId::of::<T>(),
            bindings: Vec::new(),
            priority: Priority::NORMAL,
            scope: Scope::Global,
            tag: Cow::Borrowed(""),
            path: None,
            factory,
        };
        Self {
            descriptor,
            _marker: PhantomData,
        }
        .provides::<T>(|this| this)
    }

    /// Bind contract `C`. `cast` performs the unsizing, e.g. `|s| s as Arc<dyn C>`.
    ///
    /// Binding the same contract twice keeps the first binding.
    pub fn provides<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let contract = ContractId::of::<C>();
        if self
            .descriptor
            .bindings
            .iter()
            .any(|b| b.contract == contract)
        {
            return self;
        }
        let cast: Caster = Arc::new(move |instance: Instance| {
            let concrete = instance.downcast::<T>().ok()?;
            Some(Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        self.descriptor.bindings.push(Binding { contract, cast });
        self
    }

    /// Set the resolution priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.descriptor.priority = priority;
        self
    }

    /// Set the instance lifecycle policy.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.descriptor.scope = scope;
        self
    }

    /// Set the tag.
    pub fn tag(mut self, tag: impl Into<Cow<'static, str>>) -> Self {
        self.descriptor.tag = tag.into();
        self
    }

    /// Declare a registration path for path lookups.
    pub fn path(mut self, path: impl Into<Cow<'static, str>>) -> Self {
        self.descriptor.path = Some(path.into());
        self
    }

    /// Finalize the descriptor.
    pub fn build(self) -> ServiceDescriptor {
        self.descriptor
    }
}
