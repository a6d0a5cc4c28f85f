//! Link-time descriptor registration.
//!
//! Descriptors submitted with `inventory::submit!` (or generated by the
//! `#[service]` attribute) anywhere in the final binary are collected by
//! [`InventorySource`].

use svcpool_core::{BoxError, DescriptorSource, ServiceDescriptor};

/// Registration entry for one descriptor in the link-time registry.
///
/// This struct is submitted to `inventory` for automatic collection.
pub struct ServiceRegistration {
    build: fn() -> ServiceDescriptor,
}

impl ServiceRegistration {
    /// Register the descriptor produced by `build`.
    pub const fn new(build: fn() -> ServiceDescriptor) -> Self {
        Self { build }
    }

    /// Build the registered descriptor.
    pub fn descriptor(&self) -> ServiceDescriptor {
        (self.build)()
    }
}

inventory::collect!(ServiceRegistration);

/// A [`DescriptorSource`] over every [`ServiceRegistration`] linked into the
/// binary.
///
/// Link order is unspecified, so descriptors are listed sorted by implementation
/// name. Equal priorities therefore resolve in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventorySource;

impl InventorySource {
    /// Number of linked registrations.
    pub fn registration_count() -> usize {
        inventory::iter::<ServiceRegistration>().count()
    }
}

impl DescriptorSource for InventorySource {
    fn list_descriptors(&self) -> Result<Vec<ServiceDescriptor>, BoxError> {
        let mut descriptors: Vec<_> = inventory::iter::<ServiceRegistration>()
            .map(ServiceRegistration::descriptor)
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.implementation().name());
        Ok(descriptors)
    }
}
