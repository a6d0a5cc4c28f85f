//! Descriptor sources.

use crate::{descriptor::ServiceDescriptor, error::BoxError};

/// Supplies the descriptor list at bootstrap.
///
/// How the list is produced (hand-written, generated, collected at link time) is
/// up to the implementation. It is queried at most once per controller.
pub trait DescriptorSource: Send + Sync {
    /// List every descriptor, in registration order.
    fn list_descriptors(&self) -> Result<Vec<ServiceDescriptor>, BoxError>;
}

impl DescriptorSource for Vec<ServiceDescriptor> {
    fn list_descriptors(&self) -> Result<Vec<ServiceDescriptor>, BoxError> {
        Ok(self.clone())
    }
}

impl<F> DescriptorSource for F
where
    F: Fn() -> Result<Vec<ServiceDescriptor>, BoxError> + Send + Sync,
{
    fn list_descriptors(&self) -> Result<Vec<ServiceDescriptor>, BoxError> {
        self()
    }
}
