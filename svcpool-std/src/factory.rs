//! Instance factory: builds implementations and applies scope policy.

use crate::{controller::index::ServiceEntry, panic::panic_message};
use std::panic::{AssertUnwindSafe, catch_unwind};
use svcpool_core::{Instance, ResolutionError, Scope, ServiceDescriptor};

/// Produce an instance for `entry`, honouring its scope.
///
/// Global instances are built under the entry's slot lock, so concurrent first
/// resolutions of one descriptor build exactly one instance. A failed build
/// leaves the slot empty and is retried on the next resolution.
pub(crate) fn obtain(entry: &ServiceEntry) -> Result<Instance, ResolutionError> {
    match entry.descriptor().scope() {
        Scope::NewInstance => create(entry.descriptor()),
        Scope::Global => {
            let mut slot = entry.slot.lock();
            if let Some(instance) = slot.as_ref() {
                return Ok(Instance::clone(instance));
            }
            let instance = create(entry.descriptor())?;
            *slot = Some(Instance::clone(&instance));
            Ok(instance)
        }
    }
}

/// Drop the cached Global instance of `entry`. Returns whether one was cached.
pub(crate) fn evict(entry: &ServiceEntry) -> bool {
    entry.slot.lock().take().is_some()
}

/// Whether `entry` currently holds a cached instance.
#[cfg(test)]
pub(crate) fn is_cached(entry: &ServiceEntry) -> bool {
    entry.slot.lock().is_some()
}

fn create(descriptor: &ServiceDescriptor) -> Result<Instance, ResolutionError> {
    let implementation = descriptor.implementation();
    match catch_unwind(AssertUnwindSafe(|| descriptor.instantiate())) {
        Ok(Ok(instance)) => Ok(instance),
        Ok(Err(source)) => Err(ResolutionError::Instantiation {
            implementation,
            source,
        }),
        Err(payload) => Err(ResolutionError::Panicked {
            implementation,
            message: panic_message(payload.as_ref()),
        }),
    }
}
