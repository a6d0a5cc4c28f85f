//! The frozen contract → descriptor index.

use parking_lot::Mutex;
use std::{
    any::TypeId,
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use svcpool_core::{BootstrapError, Instance, ServiceDescriptor};

/// One indexed descriptor and its Global-scope instance slot.
pub(crate) struct ServiceEntry {
    descriptor: ServiceDescriptor,
    pub(crate) slot: Mutex<Option<Instance>>,
}

impl ServiceEntry {
    pub(crate) fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            slot: Mutex::new(None),
        }
    }

    pub(crate) fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }
}

/// Read-only after construction; shared between threads without locking.
#[derive(Default)]
pub(crate) struct ServiceIndex {
    by_contract: HashMap<TypeId, Vec<Arc<ServiceEntry>>>,
    by_implementation: HashMap<TypeId, Arc<ServiceEntry>>,
}

impl ServiceIndex {
    /// Index `descriptors`, keeping the first of any duplicated implementation.
    /// Dropped duplicates are pushed to `rejected`.
    ///
    /// Candidates of each contract are ordered by priority, highest first; ties
    /// keep registration order.
    pub(crate) fn build(
        descriptors: Vec<ServiceDescriptor>,
        rejected: &mut Vec<BootstrapError>,
    ) -> Self {
        let mut index = Self::default();
        for descriptor in descriptors {
            let implementation = descriptor.implementation();
            let entry = match index.by_implementation.entry(implementation.type_id()) {
                Entry::Occupied(_) => {
                    rejected.push(BootstrapError::DuplicateImplementation(implementation));
                    continue;
                }
                Entry::Vacant(vacant) => {
                    Arc::clone(vacant.insert(Arc::new(ServiceEntry::new(descriptor))))
                }
            };
            for contract in entry.descriptor().contracts() {
                index
                    .by_contract
                    .entry(contract.type_id())
                    .or_default()
                    .push(Arc::clone(&entry));
            }
        }
        for candidates in index.by_contract.values_mut() {
            // Stable sort: equal priorities stay in registration order.
            candidates.sort_by(|a, b| b.descriptor().priority().cmp(&a.descriptor().priority()));
        }
        index
    }

    pub(crate) fn candidates(&self, contract: TypeId) -> &[Arc<ServiceEntry>] {
        self.by_contract
            .get(&contract)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn top(&self, contract: TypeId) -> Option<&Arc<ServiceEntry>> {
        self.candidates(contract).first()
    }

    pub(crate) fn implementation(&self, implementation: TypeId) -> Option<&Arc<ServiceEntry>> {
        self.by_implementation.get(&implementation)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Arc<ServiceEntry>> {
        self.by_implementation.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_implementation.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcpool_core::{ImplementationId, Priority};

    trait Engine: Send + Sync {}

    #[derive(Default)]
    struct Diesel;
    #[derive(Default)]
    struct Electric;
    #[derive(Default)]
    struct Steam;

    impl Engine for Diesel {}
    impl Engine for Electric {}
    impl Engine for Steam {}

    fn engine<T: Engine + Default + 'static>(priority: i32) -> ServiceDescriptor {
        ServiceDescriptor::with_default::<T>()
            .provides::<dyn Engine>(|s| s as Arc<dyn Engine>)
            .priority(priority)
            .build()
    }

    fn order(index: &ServiceIndex) -> Vec<ImplementationId> {
        index
            .candidates(TypeId::of::<dyn Engine>())
            .iter()
            .map(|e| e.descriptor().implementation())
            .collect()
    }

    #[test]
    fn test_candidates_sorted_by_priority() {
        let index = ServiceIndex::build(
            vec![
                engine::<Steam>(Priority::LOW),
                engine::<Electric>(Priority::HIGH),
                engine::<Diesel>(Priority::NORMAL),
            ],
            &mut Vec::new(),
        );
        assert_eq!(
            order(&index),
            vec![
                ImplementationId::of::<Electric>(),
                ImplementationId::of::<Diesel>(),
                ImplementationId::of::<Steam>(),
            ]
        );
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let index = ServiceIndex::build(
            vec![engine::<Steam>(5), engine::<Diesel>(5), engine::<Electric>(1)],
            &mut Vec::new(),
        );
        assert_eq!(
            index
                .top(TypeId::of::<dyn Engine>())
                .map(|e| e.descriptor().implementation()),
            Some(ImplementationId::of::<Steam>())
        );
        assert_eq!(order(&index)[1], ImplementationId::of::<Diesel>());
    }

    #[test]
    fn test_duplicate_implementation_rejected_and_dropped() {
        let mut rejected = Vec::new();
        let index =
            ServiceIndex::build(vec![engine::<Steam>(1), engine::<Steam>(9)], &mut rejected);

        assert_eq!(index.len(), 1);
        assert_eq!(index.candidates(TypeId::of::<dyn Engine>()).len(), 1);
        assert_eq!(
            index
                .implementation(TypeId::of::<Steam>())
                .map(|e| e.descriptor().priority()),
            Some(1)
        );
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].to_string().contains("more than once"));
    }

    #[test]
    fn test_unknown_contract_has_no_candidates() {
        let index = ServiceIndex::build(vec![engine::<Steam>(1)], &mut Vec::new());
        assert!(index.candidates(TypeId::of::<String>()).is_empty());
        assert!(index.top(TypeId::of::<String>()).is_none());
    }
}
