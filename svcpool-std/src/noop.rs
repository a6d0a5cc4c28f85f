//! No-op fallback factory.

use parking_lot::Mutex;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};
use svcpool_core::Contract;

/// Stand-ins, built lazily and kept once per contract.
///
/// Stand-ins are never indexed; they only answer resolutions that found nothing.
/// They live as long as the controller.
#[derive(Default)]
pub(crate) struct StandIns {
    cache: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl StandIns {
    pub(crate) fn get<C: Contract + ?Sized>(&self) -> Arc<C> {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<C>>())
        {
            return Arc::clone(cached);
        }
        let stand_in = C::stand_in();
        cache.insert(TypeId::of::<C>(), Box::new(Arc::clone(&stand_in)));
        stand_in
    }

    pub(crate) fn is_stand_in<C: ?Sized + 'static>(&self, instance: &Arc<C>) -> bool {
        self.cache
            .lock()
            .get(&TypeId::of::<C>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<C>>())
            .is_some_and(|cached| std::ptr::addr_eq(Arc::as_ptr(cached), Arc::as_ptr(instance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Beacon: Send + Sync {
        fn signal(&self) -> Option<u8>;
    }

    struct DarkBeacon;

    impl Beacon for DarkBeacon {
        fn signal(&self) -> Option<u8> {
            None
        }
    }

    struct LitBeacon;

    impl Beacon for LitBeacon {
        fn signal(&self) -> Option<u8> {
            Some(1)
        }
    }

    svcpool_core::contract!(dyn Beacon => DarkBeacon);

    #[test]
    fn test_stand_in_is_cached_per_contract() {
        let stand_ins = StandIns::default();
        let a = stand_ins.get::<dyn Beacon>();
        let b = stand_ins.get::<dyn Beacon>();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&a), Arc::as_ptr(&b)));
        assert_eq!(a.signal(), None);
    }

    #[test]
    fn test_is_stand_in() {
        let stand_ins = StandIns::default();
        let real: Arc<dyn Beacon> = Arc::new(LitBeacon);
        assert!(!stand_ins.is_stand_in(&real));
        let fake = stand_ins.get::<dyn Beacon>();
        assert!(stand_ins.is_stand_in(&fake));
        assert!(!stand_ins.is_stand_in(&real));
    }
}
