use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use svcpool::{
    BoxError, Priority, ServiceController, ServiceDescriptor, testing::RecordingHandler,
};

mod common;
use common::{EnglishGreeter, FrenchGreeter, Greeter, greeter};

#[test]
fn test_source_is_listed_once_on_first_access() {
    let listed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&listed);
    let controller = ServiceController::builder()
        .source(move || -> Result<Vec<ServiceDescriptor>, BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![greeter::<EnglishGreeter>(Priority::NORMAL)])
        })
        .build();

    assert_eq!(listed.load(Ordering::SeqCst), 0);
    assert!(!controller.is_loaded());

    controller.resolve::<dyn Greeter>();
    controller.resolve::<dyn Greeter>();
    controller.load_finished();
    assert_eq!(listed.load(Ordering::SeqCst), 1);
    assert!(controller.is_loaded());
}

#[test]
fn test_bootstrap_before_load_is_indexed() {
    let controller = ServiceController::new();
    assert!(controller.bootstrap([greeter::<FrenchGreeter>(Priority::NORMAL)]));
    controller.load_finished();
    assert_eq!(controller.resolve::<dyn Greeter>().greet("ann"), "bonjour ann");
}

#[test]
fn test_late_registration_is_rejected() {
    let recorder = RecordingHandler::new();
    let controller = ServiceController::builder()
        .source(vec![greeter::<EnglishGreeter>(Priority::LOW)])
        .exception_handler(recorder.clone())
        .build();
    controller.resolve::<dyn Greeter>();

    assert!(!controller.bootstrap([greeter::<FrenchGreeter>(Priority::HIGH)]));
    assert_eq!(controller.resolve::<dyn Greeter>().greet("ann"), "hello ann");
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_failing_source_keeps_bootstrapped_descriptors() {
    let recorder = RecordingHandler::new();
    let controller = ServiceController::builder()
        .source(|| -> Result<Vec<ServiceDescriptor>, BoxError> { Err("manifest missing".into()) })
        .exception_handler(recorder.clone())
        .build();

    assert!(controller.bootstrap([greeter::<FrenchGreeter>(Priority::NORMAL)]));
    // Explicitly bootstrapped descriptors survive a failed source.
    assert_eq!(controller.resolve::<dyn Greeter>().greet("ann"), "bonjour ann");
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_concurrent_first_access_loads_once() {
    let listed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&listed);
    let controller = Arc::new(
        ServiceController::builder()
            .source(move || -> Result<Vec<ServiceDescriptor>, BoxError> {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(vec![greeter::<EnglishGreeter>(Priority::NORMAL)])
            })
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = Arc::clone(&controller);
            std::thread::spawn(move || controller.resolve::<dyn Greeter>().greet("ann"))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "hello ann");
    }
    assert_eq!(listed.load(Ordering::SeqCst), 1);
}
