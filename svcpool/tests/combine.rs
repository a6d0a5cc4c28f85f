use std::{
    thread,
    time::{Duration, Instant},
};
use svcpool::{
    AttemptError, CombineError, CombineStrategy, Combined, ImplementationId, PoolConfig,
    Priority, ServiceController, ServiceDescriptor, testing::RecordingHandler,
};

mod common;
use common::{
    BrokenQuote, FastQuote, LateQuote, QuoteSource, SlowQuote, StaleQuote, StuckQuote, quote,
};

fn controller(descriptors: Vec<ServiceDescriptor>) -> (ServiceController, RecordingHandler) {
    let recorder = RecordingHandler::new();
    let controller = ServiceController::builder()
        .source(descriptors)
        .config(PoolConfig::default().with_workers(4))
        .exception_handler(recorder.clone())
        .build();
    (controller, recorder)
}

fn fetch(
    controller: &ServiceController,
    strategy: CombineStrategy,
) -> Result<Combined<u32>, CombineError> {
    controller
        .combine_with::<dyn QuoteSource>(strategy)
        .invoke("quote", |q| q.quote())
}

#[test]
fn test_all_returns_every_attempt_in_priority_order() {
    let (controller, recorder) = controller(vec![
        quote::<BrokenQuote>(Priority::LOW),
        quote::<FastQuote>(Priority::HIGH),
    ]);

    let outcome = fetch(&controller, CombineStrategy::All).unwrap();
    let attempts = outcome.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].implementation, ImplementationId::of::<FastQuote>());
    assert_eq!(attempts[0].value(), Some(&1));
    assert!(matches!(attempts[1].result, Err(AttemptError::Failed(_))));
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_default_strategy_is_all() {
    let (controller, _recorder) = controller(vec![
        quote::<FastQuote>(Priority::NORMAL),
        quote::<SlowQuote>(Priority::NORMAL),
    ]);

    let combine = controller.combine::<dyn QuoteSource>();
    assert_eq!(combine.strategy(), CombineStrategy::All);
    assert_eq!(combine.len(), 2);
    let outcome = combine.invoke("quote", |q| q.quote()).unwrap();
    assert_eq!(outcome.successes().copied().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_first_success_takes_fastest_success() {
    let (controller, _recorder) = controller(vec![
        quote::<SlowQuote>(Priority::HIGH),
        quote::<FastQuote>(Priority::LOW),
    ]);

    let started = Instant::now();
    let outcome = fetch(&controller, CombineStrategy::FirstSuccess).unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));
    match outcome {
        Combined::One(attempt) => {
            assert_eq!(attempt.implementation, ImplementationId::of::<FastQuote>());
            assert_eq!(attempt.value(), Some(&1));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_all_failures_are_aggregated() {
    let (controller, recorder) = controller(vec![
        quote::<BrokenQuote>(Priority::HIGH),
        quote::<StaleQuote>(Priority::LOW),
    ]);

    for strategy in [
        CombineStrategy::All,
        CombineStrategy::FirstSuccess,
        CombineStrategy::Priority,
    ] {
        recorder.clear();
        match fetch(&controller, strategy) {
            Err(err @ CombineError::AllFailed { .. }) => {
                let messages: Vec<_> = err
                    .failures()
                    .iter()
                    .map(|f| f.error.to_string())
                    .collect();
                assert_eq!(messages, vec!["feed offline", "quote expired"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        // Each underlying failure is reported once.
        assert_eq!(recorder.count(), 2);
    }
}

#[test]
fn test_priority_prefers_higher_success_over_faster() {
    let (controller, _recorder) = controller(vec![
        quote::<FastQuote>(Priority::LOW),
        quote::<SlowQuote>(Priority::HIGH),
    ]);

    let outcome = fetch(&controller, CombineStrategy::Priority).unwrap();
    assert_eq!(outcome.into_value(), Some(2));
}

#[test]
fn test_priority_falls_back_when_top_fails() {
    let (controller, _recorder) = controller(vec![
        quote::<BrokenQuote>(Priority::HIGH),
        quote::<SlowQuote>(Priority::NORMAL),
        quote::<FastQuote>(Priority::LOW),
    ]);

    let outcome = fetch(&controller, CombineStrategy::Priority).unwrap();
    assert_eq!(outcome.value(), Some(&2));
}

#[test]
fn test_fastest_returns_first_completion_even_if_failed() {
    let (controller, _recorder) = controller(vec![
        quote::<SlowQuote>(Priority::HIGH),
        quote::<BrokenQuote>(Priority::LOW),
    ]);

    match fetch(&controller, CombineStrategy::Fastest).unwrap() {
        Combined::One(attempt) => {
            assert_eq!(attempt.implementation, ImplementationId::of::<BrokenQuote>());
            assert!(!attempt.is_ok());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_fastest_single_failure_is_all_failed() {
    let (controller, recorder) = controller(vec![quote::<BrokenQuote>(Priority::NORMAL)]);

    match fetch(&controller, CombineStrategy::Fastest) {
        Err(CombineError::AllFailed { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].error.to_string(), "feed offline");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(recorder.count(), 1);
}

#[test]
fn test_fastest_with_every_failure_is_all_failed() {
    let (controller, recorder) = controller(vec![
        quote::<BrokenQuote>(Priority::HIGH),
        quote::<StaleQuote>(Priority::LOW),
    ]);

    let err = fetch(&controller, CombineStrategy::Fastest).unwrap_err();
    assert_eq!(err.failures().len(), 2);
    assert_eq!(recorder.count(), 2);
}

#[test]
fn test_late_failures_after_first_success_are_reported_once() {
    let (controller, recorder) = controller(vec![
        quote::<LateQuote>(Priority::HIGH),
        quote::<FastQuote>(Priority::LOW),
    ]);

    let outcome = fetch(&controller, CombineStrategy::FirstSuccess).unwrap();
    assert_eq!(outcome.value(), Some(&1));
    assert_eq!(recorder.count(), 0);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.errors(), vec!["feed lagging".to_string()]);
}

#[test]
fn test_timeout_marks_slow_attempts() {
    let (controller, recorder) = controller(vec![
        quote::<StuckQuote>(Priority::HIGH),
        quote::<FastQuote>(Priority::LOW),
    ]);

    let started = Instant::now();
    let outcome = controller
        .combine::<dyn QuoteSource>()
        .with_timeout(Duration::from_millis(50))
        .invoke("quote", |q| q.quote())
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(400));

    let attempts = outcome.attempts();
    assert!(matches!(attempts[0].result, Err(AttemptError::TimedOut(_))));
    assert_eq!(attempts[1].value(), Some(&1));
    assert!(recorder.errors()[0].contains("timed out"));
}

#[test]
fn test_no_implementations() {
    let (controller, recorder) = controller(Vec::new());
    let combine = controller.combine::<dyn QuoteSource>();
    assert!(combine.is_empty());
    assert!(matches!(
        combine.invoke("quote", |q| q.quote()),
        Err(CombineError::NoImplementations { .. })
    ));
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_panicking_attempt_is_contained() {
    let (controller, _recorder) = controller(vec![
        quote::<FastQuote>(Priority::HIGH),
        quote::<SlowQuote>(Priority::LOW),
    ]);

    let outcome = controller
        .combine::<dyn QuoteSource>()
        .invoke("quote", |q| {
            let value = q.quote()?;
            if value == 2 {
                panic!("bad tick");
            }
            Ok(value)
        })
        .unwrap();
    let attempts = outcome.attempts();
    assert_eq!(attempts[0].value(), Some(&1));
    assert!(matches!(&attempts[1].result, Err(AttemptError::Panicked(msg)) if msg == "bad tick"));
}

#[test]
fn test_shutdown_rejects_attempts() {
    let (controller, _recorder) = controller(vec![quote::<FastQuote>(Priority::NORMAL)]);
    controller.shutdown();

    match fetch(&controller, CombineStrategy::All) {
        Err(CombineError::AllFailed { failures, .. }) => {
            assert!(matches!(failures[0].error, AttemptError::Rejected));
        }
        other => panic!("unexpected {other:?}"),
    }
}
