#![allow(dead_code)]

use std::{sync::Arc, thread, time::Duration};
use svcpool::{BoxError, Priority, ServiceDescriptor, contract, testing::CountingFactory};

// ============================================================================
// Greeter Contract
// ============================================================================

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

pub struct SilentGreeter;

impl Greeter for SilentGreeter {
    fn greet(&self, _name: &str) -> String {
        String::new()
    }
}

contract!(dyn Greeter => SilentGreeter);

#[derive(Default)]
pub struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self, name: &str) -> String {
        format!("hello {name}")
    }
}

// Pinned directly in fixed resolutions.
contract!(EnglishGreeter => EnglishGreeter);

#[derive(Default)]
pub struct FrenchGreeter;

impl Greeter for FrenchGreeter {
    fn greet(&self, name: &str) -> String {
        format!("bonjour {name}")
    }
}

#[derive(Default)]
pub struct GermanGreeter;

impl Greeter for GermanGreeter {
    fn greet(&self, name: &str) -> String {
        format!("hallo {name}")
    }
}

pub fn greeter<T: Greeter + Default + 'static>(priority: i32) -> ServiceDescriptor {
    ServiceDescriptor::with_default::<T>()
        .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>)
        .priority(priority)
        .build()
}

// ============================================================================
// Quote Contract (combine)
// ============================================================================

pub trait QuoteSource: Send + Sync {
    fn quote(&self) -> Result<u32, BoxError>;
}

#[derive(Default)]
pub struct FastQuote;

impl QuoteSource for FastQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        Ok(1)
    }
}

#[derive(Default)]
pub struct SlowQuote;

impl QuoteSource for SlowQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        thread::sleep(Duration::from_millis(100));
        Ok(2)
    }
}

#[derive(Default)]
pub struct BrokenQuote;

impl QuoteSource for BrokenQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        Err("feed offline".into())
    }
}

#[derive(Default)]
pub struct StaleQuote;

impl QuoteSource for StaleQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        Err("quote expired".into())
    }
}

#[derive(Default)]
pub struct LateQuote;

impl QuoteSource for LateQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        thread::sleep(Duration::from_millis(100));
        Err("feed lagging".into())
    }
}

#[derive(Default)]
pub struct StuckQuote;

impl QuoteSource for StuckQuote {
    fn quote(&self) -> Result<u32, BoxError> {
        thread::sleep(Duration::from_millis(500));
        Ok(99)
    }
}

pub fn quote<T: QuoteSource + Default + 'static>(priority: i32) -> ServiceDescriptor {
    ServiceDescriptor::with_default::<T>()
        .provides::<dyn QuoteSource>(|s| s as Arc<dyn QuoteSource>)
        .priority(priority)
        .build()
}

// ============================================================================
// Counted Construction
// ============================================================================

/// Takes a while to build and counts every construction.
pub struct SlowToBuild;

impl Greeter for SlowToBuild {
    fn greet(&self, name: &str) -> String {
        format!("eventually {name}")
    }
}

pub fn slow_to_build(counter: &CountingFactory) -> ServiceDescriptor {
    counter
        .builder_with(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(SlowToBuild)
        })
        .provides::<dyn Greeter>(|s| s as Arc<dyn Greeter>)
        .priority(Priority::HIGH)
        .build()
}
