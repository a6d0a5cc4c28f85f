//! Controller configuration.

use std::time::Duration;
use svcpool_core::CombineStrategy;

/// Sizing and policy of the combine worker pool.
///
/// # Example
///
/// ```rust,ignore
/// let config = PoolConfig::default()
///     .with_workers(4)
///     .with_call_timeout(Duration::from_millis(250))
///     .with_default_strategy(CombineStrategy::FirstSuccess);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads shared by every combine call.
    pub workers: usize,
    /// Pending attempts the queue holds before submission blocks.
    pub queue_capacity: usize,
    /// Deadline of each attempt, measured from its submission.
    pub call_timeout: Option<Duration>,
    /// Strategy used by `combine` when none is given.
    pub default_strategy: CombineStrategy,
}

impl PoolConfig {
    /// Set the number of worker threads (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the queue capacity (at least one).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Bound every attempt by `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the strategy used when none is given.
    pub fn with_default_strategy(mut self, strategy: CombineStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .clamp(2, 16);
        Self {
            workers,
            queue_capacity: 64,
            call_timeout: None,
            default_strategy: CombineStrategy::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_clamp_to_one() {
        let config = PoolConfig::default().with_workers(0).with_queue_capacity(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_default_has_no_deadline() {
        let config = PoolConfig::default();
        assert!(config.call_timeout.is_none());
        assert!(config.workers >= 2);
        assert_eq!(config.default_strategy, CombineStrategy::All);
    }
}
