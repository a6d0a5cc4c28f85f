//! Combine strategies.

/// Policy reducing the attempts of a combine call to one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombineStrategy {
    /// Wait for every attempt and return all of them.
    #[default]
    All,
    /// Return the first success in completion order.
    FirstSuccess,
    /// Return the success of the highest-priority implementation that succeeded.
    Priority,
    /// Return whichever attempt completes first, success or failure.
    ///
    /// A failed first completion is returned once any attempt succeeds; if
    /// none does, the call fails like every other strategy.
    Fastest,
}
