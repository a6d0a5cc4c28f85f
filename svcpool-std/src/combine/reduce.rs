//! Strategy reducers: decide when a combine call is done.

use super::{Attempt, Combined};
use crate::controller::index::ServiceEntry;
use std::sync::Arc;
use svcpool_core::{AttemptError, AttemptFailure, CombineError, CombineStrategy};

/// What a decided combine call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// One attempt, by rank.
    Winner(usize),
    /// Every attempt, in rank order.
    Everything,
    /// Every attempt failed.
    AllFailed,
}

/// Collects attempt results by rank and applies the strategy to them.
///
/// Rank is the participant's position in priority order. Each rank is counted at
/// most once.
pub(crate) struct Reducer<R> {
    strategy: CombineStrategy,
    slots: Vec<Option<Result<R, AttemptError>>>,
    arrivals: Vec<usize>,
}

impl<R> Reducer<R> {
    pub(crate) fn new(strategy: CombineStrategy, participants: usize) -> Self {
        Self {
            strategy,
            slots: (0..participants).map(|_| None).collect(),
            arrivals: Vec::with_capacity(participants),
        }
    }

    /// Record the result of `rank`. Returns `false` if it was already settled.
    pub(crate) fn accept(&mut self, rank: usize, result: Result<R, AttemptError>) -> bool {
        match self.slots.get_mut(rank) {
            Some(slot) if slot.is_none() => {
                *slot = Some(result);
                self.arrivals.push(rank);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn settled(&self) -> usize {
        self.arrivals.len()
    }

    fn all_settled(&self) -> bool {
        self.arrivals.len() == self.slots.len()
    }

    fn succeeded(&self, rank: usize) -> bool {
        matches!(self.slots[rank], Some(Ok(_)))
    }

    /// The verdict, once the results seen so far determine it.
    pub(crate) fn decide(&self) -> Option<Verdict> {
        match self.strategy {
            CombineStrategy::Fastest => {
                let first = *self.arrivals.first()?;
                // A failed first arrival only wins once some attempt succeeded.
                if self.arrivals.iter().any(|&rank| self.succeeded(rank)) {
                    Some(Verdict::Winner(first))
                } else if self.all_settled() {
                    Some(Verdict::AllFailed)
                } else {
                    None
                }
            }
            CombineStrategy::FirstSuccess => {
                match self.arrivals.iter().copied().find(|&rank| self.succeeded(rank)) {
                    Some(rank) => Some(Verdict::Winner(rank)),
                    None if self.all_settled() => Some(Verdict::AllFailed),
                    None => None,
                }
            }
            CombineStrategy::Priority => {
                for (rank, slot) in self.slots.iter().enumerate() {
                    match slot {
                        None => return None,
                        Some(Ok(_)) => return Some(Verdict::Winner(rank)),
                        Some(Err(_)) => {}
                    }
                }
                Some(Verdict::AllFailed)
            }
            CombineStrategy::All => {
                if !self.all_settled() {
                    None
                } else if (0..self.slots.len()).any(|rank| self.succeeded(rank)) {
                    Some(Verdict::Everything)
                } else {
                    Some(Verdict::AllFailed)
                }
            }
        }
    }

    /// Turn the settled results into the call's outcome.
    pub(crate) fn finish(
        self,
        verdict: Verdict,
        participants: &[Arc<ServiceEntry>],
        contract: &'static str,
    ) -> Result<Combined<R>, CombineError> {
        let mut slots = self.slots;
        match verdict {
            Verdict::Winner(rank) => {
                let result = slots[rank].take().unwrap_or(Err(AttemptError::Abandoned));
                Ok(Combined::One(Attempt::new(&participants[rank], result)))
            }
            Verdict::Everything => Ok(Combined::All(
                slots
                    .into_iter()
                    .zip(participants)
                    .map(|(slot, entry)| {
                        Attempt::new(entry, slot.unwrap_or(Err(AttemptError::Abandoned)))
                    })
                    .collect(),
            )),
            Verdict::AllFailed => Err(CombineError::AllFailed {
                contract,
                failures: slots
                    .into_iter()
                    .zip(participants)
                    .filter_map(|(slot, entry)| match slot {
                        Some(Err(error)) => Some(AttemptFailure {
                            implementation: entry.descriptor().implementation(),
                            priority: entry.descriptor().priority(),
                            error,
                        }),
                        _ => None,
                    })
                    .collect(),
            }),
        }
    }
}
