// src/core/voting.rs
//
// Shared vote collection for the four ensembles. Every method runs behind a
// panic guard and either casts a vote or records why it abstained.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, warn};

use crate::config::MethodId;
use crate::error::{Abstained, MethodResult};
use super::dsp::stats;

/// Run one ensemble method, containing panics as abstentions.
///
/// A method that is not `enabled` abstains without being called.
pub fn run_method<T, F>(method: MethodId, enabled: bool, f: F) -> MethodResult<T>
where
    F: FnOnce() -> MethodResult<T>,
{
    if !enabled {
        debug!("{} skipped: disabled or unavailable", method);
        return Err(Abstained::Unavailable);
    }

    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(Abstained::Panicked(format!("{}: {}", method, msg)))
        }
    }
}

/// Strategy for resolving an exact tie between the leading values
#[derive(Debug, Clone, PartialEq)]
pub enum TieBreak<T> {
    /// The value first cast among the tied candidates wins
    FirstRegistered,
    /// This value wins when it is among the tied candidates
    Prefer(T),
}

/// Outcome of one ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct VoteResult<T> {
    /// One entry per method that voted, in registration order
    pub votes: Vec<T>,
    /// Methods behind `votes`, index-aligned
    pub voters: Vec<MethodId>,
    pub winner: T,
    pub tie_break_used: bool,
    pub abstentions: usize,
}

impl<T> VoteResult<T> {
    /// Result for an ensemble in which nobody voted
    pub fn undetermined(winner: T, abstentions: usize) -> Self {
        Self {
            votes: Vec::new(),
            voters: Vec::new(),
            winner,
            tie_break_used: false,
            abstentions,
        }
    }
}

#[derive(Debug, Clone)]
struct Vote<T> {
    method: MethodId,
    value: T,
    weight: u32,
}

/// Collects the votes and abstentions of one ensemble
#[derive(Debug, Clone)]
pub struct Ballot<T> {
    votes: Vec<Vote<T>>,
    abstentions: Vec<(MethodId, Abstained)>,
}

impl<T: Clone + PartialEq + std::fmt::Debug> Ballot<T> {
    pub fn new() -> Self {
        Self {
            votes: Vec::new(),
            abstentions: Vec::new(),
        }
    }

    pub fn cast(&mut self, method: MethodId, outcome: MethodResult<T>) {
        self.cast_weighted(method, outcome, 1);
    }

    pub fn cast_weighted(&mut self, method: MethodId, outcome: MethodResult<T>, weight: u32) {
        match outcome {
            Ok(value) => {
                debug!("{} voted {:?}", method, value);
                self.votes.push(Vote { method, value, weight });
            }
            Err(reason) => self.abstain(method, reason),
        }
    }

    pub fn abstain(&mut self, method: MethodId, reason: Abstained) {
        match &reason {
            Abstained::Unavailable | Abstained::InsufficientSignal(_) => {
                debug!("{} abstained: {}", method, reason)
            }
            Abstained::Failed(_) | Abstained::Panicked(_) => {
                warn!("{} abstained: {}", method, reason)
            }
        }
        self.abstentions.push((method, reason));
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn abstentions(&self) -> &[(MethodId, Abstained)] {
        &self.abstentions
    }

    /// Weighted plurality; `None` when nobody voted
    pub fn plurality(&self, tie_break: TieBreak<T>) -> Option<VoteResult<T>> {
        if self.votes.is_empty() {
            return None;
        }

        // (value, total weight) in order of first appearance
        let mut tally: Vec<(T, u32)> = Vec::new();
        for vote in &self.votes {
            match tally.iter_mut().find(|(v, _)| *v == vote.value) {
                Some((_, w)) => *w += vote.weight,
                None => tally.push((vote.value.clone(), vote.weight)),
            }
        }

        let best = tally.iter().map(|(_, w)| *w).max().unwrap_or(0);
        let leaders: Vec<&T> = tally
            .iter()
            .filter(|(_, w)| *w == best)
            .map(|(v, _)| v)
            .collect();

        let tie_break_used = leaders.len() > 1;
        let winner = if tie_break_used {
            match tie_break {
                TieBreak::Prefer(ref preferred) if leaders.contains(&preferred) => preferred.clone(),
                _ => leaders[0].clone(),
            }
        } else {
            leaders[0].clone()
        };

        Some(self.result(winner, tie_break_used))
    }

    fn result(&self, winner: T, tie_break_used: bool) -> VoteResult<T> {
        VoteResult {
            votes: self.votes.iter().map(|v| v.value.clone()).collect(),
            voters: self.votes.iter().map(|v| v.method).collect(),
            winner,
            tie_break_used,
            abstentions: self.abstentions.len(),
        }
    }
}

impl Ballot<f32> {
    /// Median of the cast values; `None` when nobody voted
    pub fn median(&self) -> Option<VoteResult<f32>> {
        if self.votes.is_empty() {
            return None;
        }
        let mut values: Vec<f32> = self.votes.iter().map(|v| v.value).collect();
        Some(self.result(stats::median(&mut values), false))
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> Default for Ballot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_method_contains_panics() {
        let outcome: MethodResult<u8> = run_method(MethodId::EnergyFade, true, || {
            panic!("boom");
        });
        assert_eq!(
            outcome,
            Err(Abstained::Panicked("energy-fade: boom".to_string()))
        );
    }

    #[test]
    fn test_disabled_method_is_not_called() {
        let outcome: MethodResult<u8> =
            run_method(MethodId::ChromaProfile, false, || unreachable!());
        assert_eq!(outcome, Err(Abstained::Unavailable));
    }

    #[test]
    fn test_plurality_majority() {
        let mut ballot = Ballot::new();
        ballot.cast(MethodId::FrequencyBands, Ok("bass"));
        ballot.cast(MethodId::SpectralFeatures, Ok("fx"));
        ballot.cast(MethodId::BandFallback, Ok("bass"));
        ballot.cast(MethodId::FilenameKeywords, Err(Abstained::insufficient("no match")));

        let result = ballot.plurality(TieBreak::FirstRegistered).unwrap();
        assert_eq!(result.winner, "bass");
        assert!(!result.tie_break_used);
        assert_eq!(result.votes.len(), 3);
        assert_eq!(result.abstentions, 1);
    }

    #[test]
    fn test_tie_breaks() {
        let mut ballot = Ballot::new();
        ballot.cast(MethodId::EnergyFade, Ok(1));
        ballot.cast(MethodId::OnsetDensity, Ok(2));

        let first = ballot.plurality(TieBreak::FirstRegistered).unwrap();
        assert_eq!(first.winner, 1);
        assert!(first.tie_break_used);

        assert_eq!(ballot.plurality(TieBreak::Prefer(2)).unwrap().winner, 2);
        // A preference outside the tied set falls back to first registered
        assert_eq!(ballot.plurality(TieBreak::Prefer(9)).unwrap().winner, 1);
    }

    #[test]
    fn test_weighted_vote_outranks_two_singles() {
        let mut ballot = Ballot::new();
        ballot.cast_weighted(MethodId::FilenameKeywords, Ok('d'), 2);
        ballot.cast(MethodId::FrequencyBands, Ok('b'));
        ballot.cast(MethodId::SpectralFeatures, Ok('b'));

        let result = ballot.plurality(TieBreak::FirstRegistered).unwrap();
        assert_eq!(result.winner, 'd');
        assert!(result.tie_break_used);
    }

    #[test]
    fn test_median_and_empty_ballot() {
        let mut ballot: Ballot<f32> = Ballot::new();
        assert!(ballot.median().is_none());
        ballot.cast(MethodId::EnergyAutocorrelation, Ok(120.0));
        ballot.cast(MethodId::ToolkitTempo, Ok(124.0));
        assert_eq!(ballot.median().unwrap().winner, 122.0);
    }
}
