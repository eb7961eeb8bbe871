//! Read-side folds over the append-only decision ledger.
//!
//! Candidate state is never stored on the alias row. It is recomputed from the
//! ledger each time a caller asks.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::{AliasId, Decision, DecisionAction, DecisionRequest, EmployerId};
use super::repository::DecisionEntry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionValidationError {
    #[error("decision requires the deciding reviewer id")]
    MissingDecider,
}

pub(crate) fn prepare_entry(request: DecisionRequest) -> Result<DecisionEntry, DecisionValidationError> {
    let decided_by = request.decided_by.trim().to_string();
    if decided_by.is_empty() {
        return Err(DecisionValidationError::MissingDecider);
    }

    Ok(DecisionEntry {
        employer_id: request.employer_id,
        alias_id: request.alias_id,
        action: request.action,
        decided_by,
        reason: request
            .reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty()),
    })
}

/// Review state of an (employer, alias) pair derived from its decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateState {
    Eligible,
    Approved,
    Rejected,
    /// `until` is `None` when deferrals never expire.
    Deferred { until: Option<DateTime<Utc>> },
}

/// Every decision recorded against one pair, reduced to what the queue needs.
#[derive(Debug, Clone, Default)]
pub struct PairHistory<'a> {
    pub rejected: Option<&'a Decision>,
    pub last_deferred: Option<&'a Decision>,
    pub last_approved: Option<&'a Decision>,
}

impl<'a> PairHistory<'a> {
    fn absorb(&mut self, decision: &'a Decision) {
        let slot = match decision.action {
            DecisionAction::Reject => &mut self.rejected,
            DecisionAction::Defer => &mut self.last_deferred,
            DecisionAction::Approve => &mut self.last_approved,
        };
        let newer = slot.map_or(true, |current| decision.decided_at >= current.decided_at);
        if newer {
            *slot = Some(decision);
        }
    }

    /// Reject is permanent. A defer hides the pair until `defer_window` has elapsed
    /// since the latest defer; `None` keeps it hidden forever.
    pub fn state(&self, now: DateTime<Utc>, defer_window: Option<Duration>) -> CandidateState {
        if self.rejected.is_some() {
            return CandidateState::Rejected;
        }

        if let Some(deferred) = self.last_deferred {
            match defer_window {
                None => return CandidateState::Deferred { until: None },
                Some(window) => {
                    let until = deferred.decided_at + window;
                    if now < until {
                        return CandidateState::Deferred { until: Some(until) };
                    }
                }
            }
        }

        match (self.last_approved, self.last_deferred) {
            (Some(approved), Some(deferred)) if approved.decided_at < deferred.decided_at => {
                CandidateState::Eligible
            }
            (Some(_), _) => CandidateState::Approved,
            (None, _) => CandidateState::Eligible,
        }
    }

    /// The defer that a re-entered candidate is carrying, if any.
    pub fn expired_defer(
        &self,
        now: DateTime<Utc>,
        defer_window: Option<Duration>,
    ) -> Option<&'a Decision> {
        let deferred = self.last_deferred?;
        let window = defer_window?;
        (deferred.decided_at + window <= now).then_some(deferred)
    }
}

/// Group the ledger by (employer, alias) pair.
pub fn fold_ledger(decisions: &[Decision]) -> HashMap<(&EmployerId, &AliasId), PairHistory<'_>> {
    let mut histories: HashMap<(&EmployerId, &AliasId), PairHistory<'_>> = HashMap::new();
    for decision in decisions {
        histories
            .entry((&decision.employer_id, &decision.alias_id))
            .or_default()
            .absorb(decision);
    }
    histories
}
