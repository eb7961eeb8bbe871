//! Promotion queue derived on every read from employers, aliases and the ledger.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::audit::{fold_ledger, CandidateState, PairHistory};
use super::config::ResolutionConfig;
use super::domain::{Alias, AliasId, AliasSource, Decision, Employer, EmployerId};
use super::normalize::normalize_name;
use super::repository::ReviewSnapshot;
use super::similarity::trigram_similarity;

pub const AUTHORITATIVE_PRIORITY: u8 = 10;
pub const TRUSTED_SOURCE_PRIORITY: u8 = 5;
pub const BASELINE_PRIORITY: u8 = 1;

/// Another employer whose canonical name closely matches a queued alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictWarning {
    pub employer_id: EmployerId,
    pub employer_name: String,
    /// In `(threshold, 1.0]`; exact name matches report `1.0`.
    pub similarity: f64,
}

/// One row of the review dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionCandidate {
    pub alias_id: AliasId,
    pub employer_id: EmployerId,
    pub employer_name: String,
    pub alias: String,
    pub normalized: String,
    pub source: AliasSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identifier: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub collected_by: String,
    pub is_authoritative: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub priority: u8,
    pub conflicts: Vec<ConflictWarning>,
    /// Most recent defer of a candidate whose deferral has lapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

pub fn alias_priority(alias: &Alias) -> u8 {
    if alias.is_authoritative {
        AUTHORITATIVE_PRIORITY
    } else if alias.source.external_system().is_some() {
        TRUSTED_SOURCE_PRIORITY
    } else {
        BASELINE_PRIORITY
    }
}

fn is_corroborated(alias: &Alias, employer: &Employer) -> bool {
    alias.is_authoritative
        || alias
            .source
            .external_system()
            .is_some_and(|system| employer.has_external_id(system))
}

struct NamedEmployer<'a> {
    employer: &'a Employer,
    normalized: String,
}

/// Fold the snapshot into the prioritized, conflict-annotated queue as of `now`.
pub fn derive_queue(
    snapshot: &ReviewSnapshot,
    config: &ResolutionConfig,
    now: DateTime<Utc>,
) -> Vec<PromotionCandidate> {
    let named: Vec<NamedEmployer<'_>> = snapshot
        .employers
        .iter()
        .map(|employer| NamedEmployer {
            employer,
            normalized: normalize_name(&employer.name),
        })
        .collect();
    let by_id: HashMap<&EmployerId, &NamedEmployer<'_>> = named
        .iter()
        .map(|entry| (&entry.employer.id, entry))
        .collect();
    let ledger = fold_ledger(&snapshot.decisions);
    let no_history = PairHistory::default();
    let defer_window = config.defer_window();

    let mut queue: Vec<PromotionCandidate> = snapshot
        .aliases
        .iter()
        .filter_map(|alias| {
            let owner = by_id.get(&alias.employer_id)?;
            if alias.normalized == owner.normalized || !is_corroborated(alias, owner.employer) {
                return None;
            }

            let history = ledger
                .get(&(&alias.employer_id, &alias.id))
                .unwrap_or(&no_history);
            let approved_at = match history.state(now, defer_window) {
                CandidateState::Eligible => None,
                CandidateState::Approved => history.last_approved.map(|d| d.decided_at),
                CandidateState::Rejected | CandidateState::Deferred { .. } => return None,
            };

            Some(PromotionCandidate {
                alias_id: alias.id.clone(),
                employer_id: alias.employer_id.clone(),
                employer_name: owner.employer.name.clone(),
                alias: alias.raw.clone(),
                normalized: alias.normalized.clone(),
                source: alias.source,
                source_identifier: alias.source_identifier.clone(),
                collected_at: alias.collected_at,
                collected_by: alias.collected_by.clone(),
                is_authoritative: alias.is_authoritative,
                notes: alias.notes.clone(),
                created_at: alias.created_at,
                priority: alias_priority(alias),
                conflicts: find_conflicts(alias, &named, config),
                previous_decision: history.expired_defer(now, defer_window).cloned(),
                approved_at,
            })
        })
        .collect();

    queue.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.collected_at.cmp(&a.collected_at))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.alias_id.cmp(&b.alias_id))
    });
    queue
}

fn find_conflicts(
    alias: &Alias,
    employers: &[NamedEmployer<'_>],
    config: &ResolutionConfig,
) -> Vec<ConflictWarning> {
    let mut conflicts: Vec<ConflictWarning> = employers
        .iter()
        .filter(|entry| entry.employer.id != alias.employer_id)
        .filter_map(|entry| {
            let exact = entry.normalized == alias.normalized;
            let similarity = if exact {
                1.0
            } else {
                trigram_similarity(&entry.normalized, &alias.normalized)
            };
            (exact || similarity > config.conflict_threshold).then(|| ConflictWarning {
                employer_id: entry.employer.id.clone(),
                employer_name: entry.employer.name.clone(),
                similarity,
            })
        })
        .collect();

    conflicts.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.employer_name.cmp(&b.employer_name))
            .then_with(|| a.employer_id.cmp(&b.employer_id))
    });
    conflicts.truncate(config.conflict_limit);
    conflicts
}
