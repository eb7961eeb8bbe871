use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use super::domain::{
    Alias, AliasId, Decision, DecisionId, DependentRelation, Employer, EmployerId,
};
use super::repository::{
    AliasUpsert, DecisionEntry, DependentTally, IdentityRepository, RepositoryError,
    ReviewSnapshot,
};

#[derive(Debug, Default)]
struct IdentityState {
    employers: BTreeMap<EmployerId, Employer>,
    aliases: BTreeMap<AliasId, Alias>,
    alias_keys: HashMap<(EmployerId, String), AliasId>,
    decisions: Vec<Decision>,
    dependents: BTreeMap<(EmployerId, DependentRelation), u64>,
    alias_sequence: u64,
    decision_sequence: u64,
}

/// Process-local store backing the identity relations.
///
/// All relations sit behind one lock: a write holds the write guard for its whole
/// transaction and a read clones what it needs under a single read guard.
#[derive(Debug, Default, Clone)]
pub struct InMemoryIdentityRepository {
    state: Arc<RwLock<IdentityState>>,
}

impl InMemoryIdentityRepository {
    fn read(&self) -> Result<RwLockReadGuard<'_, IdentityState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Unavailable("identity store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IdentityState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Unavailable("identity store lock poisoned".to_string()))
    }

    /// Insert or replace an employer, as the import and merge side would.
    pub fn put_employer(&self, employer: Employer) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        state.employers.insert(employer.id.clone(), employer);
        Ok(())
    }

    /// Record one row in a relation that references the employer. Alias counts
    /// come from the alias rows themselves and are refused here.
    pub fn attach_dependent(
        &self,
        employer_id: &EmployerId,
        relation: DependentRelation,
    ) -> Result<(), RepositoryError> {
        if relation == DependentRelation::Aliases {
            return Err(RepositoryError::DerivedRelation(relation));
        }
        let mut state = self.write()?;
        if !state.employers.contains_key(employer_id) {
            return Err(RepositoryError::employer_not_found(employer_id));
        }
        *state
            .dependents
            .entry((employer_id.clone(), relation))
            .or_insert(0) += 1;
        Ok(())
    }

    pub fn employer(&self, id: &EmployerId) -> Result<Option<Employer>, RepositoryError> {
        Ok(self.read()?.employers.get(id).cloned())
    }

    pub fn decisions(&self) -> Result<Vec<Decision>, RepositoryError> {
        Ok(self.read()?.decisions.clone())
    }
}

impl IdentityRepository for InMemoryIdentityRepository {
    fn upsert_alias(&self, upsert: AliasUpsert) -> Result<Alias, RepositoryError> {
        let mut state = self.write()?;
        if !state.employers.contains_key(&upsert.employer_id) {
            return Err(RepositoryError::employer_not_found(&upsert.employer_id));
        }

        let now = Utc::now();
        let key = (upsert.employer_id.clone(), upsert.normalized.clone());

        if let Some(existing_id) = state.alias_keys.get(&key).cloned() {
            let alias = state
                .aliases
                .get_mut(&existing_id)
                .ok_or_else(|| RepositoryError::alias_not_found(&existing_id))?;
            alias.source = upsert.source;
            alias.source_identifier = upsert.source_identifier;
            alias.collected_at = upsert.collected_at;
            alias.collected_by = upsert.collected_by;
            alias.is_authoritative = upsert.is_authoritative;
            alias.notes = upsert.notes;
            alias.updated_at = now;
            debug!(alias_id = %existing_id, "alias provenance refreshed");
            return Ok(alias.clone());
        }

        state.alias_sequence += 1;
        let id = AliasId(format!("alias-{:06}", state.alias_sequence));
        let alias = Alias {
            id: id.clone(),
            employer_id: upsert.employer_id,
            raw: upsert.raw,
            normalized: upsert.normalized,
            source: upsert.source,
            source_identifier: upsert.source_identifier,
            collected_at: upsert.collected_at,
            collected_by: upsert.collected_by,
            is_authoritative: upsert.is_authoritative,
            notes: upsert.notes,
            created_at: now,
            updated_at: now,
        };
        state.alias_keys.insert(key, id.clone());
        state.aliases.insert(id, alias.clone());
        Ok(alias)
    }

    fn append_decision(&self, entry: DecisionEntry) -> Result<Decision, RepositoryError> {
        let mut state = self.write()?;
        if !state.employers.contains_key(&entry.employer_id) {
            return Err(RepositoryError::employer_not_found(&entry.employer_id));
        }
        if !state.aliases.contains_key(&entry.alias_id) {
            return Err(RepositoryError::alias_not_found(&entry.alias_id));
        }

        state.decision_sequence += 1;
        let decision = Decision {
            id: DecisionId(format!("decision-{:06}", state.decision_sequence)),
            employer_id: entry.employer_id,
            alias_id: entry.alias_id,
            action: entry.action,
            decided_by: entry.decided_by,
            reason: entry.reason,
            decided_at: Utc::now(),
        };
        state.decisions.push(decision.clone());
        Ok(decision)
    }

    fn pending_employers(&self) -> Result<Vec<Employer>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .employers
            .values()
            .filter(|employer| employer.is_pending())
            .cloned()
            .collect())
    }

    fn review_snapshot(&self) -> Result<ReviewSnapshot, RepositoryError> {
        let state = self.read()?;
        Ok(ReviewSnapshot {
            employers: state.employers.values().cloned().collect(),
            aliases: state.aliases.values().cloned().collect(),
            decisions: state.decisions.clone(),
        })
    }

    fn dependent_tallies(
        &self,
        employer_ids: &[EmployerId],
    ) -> Result<Vec<DependentTally>, RepositoryError> {
        let wanted: BTreeSet<&EmployerId> = employer_ids.iter().collect();
        let state = self.read()?;

        let mut counts: BTreeMap<(EmployerId, DependentRelation), u64> = state
            .dependents
            .iter()
            .filter(|((employer_id, _), _)| wanted.contains(employer_id))
            .map(|(key, count)| (key.clone(), *count))
            .collect();

        for alias in state.aliases.values() {
            if wanted.contains(&alias.employer_id) {
                *counts
                    .entry((alias.employer_id.clone(), DependentRelation::Aliases))
                    .or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|((employer_id, relation), count)| DependentTally {
                employer_id,
                relation,
                count,
            })
            .collect())
    }
}
