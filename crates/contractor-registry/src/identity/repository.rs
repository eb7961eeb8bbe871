use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Alias, AliasId, AliasSource, Decision, DecisionAction, DependentRelation, Employer,
    EmployerId,
};

/// Normalized alias write, keyed by `(employer_id, normalized)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasUpsert {
    pub employer_id: EmployerId,
    pub raw: String,
    pub normalized: String,
    pub source: AliasSource,
    pub source_identifier: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub collected_by: String,
    pub is_authoritative: bool,
    pub notes: Option<String>,
}

/// Ledger append. The store assigns the id and the decision timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEntry {
    pub employer_id: EmployerId,
    pub alias_id: AliasId,
    pub action: DecisionAction,
    pub decided_by: String,
    pub reason: Option<String>,
}

/// Employers, aliases and decisions observed at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ReviewSnapshot {
    pub employers: Vec<Employer>,
    pub aliases: Vec<Alias>,
    pub decisions: Vec<Decision>,
}

/// Storage abstraction over the three identity relations and their dependents.
///
/// Each write must be a single atomic transaction and each read must observe a
/// single consistent snapshot.
pub trait IdentityRepository: Send + Sync {
    /// Insert or refresh provenance for the alias key. Fails with
    /// [`RepositoryError::NotFound`] when the employer does not exist.
    fn upsert_alias(&self, upsert: AliasUpsert) -> Result<Alias, RepositoryError>;

    /// Append a decision row. Fails with [`RepositoryError::NotFound`] when either
    /// the employer or the alias does not exist.
    fn append_decision(&self, entry: DecisionEntry) -> Result<Decision, RepositoryError>;

    fn pending_employers(&self) -> Result<Vec<Employer>, RepositoryError>;

    fn review_snapshot(&self) -> Result<ReviewSnapshot, RepositoryError>;

    /// Non-zero reference counts for the requested employers. Employers without
    /// any reference produce no tallies at all.
    fn dependent_tallies(
        &self,
        employer_ids: &[EmployerId],
    ) -> Result<Vec<DependentTally>, RepositoryError>;
}

/// Grouped reference count for one employer in one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentTally {
    pub employer_id: EmployerId,
    pub relation: DependentRelation,
    pub count: u64,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("{0:?} are counted from their own rows and cannot be attached")]
    DerivedRelation(DependentRelation),
}

impl RepositoryError {
    pub fn employer_not_found(id: &EmployerId) -> Self {
        Self::NotFound {
            entity: "employer",
            id: id.0.clone(),
        }
    }

    pub fn alias_not_found(id: &AliasId) -> Self {
        Self::NotFound {
            entity: "alias",
            id: id.0.clone(),
        }
    }
}
