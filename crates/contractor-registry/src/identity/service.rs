use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::aliases::{prepare_upsert, AliasValidationError};
use super::audit::{prepare_entry, DecisionValidationError};
use super::config::ResolutionConfig;
use super::domain::{Alias, AliasSubmission, Decision, DecisionRequest, EmployerId, Reviewer};
use super::duplicates::{authorize_scan, cluster_employers, DuplicateCluster, PermissionDenied};
use super::impact::{summarize_impact, ImpactReport};
use super::queue::{derive_queue, PromotionCandidate};
use super::repository::{IdentityRepository, RepositoryError};

/// Facade over the alias store, decision ledger, duplicate detector, promotion queue
/// and merge impact analyzer, all sharing one repository.
pub struct EmployerIdentityService<R> {
    repository: Arc<R>,
    config: ResolutionConfig,
}

impl<R> EmployerIdentityService<R>
where
    R: IdentityRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: ResolutionConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Record or refresh an alias candidate for `employer_id`. Safe to retry.
    pub fn record_alias(
        &self,
        employer_id: EmployerId,
        submission: AliasSubmission,
    ) -> Result<Alias, IdentityServiceError> {
        let upsert = prepare_upsert(employer_id, submission)?;
        let alias = self.repository.upsert_alias(upsert).map_err(|err| {
            warn!(error = %err, "alias upsert refused");
            err
        })?;

        info!(
            alias_id = %alias.id,
            employer_id = %alias.employer_id,
            source = alias.source.label(),
            authoritative = alias.is_authoritative,
            "alias recorded"
        );
        Ok(alias)
    }

    /// Append a reviewer decision to the ledger. Every call appends a new row, so a
    /// blind retry records the action twice.
    pub fn record_decision(
        &self,
        request: DecisionRequest,
    ) -> Result<Decision, IdentityServiceError> {
        let entry = prepare_entry(request)?;
        let decision = self.repository.append_decision(entry).map_err(|err| {
            warn!(error = %err, "decision append refused");
            err
        })?;

        info!(
            decision_id = %decision.id,
            employer_id = %decision.employer_id,
            alias_id = %decision.alias_id,
            action = decision.action.label(),
            decided_by = %decision.decided_by,
            "decision recorded"
        );
        Ok(decision)
    }

    /// Cluster pending employers for merge review. Requires the duplicate review
    /// capability; read-only and safe to abandon midway.
    pub fn scan_duplicates(
        &self,
        reviewer: &Reviewer,
    ) -> Result<Vec<DuplicateCluster>, IdentityServiceError> {
        if let Err(denied) = authorize_scan(reviewer) {
            warn!(reviewer = %reviewer.id, role = reviewer.role.label(), "duplicate scan denied");
            return Err(denied.into());
        }

        let pending = self.repository.pending_employers()?;
        let clusters = cluster_employers(&pending, self.config.cluster_threshold);
        info!(
            reviewer = %reviewer.id,
            pending = pending.len(),
            clusters = clusters.len(),
            "duplicate scan complete"
        );
        Ok(clusters)
    }

    pub fn promotion_queue(&self) -> Result<Vec<PromotionCandidate>, IdentityServiceError> {
        self.promotion_queue_at(Utc::now())
    }

    /// Queue as it stands at `now`; deferrals are measured against this instant.
    pub fn promotion_queue_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionCandidate>, IdentityServiceError> {
        let snapshot = self.repository.review_snapshot()?;
        let queue = derive_queue(&snapshot, &self.config, now);
        debug!(
            aliases = snapshot.aliases.len(),
            decisions = snapshot.decisions.len(),
            queued = queue.len(),
            "promotion queue derived"
        );
        Ok(queue)
    }

    /// Count dependent records per employer ahead of a merge. Unknown ids yield
    /// zero rows rather than errors.
    pub fn merge_impact(
        &self,
        employer_ids: &[EmployerId],
    ) -> Result<ImpactReport, IdentityServiceError> {
        let tallies = self.repository.dependent_tallies(employer_ids)?;
        let report = summarize_impact(employer_ids, &tallies);
        info!(
            employers = report.rows.len(),
            total_dependents = report.total_dependents,
            "merge impact analyzed"
        );
        Ok(report)
    }
}

/// Error raised by the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityServiceError {
    #[error(transparent)]
    Alias(#[from] AliasValidationError),
    #[error(transparent)]
    Decision(#[from] DecisionValidationError),
    #[error(transparent)]
    Permission(#[from] PermissionDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
