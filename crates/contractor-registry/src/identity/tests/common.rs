use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::identity::domain::{
    AgreementStatus, Alias, AliasSource, AliasSubmission, ApprovalState, Decision,
    DecisionAction, DecisionRequest, Employer, EmployerId, ExternalSystem, Reviewer,
    ReviewerRole,
};
use crate::identity::repository::{
    AliasUpsert, DecisionEntry, DependentTally, IdentityRepository, RepositoryError,
    ReviewSnapshot,
};
use crate::identity::{EmployerIdentityService, InMemoryIdentityRepository, ResolutionConfig};

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn employer(id: &str, name: &str, created_at: DateTime<Utc>) -> Employer {
    Employer {
        id: EmployerId(id.to_string()),
        name: name.to_string(),
        external_ids: BTreeMap::new(),
        approval: ApprovalState::Pending,
        agreement: AgreementStatus::None,
        created_at,
        updated_at: created_at,
    }
}

pub(super) fn active_employer(id: &str, name: &str, created_at: DateTime<Utc>) -> Employer {
    Employer {
        approval: ApprovalState::Active,
        agreement: AgreementStatus::Current,
        ..employer(id, name, created_at)
    }
}

pub(super) fn with_external_id(
    mut employer: Employer,
    system: ExternalSystem,
    value: &str,
) -> Employer {
    employer.external_ids.insert(system, value.to_string());
    employer
}

pub(super) fn submission(
    raw: &str,
    source: AliasSource,
    is_authoritative: bool,
    collected_at: DateTime<Utc>,
) -> AliasSubmission {
    AliasSubmission {
        raw: raw.to_string(),
        source,
        source_identifier: Some(format!("{}-ref", source.label())),
        collected_at,
        collected_by: "importer".to_string(),
        is_authoritative,
        notes: None,
    }
}

pub(super) fn decision(alias: &Alias, action: DecisionAction) -> DecisionRequest {
    DecisionRequest {
        employer_id: alias.employer_id.clone(),
        alias_id: alias.id.clone(),
        action,
        decided_by: "reviewer-7".to_string(),
        reason: Some(format!("{} after review", action.label())),
    }
}

pub(super) fn lead() -> Reviewer {
    Reviewer::new("lead-1", ReviewerRole::LeadOrganiser)
}

pub(super) fn organiser() -> Reviewer {
    Reviewer::new("organiser-1", ReviewerRole::Organiser)
}

pub(super) fn employer_id(id: &str) -> EmployerId {
    EmployerId(id.to_string())
}

pub(super) fn build_service() -> (
    EmployerIdentityService<InMemoryIdentityRepository>,
    Arc<InMemoryIdentityRepository>,
) {
    build_service_with(ResolutionConfig::default())
}

pub(super) fn build_service_with(
    config: ResolutionConfig,
) -> (
    EmployerIdentityService<InMemoryIdentityRepository>,
    Arc<InMemoryIdentityRepository>,
) {
    let repository = Arc::new(InMemoryIdentityRepository::default());
    let service = EmployerIdentityService::new(repository.clone(), config);
    (service, repository)
}

pub(super) fn seed(repository: &InMemoryIdentityRepository, employers: Vec<Employer>) {
    for employer in employers {
        repository.put_employer(employer).expect("seed employer");
    }
}

/// Repository whose backing store is down.
pub(super) struct UnavailableRepository;

impl IdentityRepository for UnavailableRepository {
    fn upsert_alias(&self, _upsert: AliasUpsert) -> Result<Alias, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn append_decision(&self, _entry: DecisionEntry) -> Result<Decision, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn pending_employers(&self) -> Result<Vec<Employer>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn review_snapshot(&self) -> Result<ReviewSnapshot, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn dependent_tallies(
        &self,
        _employer_ids: &[EmployerId],
    ) -> Result<Vec<DependentTally>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}
