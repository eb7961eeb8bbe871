//! Employer identity resolution.
//!
//! Aliases collected from manual entry, legacy imports and trusted registries are
//! stored with provenance, reviewed through a promotion queue that is re-derived from
//! the decision ledger on every read, and consolidated by an external merge executor
//! that consults the impact analyzer first.

pub(crate) mod aliases;
pub mod audit;
pub mod config;
pub mod domain;
pub mod duplicates;
pub mod impact;
pub mod import;
pub mod memory;
pub mod normalize;
pub mod queue;
pub mod repository;
pub mod router;
pub mod service;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use aliases::AliasValidationError;
pub use audit::{CandidateState, DecisionValidationError};
pub use config::ResolutionConfig;
pub use domain::{
    AgreementStatus, Alias, AliasId, AliasSource, AliasSubmission, ApprovalState, Decision,
    DecisionAction, DecisionId, DecisionRequest, DependentRelation, Employer, EmployerId,
    ExternalSystem, Reviewer, ReviewerRole,
};
pub use duplicates::{ClusterMember, DuplicateCluster, PermissionDenied};
pub use impact::{ImpactReport, ImpactRow};
pub use import::{EmployerCsvImporter, EmployerImportError};
pub use memory::InMemoryIdentityRepository;
pub use queue::{ConflictWarning, PromotionCandidate};
pub use repository::{IdentityRepository, RepositoryError, ReviewSnapshot};
pub use router::identity_router;
pub use service::{EmployerIdentityService, IdentityServiceError};
