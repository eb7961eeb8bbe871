use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a canonical employer. Assigned by the import/merge side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployerId(pub String);

/// Store-assigned identifier of an alias row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasId(pub String);

/// Store-assigned identifier of a decision row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(pub String);

impl fmt::Display for EmployerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registries whose identifiers are trusted enough to corroborate an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSystem {
    Abr,
    Bci,
    Fwc,
    Incolink,
}

/// Where an alias candidate was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasSource {
    Manual,
    LegacyImport,
    Abr,
    Bci,
    Fwc,
    Incolink,
}

impl From<ExternalSystem> for AliasSource {
    fn from(system: ExternalSystem) -> Self {
        match system {
            ExternalSystem::Abr => AliasSource::Abr,
            ExternalSystem::Bci => AliasSource::Bci,
            ExternalSystem::Fwc => AliasSource::Fwc,
            ExternalSystem::Incolink => AliasSource::Incolink,
        }
    }
}

impl AliasSource {
    /// The trusted registry behind this source, if any.
    pub const fn external_system(self) -> Option<ExternalSystem> {
        match self {
            AliasSource::Manual | AliasSource::LegacyImport => None,
            AliasSource::Abr => Some(ExternalSystem::Abr),
            AliasSource::Bci => Some(ExternalSystem::Bci),
            AliasSource::Fwc => Some(ExternalSystem::Fwc),
            AliasSource::Incolink => Some(ExternalSystem::Incolink),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AliasSource::Manual => "manual",
            AliasSource::LegacyImport => "legacy_import",
            AliasSource::Abr => "abr",
            AliasSource::Bci => "bci",
            AliasSource::Fwc => "fwc",
            AliasSource::Incolink => "incolink",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Current,
    Expired,
    None,
}

/// Canonical employer identity. Owned by the import and merge side; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employer {
    pub id: EmployerId,
    pub name: String,
    /// At most one identifier per external system.
    #[serde(default)]
    pub external_ids: BTreeMap<ExternalSystem, String>,
    pub approval: ApprovalState,
    pub agreement: AgreementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employer {
    pub fn is_pending(&self) -> bool {
        self.approval == ApprovalState::Pending
    }

    pub fn has_external_id(&self, system: ExternalSystem) -> bool {
        self.external_ids.contains_key(&system)
    }
}

/// Provenance-tagged alias row. Keyed by `(employer_id, normalized)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub id: AliasId,
    pub employer_id: EmployerId,
    pub raw: String,
    pub normalized: String,
    pub source: AliasSource,
    pub source_identifier: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub collected_by: String,
    pub is_authoritative: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied alias candidate as produced by ingestion or manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSubmission {
    pub raw: String,
    pub source: AliasSource,
    #[serde(default)]
    pub source_identifier: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub collected_by: String,
    #[serde(default)]
    pub is_authoritative: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
    Defer,
}

impl DecisionAction {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Reject => "reject",
            DecisionAction::Defer => "defer",
        }
    }
}

/// One immutable reviewer action on an (employer, alias) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub employer_id: EmployerId,
    pub alias_id: AliasId,
    pub action: DecisionAction,
    pub decided_by: String,
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Reviewer action as submitted, before the ledger assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub employer_id: EmployerId,
    pub alias_id: AliasId,
    pub action: DecisionAction,
    pub decided_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    Viewer,
    Organiser,
    LeadOrganiser,
    Admin,
}

impl ReviewerRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "organiser" | "organizer" => Some(Self::Organiser),
            "lead_organiser" | "lead_organizer" | "lead" => Some(Self::LeadOrganiser),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewerRole::Viewer => "viewer",
            ReviewerRole::Organiser => "organiser",
            ReviewerRole::LeadOrganiser => "lead_organiser",
            ReviewerRole::Admin => "admin",
        }
    }
}

/// Authenticated caller, as resolved by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: String,
    pub role: ReviewerRole,
}

impl Reviewer {
    pub fn new(id: impl Into<String>, role: ReviewerRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn can_review_duplicates(&self) -> bool {
        matches!(self.role, ReviewerRole::LeadOrganiser | ReviewerRole::Admin)
    }
}

/// Relations that hold a foreign key to an employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentRelation {
    Placements,
    ProjectRoles,
    ProjectTrades,
    SiteTrades,
    Agreements,
    Visits,
    Capabilities,
    Aliases,
    BuilderProjects,
}

impl DependentRelation {
    pub const ALL: [DependentRelation; 9] = [
        DependentRelation::Placements,
        DependentRelation::ProjectRoles,
        DependentRelation::ProjectTrades,
        DependentRelation::SiteTrades,
        DependentRelation::Agreements,
        DependentRelation::Visits,
        DependentRelation::Capabilities,
        DependentRelation::Aliases,
        DependentRelation::BuilderProjects,
    ];
}
