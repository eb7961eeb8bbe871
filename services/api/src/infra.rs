use chrono::{DateTime, TimeZone, Utc};
use contractor_registry::error::AppError;
use contractor_registry::identity::{
    AgreementStatus, ApprovalState, DependentRelation, Employer, EmployerCsvImporter, EmployerId,
    ExternalSystem, InMemoryIdentityRepository, ReviewerRole,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_role(raw: &str) -> Result<ReviewerRole, String> {
    ReviewerRole::parse(raw).ok_or_else(|| {
        format!("unknown reviewer role '{raw}' (expected viewer, organiser, lead_organiser or admin)")
    })
}

fn demo_timestamp(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn demo_employer(
    id: &str,
    name: &str,
    day: u32,
    approval: ApprovalState,
    external_ids: &[(ExternalSystem, &str)],
) -> Employer {
    let created_at = demo_timestamp(day);
    Employer {
        id: EmployerId(id.to_string()),
        name: name.to_string(),
        external_ids: external_ids
            .iter()
            .map(|(system, value)| (*system, value.to_string()))
            .collect::<BTreeMap<_, _>>(),
        approval,
        agreement: match approval {
            ApprovalState::Active => AgreementStatus::Current,
            ApprovalState::Pending => AgreementStatus::None,
        },
        created_at,
        updated_at: created_at,
    }
}

/// Register used by `demo` and `serve --seed-demo`: three spellings of one
/// builder, one unrelated pending employer and two active employers.
pub(crate) fn demo_register() -> Vec<Employer> {
    vec![
        demo_employer(
            "emp-1",
            "ACME Pty Ltd",
            1,
            ApprovalState::Pending,
            &[(ExternalSystem::Abr, "51824753556")],
        ),
        demo_employer("emp-2", "Acme Pty Ltd", 2, ApprovalState::Pending, &[]),
        demo_employer("emp-3", "Acme Pty. Ltd", 3, ApprovalState::Pending, &[]),
        demo_employer(
            "emp-4",
            "Beta Constructions",
            4,
            ApprovalState::Pending,
            &[(ExternalSystem::Fwc, "FWC-881")],
        ),
        demo_employer(
            "emp-5",
            "Acme Building Group",
            5,
            ApprovalState::Active,
            &[(ExternalSystem::Bci, "B-2201")],
        ),
        demo_employer("emp-6", "Delta Steel Fixing", 6, ApprovalState::Active, &[]),
    ]
}

/// Employers from a CSV export when given, the built-in register otherwise.
pub(crate) fn load_register(path: Option<&Path>) -> Result<Vec<Employer>, AppError> {
    match path {
        Some(path) => Ok(EmployerCsvImporter::from_path(path)?),
        None => Ok(demo_register()),
    }
}

/// Populate the store with employers and a spread of dependent records so merge
/// impact has something to count.
pub(crate) fn seed_repository(
    repository: &InMemoryIdentityRepository,
    employers: Vec<Employer>,
) -> Result<(), AppError> {
    let ids: Vec<EmployerId> = employers.iter().map(|employer| employer.id.clone()).collect();
    for employer in employers {
        repository.put_employer(employer)?;
    }

    let spread = [
        (DependentRelation::Placements, 3),
        (DependentRelation::ProjectRoles, 1),
        (DependentRelation::Visits, 2),
    ];
    if let Some(first) = ids.first() {
        for (relation, count) in spread {
            for _ in 0..count {
                repository.attach_dependent(first, relation)?;
            }
        }
    }
    if let Some(second) = ids.get(1) {
        repository.attach_dependent(second, DependentRelation::SiteTrades)?;
    }
    Ok(())
}
