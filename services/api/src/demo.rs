use crate::infra::{load_register, parse_role, seed_repository};
use chrono::Utc;
use clap::Args;
use contractor_registry::error::AppError;
use contractor_registry::identity::duplicates::cluster_employers;
use contractor_registry::identity::{
    AliasSource, AliasSubmission, DecisionAction, DecisionRequest, DuplicateCluster, Employer,
    EmployerCsvImporter, EmployerId, EmployerIdentityService, IdentityServiceError, ImpactReport,
    InMemoryIdentityRepository, PromotionCandidate, ResolutionConfig, Reviewer, ReviewerRole,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Employer register CSV (id,name,created_at[,approval,abr,bci,fwc,incolink]).
    /// Defaults to the built-in register.
    #[arg(long)]
    pub(crate) employers_csv: Option<PathBuf>,
    /// Role used for the duplicate scan portion of the demo.
    #[arg(long, value_parser = parse_role, default_value = "lead_organiser")]
    pub(crate) reviewer_role: ReviewerRole,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            employers_csv: None,
            reviewer_role: ReviewerRole::LeadOrganiser,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DuplicateScanArgs {
    /// Employer register CSV export to scan
    #[arg(long)]
    pub(crate) employers_csv: PathBuf,
    /// Minimum name similarity (0-100) for cluster membership
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
}

pub(crate) struct DemoOutcome {
    pub(crate) queue_before: Vec<PromotionCandidate>,
    pub(crate) queue_after: Vec<PromotionCandidate>,
    pub(crate) clusters: Option<Vec<DuplicateCluster>>,
    pub(crate) impact: ImpactReport,
}

pub(crate) fn run_duplicate_scan(args: DuplicateScanArgs) -> Result<(), AppError> {
    let employers = EmployerCsvImporter::from_path(&args.employers_csv)?;
    let threshold = args
        .threshold
        .unwrap_or_else(|| ResolutionConfig::default().cluster_threshold);
    let pending: Vec<Employer> = employers
        .into_iter()
        .filter(Employer::is_pending)
        .collect();

    let clusters = cluster_employers(&pending, threshold);
    println!(
        "Duplicate scan of {} ({} pending employers, threshold {:.0})",
        args.employers_csv.display(),
        pending.len(),
        threshold
    );
    render_clusters(&clusters);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let outcome = build_demo(args)?;

    println!("Employer identity review demo");
    println!("\nPromotion queue ({} candidates)", outcome.queue_before.len());
    render_queue(&outcome.queue_before);
    println!(
        "\nPromotion queue after review ({} candidates)",
        outcome.queue_after.len()
    );
    render_queue(&outcome.queue_after);

    match &outcome.clusters {
        Some(clusters) => {
            println!("\nDuplicate clusters");
            render_clusters(clusters);
        }
        None => println!("\nDuplicate scan skipped: reviewer lacks the duplicate review capability"),
    }

    println!(
        "\nMerge impact ({} dependents in total)",
        outcome.impact.total_dependents
    );
    for row in &outcome.impact.rows {
        println!(
            "- {}: {} placements | {} project roles | {} site trades | {} visits | {} aliases | {} total",
            row.employer_id,
            row.placements,
            row.project_roles,
            row.site_trades,
            row.visits,
            row.aliases,
            row.total()
        );
    }
    Ok(())
}

pub(crate) fn build_demo(args: DemoArgs) -> Result<DemoOutcome, AppError> {
    let employers = load_register(args.employers_csv.as_deref())?;
    let repository = Arc::new(InMemoryIdentityRepository::default());
    seed_repository(&repository, employers.clone())?;
    let service = EmployerIdentityService::new(repository, ResolutionConfig::default());

    collect_demo_aliases(&service, &employers)?;
    let queue_before = service.promotion_queue()?;

    // approve the head of the queue, defer the tail
    let mut actions = Vec::new();
    if let Some(head) = queue_before.first() {
        actions.push((head, DecisionAction::Approve));
    }
    if queue_before.len() > 1 {
        if let Some(tail) = queue_before.last() {
            actions.push((tail, DecisionAction::Defer));
        }
    }
    for (candidate, action) in actions {
        service.record_decision(DecisionRequest {
            employer_id: candidate.employer_id.clone(),
            alias_id: candidate.alias_id.clone(),
            action,
            decided_by: "demo-reviewer".to_string(),
            reason: Some(format!("demo {}", action.label())),
        })?;
    }
    let queue_after = service.promotion_queue()?;

    let reviewer = Reviewer::new("demo-reviewer", args.reviewer_role);
    let clusters = match service.scan_duplicates(&reviewer) {
        Ok(clusters) => Some(clusters),
        Err(IdentityServiceError::Permission(_)) => None,
        Err(err) => return Err(err.into()),
    };

    let impact_ids: Vec<EmployerId> = match clusters.as_ref().and_then(|found| found.first()) {
        Some(cluster) => cluster
            .members
            .iter()
            .map(|member| member.employer_id.clone())
            .collect(),
        None => employers.iter().map(|employer| employer.id.clone()).collect(),
    };
    let impact = service.merge_impact(&impact_ids)?;

    Ok(DemoOutcome {
        queue_before,
        queue_after,
        clusters,
        impact,
    })
}

/// One trading-name alias per registry id, corroborated by that id, plus an
/// authoritative manual alias for the first employer.
fn collect_demo_aliases(
    service: &EmployerIdentityService<InMemoryIdentityRepository>,
    employers: &[Employer],
) -> Result<(), AppError> {
    let collected_at = Utc::now();
    for employer in employers {
        for (system, identifier) in &employer.external_ids {
            service.record_alias(
                employer.id.clone(),
                AliasSubmission {
                    raw: format!("{} Holdings", employer.name),
                    source: AliasSource::from(*system),
                    source_identifier: Some(identifier.clone()),
                    collected_at,
                    collected_by: "registry-sync".to_string(),
                    is_authoritative: false,
                    notes: None,
                },
            )?;
        }
    }

    if let Some(first) = employers.first() {
        service.record_alias(
            first.id.clone(),
            AliasSubmission {
                raw: format!("{} Trading", first.name),
                source: AliasSource::Manual,
                source_identifier: None,
                collected_at,
                collected_by: "demo-organiser".to_string(),
                is_authoritative: true,
                notes: Some("confirmed on site visit".to_string()),
            },
        )?;
    }
    Ok(())
}

fn render_queue(queue: &[PromotionCandidate]) {
    if queue.is_empty() {
        println!("- (empty)");
    }
    for candidate in queue {
        let status = match (&candidate.approved_at, &candidate.previous_decision) {
            (Some(_), _) => " [approved]",
            (None, Some(_)) => " [returned from deferral]",
            (None, None) => "",
        };
        println!(
            "- [p{}] {} -> {} ({}, collected by {}){}",
            candidate.priority,
            candidate.alias,
            candidate.employer_name,
            candidate.source.label(),
            candidate.collected_by,
            status
        );
        for conflict in &candidate.conflicts {
            println!(
                "    conflicts with {} ({}) at {:.2}",
                conflict.employer_name, conflict.employer_id, conflict.similarity
            );
        }
    }
}

fn render_clusters(clusters: &[DuplicateCluster]) {
    if clusters.is_empty() {
        println!("- no clusters above threshold");
    }
    for cluster in clusters {
        println!(
            "- {} ({}) with {} members, similarity {:.2}-{:.2}",
            cluster.anchor_name,
            cluster.anchor_id,
            cluster.member_count,
            cluster.min_similarity,
            cluster.max_similarity
        );
        for member in cluster.members.iter().skip(1) {
            println!(
                "    {} ({}) at {:.2}",
                member.name, member.employer_id, member.similarity
            );
        }
    }
}
