use chrono::{Duration, Utc};

use super::common::*;
use crate::identity::domain::{AliasSource, DecisionAction, ExternalSystem};
use crate::identity::queue::{
    alias_priority, AUTHORITATIVE_PRIORITY, BASELINE_PRIORITY, TRUSTED_SOURCE_PRIORITY,
};
use crate::identity::repository::IdentityRepository;
use crate::identity::ResolutionConfig;

#[test]
fn authoritative_aliases_appear_exactly_once() {
    let (service, repository) = build_service();
    seed(
        &repository,
        vec![
            employer("emp-1", "Acme Pty Ltd", at(1, 9)),
            employer("emp-2", "Beta Constructions", at(1, 10)),
        ],
    );

    for (employer, raw) in [
        ("emp-1", "Acme Formwork"),
        ("emp-1", "Acme Civil"),
        ("emp-2", "Beta Group"),
    ] {
        service
            .record_alias(
                employer_id(employer),
                submission(raw, AliasSource::Manual, true, at(2, 9)),
            )
            .expect("alias");
    }
    // refresh one key; must not duplicate the row in the queue
    service
        .record_alias(
            employer_id("emp-1"),
            submission("ACME CIVIL", AliasSource::Manual, true, at(3, 9)),
        )
        .expect("refresh");

    let queue = service.promotion_queue().expect("queue");
    let snapshot = repository.review_snapshot().expect("snapshot");

    assert_eq!(queue.len(), 3);
    for alias in &snapshot.aliases {
        let hits = queue.iter().filter(|row| row.alias_id == alias.id).count();
        assert_eq!(hits, 1, "alias {} should be queued once", alias.id);
    }
    assert!(queue
        .iter()
        .all(|row| row.priority == AUTHORITATIVE_PRIORITY));
}

#[test]
fn alias_matching_canonical_name_is_not_queued() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);

    service
        .record_alias(
            employer_id("emp-1"),
            submission("ACME PTY. LTD", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");

    assert!(service.promotion_queue().expect("queue").is_empty());
}

#[test]
fn trusted_source_needs_matching_external_id() {
    let (service, repository) = build_service();
    seed(
        &repository,
        vec![
            with_external_id(
                employer("emp-1", "Acme Pty Ltd", at(1, 9)),
                ExternalSystem::Abr,
                "51824753556",
            ),
            employer("emp-2", "Beta Constructions", at(1, 10)),
        ],
    );

    let corroborated = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Building Group", AliasSource::Abr, false, at(2, 9)),
        )
        .expect("abr alias");
    // wrong registry for emp-1
    service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Concreting", AliasSource::Bci, false, at(2, 9)),
        )
        .expect("bci alias");
    // emp-2 has no registry ids at all
    service
        .record_alias(
            employer_id("emp-2"),
            submission("Beta Build", AliasSource::Fwc, false, at(2, 9)),
        )
        .expect("fwc alias");
    // manual and not authoritative
    service
        .record_alias(
            employer_id("emp-2"),
            submission("Beta Civil", AliasSource::Manual, false, at(2, 9)),
        )
        .expect("manual alias");

    let queue = service.promotion_queue().expect("queue");

    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].alias_id, corroborated.id);
    assert_eq!(queue[0].priority, TRUSTED_SOURCE_PRIORITY);
}

#[test]
fn rejected_alias_never_returns_even_after_upserts() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);
    let alias = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");

    service
        .record_decision(decision(&alias, DecisionAction::Reject))
        .expect("reject");
    service
        .record_alias(
            employer_id("emp-1"),
            submission("acme civil", AliasSource::Abr, true, at(9, 9)),
        )
        .expect("upsert same key");

    let far_future = Utc::now() + Duration::days(3650);
    assert!(service.promotion_queue().expect("queue").is_empty());
    assert!(service
        .promotion_queue_at(far_future)
        .expect("queue")
        .is_empty());
}

#[test]
fn reject_applies_to_the_pair_only() {
    let (service, repository) = build_service();
    seed(
        &repository,
        vec![
            employer("emp-1", "Acme Pty Ltd", at(1, 9)),
            employer("emp-2", "Beta Constructions", at(1, 10)),
        ],
    );
    let rejected = service
        .record_alias(
            employer_id("emp-1"),
            submission("Shared Trading Name", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    let other = service
        .record_alias(
            employer_id("emp-2"),
            submission("Shared Trading Name", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    service
        .record_decision(decision(&rejected, DecisionAction::Reject))
        .expect("reject");

    let queue = service.promotion_queue().expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].alias_id, other.id);
}

#[test]
fn deferred_alias_reenters_after_window_with_previous_decision() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);
    let alias = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    let defer = service
        .record_decision(decision(&alias, DecisionAction::Defer))
        .expect("defer");

    assert!(service.promotion_queue().expect("queue").is_empty());

    let window = service.config().defer_window().expect("defer window");
    let later = defer.decided_at + window;
    let queue = service.promotion_queue_at(later).expect("queue");

    assert_eq!(queue.len(), 1);
    let previous = queue[0]
        .previous_decision
        .as_ref()
        .expect("previous defer carried");
    assert_eq!(previous.id, defer.id);
    assert_eq!(previous.action, DecisionAction::Defer);
}

#[test]
fn deferral_is_permanent_without_a_window() {
    let (service, repository) = build_service_with(ResolutionConfig {
        defer_days: None,
        ..ResolutionConfig::default()
    });
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);
    let alias = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    service
        .record_decision(decision(&alias, DecisionAction::Defer))
        .expect("defer");

    let far_future = Utc::now() + Duration::days(3650);
    assert!(service
        .promotion_queue_at(far_future)
        .expect("queue")
        .is_empty());
}

#[test]
fn approved_alias_stays_visible_with_approval_time() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);
    let alias = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    let approval = service
        .record_decision(decision(&alias, DecisionAction::Approve))
        .expect("approve");

    let queue = service.promotion_queue().expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].approved_at, Some(approval.decided_at));
    assert!(queue[0].previous_decision.is_none());
}

#[test]
fn authoritative_precedes_trusted_source_regardless_of_recency() {
    let (service, repository) = build_service();
    seed(
        &repository,
        vec![with_external_id(
            employer("emp-1", "Acme Pty Ltd", at(1, 9)),
            ExternalSystem::Fwc,
            "FWC-123",
        )],
    );

    let older_authoritative = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("authoritative");
    let newer_trusted = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Formwork", AliasSource::Fwc, false, at(20, 9)),
        )
        .expect("trusted");

    let queue = service.promotion_queue().expect("queue");

    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].alias_id, older_authoritative.id);
    assert_eq!(queue[0].priority, AUTHORITATIVE_PRIORITY);
    assert_eq!(queue[1].alias_id, newer_trusted.id);
    assert_eq!(queue[1].priority, TRUSTED_SOURCE_PRIORITY);
}

#[test]
fn equal_priority_orders_by_collection_then_creation_recency() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);

    let older = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("older");
    let newest = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Formwork", AliasSource::Manual, true, at(10, 9)),
        )
        .expect("newest");
    let same_collection_created_later = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Steel", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("created later");

    let queue = service.promotion_queue().expect("queue");
    let order: Vec<_> = queue.iter().map(|row| row.alias_id.clone()).collect();

    assert_eq!(order[0], newest.id);
    if same_collection_created_later.created_at > older.created_at {
        assert_eq!(order[1], same_collection_created_later.id);
        assert_eq!(order[2], older.id);
    } else {
        // identical creation instants fall back to alias id
        assert_eq!(order[1], older.id);
        assert_eq!(order[2], same_collection_created_later.id);
    }
}

#[test]
fn conflicts_are_capped_and_above_threshold() {
    let (service, repository) = build_service();
    let mut employers = vec![employer("emp-0", "Owner Holdings", at(1, 9))];
    for index in 1..=7 {
        employers.push(active_employer(
            &format!("emp-{index}"),
            "Acme Civil Contractors",
            at(1, 9),
        ));
    }
    employers.push(employer("emp-8", "Acme Civil Contractor", at(1, 9)));
    employers.push(employer("emp-9", "Zenith Scaffolding", at(1, 9)));
    seed(&repository, employers);

    service
        .record_alias(
            employer_id("emp-0"),
            submission("ACME Civil Contractors", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");

    let queue = service.promotion_queue().expect("queue");
    assert_eq!(queue.len(), 1);
    let conflicts = &queue[0].conflicts;

    assert_eq!(conflicts.len(), 5);
    assert!(conflicts
        .iter()
        .all(|conflict| (0.8..=1.0).contains(&conflict.similarity)));
    assert!(conflicts
        .iter()
        .all(|conflict| conflict.employer_id.0 != "emp-0" && conflict.employer_id.0 != "emp-9"));
    assert!(conflicts.iter().all(|conflict| conflict.similarity == 1.0));
}

#[test]
fn near_match_is_reported_with_trigram_score() {
    let (service, repository) = build_service();
    seed(
        &repository,
        vec![
            employer("emp-0", "Owner Holdings", at(1, 9)),
            employer("emp-1", "Acme Civil Contractor", at(1, 9)),
            employer("emp-2", "Acme Plumbing", at(1, 9)),
        ],
    );

    service
        .record_alias(
            employer_id("emp-0"),
            submission("Acme Civil Contractors", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");

    let queue = service.promotion_queue().expect("queue");
    let conflicts = &queue[0].conflicts;

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].employer_id.0, "emp-1");
    assert!(conflicts[0].similarity > 0.8 && conflicts[0].similarity < 1.0);
}

#[test]
fn queue_reflects_latest_writes_without_caching() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);

    assert!(service.promotion_queue().expect("empty queue").is_empty());

    let alias = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, true, at(2, 9)),
        )
        .expect("alias");
    assert_eq!(service.promotion_queue().expect("queue").len(), 1);

    service
        .record_decision(decision(&alias, DecisionAction::Reject))
        .expect("reject");
    assert!(service.promotion_queue().expect("queue").is_empty());
}

#[test]
fn priority_tiers() {
    let (service, repository) = build_service();
    seed(&repository, vec![employer("emp-1", "Acme Pty Ltd", at(1, 9))]);

    let manual = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Civil", AliasSource::Manual, false, at(2, 9)),
        )
        .expect("manual");
    let legacy = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Legacy", AliasSource::LegacyImport, false, at(2, 9)),
        )
        .expect("legacy");
    let registry = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Incolink", AliasSource::Incolink, false, at(2, 9)),
        )
        .expect("registry");
    let authoritative = service
        .record_alias(
            employer_id("emp-1"),
            submission("Acme Trusted", AliasSource::LegacyImport, true, at(2, 9)),
        )
        .expect("authoritative");

    assert_eq!(alias_priority(&manual), BASELINE_PRIORITY);
    assert_eq!(alias_priority(&legacy), BASELINE_PRIORITY);
    assert_eq!(alias_priority(&registry), TRUSTED_SOURCE_PRIORITY);
    assert_eq!(alias_priority(&authoritative), AUTHORITATIVE_PRIORITY);
}
