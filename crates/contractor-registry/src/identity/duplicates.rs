//! Greedy single-link clustering of pending employers.
//!
//! Each anchor is compared only against the employers still unassigned when its turn
//! comes, and members are never compared with each other. Names that are similar to
//! one another but not to the anchor therefore land in separate clusters (or none).
//! The scan is O(n²) in the pending set and keeps no state between calls.

use serde::Serialize;

use super::domain::{Employer, EmployerId, Reviewer};
use super::normalize::normalize_name;
use super::similarity::name_similarity;

/// Similarity an anchor reports against itself.
const ANCHOR_SIMILARITY: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMember {
    pub employer_id: EmployerId,
    pub name: String,
    /// Levenshtein similarity to the anchor, 0 to 100.
    pub similarity: f64,
}

/// Group of pending employers that probably denote one real-world entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCluster {
    pub anchor_id: EmployerId,
    pub anchor_name: String,
    /// Anchor first, then matched employers in scan order.
    pub members: Vec<ClusterMember>,
    pub member_count: usize,
    /// Bounds over the non-anchor members.
    pub min_similarity: f64,
    pub max_similarity: f64,
}

/// Raised when the caller lacks the capability a privileged operation needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reviewer {reviewer} lacks the {required} capability")]
pub struct PermissionDenied {
    pub reviewer: String,
    pub required: &'static str,
}

pub(crate) fn authorize_scan(reviewer: &Reviewer) -> Result<(), PermissionDenied> {
    if reviewer.can_review_duplicates() {
        Ok(())
    } else {
        Err(PermissionDenied {
            reviewer: reviewer.id.clone(),
            required: "duplicate_review",
        })
    }
}

/// Cluster `employers` by normalized-name similarity.
///
/// Order of the input does not matter; employers are walked newest first with the
/// id as a stable tie-break. Only clusters with more than one member are returned.
pub fn cluster_employers(employers: &[Employer], threshold: f64) -> Vec<DuplicateCluster> {
    let mut order: Vec<usize> = (0..employers.len()).collect();
    order.sort_by(|&a, &b| {
        employers[b]
            .created_at
            .cmp(&employers[a].created_at)
            .then_with(|| employers[a].id.cmp(&employers[b].id))
    });

    let normalized: Vec<String> = employers
        .iter()
        .map(|employer| normalize_name(&employer.name))
        .collect();

    let mut assigned = vec![false; employers.len()];
    let mut clusters = Vec::new();

    for (position, &anchor) in order.iter().enumerate() {
        if assigned[anchor] {
            continue;
        }
        assigned[anchor] = true;

        let matches: Vec<(usize, f64)> = order[position + 1..]
            .iter()
            .filter(|&&candidate| !assigned[candidate])
            .map(|&candidate| {
                let score = name_similarity(&normalized[anchor], &normalized[candidate]);
                (candidate, score)
            })
            .filter(|&(_, score)| score >= threshold)
            .collect();

        if matches.is_empty() {
            continue;
        }

        for &(candidate, _) in &matches {
            assigned[candidate] = true;
        }

        clusters.push(build_cluster(employers, anchor, &matches));
    }

    clusters
}

fn build_cluster(employers: &[Employer], anchor: usize, matches: &[(usize, f64)]) -> DuplicateCluster {
    let anchor_employer = &employers[anchor];
    let mut members = Vec::with_capacity(matches.len() + 1);
    members.push(ClusterMember {
        employer_id: anchor_employer.id.clone(),
        name: anchor_employer.name.clone(),
        similarity: ANCHOR_SIMILARITY,
    });

    let mut min_similarity = f64::MAX;
    let mut max_similarity = f64::MIN;
    for &(index, similarity) in matches {
        min_similarity = min_similarity.min(similarity);
        max_similarity = max_similarity.max(similarity);
        members.push(ClusterMember {
            employer_id: employers[index].id.clone(),
            name: employers[index].name.clone(),
            similarity,
        });
    }

    DuplicateCluster {
        anchor_id: anchor_employer.id.clone(),
        anchor_name: anchor_employer.name.clone(),
        member_count: members.len(),
        members,
        min_similarity,
        max_similarity,
    }
}
