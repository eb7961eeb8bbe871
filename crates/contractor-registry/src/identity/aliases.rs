use super::domain::{AliasSubmission, EmployerId};
use super::normalize::normalize_name;
use super::repository::AliasUpsert;

/// Reasons an alias candidate is refused before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasValidationError {
    #[error("alias text '{raw}' is empty after normalization")]
    EmptyText { raw: String },
    #[error("alias provenance requires a collecting actor")]
    EmptyCollector,
}

/// Turn a submission into the keyed upsert the store applies atomically.
pub(crate) fn prepare_upsert(
    employer_id: EmployerId,
    submission: AliasSubmission,
) -> Result<AliasUpsert, AliasValidationError> {
    let normalized = normalize_name(&submission.raw);
    if normalized.is_empty() {
        return Err(AliasValidationError::EmptyText {
            raw: submission.raw,
        });
    }

    let collected_by = submission.collected_by.trim().to_string();
    if collected_by.is_empty() {
        return Err(AliasValidationError::EmptyCollector);
    }

    Ok(AliasUpsert {
        employer_id,
        raw: submission.raw.trim().to_string(),
        normalized,
        source: submission.source,
        source_identifier: non_blank(submission.source_identifier),
        collected_at: submission.collected_at,
        collected_by,
        is_authoritative: submission.is_authoritative,
        notes: non_blank(submission.notes),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
