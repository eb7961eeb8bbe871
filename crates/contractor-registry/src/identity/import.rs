use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{AgreementStatus, ApprovalState, Employer, EmployerId, ExternalSystem};

#[derive(Debug)]
pub enum EmployerImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for EmployerImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployerImportError::Io(err) => write!(f, "failed to read employer export: {}", err),
            EmployerImportError::Csv(err) => write!(f, "invalid employer CSV data: {}", err),
            EmployerImportError::InvalidRow { line, reason } => {
                write!(f, "employer CSV line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for EmployerImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmployerImportError::Io(err) => Some(err),
            EmployerImportError::Csv(err) => Some(err),
            EmployerImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for EmployerImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for EmployerImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads employer identity rows from a registry export.
///
/// Columns: `id`, `name`, `created_at` (RFC 3339), optional `approval`
/// (`pending` by default) and optional `abr`, `bci`, `fwc`, `incolink` identifiers.
pub struct EmployerCsvImporter;

impl EmployerCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Employer>, EmployerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Employer>, EmployerImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut employers = Vec::new();

        let headers = csv_reader.byte_headers()?.clone();
        let mut record = csv::ByteRecord::new();
        while csv_reader.read_byte_record(&mut record)? {
            let line = record.position().map_or(0, |position| position.line());
            let row: EmployerRow = record.deserialize(Some(&headers))?;
            employers.push(row.into_employer(line)?);
        }

        Ok(employers)
    }
}

#[derive(Debug, Deserialize)]
struct EmployerRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    approval: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    abr: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bci: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    fwc: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    incolink: Option<String>,
}

impl EmployerRow {
    fn into_employer(self, line: u64) -> Result<Employer, EmployerImportError> {
        if self.id.is_empty() || self.name.is_empty() {
            return Err(EmployerImportError::InvalidRow {
                line,
                reason: "id and name are required".to_string(),
            });
        }

        let approval = match self.approval.as_deref().map(str::to_ascii_lowercase) {
            None => ApprovalState::Pending,
            Some(value) if value == "pending" => ApprovalState::Pending,
            Some(value) if value == "active" => ApprovalState::Active,
            Some(value) => {
                return Err(EmployerImportError::InvalidRow {
                    line,
                    reason: format!("unknown approval state '{value}'"),
                })
            }
        };

        let mut external_ids = BTreeMap::new();
        for (system, value) in [
            (ExternalSystem::Abr, self.abr),
            (ExternalSystem::Bci, self.bci),
            (ExternalSystem::Fwc, self.fwc),
            (ExternalSystem::Incolink, self.incolink),
        ] {
            if let Some(value) = value {
                external_ids.insert(system, value);
            }
        }

        Ok(Employer {
            id: EmployerId(self.id),
            name: self.name,
            external_ids,
            approval,
            agreement: AgreementStatus::None,
            created_at: self.created_at,
            updated_at: self.created_at,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn imports_pending_employers_with_external_ids() {
        let csv = "id,name,created_at,approval,abr,bci,fwc,incolink\n\
                   emp-1,ACME Pty Ltd,2025-01-01T00:00:00Z,,51824753556,,,\n\
                   emp-2,Beta Constructions,2025-01-02T00:00:00Z,active,,B-77,,\n";

        let employers =
            EmployerCsvImporter::from_reader(Cursor::new(csv)).expect("import succeeds");

        assert_eq!(employers.len(), 2);
        assert_eq!(employers[0].approval, ApprovalState::Pending);
        assert_eq!(
            employers[0].external_ids.get(&ExternalSystem::Abr).map(String::as_str),
            Some("51824753556")
        );
        assert!(employers[0].external_ids.get(&ExternalSystem::Bci).is_none());
        assert_eq!(employers[1].approval, ApprovalState::Active);
        assert!(employers[1].has_external_id(ExternalSystem::Bci));
    }

    #[test]
    fn minimal_columns_are_enough() {
        let csv = "id,name,created_at\nemp-9,Gamma Civil,2025-03-01T08:30:00+10:00\n";
        let employers =
            EmployerCsvImporter::from_reader(Cursor::new(csv)).expect("import succeeds");
        assert_eq!(employers.len(), 1);
        assert!(employers[0].external_ids.is_empty());
        assert!(employers[0].is_pending());
    }

    #[test]
    fn unknown_approval_state_is_rejected() {
        let csv = "id,name,created_at,approval\nemp-1,Acme,2025-01-01T00:00:00Z,archived\n";
        match EmployerCsvImporter::from_reader(Cursor::new(csv)) {
            Err(EmployerImportError::InvalidRow { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("archived"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn invalid_row_reports_its_own_line() {
        let csv = "id,name,created_at
                   emp-1,Acme,2025-01-01T00:00:00Z
                   emp-2,,2025-01-02T00:00:00Z
                   emp-3,Gamma Civil,2025-01-03T00:00:00Z
";
        match EmployerCsvImporter::from_reader(Cursor::new(csv)) {
            Err(EmployerImportError::InvalidRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn malformed_timestamp_surfaces_csv_error() {
        let csv = "id,name,created_at\nemp-1,Acme,yesterday\n";
        assert!(matches!(
            EmployerCsvImporter::from_reader(Cursor::new(csv)),
            Err(EmployerImportError::Csv(_))
        ));
    }
}
