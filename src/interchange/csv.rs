//! CSV import and export of column records.
//!
//! Headers are matched loosely: `Column Name`, `column_name` and `columnName`
//! all name the same field. Boolean cells accept `true`, `yes` or `1`
//! (any case); everything else is false.

use crate::models::{ColumnRecord, NdmoClassification, SensitivityFlags, new_record_id};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Export header, in output order.
pub const EXPORT_HEADERS: [&str; 10] = [
    "ID",
    "Column Name",
    "Description",
    "NDMO Classification",
    "Reason NDMO",
    "PII",
    "PHI",
    "PFI",
    "PSI",
    "PCI",
];

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("CSV header has no column name field (expected 'Column Name', 'column_name' or 'columnName')")]
    MissingColumnName,

    #[error("Failed to write CSV: {0}")]
    Write(String),
}

/// A data row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SkippedRow {
    /// 1-based line number in the input, header included
    pub line: u64,
    pub reason: String,
}

/// Records parsed from a CSV document.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct CsvImport {
    pub records: Vec<ColumnRecord>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    ColumnName,
    Description,
    Ndmo,
    Reason,
    Flag(usize),
}

/// Map a header cell to a field, ignoring case, spaces, underscores and dashes.
fn field_for_header(header: &str) -> Option<Field> {
    let key: String = header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .to_lowercase();
    match key.as_str() {
        "id" => Some(Field::Id),
        "columnname" => Some(Field::ColumnName),
        "description" => Some(Field::Description),
        "ndmoclassification" => Some(Field::Ndmo),
        "reasonndmo" => Some(Field::Reason),
        "pii" => Some(Field::Flag(0)),
        "phi" => Some(Field::Flag(1)),
        "pfi" => Some(Field::Flag(2)),
        "psi" => Some(Field::Flag(3)),
        "pci" => Some(Field::Flag(4)),
        _ => None,
    }
}

/// Permissive boolean: `true`, `yes` and `1` in any case.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

/// Parse CSV text into column records.
///
/// Blank ids get a fresh one; blank or unknown NDMO levels become `Public`.
/// Rows without a column name are skipped and reported.
pub fn import_csv(input: &str) -> Result<CsvImport, CsvError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(input.trim_start_matches('\u{feff}').as_bytes());

    let fields: Vec<Option<Field>> = reader.headers()?.iter().map(field_for_header).collect();
    if !fields.contains(&Some(Field::ColumnName)) {
        return Err(CsvError::MissingColumnName);
    }

    let mut import = CsvImport::default();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let mut record = ColumnRecord::new(String::new());
        record.id = String::new();
        let mut flags = [false; 5];
        for (field, value) in fields.iter().zip(row.iter()) {
            match field {
                Some(Field::Id) => record.id = value.to_string(),
                Some(Field::ColumnName) => record.column_name = value.to_string(),
                Some(Field::Description) => record.description = value.to_string(),
                Some(Field::Ndmo) => {
                    record.ndmo_classification = NdmoClassification::from_str_or_default(value)
                }
                Some(Field::Reason) => {
                    record.reason_ndmo = Some(value.to_string()).filter(|r| !r.is_empty())
                }
                Some(Field::Flag(idx)) => flags[*idx] = parse_flag(value),
                None => {}
            }
        }
        record.flags = SensitivityFlags::from_array(flags);

        if record.column_name.is_empty() {
            import.skipped.push(SkippedRow {
                line,
                reason: "missing column name".to_string(),
            });
            continue;
        }
        if record.id.is_empty() {
            record.id = new_record_id();
        }
        import.records.push(record);
    }
    Ok(import)
}

/// Render records as CSV in [`EXPORT_HEADERS`] order.
pub fn export_csv(records: &[ColumnRecord]) -> Result<String, CsvError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        let flags = record.flags.as_array().map(|f| if f { "true" } else { "false" });
        writer.write_record([
            record.id.as_str(),
            record.column_name.as_str(),
            record.description.as_str(),
            record.ndmo_classification.as_str(),
            record.reason_ndmo.as_deref().unwrap_or_default(),
            flags[0],
            flags[1],
            flags[2],
            flags[3],
            flags[4],
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_aliases() {
        for header in ["Column Name", "column_name", "columnName", "COLUMN NAME"] {
            assert_eq!(field_for_header(header), Some(Field::ColumnName));
        }
        assert_eq!(field_for_header("Reason NDMO"), Some(Field::Reason));
        assert_eq!(field_for_header("reasonNdmo"), Some(Field::Reason));
        assert_eq!(field_for_header("NDMO Classification"), Some(Field::Ndmo));
        assert_eq!(field_for_header("ID"), Some(Field::Id));
        assert_eq!(field_for_header("Owner"), None);
    }

    #[test]
    fn test_parse_flag() {
        for value in ["true", "TRUE", "Yes", "1", " yes "] {
            assert!(parse_flag(value), "{value}");
        }
        for value in ["", "no", "0", "false", "y", "2"] {
            assert!(!parse_flag(value), "{value}");
        }
    }

    #[test]
    fn test_import_minimal_row_defaults() {
        let import = import_csv("Column Name,PII\nemail,yes\n").unwrap();
        assert!(import.skipped.is_empty());
        let record = &import.records[0];
        assert_eq!(record.column_name, "email");
        assert!(record.flags.pii);
        assert!(!record.flags.pci);
        assert_eq!(record.ndmo_classification, NdmoClassification::Public);
        assert_eq!(record.description, "");
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_import_skips_nameless_rows() {
        let csv = "id,column_name,description\n,email,Email address\nabc,,orphan\n";
        let import = import_csv(csv).unwrap();
        assert_eq!(import.records.len(), 1);
        assert_eq!(import.skipped, vec![SkippedRow {
            line: 3,
            reason: "missing column name".to_string(),
        }]);
    }

    #[test]
    fn test_import_keeps_supplied_id_and_level() {
        let csv = "ID,Column Name,NDMO Classification,Reason NDMO\nfixed-1,ssn,top secret,National id\n";
        let import = import_csv(csv).unwrap();
        let record = &import.records[0];
        assert_eq!(record.id, "fixed-1");
        assert_eq!(record.ndmo_classification, NdmoClassification::TopSecret);
        assert_eq!(record.reason_ndmo.as_deref(), Some("National id"));
    }

    #[test]
    fn test_import_requires_name_header() {
        let err = import_csv("Description,PII\nx,yes\n").unwrap_err();
        assert!(matches!(err, CsvError::MissingColumnName));
    }

    #[test]
    fn test_export_header_and_values() {
        let mut record = ColumnRecord::new("card_number");
        record.id = "r1".to_string();
        record.description = "Card, primary".to_string();
        record.flags.pci = true;
        let csv = export_csv(&[record]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Column Name,Description,NDMO Classification,Reason NDMO,PII,PHI,PFI,PSI,PCI")
        );
        assert_eq!(
            lines.next(),
            Some("r1,card_number,\"Card, primary\",Public,,false,false,false,false,true")
        );
    }

    #[test]
    fn test_export_then_import_preserves_records() {
        let mut record = ColumnRecord::new("diagnosis");
        record.flags.phi = true;
        record.ndmo_classification = NdmoClassification::Restricted;
        let csv = export_csv(std::slice::from_ref(&record)).unwrap();
        let import = import_csv(&csv).unwrap();
        assert_eq!(import.records, vec![record]);
    }
}
