//! Import and export formats for column records.

pub mod csv;

pub use self::csv::{CsvError, CsvImport, EXPORT_HEADERS, SkippedRow, export_csv, import_csv};
