//! Data models for the data-governance server.
//!
//! This module re-exports all model types used throughout the application.

pub mod column;
pub mod connection;
pub mod envelope;

// Re-export commonly used types
pub use column::{
    Classification, ColumnInput, ColumnRecord, InvalidNdmoClassification, NdmoClassification,
    SensitivityFlags, duplicate_names, new_record_id,
};
pub use connection::{
    ConnectionStringError, DatabaseType, OracleConnectParams, mask_connection_string,
};
pub use envelope::Envelope;
