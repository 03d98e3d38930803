//! Column record data models.
//!
//! A [`ColumnRecord`] is the unit moved between storage, the tool boundary and
//! client state: one governed database column with its NDMO level and five
//! independent sensitivity flags.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// NDMO sensitivity level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema,
)]
pub enum NdmoClassification {
    #[serde(rename = "Top Secret")]
    TopSecret,
    #[serde(rename = "Secret")]
    Secret,
    #[serde(rename = "Restricted")]
    Restricted,
    #[default]
    #[serde(rename = "Public")]
    Public,
}

impl NdmoClassification {
    /// All levels, most to least sensitive.
    pub const ALL: [NdmoClassification; 4] = [
        Self::TopSecret,
        Self::Secret,
        Self::Restricted,
        Self::Public,
    ];

    /// Get the canonical label stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopSecret => "Top Secret",
            Self::Secret => "Secret",
            Self::Restricted => "Restricted",
            Self::Public => "Public",
        }
    }

    /// Parse a stored label; anything unrecognised or blank falls back to `Public`.
    pub fn from_str_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for NdmoClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not an NDMO classification (expected Top Secret, Secret, Restricted or Public)")]
pub struct InvalidNdmoClassification(pub String);

impl FromStr for NdmoClassification {
    type Err = InvalidNdmoClassification;

    /// Case-insensitive; `_`, `-` and repeated spaces are treated as a single space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match normalized.as_str() {
            "top secret" => Ok(Self::TopSecret),
            "secret" => Ok(Self::Secret),
            "restricted" => Ok(Self::Restricted),
            "public" => Ok(Self::Public),
            _ => Err(InvalidNdmoClassification(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for NdmoClassification {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The five independent sensitivity flags. No flag implies another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SensitivityFlags {
    /// Personally identifiable information
    pub pii: bool,
    /// Protected health information
    pub phi: bool,
    /// Personal financial information
    pub pfi: bool,
    /// Payment-system information
    pub psi: bool,
    /// Payment card industry data
    pub pci: bool,
}

impl SensitivityFlags {
    /// Every flag set.
    pub fn all() -> Self {
        Self {
            pii: true,
            phi: true,
            pfi: true,
            psi: true,
            pci: true,
        }
    }

    /// Flags in storage column order: pii, phi, pfi, psi, pci.
    pub fn as_array(&self) -> [bool; 5] {
        [self.pii, self.phi, self.pfi, self.psi, self.pci]
    }

    pub fn from_array(flags: [bool; 5]) -> Self {
        let [pii, phi, pfi, psi, pci] = flags;
        Self {
            pii,
            phi,
            pfi,
            psi,
            pci,
        }
    }
}

/// AI-produced (or user-entered) governance fields: everything but id and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub description: String,
    #[serde(alias = "ndmo_classification")]
    pub ndmo_classification: NdmoClassification,
    #[serde(default, alias = "reason_ndmo")]
    pub reason_ndmo: Option<String>,
    #[serde(flatten)]
    pub flags: SensitivityFlags,
}

/// A governed database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRecord {
    /// Opaque unique identifier; primary key in storage
    pub id: String,
    /// The governed column's name. Not unique.
    pub column_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ndmo_classification: NdmoClassification,
    #[serde(default)]
    pub reason_ndmo: Option<String>,
    #[serde(flatten)]
    pub flags: SensitivityFlags,
}

/// Generate a fresh record id.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ColumnRecord {
    /// Create a record with a fresh id and default governance fields.
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            column_name: column_name.into(),
            description: String::new(),
            ndmo_classification: NdmoClassification::default(),
            reason_ndmo: None,
            flags: SensitivityFlags::default(),
        }
    }

    /// Build a record from a classification result for the given column name.
    pub fn from_classification(column_name: impl Into<String>, classification: Classification) -> Self {
        Self {
            id: new_record_id(),
            column_name: column_name.into(),
            description: classification.description,
            ndmo_classification: classification.ndmo_classification,
            reason_ndmo: classification.reason_ndmo,
            flags: classification.flags,
        }
    }

    /// Assign a fresh id when the current one is blank.
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = new_record_id();
        }
    }

    /// Check the fields required before any write.
    pub fn validate(&self) -> Result<(), String> {
        if self.column_name.trim().is_empty() {
            return Err("columnName is required".to_string());
        }
        Ok(())
    }

    /// Reason text with blanks collapsed to `None`.
    pub fn reason(&self) -> Option<&str> {
        self.reason_ndmo.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// Column record as accepted from callers: the id may be omitted.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInput {
    /// Leave empty to have the server assign one
    #[serde(default)]
    pub id: Option<String>,
    pub column_name: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to "Public"
    #[serde(default)]
    pub ndmo_classification: NdmoClassification,
    #[serde(default)]
    pub reason_ndmo: Option<String>,
    #[serde(default)]
    pub pii: bool,
    #[serde(default)]
    pub phi: bool,
    #[serde(default)]
    pub pfi: bool,
    #[serde(default)]
    pub psi: bool,
    #[serde(default)]
    pub pci: bool,
}

impl From<ColumnInput> for ColumnRecord {
    fn from(input: ColumnInput) -> Self {
        let mut record = Self {
            id: input.id.unwrap_or_default(),
            column_name: input.column_name.trim().to_string(),
            description: input.description,
            ndmo_classification: input.ndmo_classification,
            reason_ndmo: input.reason_ndmo,
            flags: SensitivityFlags {
                pii: input.pii,
                phi: input.phi,
                pfi: input.pfi,
                psi: input.psi,
                pci: input.pci,
            },
        };
        record.ensure_id();
        record
    }
}

/// Column names that occur more than once, with their occurrence counts.
///
/// Duplicates are legal; this feeds operator review.
pub fn duplicate_names(records: &[ColumnRecord]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.column_name.clone()).or_default() += 1;
    }
    counts.retain(|_, count| *count > 1);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndmo_parse_is_lenient_on_case_and_separators() {
        assert_eq!(
            "top secret".parse::<NdmoClassification>().unwrap(),
            NdmoClassification::TopSecret
        );
        assert_eq!(
            "TOP_SECRET".parse::<NdmoClassification>().unwrap(),
            NdmoClassification::TopSecret
        );
        assert_eq!(
            " Restricted ".parse::<NdmoClassification>().unwrap(),
            NdmoClassification::Restricted
        );
        assert!("Confidential".parse::<NdmoClassification>().is_err());
    }

    #[test]
    fn test_ndmo_default_is_public() {
        assert_eq!(NdmoClassification::default(), NdmoClassification::Public);
        assert_eq!(
            NdmoClassification::from_str_or_default(""),
            NdmoClassification::Public
        );
    }

    #[test]
    fn test_ndmo_serializes_to_label() {
        let json = serde_json::to_string(&NdmoClassification::TopSecret).unwrap();
        assert_eq!(json, "\"Top Secret\"");
    }

    #[test]
    fn test_column_record_wire_shape() {
        let mut record = ColumnRecord::new("card_number");
        record.flags.pci = true;
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["columnName"], "card_number");
        assert_eq!(value["ndmoClassification"], "Public");
        assert_eq!(value["pci"], true);
        assert_eq!(value["pii"], false);
        assert!(value.get("flags").is_none());
    }

    #[test]
    fn test_column_input_assigns_id() {
        let input: ColumnInput =
            serde_json::from_str(r#"{"columnName": " email ", "pii": true}"#).unwrap();
        let record = ColumnRecord::from(input);
        assert!(!record.id.is_empty());
        assert_eq!(record.column_name, "email");
        assert!(record.flags.pii);
        assert_eq!(record.ndmo_classification, NdmoClassification::Public);
    }

    #[test]
    fn test_column_input_keeps_given_id() {
        let input: ColumnInput =
            serde_json::from_str(r#"{"id": "abc", "columnName": "email"}"#).unwrap();
        assert_eq!(ColumnRecord::from(input).id, "abc");
    }

    #[test]
    fn test_validate_requires_column_name() {
        let record = ColumnRecord::new("  ");
        assert!(record.validate().is_err());
        assert!(ColumnRecord::new("ssn").validate().is_ok());
    }

    #[test]
    fn test_flags_array_order() {
        let flags = SensitivityFlags {
            pfi: true,
            pci: true,
            ..Default::default()
        };
        assert_eq!(flags.as_array(), [false, false, true, false, true]);
        assert_eq!(SensitivityFlags::from_array(flags.as_array()), flags);
    }

    #[test]
    fn test_duplicate_names() {
        let records = vec![
            ColumnRecord::new("email"),
            ColumnRecord::new("phone"),
            ColumnRecord::new("email"),
        ];
        let dups = duplicate_names(&records);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups["email"], 2);
    }
}
