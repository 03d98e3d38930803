//! Result envelope returned at the tool boundary.
//!
//! Internally every operation returns `CatalogResult<T>`; callers outside the
//! crate receive `{success, message?, error?, error_kind?, data?}`.

use crate::error::{CatalogError, CatalogResult, ErrorKind};
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Hint for recovering from the error, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            error_kind: None,
            suggestion: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn failure(err: &CatalogError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            suggestion: err.suggestion().map(str::to_string),
            data: None,
        }
    }

    /// Build an envelope from a result, attaching `message` only on success.
    pub fn from_result(result: CatalogResult<T>, message: impl FnOnce(&T) -> String) -> Self {
        match result {
            Ok(data) => {
                let msg = message(&data);
                Self::ok_with_message(data, msg)
            }
            Err(err) => Self::failure(&err),
        }
    }
}
