//! Column classification against a hosted model.

use super::client::LlmClient;
use super::error::{ClassifyError, ClassifyResult};
use super::prompt::{build_classification_prompt, extract_json};
use crate::models::Classification;
use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A classified column name.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedColumn {
    pub column_name: String,
    pub classification: Classification,
}

/// A column name the model could not classify.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationFailure {
    pub column_name: String,
    pub error: String,
}

/// Outcome of classifying many names. Successes are kept when siblings fail.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct ClassificationBatch {
    pub classified: Vec<ClassifiedColumn>,
    pub failed: Vec<ClassificationFailure>,
}

#[derive(Clone)]
pub struct Classifier {
    client: Arc<dyn LlmClient>,
}

impl Classifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Classify one column name. No retry.
    pub async fn classify(&self, column_name: &str) -> ClassifyResult<Classification> {
        let column_name = column_name.trim();
        if column_name.is_empty() {
            return Err(ClassifyError::InvalidInput(
                "column name is required".to_string(),
            ));
        }

        let prompt = build_classification_prompt(column_name);
        debug!(column = %column_name, model = %self.model_name(), "Classifying column");

        let response = self.client.complete(&prompt).await?;
        if response.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        parse_classification(&response)
    }

    /// Classify every name concurrently and collect per-name outcomes.
    pub async fn classify_many(&self, column_names: &[String]) -> ClassificationBatch {
        let results = join_all(column_names.iter().map(|name| async move {
            (name.trim().to_string(), self.classify(name).await)
        }))
        .await;

        let mut batch = ClassificationBatch::default();
        for (column_name, result) in results {
            match result {
                Ok(classification) => batch.classified.push(ClassifiedColumn {
                    column_name,
                    classification,
                }),
                Err(e) => {
                    warn!(column = %column_name, error = %e, "Column classification failed");
                    batch.failed.push(ClassificationFailure {
                        column_name,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            classified = batch.classified.len(),
            failed = batch.failed.len(),
            "Classification batch complete"
        );
        batch
    }
}

/// Extract, parse and validate a model response.
pub fn parse_classification(response: &str) -> ClassifyResult<Classification> {
    let json = extract_json(response);
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| ClassifyError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(ClassifyError::Parse("expected a JSON object".to_string()));
    }
    let mut classification: Classification =
        serde_json::from_value(value).map_err(|e| ClassifyError::Validation(e.to_string()))?;

    classification.description = classification.description.trim().to_string();
    classification.reason_ndmo = classification
        .reason_ndmo
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    Ok(classification)
}
