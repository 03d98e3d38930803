//! Prompt rendering and JSON extraction for column classification.

use crate::models::NdmoClassification;

const CLASSIFICATION_TEMPLATE: &str = r#"You are a data governance analyst. Classify the database column named "{column_name}".

Return a single JSON object with exactly these fields:
- "description": a short literal explanation of what the column contains
- "ndmoClassification": one of {levels}
- "reasonNdmo": one sentence justifying the chosen classification
- "pii": true if the column holds personally identifiable information
- "phi": true if the column holds protected health information
- "pfi": true if the column holds personal financial information
- "psi": true if the column holds payment-system information
- "pci": true if the column holds payment card industry data

The five flags are independent; set each on its own merits.
Respond with the JSON object only."#;

/// Render the classification prompt for one column name.
pub fn build_classification_prompt(column_name: &str) -> String {
    let levels = NdmoClassification::ALL
        .iter()
        .map(|level| format!("\"{}\"", level.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    CLASSIFICATION_TEMPLATE
        .replace("{column_name}", &column_name.replace('"', "'"))
        .replace("{levels}", &levels)
}

/// Pull the JSON object out of a model response.
///
/// Accepts a ```json fenced block, any fenced block, or the span from the first
/// `{` to the last `}`. Otherwise returns the trimmed text unchanged.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        // Skip a language tag on the fence line
        let content_start = trimmed[content_start..]
            .find('\n')
            .map(|n| content_start + n + 1)
            .unwrap_or(content_start);
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
