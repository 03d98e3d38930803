//! AI-assisted column classification.
//!
//! A column name is rendered into a fixed prompt, sent to a hosted model and
//! the JSON answer is validated into a [`Classification`](crate::models::Classification).

pub mod classifier;
pub mod client;
pub mod error;
pub mod prompt;

pub use classifier::{
    ClassificationBatch, ClassificationFailure, ClassifiedColumn, Classifier,
    parse_classification,
};
pub use client::{ClassifierConfig, LlmClient, OpenAiClient};
pub use error::{ClassifyError, ClassifyResult};
pub use prompt::{build_classification_prompt, extract_json};
