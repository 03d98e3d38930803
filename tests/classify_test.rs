//! Integration tests for column classification against a mocked
//! OpenAI-compatible endpoint.

use datagov_mcp_server::classify::{
    ClassifierConfig, Classifier, ClassifyError, LlmClient, OpenAiClient,
};
use datagov_mcp_server::db::PersistenceRouter;
use datagov_mcp_server::error::ErrorKind;
use datagov_mcp_server::models::NdmoClassification;
use datagov_mcp_server::tools::{
    ClassifyColumnInput, ClassifyColumnsInput, ClassifyToolHandler, ToolContext,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

const CARD_NUMBER: &str = r#"{
  "description": "Payment card number used for purchases",
  "ndmoClassification": "Secret",
  "reasonNdmo": "Cardholder data is regulated",
  "pii": false,
  "phi": false,
  "pfi": true,
  "psi": false,
  "pci": true
}"#;

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(ClassifierConfig {
        api_url: format!("{}{}", server.uri(), COMPLETIONS_PATH),
        api_key: Some("test-key".to_string()),
        ..ClassifierConfig::default()
    })
}

fn classifier_for(server: &MockServer) -> Classifier {
    Classifier::new(Arc::new(client_for(server)))
}

async fn mock_answer(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_card_number_is_pci() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(completion(CARD_NUMBER))
        .expect(1)
        .mount(&server)
        .await;

    let result = classifier_for(&server).classify("card_number").await.unwrap();
    assert!(result.flags.pci);
    assert!(NdmoClassification::ALL.contains(&result.ndmo_classification));
    assert!(result.description.to_lowercase().contains("card"));
}

#[tokio::test]
async fn test_prompt_names_the_column() {
    let server = MockServer::start().await;
    mock_answer(&server, completion(CARD_NUMBER)).await;

    classifier_for(&server).classify("patient_blood_type").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("patient_blood_type"));
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_fenced_answer_parses() {
    let server = MockServer::start().await;
    let fenced = format!("Here you go:\n```json\n{}\n```", CARD_NUMBER);
    mock_answer(&server, completion(&fenced)).await;

    let result = classifier_for(&server).classify("card_number").await.unwrap();
    assert_eq!(result.ndmo_classification, NdmoClassification::Secret);
    assert_eq!(
        result.reason_ndmo.as_deref(),
        Some("Cardholder data is regulated")
    );
}

#[tokio::test]
async fn test_malformed_answer_is_parse_error() {
    let server = MockServer::start().await;
    mock_answer(&server, completion("{\"description\": \"card\", \"pii\": ")).await;

    let err = classifier_for(&server).classify("card_number").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Parse(_)), "{err}");
}

#[tokio::test]
async fn test_missing_flags_fail_validation() {
    let server = MockServer::start().await;
    mock_answer(
        &server,
        completion(r#"{"description": "x", "ndmoClassification": "Public"}"#),
    )
    .await;

    let err = classifier_for(&server).classify("notes").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Validation(_)), "{err}");
}

#[tokio::test]
async fn test_server_error_is_http_status() {
    let server = MockServer::start().await;
    mock_answer(
        &server,
        ResponseTemplate::new(500).set_body_string("upstream exploded"),
    )
    .await;

    let err = classifier_for(&server).classify("card_number").await.unwrap_err();
    match err {
        ClassifyError::HttpStatus { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("expected HttpStatus, got {other}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Port 1 is never listening
    let client = OpenAiClient::new(ClassifierConfig {
        api_url: format!("http://127.0.0.1:1{}", COMPLETIONS_PATH),
        api_key: Some("test-key".to_string()),
        ..ClassifierConfig::default()
    });

    let err = Classifier::new(Arc::new(client))
        .classify("card_number")
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::Transport(_)), "{err}");
}

#[tokio::test]
async fn test_non_json_success_body_is_protocol_error() {
    let server = MockServer::start().await;
    mock_answer(
        &server,
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_string("<html><body>Proxy login</body></html>"),
    )
    .await;

    let err = classifier_for(&server).classify("card_number").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Protocol(_)), "{err}");
}

#[tokio::test]
async fn test_empty_content_is_empty_response() {
    let server = MockServer::start().await;
    mock_answer(&server, completion("   ")).await;

    let err = classifier_for(&server).classify("card_number").await.unwrap_err();
    assert!(matches!(err, ClassifyError::EmptyResponse));

    let server = MockServer::start().await;
    mock_answer(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })),
    )
    .await;
    let err = client_for(&server).complete("anything").await.unwrap_err();
    assert!(matches!(err, ClassifyError::EmptyResponse));
}

#[tokio::test]
async fn test_missing_key_never_calls_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion(CARD_NUMBER))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(ClassifierConfig {
        api_url: format!("{}{}", server.uri(), COMPLETIONS_PATH),
        api_key: None,
        ..ClassifierConfig::default()
    });
    assert!(!client.is_configured());

    let err = Classifier::new(Arc::new(client))
        .classify("card_number")
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::NotConfigured(_)));
}

#[tokio::test]
async fn test_tool_reports_partial_failures() {
    let server = MockServer::start().await;
    mock_answer(&server, completion(CARD_NUMBER)).await;

    let ctx = ToolContext::new(PersistenceRouter::default(), classifier_for(&server), None);
    let handler = ClassifyToolHandler::new(Arc::new(ctx));

    let output = handler
        .classify_columns(ClassifyColumnsInput {
            column_names: vec!["card_number".to_string(), "  ".to_string()],
            persist: false,
            connection_string: None,
        })
        .await
        .unwrap();
    assert_eq!(output.classified.len(), 1);
    assert_eq!(output.classified[0].column_name, "card_number");
    assert_eq!(output.failed.len(), 1);
    assert!(output.persisted.is_none());

    let err = handler
        .classify_column(ClassifyColumnInput {
            column_name: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Classification);
}

#[tokio::test]
async fn test_persist_without_connection_fails_before_model_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion(CARD_NUMBER))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = ToolContext::new(PersistenceRouter::default(), classifier_for(&server), None);
    let err = ClassifyToolHandler::new(Arc::new(ctx))
        .classify_columns(ClassifyColumnsInput {
            column_names: vec!["card_number".to_string()],
            persist: true,
            connection_string: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
