use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use recipe_scribe::application::ports::{LlmClient, LlmClientError, SamplingParams};
use recipe_scribe::infrastructure::llm::OpenAiClient;

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn start_mock_chat_server(
    response_status: u16,
    response_body: &'static str,
) -> (String, Captured, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&captured);

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, body: axum::Json<Value>| {
            let sink = Arc::clone(&sink);
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                sink.lock().unwrap().push((auth, body.0));
                let status = StatusCode::from_u16(response_status).unwrap();
                (
                    status,
                    [("content-type", "application/json")],
                    response_body,
                )
                    .into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/v1", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, captured, shutdown_tx)
}

const COMPLETION: &str = r#"{
  "id": "chatcmpl-1",
  "choices": [
    {"index": 0, "message": {"role": "assistant", "content": "{\"recipe_name\": \"Soup\"}"}, "finish_reason": "stop"}
  ]
}"#;

#[tokio::test]
async fn given_completion_when_calling_then_returns_message_content() {
    let (base_url, _, shutdown_tx) = start_mock_chat_server(200, COMPLETION).await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());

    let reply = client
        .complete("Extract the recipe", &SamplingParams::default())
        .await
        .unwrap();

    assert_eq!(reply, r#"{"recipe_name": "Soup"}"#);
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_prompt_when_calling_then_sends_single_user_message_with_sampling() {
    let (base_url, captured, shutdown_tx) = start_mock_chat_server(200, COMPLETION).await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());
    let sampling = SamplingParams {
        temperature: 0.3,
        max_tokens: Some(800),
    };

    client.complete("Extract the recipe", &sampling).await.unwrap();

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["max_tokens"], 800);
    assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Extract the recipe");
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_no_max_tokens_when_calling_then_omits_the_field() {
    let (base_url, captured, shutdown_tx) = start_mock_chat_server(200, COMPLETION).await;
    let client = OpenAiClient::with_base_url(&base_url, String::new(), "local-model".into());

    client
        .complete("hello", &SamplingParams::default())
        .await
        .unwrap();

    let requests = captured.lock().unwrap().clone();
    let (auth, body) = &requests[0];
    assert!(auth.is_none());
    assert!(body.get("max_tokens").is_none());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_too_many_requests_when_calling_then_reports_rate_limited() {
    let (base_url, _, shutdown_tx) =
        start_mock_chat_server(429, r#"{"error": {"message": "slow down"}}"#).await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());

    let result = client.complete("hi", &SamplingParams::default()).await;

    assert!(matches!(result, Err(LlmClientError::RateLimited)));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_server_error_when_calling_then_reports_request_failure_with_status() {
    let (base_url, _, shutdown_tx) =
        start_mock_chat_server(500, r#"{"error": "boom"}"#).await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());

    let result = client.complete("hi", &SamplingParams::default()).await;

    match result {
        Err(LlmClientError::ApiRequestFailed(msg)) => assert!(msg.contains("500")),
        other => panic!("expected request failure, got {:?}", other),
    }
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_empty_choices_when_calling_then_reports_invalid_response() {
    let (base_url, _, shutdown_tx) = start_mock_chat_server(200, r#"{"choices": []}"#).await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());

    let result = client.complete("hi", &SamplingParams::default()).await;

    assert!(matches!(result, Err(LlmClientError::InvalidResponse(_))));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_non_json_body_when_calling_then_reports_invalid_response() {
    let (base_url, _, shutdown_tx) = start_mock_chat_server(200, "<html>gateway</html>").await;
    let client = OpenAiClient::with_base_url(&base_url, "sk-test".into(), "gpt-4".into());

    let result = client.complete("hi", &SamplingParams::default()).await;

    assert!(matches!(result, Err(LlmClientError::InvalidResponse(_))));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_unreachable_server_when_calling_then_reports_request_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = OpenAiClient::with_base_url(
        &format!("http://{}/v1", addr),
        "sk-test".into(),
        "gpt-4".into(),
    );

    let result = client.complete("hi", &SamplingParams::default()).await;

    assert!(matches!(result, Err(LlmClientError::ApiRequestFailed(_))));
}

#[test]
fn given_trailing_slash_when_building_client_then_endpoint_is_normalized() {
    let client =
        OpenAiClient::with_base_url("http://localhost:1234/v1/", String::new(), "m".into());
    assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
}
