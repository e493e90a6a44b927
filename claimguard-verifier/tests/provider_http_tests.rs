//! Backend wire tests against a local stub server
//!
//! The stub answers by path prefix: `/ok/...` with a valid envelope,
//! `/fail/...` with HTTP 500 and `/garbage/...` with a non-JSON body.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use claimguard_common::config::{ProviderConfig, ProviderKind};
use claimguard_verifier::providers::{ModelBackend, ModelRequest, Provider, ProviderError};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Value,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

async fn stub(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    log.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    if path.starts_with("/fail/") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream overloaded").into_response();
    }
    if path.starts_with("/garbage/") {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }
    if method == Method::GET {
        return Json(json!({ "data": [] })).into_response();
    }

    let answer = r#"{"verdict":"TRUE","confidence":0.9,"reasoning":"Confirmed [1]."}"#;
    match path.as_str() {
        "/ok/chat/completions" => Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": answer } }],
            "usage": { "prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60 }
        }))
        .into_response(),
        "/ok/v1/messages" => Json(json!({
            "content": [{ "type": "text", "text": answer }],
            "usage": { "input_tokens": 40, "output_tokens": 12 }
        }))
        .into_response(),
        p if p.starts_with("/ok/v1beta/models/") => Json(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": answer }] } }],
            "usageMetadata": { "promptTokenCount": 30, "candidatesTokenCount": 5, "totalTokenCount": 35 }
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Test helper: start the stub on an ephemeral port
async fn start_stub() -> (SocketAddr, Log) {
    let log: Log = Arc::default();
    let app = Router::new().fallback(stub).with_state(log.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

fn provider(kind: ProviderKind, base_url: String) -> Provider {
    let config = ProviderConfig {
        kind,
        api_key: "test-key".to_string(),
        base_url: Some(base_url),
        ..ProviderConfig::default()
    };
    Provider::from_config(&config, Duration::from_secs(5)).unwrap()
}

fn request(model: &str) -> ModelRequest {
    ModelRequest {
        system_prompt: "You are a fact checker.".to_string(),
        user_prompt: "CLAIM: water is wet".to_string(),
        model: model.to_string(),
        temperature: 0.0,
        max_tokens: 256,
    }
}

fn header<'a>(recorded: &'a Recorded, name: &str) -> Option<&'a str> {
    recorded.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_chat_completions_wire_format() {
    let (addr, log) = start_stub().await;
    let backend = provider(ProviderKind::ChatCompletions, format!("http://{addr}/ok/"));
    assert_eq!(backend.endpoint(), format!("http://{addr}/ok"));

    let completion = backend.invoke(&request("openai/gpt-4o-mini")).await.unwrap();
    assert!(completion.text.contains("\"verdict\":\"TRUE\""));
    assert_eq!(completion.usage.unwrap().total_tokens, Some(60));

    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.path, "/ok/chat/completions");
    assert_eq!(header(call, "authorization"), Some("Bearer test-key"));
    assert!(header(call, "user-agent").unwrap().starts_with("claimguard-verifier/"));
    assert_eq!(call.body["model"], "openai/gpt-4o-mini");
    assert_eq!(call.body["messages"][0]["role"], "system");
    assert_eq!(call.body["messages"][1]["content"], "CLAIM: water is wet");
    assert_eq!(call.body["response_format"]["type"], "json_object");
    assert_eq!(call.body["max_tokens"], 256);
}

#[tokio::test]
async fn test_messages_wire_format() {
    let (addr, log) = start_stub().await;
    let backend = provider(ProviderKind::Messages, format!("http://{addr}/ok"));

    let completion = backend.invoke(&request("claude-model")).await.unwrap();
    assert!(completion.text.contains("Confirmed [1]."));
    let usage = completion.usage.unwrap();
    assert_eq!(usage.input_tokens, Some(40));
    assert_eq!(usage.total_tokens, Some(52));

    let calls = log.lock().unwrap().clone();
    let call = &calls[0];
    assert_eq!(call.path, "/ok/v1/messages");
    assert_eq!(header(call, "x-api-key"), Some("test-key"));
    assert_eq!(header(call, "anthropic-version"), Some("2023-06-01"));
    assert_eq!(call.body["system"], "You are a fact checker.");
    assert_eq!(call.body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_gemini_wire_format() {
    let (addr, log) = start_stub().await;
    let backend = provider(ProviderKind::Gemini, format!("http://{addr}/ok"));

    let completion = backend.invoke(&request("gemini-flash")).await.unwrap();
    assert!(completion.text.contains("\"confidence\":0.9"));
    assert_eq!(completion.usage.unwrap().total_tokens, Some(35));

    let calls = log.lock().unwrap().clone();
    let call = &calls[0];
    assert_eq!(call.path, "/ok/v1beta/models/gemini-flash:generateContent");
    assert_eq!(header(call, "x-goog-api-key"), Some("test-key"));
    assert!(header(call, "authorization").is_none());
    assert_eq!(
        call.body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        call.body["systemInstruction"]["parts"][0]["text"],
        "You are a fact checker."
    );
}

#[tokio::test]
async fn test_server_error_maps_to_http_error() {
    let (addr, _log) = start_stub().await;
    let backend = provider(ProviderKind::ChatCompletions, format!("http://{addr}/fail"));

    let err = backend.invoke(&request("m")).await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::Http {
            status: 500,
            body: "upstream overloaded".to_string()
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_non_json_body_is_malformed_envelope() {
    let (addr, _log) = start_stub().await;
    let backend = provider(ProviderKind::Messages, format!("http://{addr}/garbage"));

    let err = backend.invoke(&request("m")).await.unwrap_err();
    assert!(matches!(err, ProviderError::MalformedEnvelope(_)));
}

#[tokio::test]
async fn test_probe_reports_status() {
    let (addr, log) = start_stub().await;

    let ok = provider(ProviderKind::Gemini, format!("http://{addr}/ok"));
    assert_eq!(
        ok.probe().await,
        format!("http://{addr}/ok reachable (HTTP 200)")
    );
    assert_eq!(log.lock().unwrap()[0].path, "/ok/v1beta/models");

    let failing = provider(ProviderKind::ChatCompletions, format!("http://{addr}/fail"));
    assert_eq!(
        failing.probe().await,
        format!("http://{addr}/fail responded with HTTP 500")
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = provider(ProviderKind::ChatCompletions, format!("http://{addr}"));
    let err = backend.invoke(&request("m")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert!(backend.probe().await.contains("unreachable"));
}
