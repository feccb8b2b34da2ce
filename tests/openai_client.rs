use std::sync::Arc;

use serde_json::{json, Value};
use toolchat::agent::Chat;
use toolchat::llm::{ChatMessage, CompletionOptions, LlmClient, ModelCallError, OpenAiClient};
use toolchat::tools::{model_tool_schema, Calculator, CatalogSource};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options() -> CompletionOptions {
    CompletionOptions {
        model: "gpt-4o-mini".to_string(),
        max_tokens: 1000,
        temperature: 0.7,
    }
}

fn text_body(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

fn tool_body(tool_id: &str, tool_name: &str, args_json: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": tool_id,
                    "type": "function",
                    "function": { "name": tool_name, "arguments": args_json }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_text_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("x-title", "toolchat-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Hello!")))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("test-key", format!("{}/v1/", server.uri()))
        .with_header("X-Title", "toolchat-tests");
    let response = client
        .chat_completion(&options(), &[ChatMessage::user("Hi")], None)
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Hello!"));
    assert!(!response.has_tool_calls());
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 1000);
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
}

#[tokio::test]
async fn test_tool_call_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "tool_choice": "auto" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tool_body("call_abc", "calculator", r#"{"expression":"2+2"}"#)),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::new("test-key", format!("{}/v1", server.uri()));
    let schemas = vec![model_tool_schema(&Calculator)];
    let response = client
        .chat_completion(&options(), &[ChatMessage::user("2+2?")], Some(&schemas))
        .await
        .unwrap();

    assert_eq!(response.content, None);
    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.id, "call_abc");
    assert_eq!(call.kind, "function");
    assert_eq!(call.function.name, "calculator");
    assert_eq!(call.function.arguments, r#"{"expression":"2+2"}"#);

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["tools"][0]["function"]["name"], "calculator");
    assert_eq!(
        body["tools"][0]["function"]["parameters"]["required"],
        json!(["expression"])
    );
}

#[tokio::test]
async fn test_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("bad-key", format!("{}/v1", server.uri()));
    let err = client
        .chat_completion(&options(), &[ChatMessage::user("Hi")], None)
        .await
        .unwrap_err();

    match err {
        ModelCallError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("k", format!("{}/v1", server.uri()));
    let err = client
        .chat_completion(&options(), &[ChatMessage::user("Hi")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, ModelCallError::EmptyChoices));
}

#[tokio::test]
async fn test_chat_turn_over_http() {
    let server = MockServer::start().await;

    // First call offers tools and gets a tool call back.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "tool_choice": "auto" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tool_body("call_1", "calculator", r#"{"expression":"2+2"}"#)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("The answer is 4.")))
        .mount(&server)
        .await;

    let client = OpenAiClient::new("k", format!("{}/v1", server.uri()));
    let mut chat = Chat::new(options(), Arc::new(client), "You are helpful.");
    chat.discover(&CatalogSource::builtin());

    let answer = chat.send("what is 2+2 using calculator").await.unwrap();
    assert!(answer.contains('4'));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["tools"].as_array().unwrap().len(), 7);
    assert!(bodies[1].get("tools").is_none());

    let second_messages = bodies[1]["messages"].as_array().unwrap();
    let tool_msg = &second_messages[3];
    assert_eq!(tool_msg["role"], "tool");
    assert_eq!(tool_msg["tool_call_id"], "call_1");
    assert_eq!(tool_msg["content"], "Result: 4");
    assert_eq!(second_messages[2]["tool_calls"][0]["id"], "call_1");
}
