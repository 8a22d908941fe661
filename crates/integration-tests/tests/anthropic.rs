mod harness;

use axum::http::StatusCode;
use conduit_llm::{
    Content, FinishReason, FunctionCall, FunctionResponse, GenerationOptions, LlmError, LlmRequest, Part, Role,
    ToolDeclaration,
};
use futures_util::{StreamExt, TryStreamExt};
use harness::config::ConfigBuilder;
use harness::mock_llm::{MockLlm, Reply};
use serde_json::{Value, json};

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn call(id: &str) -> Part {
    Part::FunctionCall(FunctionCall {
        id: id.to_owned(),
        name: "get_weather".to_owned(),
        args: object(json!({"location": "Paris"})),
    })
}

fn result(id: &str) -> Part {
    Part::FunctionResponse(FunctionResponse {
        id: id.to_owned(),
        name: "get_weather".to_owned(),
        response: object(json!({"temperature": 21})),
    })
}

fn hello_request() -> LlmRequest {
    LlmRequest::new(
        vec![Content::user_text("Hello")],
        GenerationOptions {
            system_instruction: Some(Content::user_text("Be brief.")),
            ..GenerationOptions::default()
        },
    )
}

#[tokio::test]
async fn single_response_is_converted() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let response = model.generate(&hello_request()).await.unwrap();

    assert!(response.turn_complete);
    assert_eq!(response.content.role, Role::Model);
    assert_eq!(response.content.text(), "Hello from mock LLM");
    assert_eq!(response.finish_reason, FinishReason::Stop);

    let usage = response.usage.unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (10, 5, 15));
}

#[tokio::test]
async fn request_carries_headers_and_wire_shape() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    model.generate(&hello_request()).await.unwrap();

    let recorded = mock.last_request();
    assert_eq!(recorded.path, "/v1/messages");
    assert_eq!(recorded.header("x-api-key"), Some("test-key"));
    assert_eq!(recorded.header("anthropic-version"), Some("2023-06-01"));
    assert!(recorded.header("authorization").is_none());

    assert_eq!(recorded.body["model"], "mock-claude");
    assert_eq!(recorded.body["max_tokens"], 4096);
    assert_eq!(recorded.body["system"], "Be brief.");
    assert_eq!(
        recorded.body["messages"],
        json!([{"role": "user", "content": [{"type": "text", "text": "Hello"}]}])
    );
}

#[tokio::test]
async fn configured_max_tokens_applies_when_request_sets_none() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_anthropic_provider_limited("claude", &mock.base_url(), 1024)
        .build();
    let model = harness::model(&config, "claude");

    model.generate(&hello_request()).await.unwrap();

    assert_eq!(mock.last_request().body["max_tokens"], 1024);
}

#[tokio::test]
async fn unanswered_tool_calls_are_repaired_and_ids_sanitized() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    // `call.2` is never answered; both IDs contain characters the vendor rejects
    let request = LlmRequest::new(
        vec![
            Content::user_text("Weather in Paris and Rome?"),
            Content::new(Role::Model, vec![call("call.1"), call("call.2")]),
            Content::new(Role::User, vec![result("call.1")]),
        ],
        GenerationOptions {
            tools: vec![ToolDeclaration::new("get_weather", "Get current weather").with_json_schema(json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }))],
            ..GenerationOptions::default()
        },
    );

    model.generate(&request).await.unwrap();

    let body = mock.last_request().body;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);

    let assistant = messages[1]["content"].as_array().unwrap();
    assert_eq!(assistant.len(), 1, "unanswered tool_use must be dropped");
    let tool_use_id = assistant[0]["id"].as_str().unwrap();
    assert!(tool_use_id.starts_with("toolu_"));
    assert!(tool_use_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));

    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], tool_use_id);

    assert_eq!(
        body["tools"][0]["input_schema"],
        json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        })
    );
}

#[tokio::test]
async fn vendor_tool_use_is_converted() {
    let mock = MockLlm::start_with(Reply::ToolCall {
        id: "toolu_01A".to_owned(),
        name: "get_weather".to_owned(),
        arguments: json!({"location": "Paris"}),
    })
    .await
    .unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let response = model.generate(&hello_request()).await.unwrap();

    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.content.text(), "Let me check.");
    let calls: Vec<_> = response.content.function_calls().collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "toolu_01A");
    assert_eq!(calls[0].args["location"], "Paris");
}

#[tokio::test]
async fn stream_yields_partials_then_aggregate() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let responses: Vec<_> = model
        .generate_stream(&hello_request())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let (last, partials) = responses.split_last().unwrap();
    let deltas: Vec<_> = partials.iter().map(|r| r.content.text()).collect();
    assert_eq!(deltas, ["Hello ", "from ", "mock ", "LLM"]);

    assert!(last.turn_complete);
    assert_eq!(last.content.text(), "Hello from mock LLM");
    assert_eq!(last.finish_reason, FinishReason::Stop);
    assert_eq!(last.usage.map(|u| u.total_tokens), Some(15));

    assert_eq!(mock.last_request().body["stream"], true);
}

#[tokio::test]
async fn streamed_tool_use_is_assembled() {
    let mock = MockLlm::start_with(Reply::ToolCall {
        id: "toolu_stream".to_owned(),
        name: "get_weather".to_owned(),
        arguments: json!({"location": "Paris", "unit": "celsius"}),
    })
    .await
    .unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let responses: Vec<_> = model
        .generate_stream(&hello_request())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(responses.len(), 1);
    let calls: Vec<_> = responses[0].content.function_calls().collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "toolu_stream");
    assert_eq!(calls[0].args["unit"], "celsius");
}

#[tokio::test]
async fn stream_error_event_ends_sequence_without_aggregate() {
    let mock = MockLlm::start_with(Reply::StreamError).await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let items: Vec<_> = model.generate_stream(&hello_request()).await.unwrap().collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().content.text(), "Hel");
    assert!(matches!(&items[1], Err(LlmError::Streaming(message)) if message.contains("Overloaded")));
}

#[tokio::test]
async fn overloaded_status_is_surfaced() {
    let mock = MockLlm::start_failing(StatusCode::SERVICE_UNAVAILABLE).await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let err = model.generate(&hello_request()).await.unwrap_err();

    assert!(matches!(&err, LlmError::Upstream(message) if message.contains("503") && message.contains("overloaded_error")));
}

#[tokio::test]
async fn dropping_stream_early_stops_reading() {
    let mock = MockLlm::start().await.unwrap();
    let config = ConfigBuilder::new().with_anthropic_provider("claude", &mock.base_url()).build();
    let model = harness::model(&config, "claude");

    let mut responses = model.generate_stream(&hello_request()).await.unwrap();
    let first = responses.next().await.unwrap().unwrap();
    drop(responses);

    assert!(first.partial);
    assert_eq!(first.content.text(), "Hello ");

    // The model stays usable after an abandoned stream
    let response = model.generate(&hello_request()).await.unwrap();
    assert!(response.turn_complete);
}
