use httpmock::prelude::*;
use providers::{CompletionClient, HttpCompletionClient};
use serde_json::json;
use shared::agent_api::ChatMessage;
use shared::settings::CompletionSettings;
use shared::PipelineError;

fn settings_for(url: String) -> CompletionSettings {
    let mut settings = CompletionSettings {
        url: Some(url),
        model: Some("test-model".into()),
        ..Default::default()
    };
    settings
        .headers
        .insert("Authorization".into(), "Bearer test-key".into());
    settings
}

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("Reply with one shell command."),
        ChatMessage::user("show disk usage"),
    ]
}

#[tokio::test]
async fn completion_client_posts_conversation_and_returns_command() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .json_body_includes(
                json!({
                    "model": "test-model",
                    "messages": [
                        {"role": "system", "content": "Reply with one shell command."},
                        {"role": "user", "content": "show disk usage"}
                    ]
                })
                .to_string(),
            );
        then.status(200).json_body(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "df -h\n"}
            }]
        }));
    });

    let client =
        HttpCompletionClient::from_settings(&settings_for(server.url("/v1/chat/completions")))
            .unwrap();
    let command = client.complete(&conversation()).await.unwrap();

    mock.assert();
    assert_eq!(command, "df -h");
}

#[tokio::test]
async fn completion_client_maps_non_success_status_to_transport_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/complete");
        then.status(503).body("upstream overloaded");
    });

    let client = HttpCompletionClient::from_settings(&settings_for(server.url("/complete"))).unwrap();
    let err = client.complete(&conversation()).await.unwrap_err();

    match err {
        PipelineError::Transport(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("upstream overloaded"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn completion_client_maps_missing_choices_to_shape_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/complete");
        then.status(200).json_body(json!({"error": "no model loaded"}));
    });

    let client = HttpCompletionClient::from_settings(&settings_for(server.url("/complete"))).unwrap();
    let err = client.complete(&conversation()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Shape(_)), "got {err:?}");
    assert!(err.to_string().contains("no model loaded"));
}

#[tokio::test]
async fn completion_client_reports_unreachable_endpoint() {
    // Port 1 is reserved and refuses connections on loopback
    let client =
        HttpCompletionClient::from_settings(&settings_for("http://127.0.0.1:1/complete".into()))
            .unwrap();
    let err = client.complete(&conversation()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Transport(_)), "got {err:?}");
}
