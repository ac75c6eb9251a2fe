use devbox_launcher::launcher::{LaunchClient, LauncherError};
use devbox_launcher::{ErrorCode, LaunchRequest};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> LaunchRequest {
    LaunchRequest {
        agent_id: Some("a1".to_string()),
        ..Default::default()
    }
}

async fn mount_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/runloop/launch-devbox"))
        .and(body_json(json!({ "agentId": "a1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tunnelUrl": "https://t.example",
            "devboxId": "d1",
            "chatUrl": "https://chat.example/?apiUrl=https%3A%2F%2Ft.example&assistantId=agent",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn launch_returns_chat_url() {
    let server = MockServer::start().await;
    mount_success(&server).await;

    let client = LaunchClient::new(&server.uri()).unwrap();
    let chat_url = client.launch_devbox(&request()).await.unwrap();

    assert_eq!(
        chat_url,
        "https://chat.example/?apiUrl=https%3A%2F%2Ft.example&assistantId=agent"
    );
}

#[tokio::test]
async fn launch_with_response_returns_everything() {
    let server = MockServer::start().await;
    mount_success(&server).await;

    let client = LaunchClient::new(&server.uri()).unwrap();
    let result = client.launch_devbox_with_response(&request()).await.unwrap();

    assert_eq!(result.devbox_id, "d1");
    assert_eq!(result.tunnel_url, "https://t.example");
}

#[tokio::test]
async fn rejection_surfaces_payload_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/runloop/launch-devbox"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "agentId is required",
            "code": "MISSING_AGENT_ID",
        })))
        .mount(&server)
        .await;

    let client = LaunchClient::new(&server.uri()).unwrap();
    let err = client
        .launch_devbox(&LaunchRequest::default())
        .await
        .unwrap_err();

    match err {
        LauncherError::Rejected {
            status,
            message,
            payload,
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "agentId is required");
            assert_eq!(payload.unwrap().code, ErrorCode::MissingAgentId);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn unreadable_rejection_uses_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/runloop/launch-devbox"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = LaunchClient::new(&server.uri()).unwrap();
    let err = client.launch_devbox(&request()).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to launch devbox");
}

#[test]
fn endpoint_is_joined_onto_server_url() {
    let client = LaunchClient::new("http://localhost:8080").unwrap();
    assert_eq!(
        client.endpoint().as_str(),
        "http://localhost:8080/api/runloop/launch-devbox"
    );

    let mounted = LaunchClient::new("https://tools.example/app").unwrap();
    assert_eq!(
        mounted.endpoint().as_str(),
        "https://tools.example/app/api/runloop/launch-devbox"
    );

    assert!(matches!(
        LaunchClient::new("not a url"),
        Err(LauncherError::InvalidServerUrl(_))
    ));
}
