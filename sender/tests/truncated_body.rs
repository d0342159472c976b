use sender::transport::HttpRequest;
use sender::{
    CredentialStatus, Dispatcher, History, HttpTransport, ProbeEngine, ProbeResult,
    ReqwestTransport,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Announces a 100 byte body, writes 5 bytes of it, then hangs up
const SHORT_RESPONSE: &str = "HTTP/1.1 201 Created\r\n\
    Content-Type: application/json\r\n\
    Content-Length: 100\r\n\
    \r\n\
    {\"id\"";

async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                return;
            }
        }
    }
}

async fn spawn_short_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut stream).await;
                let _ = stream.write_all(SHORT_RESPONSE.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{}/api/webhook/tive", addr)
}

fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap())
}

#[tokio::test]
async fn test_truncated_body_keeps_status() {
    let url = spawn_short_body_server().await;
    let response = transport().send(HttpRequest::get(&url)).await.unwrap();

    assert_eq!(response.status, 201);
    assert!(response.body.is_empty());
    assert_eq!(response.json_or_empty(), json!({}));
}

#[tokio::test]
async fn test_dispatch_with_truncated_body_succeeds() {
    let url = spawn_short_body_server().await;
    let history = Arc::new(History::unbounded());
    let dispatcher = Dispatcher::new(transport(), history.clone());

    let result = dispatcher.dispatch(&url, "key", r#"{"a":1}"#).await.unwrap();

    assert!(result.succeeded);
    assert_eq!(result.status, Some(201));
    assert_eq!(result.response_body, Some(json!({})));
    assert!(result.error_message.is_none());
    assert_eq!(history.tally(), (1, 0));
}

#[tokio::test]
async fn test_checks_with_truncated_body_classify_by_status() {
    let url = spawn_short_body_server().await;
    let engine = ProbeEngine::new(transport());

    assert_eq!(
        engine.probe_reachability(&url).await,
        ProbeResult::Connected("API is running".to_string())
    );
    assert_eq!(
        engine.probe_credential(&url, "key").await,
        CredentialStatus::Valid("API key is valid".to_string())
    );
}
