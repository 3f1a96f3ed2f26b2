//! Fetching and inference against a local HTTP server
use std::net::SocketAddr;

use assay_core::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answers a single request with a canned response and hands back the raw request.
async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: String,
) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        let header_end = loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        // the client may hang up once it has seen the status line
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        String::from_utf8_lossy(&request).into_owned()
    });

    (addr, handle)
}

fn product_page() -> String {
    std::fs::read_to_string("../../tests/fixtures/product_page.html").unwrap()
}

#[tokio::test]
async fn test_fetch_sends_browser_headers() {
    let (addr, server) = serve_once("200 OK", "text/html", product_page()).await;

    let html = fetch_url(&format!("http://{addr}/notes"), &FetchConfig::default()).await.unwrap();
    let request = server.await.unwrap().to_lowercase();

    assert!(html.contains("Larkspur Notes"));
    assert!(request.starts_with("get /notes http/1.1"));
    assert!(request.contains("user-agent: mozilla/5.0 (windows nt 10.0; win64; x64)"));
    assert!(request.contains("accept: text/html,application/xhtml+xml"));
    assert!(request.contains("accept-language: en-us,en;q=0.5"));
}

#[tokio::test]
async fn test_fetch_error_status() {
    let (addr, server) = serve_once("503 Service Unavailable", "text/html", "<p>busy</p>".to_string()).await;

    let result = fetch_url(&format!("http://{addr}/notes"), &FetchConfig::default()).await;
    server.await.unwrap();

    match result {
        Err(err @ AssayError::HttpStatus { status: 503, .. }) => assert!(err.is_network()),
        other => panic!("expected HTTP 503, got {other:?}"),
    }
}

#[tokio::test]
async fn test_extract_reports_error_status_as_data() {
    let (addr, server) = serve_once("503 Service Unavailable", "text/html", "<p>busy</p>".to_string()).await;
    let url = format!("http://{addr}/notes");

    let result = WebExtractor::default().extract(&url).await.unwrap();
    server.await.unwrap();

    assert_eq!(result.content, "");
    assert!(result.error.as_deref().is_some_and(|e| e.starts_with("failed to fetch URL") && e.contains("503")));
    assert_eq!(result.metadata.get("url"), Some(&url));
}

#[tokio::test]
async fn test_extract_over_http() {
    let (addr, server) = serve_once("200 OK", "text/html; charset=utf-8", product_page()).await;

    let result = WebExtractor::default().extract(&format!("http://{addr}/notes")).await.unwrap();
    server.await.unwrap();

    assert!(result.is_ok(), "unexpected error: {:?}", result.error);
    assert!(result.content.contains("SAML single sign-on"));
    assert_eq!(result.metadata["price"], "12.00");
}

#[cfg(feature = "gemini")]
#[tokio::test]
async fn test_gemini_generate_success() {
    let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Solid "},{"text":"product."}]}}]}"#;
    let (addr, server) = serve_once("200 OK", "application/json", body.to_string()).await;

    let client = GeminiClient::new("test-key", "gemini-test", std::time::Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("http://{addr}/v1beta/"));
    let text = client.generate("Assess usability.", &GenerationConfig::default()).await.unwrap();
    let request = server.await.unwrap();

    assert_eq!(text, "Solid product.");
    assert!(request.starts_with("POST /v1beta/models/gemini-test:generateContent HTTP/1.1"));
    assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));

    let (_, json) = request.split_once("\r\n\r\n").unwrap();
    let payload: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(payload["contents"][0]["parts"][0]["text"], "Assess usability.");
    assert_eq!(payload["generationConfig"]["maxOutputTokens"], 2048);
    assert_eq!(payload["safetySettings"].as_array().map(Vec::len), Some(4));
    assert_eq!(payload["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
}

#[cfg(feature = "gemini")]
#[tokio::test]
async fn test_gemini_error_status() {
    let body = r#"{"error":{"code":503,"message":"overloaded"}}"#;
    let (addr, server) = serve_once("503 Service Unavailable", "application/json", body.to_string()).await;

    let client = GeminiClient::new("test-key", "gemini-test", std::time::Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("http://{addr}"));
    let result = client.generate("Assess usability.", &GenerationConfig::default()).await;
    server.await.unwrap();

    match result {
        Err(AssayError::Inference(msg)) => assert!(msg.contains("503") && msg.contains("overloaded")),
        other => panic!("expected inference error, got {other:?}"),
    }
}

#[cfg(feature = "gemini")]
#[tokio::test]
async fn test_gemini_empty_candidates() {
    let (addr, server) = serve_once("200 OK", "application/json", "{}".to_string()).await;

    let client = GeminiClient::new("test-key", "gemini-test", std::time::Duration::from_secs(5))
        .unwrap()
        .with_base_url(format!("http://{addr}"));
    let text = client.generate("Assess usability.", &GenerationConfig::default()).await.unwrap();
    server.await.unwrap();

    assert_eq!(text, "");
}
