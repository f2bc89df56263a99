use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

pub async fn request(app: &Router, method: Method, path: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(path);

    let req = if let Some(payload) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("empty body")
    };

    app.clone().oneshot(req).await.expect("oneshot response")
}

pub async fn response_json(resp: Response) -> (StatusCode, HeaderMap, Value) {
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body bytes");

    let json = if bytes.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice::<Value>(&bytes).expect("parse json body")
    };

    (status, headers, json)
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], code);
    assert!(body.get("message").is_some());
}

/// Reads an SSE body until the first complete event and returns its text.
pub async fn first_sse_event(resp: Response) -> String {
    use futures::StreamExt;

    let mut stream = resp.into_body().into_data_stream();
    let mut text = String::new();
    while !text.contains("\n\n") {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .expect("sse event within timeout")
            .expect("sse body ended early")
            .expect("sse chunk");
        text.push_str(std::str::from_utf8(&chunk).expect("utf-8 sse chunk"));
    }
    text
}

/// Parses the `data:` line of a single SSE event as JSON.
pub fn sse_data_json(event: &str) -> Value {
    let data = event
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .expect("sse data line");
    serde_json::from_str(data.trim()).expect("parse sse data")
}
