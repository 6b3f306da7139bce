//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields in JSON request bodies are never logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Some(body_text) = read_body_text(body).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"));

    if is_json {
        log_request(&parts, &redact_password(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let Some(body_text) = read_body_text(body).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

async fn read_body_text(body: Body) -> Option<String> {
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).to_string()),
        Err(error) => {
            tracing::error!("Could not read body: {error}");
            None
        }
    }
}

/// Replace the value of a top-level `password` field in a JSON object.
///
/// Bodies that are not JSON objects are returned as is.
fn redact_password(json_text: &str) -> String {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(json_text) else {
        return json_text.to_owned();
    };

    match object.get_mut("password") {
        Some(password) => {
            *password = Value::String(REDACTED.to_owned());
            Value::Object(object).to_string()
        }
        None => json_text.to_owned(),
    }
}

/// The longest prefix of `text` that fits in [LOG_BODY_LENGTH_LIMIT] bytes.
fn truncate(text: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(text.len());

    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Received request: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{LOG_BODY_LENGTH_LIMIT, redact_password, truncate};

    #[test]
    fn redacts_password_field() {
        let body = json!({"email": "alice@example.com", "password": "hunter2"}).to_string();

        let redacted: Value = serde_json::from_str(&redact_password(&body)).unwrap();

        assert_eq!(
            redacted,
            json!({"email": "alice@example.com", "password": "********"})
        );
    }

    #[test]
    fn leaves_other_bodies_alone() {
        assert_eq!(redact_password("not json"), "not json");
        assert_eq!(redact_password(r#"{"title":"Coffee"}"#), r#"{"title":"Coffee"}"#);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&text);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert_eq!(truncated, "é".repeat(LOG_BODY_LENGTH_LIMIT / 2));
    }
}
