//! API Middleware
//!
//! Operation context extraction and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::net::IpAddr;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::OperationContext;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Optional per-request deadline in milliseconds
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Build the `OperationContext` for a request from its headers
pub fn context_from_headers(headers: &HeaderMap) -> OperationContext {
    // Extract correlation ID or generate new one
    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut context = OperationContext::new().with_correlation_id(correlation_id);

    if let Some(ip) = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        context = context.with_client_ip(ip);
    }

    if let Some(timeout_ms) = headers
        .get(REQUEST_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
    {
        context = context.with_timeout(Duration::from_millis(timeout_ms));
    }

    context
}

/// Attach an `OperationContext` to every request
pub async fn context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let context = context_from_headers(request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            correlation_id = ?correlation_id,
            "Request failed"
        );
    } else {
        tracing::info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            correlation_id = ?correlation_id,
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert(CORRELATION_ID_HEADER, "abc".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let auth = masked.iter().find(|(k, _)| k == "authorization");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");

        assert_eq!(auth.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
    }

    #[test]
    fn test_context_uses_correlation_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_ID_HEADER, id.to_string().parse().unwrap());
        headers.insert(FORWARDED_FOR_HEADER, "10.0.0.7, 192.168.1.1".parse().unwrap());

        let context = context_from_headers(&headers);

        assert_eq!(context.correlation_id, Some(id));
        assert_eq!(context.client_ip, Some("10.0.0.7".parse().unwrap()));
        assert!(context.deadline.is_none());
    }

    #[tokio::test]
    async fn test_context_timeout_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_TIMEOUT_HEADER, "1500".parse().unwrap());
        headers.insert(CORRELATION_ID_HEADER, "not-a-uuid".parse().unwrap());

        let context = context_from_headers(&headers);

        assert!(context.deadline.is_some());
        assert!(context.correlation_id.is_some());
    }
}
