//! HTTP routes for Stampbook
//!
//! One module per route family; the shared response helpers live here.

pub mod auth_routes;
pub mod health;
pub mod stamps;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::stamps::Artifact;
use crate::types::StampbookError;

pub use auth_routes::handle_auth_request;
pub use health::{health_check, readiness_check, version_info};
pub use stamps::handle_api_request;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Error type request bodies must convert into so they can be length-limited
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub(crate) fn error_response(err: &StampbookError) -> Response<BoxBody> {
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().into()),
        },
    )
}

pub(crate) fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
            code: None,
        },
    )
}

/// Attachment response for a generated export
pub(crate) fn download_response(artifact: Artifact) -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", artifact.content_type)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", artifact.filename),
        )
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Expose-Headers", "Content-Disposition")
        .header("Cache-Control", "no-store")
        .body(full_body(artifact.bytes))
        .unwrap()
}

pub(crate) fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Read at most `limit` bytes of body and decode them as JSON
///
/// Reading stops as soon as the limit is crossed.
pub(crate) async fn parse_json_body<B, T>(
    req: Request<B>,
    limit: usize,
) -> Result<T, StampbookError>
where
    B: hyper::body::Body,
    B::Error: Into<BoxError>,
    T: for<'de> Deserialize<'de>,
{
    let bytes = match Limited::new(req.into_body(), limit).collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return Err(StampbookError::Http("Request body too large".into()));
        }
        Err(e) => return Err(StampbookError::Http(format!("Failed to read body: {}", e))),
    };

    serde_json::from_slice(&bytes).map_err(|e| StampbookError::Http(format!("Invalid JSON: {}", e)))
}

pub(crate) fn get_auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Decode the query string into `T`; a missing query decodes as empty
pub(crate) fn parse_query<B, T>(req: &Request<B>) -> Result<T, StampbookError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| StampbookError::BadRequest(format!("Invalid query: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        reason: String,
    }

    fn request(body: String) -> Request<Full<Bytes>> {
        Request::builder()
            .method("POST")
            .uri("/api/stamps")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_body_within_limit() {
        let body: Payload = parse_json_body(request(r#"{"reason":"ok"}"#.into()), 64)
            .await
            .unwrap();
        assert_eq!(body.reason, "ok");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let oversized = format!(r#"{{"reason":"{}"}}"#, "x".repeat(4096));
        let err = parse_json_body::<_, Payload>(request(oversized), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, StampbookError::Http(ref m) if m == "Request body too large"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let err = parse_json_body::<_, Payload>(request("not json".into()), 64)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }
}
