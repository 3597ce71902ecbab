//! HTTP routes for the stamp book
//!
//! Every route needs a bearer token; the principal's session is opened
//! on first use.
//!
//! - GET  /api/stamps         - Snapshot (collection, progress, achievements, toast)
//! - POST /api/stamps         - Add a stamp `{index, reason}`
//! - GET  /api/grid           - Grid cells with stamped flags
//! - GET  /api/reasons        - Reasons list (`search`, `sort`)
//! - GET  /api/reasons/export - Reasons list as a text download
//! - GET  /api/report         - Report download (`format=pdf|text`)
//! - GET  /api/quote          - Quote of the day

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    cors_preflight, download_response, error_response, get_auth_header, json_response,
    method_not_allowed, parse_json_body, parse_query, BoxBody, BoxError, ErrorResponse,
};
use crate::auth::Principal;
use crate::server::AppState;
use crate::stamps::{daily_quote, ReportFormat, SortKey, ValidationError, MAX_STAMPS};
use crate::types::StampbookError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddStampRequest {
    /// Signed and wide so any JSON integer reaches range validation
    pub index: i64,
    pub reason: String,
}

impl AddStampRequest {
    /// Narrow `index` to a grid position, checking the reason first as the
    /// controller does
    fn grid_index(&self) -> Result<u32, ValidationError> {
        if self.reason.trim().is_empty() {
            return Err(ValidationError::InvalidReason);
        }
        u32::try_from(self.index).map_err(|_| ValidationError::IndexOutOfRange {
            index: self.index,
            max: MAX_STAMPS,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonsQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: Option<String>,
}

impl ReasonsQuery {
    fn sort_key(&self) -> Result<SortKey, StampbookError> {
        match self.sort.as_deref() {
            None | Some("") => Ok(SortKey::default()),
            Some(s) => s.parse().map_err(StampbookError::BadRequest),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: &'static str,
}

// =============================================================================
// Route Handlers
// =============================================================================

async fn handle_add_stamp<B>(
    req: Request<B>,
    state: &AppState,
    principal: &Principal,
) -> Result<Response<BoxBody>, StampbookError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body: AddStampRequest = parse_json_body(req, state.args.max_body_bytes).await?;
    let index = body.grid_index()?;
    let result = state
        .service
        .add_stamp(principal, index, &body.reason)
        .await?;

    let status = if result.newly_written {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(json_response(status, &result))
}

async fn handle_reasons<B>(
    req: &Request<B>,
    state: &AppState,
    principal: &Principal,
    export: bool,
) -> Result<Response<BoxBody>, StampbookError> {
    let query: ReasonsQuery = parse_query(req)?;
    let sort = query.sort_key()?;

    if export {
        let artifact = state
            .service
            .export_reasons(principal, &query.search, sort)
            .await?;
        Ok(download_response(artifact))
    } else {
        let records = state.service.reasons(principal, &query.search, sort).await?;
        Ok(json_response(StatusCode::OK, &records))
    }
}

async fn handle_report<B>(
    req: &Request<B>,
    state: &AppState,
    principal: &Principal,
) -> Result<Response<BoxBody>, StampbookError> {
    let query: ReportQuery = parse_query(req)?;
    let format = match query.format.as_deref() {
        None | Some("") => ReportFormat::default(),
        Some(f) => f.parse().map_err(StampbookError::BadRequest)?,
    };

    let artifact = state.service.report(principal, format, None).await?;
    Ok(download_response(artifact))
}

async fn route<B>(
    req: Request<B>,
    state: &AppState,
    principal: &Principal,
) -> Result<Response<BoxBody>, StampbookError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();

    match (req.method(), path.as_str()) {
        (&Method::GET, "/api/stamps") => {
            let view = state.service.snapshot(principal).await?;
            Ok(json_response(StatusCode::OK, &view))
        }
        (&Method::POST, "/api/stamps") => handle_add_stamp(req, state, principal).await,
        (&Method::GET, "/api/grid") => {
            let cells = state.service.grid(principal).await?;
            Ok(json_response(StatusCode::OK, &cells))
        }
        (&Method::GET, "/api/reasons") => handle_reasons(&req, state, principal, false).await,
        (&Method::GET, "/api/reasons/export") => handle_reasons(&req, state, principal, true).await,
        (&Method::GET, "/api/report") => handle_report(&req, state, principal).await,

        (_, "/api/stamps")
        | (_, "/api/grid")
        | (_, "/api/reasons")
        | (_, "/api/reasons/export")
        | (_, "/api/report") => Ok(method_not_allowed()),

        _ => Ok(json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "API endpoint not found".into(),
                code: None,
            },
        )),
    }
}

/// Handle `/api/*` requests.
///
/// Returns Some(response) if request was handled, None if not an API route.
pub async fn handle_api_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path();
    if !path.starts_with("/api/") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // The quote is the same for everybody
    if path == "/api/quote" {
        return Some(if req.method() == Method::GET {
            json_response(
                StatusCode::OK,
                &QuoteResponse {
                    quote: daily_quote(),
                },
            )
        } else {
            method_not_allowed()
        });
    }

    let principal = match state.identity.authenticate(get_auth_header(&req)) {
        Ok(p) => p,
        Err(e) => return Some(error_response(&e)),
    };

    Some(match route(req, &state, &principal).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_state;
    use crate::store::StampStore;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    fn request(method: Method, path: &str, token: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .header("Authorization", format!("Bearer {token}"))
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<BoxBody> {
        handle_api_request(req, Arc::clone(state)).await.unwrap()
    }

    async fn json_of(response: Response<BoxBody>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (state, _) = test_state();
        let req = Request::builder()
            .uri("/api/stamps")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = send(&state, req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_add_then_snapshot() {
        let (state, _) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();

        let response = send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":7,"reason":"meetings"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(&state, request(Method::GET, "/api/stamps", &token, "")).await;
        let json = json_of(response).await;
        assert_eq!(json["count"], 1);
        assert_eq!(json["stamps"][0]["index"], 7);
        assert_eq!(json["displayName"], "Anonymous");
    }

    #[tokio::test]
    async fn test_validation_errors_map_to_status() {
        let (state, _) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();

        let response = send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":1,"reason":"  "}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_of(response).await["code"], "INVALID_REASON");

        send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":1,"reason":"ok"}"#),
        )
        .await;
        let response = send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":1,"reason":"again"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_off_grid_indices_are_out_of_range() {
        let (state, store) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();

        for index in ["-1", "0", "101", "5000000000"] {
            let body = format!(r#"{{"index":{index},"reason":"x"}}"#);
            let response = send(&state, request(Method::POST, "/api/stamps", &token, &body)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "index {index}");
            assert_eq!(json_of(response).await["code"], "INDEX_OUT_OF_RANGE");
        }

        // A blank reason is still reported first
        let response = send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":-1,"reason":" "}"#),
        )
        .await;
        assert_eq!(json_of(response).await["code"], "INVALID_REASON");
        assert!(store.load("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_503() {
        let (state, store) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();
        send(&state, request(Method::GET, "/api/stamps", &token, "")).await;

        store.set_available(false);
        let response = send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":2,"reason":"x"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_reasons_export_download() {
        let (state, _) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();
        send(
            &state,
            request(Method::POST, "/api/stamps", &token, r#"{"index":3,"reason":"Boss"}"#),
        )
        .await;

        let response = send(
            &state,
            request(Method::GET, "/api/reasons/export?search=boss&sort=index", &token, ""),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Content-Disposition"],
            "attachment; filename=\"resignation_reasons.txt\""
        );

        let response = send(
            &state,
            request(Method::GET, "/api/reasons?sort=bogus", &token, ""),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_formats() {
        let (state, _) = test_state();
        let token = state.identity.issue_token("u1", None).unwrap();

        let response = send(&state, request(Method::GET, "/api/report", &token, "")).await;
        assert_eq!(response.headers()["Content-Type"], "application/pdf");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.starts_with(b"%PDF"));

        let response = send(
            &state,
            request(Method::GET, "/api/report?format=text", &token, ""),
        )
        .await;
        assert_eq!(response.headers()["Content-Type"], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_quote_is_public() {
        let (state, _) = test_state();
        let req = Request::builder()
            .uri("/api/quote")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = send(&state, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_of(response).await["quote"].is_string());
    }
}
