//! HTTP Routes for Authentication
//!
//! Tokens come from the external identity provider; these routes only
//! verify them and manage the session context:
//! - POST /auth/sign-in   - Verify a provider token and open the session
//! - POST /auth/sign-out  - Discard the session
//! - GET  /auth/me        - Current principal from token
//! - POST /auth/dev-token - Dev mode only: mint a token

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::{
    cors_preflight, error_response, get_auth_header, json_response, method_not_allowed,
    parse_json_body, BoxBody, BoxError, ErrorResponse,
};
use crate::auth::{extract_token_from_header, Principal};
use crate::server::AppState;
use crate::types::StampbookError;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    /// Provider token; the Authorization header is used when absent
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevTokenRequest {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub display_name: String,
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id.clone(),
            display_name: principal.display_name().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    #[serde(flatten)]
    pub principal: MeResponse,
    pub stamps: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/sign-in
///
/// Verifies the token, announces the sign-in, and loads the collection so
/// the response can report how many stamps the principal already has.
async fn handle_sign_in<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let header_token = extract_token_from_header(get_auth_header(&req)).map(str::to_string);

    let body: SignInRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        // An empty body is fine when the token came in the header
        Err(_) if header_token.is_some() => SignInRequest::default(),
        Err(e) => return error_response(&e),
    };

    let token = match body.token.or(header_token) {
        Some(t) => t,
        None => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "No token provided".into(),
                    code: Some("UNAUTHORIZED".into()),
                },
            )
        }
    };

    let principal = match state.identity.sign_in(&token) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match state.service.open_session(&principal).await {
        Ok(session) => {
            let stamps = session.collection().await.len();
            json_response(
                StatusCode::OK,
                &SignInResponse {
                    principal: MeResponse::from(&principal),
                    stamps,
                },
            )
        }
        Err(e) => {
            warn!(user_id = %principal.user_id, error = %e, "Sign-in could not load stamps");
            error_response(&e)
        }
    }
}

/// POST /auth/sign-out
async fn handle_sign_out<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody> {
    let principal = match state.identity.authenticate(get_auth_header(&req)) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    state.identity.sign_out(&principal);
    state.service.close_session(&principal);

    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Signed out".into(),
        },
    )
}

/// GET /auth/me
async fn handle_me<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody> {
    match state.identity.authenticate(get_auth_header(&req)) {
        Ok(principal) => json_response(StatusCode::OK, &MeResponse::from(&principal)),
        Err(e) => error_response(&e),
    }
}

/// POST /auth/dev-token
///
/// Stands in for the external provider during local development.
async fn handle_dev_token<B>(req: Request<B>, state: Arc<AppState>) -> Response<BoxBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if !state.args.dev_mode {
        return error_response(&StampbookError::NotFound(
            "Dev tokens are only available in dev mode".into(),
        ));
    }

    let body: DevTokenRequest = match parse_json_body(req, state.args.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    if body.user_id.trim().is_empty() {
        return error_response(&StampbookError::BadRequest("userId is required".into()));
    }

    match state.identity.issue_token(&body.user_id, body.display_name) {
        Ok(token) => json_response(
            StatusCode::OK,
            &TokenResponse {
                token,
                expires_in: state.identity.expiry_seconds(),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    // Only handle /auth/* routes
    if !path.starts_with("/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/auth/sign-in") => handle_sign_in(req, state).await,
        (&Method::POST, "/auth/sign-out") => handle_sign_out(req, state).await,
        (&Method::GET, "/auth/me") => handle_me(req, state).await,
        (&Method::POST, "/auth/dev-token") => handle_dev_token(req, state).await,

        (_, "/auth/sign-in") | (_, "/auth/sign-out") | (_, "/auth/me") | (_, "/auth/dev-token") => {
            method_not_allowed()
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_state;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    fn request(
        method: Method,
        path: &str,
        token: Option<&str>,
        body: &str,
    ) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    async fn json_of(response: Response<BoxBody>) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_dev_token_sign_in_me_sign_out() {
        let (state, _) = test_state();

        let response = handle_auth_request(
            request(
                Method::POST,
                "/auth/dev-token",
                None,
                r#"{"userId":"u1","displayName":"Ada"}"#,
            ),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_of(response).await["token"].as_str().unwrap().to_string();

        let response = handle_auth_request(
            request(Method::POST, "/auth/sign-in", Some(&token), ""),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["stamps"], 0);
        assert_eq!(state.service.sessions().len(), 1);

        let response = handle_auth_request(
            request(Method::GET, "/auth/me", Some(&token), ""),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(json_of(response).await["displayName"], "Ada");

        let response = handle_auth_request(
            request(Method::POST, "/auth/sign-out", Some(&token), ""),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.service.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_without_token() {
        let (state, _) = test_state();
        let req = request(Method::POST, "/auth/sign-in", None, "{}");
        let response = handle_auth_request(req, state).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_method_and_unknown_path() {
        let (state, _) = test_state();
        let response = handle_auth_request(
            request(Method::GET, "/auth/sign-in", None, ""),
            Arc::clone(&state),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = handle_auth_request(request(Method::GET, "/auth/nope", None, ""), state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        assert!(handle_auth_request(
            request(Method::GET, "/api/stamps", None, ""),
            test_state().0
        )
        .await
        .is_none());
    }
}
