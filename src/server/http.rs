//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{IdentityProvider, JwtValidator};
use crate::config::Args;
use crate::routes::{self, BoxBody};
use crate::services::{StampService, StampServiceConfig};
use crate::session::{spawn_principal_listener, SessionRegistry};
use crate::stamps::ReportFont;
use crate::store::StampStore;
use crate::types::StampbookError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Durable owner of every stamp collection
    pub store: Arc<dyn StampStore>,
    /// Token verification and principal events
    pub identity: Arc<IdentityProvider>,
    /// Session-scoped stamp operations
    pub service: Arc<StampService>,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState over `store`, deriving the JWT validator from `args`
    pub fn new(args: Args, store: Arc<dyn StampStore>) -> Result<Self, StampbookError> {
        let validator = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => JwtValidator::new_dev(),
            (None, false) => {
                return Err(StampbookError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };

        Ok(Self::with_identity(
            args,
            store,
            Arc::new(IdentityProvider::new(validator)),
        ))
    }

    pub fn with_identity(
        args: Args,
        store: Arc<dyn StampStore>,
        identity: Arc<IdentityProvider>,
    ) -> Self {
        let config = StampServiceConfig {
            toast_ttl: args.toast_ttl(),
            report_font: ReportFont::new(args.report_font.clone()),
        };
        let service = Arc::new(StampService::new(
            Arc::clone(&store),
            Arc::new(SessionRegistry::with_idle_ttl(Duration::from_secs(
                identity.expiry_seconds(),
            ))),
            config,
        ));

        Self {
            args,
            store,
            identity,
            service,
            started_at: Instant::now(),
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), StampbookError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Stampbook listening on {} as node {}",
        state.args.listen, state.args.node_id
    );
    info!("Stamp store backend: {}", state.store.backend());

    if state.args.dev_mode {
        warn!("Development mode enabled - /auth/dev-token issues tokens");
    }

    // Open and discard session contexts as principals come and go
    spawn_principal_listener(Arc::clone(&state.service), state.identity.subscribe());

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Handle auth routes (/auth/*) - these consume the request
    if path.starts_with("/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    if path.starts_with("/api/") {
        if let Some(response) = routes::handle_api_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    let response = match (method, path.as_str()) {
        // Liveness probe - returns 200 while the process is serving
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)).await)
        }

        // Readiness probe - returns 200 only if the store is reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)).await)
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "Stamp routes live under /api, session routes under /auth"
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
