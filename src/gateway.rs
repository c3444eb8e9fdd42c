use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use reqwest::Url;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::auth::{Caller, CredentialProvider, Role, SharedCredentials};
use crate::config::GatewayConfig;
use crate::rate_limit::{rate_limit, RateLimiter};
use crate::{NobelError, Result};

// routes that only read
const READERS: &[Role] = &[Role::Reader];
// routes that change the collection
const ADMINS: &[Role] = &[Role::Admin];

/// The client facing HTTP server.
///
/// Every request is rate limited per client IP, authenticated with HTTP Basic credentials and
/// checked against the roles allowed for its route, before being forwarded to the backend
/// with the gateway's own credentials. The backend's status and body are returned unchanged.
pub struct GatewayServer {
    state: GatewayState,
    limiter: Arc<RateLimiter>,
}

#[derive(Clone)]
struct GatewayState {
    http: reqwest::Client,
    backend: Arc<Url>,
    backend_identity: Arc<str>,
    backend_secret: Arc<str>,
    credentials: SharedCredentials,
}

impl FromRef<GatewayState> for SharedCredentials {
    fn from_ref(state: &GatewayState) -> Self {
        state.credentials.clone()
    }
}

impl GatewayServer {
    /// Create a new `GatewayServer` forwarding to the backend described by `config`, and
    /// authenticating callers with `credentials`
    ///
    /// # Errors
    /// returns [`NobelError::Http`] if the HTTP client could not be built
    pub fn new(config: &GatewayConfig, credentials: impl CredentialProvider + 'static) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.backend_timeout)
            .build()?;

        Ok(GatewayServer {
            state: GatewayState {
                http,
                backend: Arc::new(config.backend_url.clone()),
                backend_identity: Arc::from(config.backend_identity.as_str()),
                backend_secret: Arc::from(config.backend_secret.as_str()),
                credentials: Arc::new(credentials),
            },
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
        })
    }

    /// the rate limiter guarding this gateway
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// the routes of the gateway.
    ///
    /// The rate limiter keys clients by their peer address, so the router must be served with
    /// `into_make_service_with_connect_info::<SocketAddr>()`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(all_prizes))
            .route("/prizes/{year}", get(prizes_by_year))
            .route(
                "/prizes/{year}/{category}",
                get(prizes_by_year_and_category)
                    .put(update_prize)
                    .delete(delete_prize),
            )
            .route("/prize", post(create_prize))
            .route("/prizes", post(create_prize))
            .layer(middleware::from_fn_with_state(self.limiter.clone(), rate_limit))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// starts the gateway listening on the given address, until Ctrl+C or SIGTERM is received
    ///
    /// # Errors
    /// returns [`NobelError::Io`] if the server could not be started
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "gateway listening on {}, forwarding to {}",
            listener.local_addr()?,
            self.state.backend
        );
        self.serve(listener, crate::shutdown_signal()).await
    }

    /// serves requests on an already bound `listener` until `shutdown` completes
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;
        info!("gateway stopped");
        Ok(())
    }
}

async fn all_prizes(State(state): State<GatewayState>, caller: Caller) -> Result<Response> {
    caller.require(READERS)?;
    forward(&state, Method::GET, &[], None).await
}

async fn prizes_by_year(
    State(state): State<GatewayState>,
    caller: Caller,
    Path(year): Path<i32>,
) -> Result<Response> {
    caller.require(READERS)?;
    let year = year.to_string();
    forward(&state, Method::GET, &["prizes", year.as_str()], None).await
}

async fn prizes_by_year_and_category(
    State(state): State<GatewayState>,
    caller: Caller,
    Path((year, category)): Path<(i32, String)>,
) -> Result<Response> {
    caller.require(READERS)?;
    let year = year.to_string();
    let path = ["prizes", year.as_str(), category.as_str()];
    forward(&state, Method::GET, &path, None).await
}

async fn update_prize(
    State(state): State<GatewayState>,
    caller: Caller,
    Path((year, category)): Path<(i32, String)>,
    body: Bytes,
) -> Result<Response> {
    caller.require(ADMINS)?;
    let year = year.to_string();
    let path = ["prizes", year.as_str(), category.as_str()];
    forward(&state, Method::PUT, &path, Some(body)).await
}

async fn delete_prize(
    State(state): State<GatewayState>,
    caller: Caller,
    Path((year, category)): Path<(i32, String)>,
) -> Result<Response> {
    caller.require(ADMINS)?;
    let year = year.to_string();
    let path = ["prizes", year.as_str(), category.as_str()];
    forward(&state, Method::DELETE, &path, None).await
}

async fn create_prize(
    State(state): State<GatewayState>,
    caller: Caller,
    body: Bytes,
) -> Result<Response> {
    caller.require(ADMINS)?;
    forward(&state, Method::POST, &["prize"], Some(body)).await
}

/// sends the request to the backend and turns the backend's answer into our response
async fn forward(
    state: &GatewayState,
    method: Method,
    segments: &[&str],
    body: Option<Bytes>,
) -> Result<Response> {
    let url = backend_url(&state.backend, segments)?;
    debug!("forwarding {} {}", method, url);

    let mut request = state
        .http
        .request(method, url.clone())
        .basic_auth(&*state.backend_identity, Some(&*state.backend_secret));
    if let Some(body) = body {
        request = request.header(CONTENT_TYPE, "application/json").body(body);
    }

    let upstream = request.send().await.map_err(|e| {
        error!("backend request to {} failed: {}", url, e);
        NobelError::Upstream(format!("the backend could not be reached: {}", e))
    })?;

    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let bytes = upstream.bytes().await.map_err(|e| {
        error!("reading the backend response failed: {}", e);
        NobelError::Upstream(format!("the backend response could not be read: {}", e))
    })?;
    debug!("backend answered {}", status);

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

/// appends percent-encoded path `segments` to the backend base url
fn backend_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| NobelError::Parsing(format!("{} can not be used as a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
