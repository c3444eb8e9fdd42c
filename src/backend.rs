use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{Caller, CredentialProvider, Role, SharedCredentials};
use crate::model::{Deleted, Prize, PrizeUpdate, Prizes};
use crate::{NobelError, PrizeStore, Result};

/// An HTTP server exposing a [`PrizeStore`].
///
/// Reads are public. Creating, updating and deleting prizes requires HTTP Basic credentials that
/// the [`CredentialProvider`] resolves to [`Role::Admin`].
///
/// # Example
/// Serve the prizes kept in `./datos/bd.json` on "127.0.0.1:8001"
/// ```rust,no_run
/// use std::path::Path;
/// use nobel::{BackendServer, JsonPrizeStore, Role, StaticCredentials};
/// # async fn run() -> nobel::Result<()> {
/// let store = JsonPrizeStore::open(Path::new("./datos/bd.json"))?;
/// let credentials = StaticCredentials::new().with_user("gateway", "gateway-secret", Role::Admin);
/// let server = BackendServer::new(store, credentials);
/// server.run("127.0.0.1:8001".parse().unwrap()).await?;
/// # Ok(())
/// # }
/// ```
pub struct BackendServer<S: PrizeStore> {
    state: BackendState<S>,
}

#[derive(Clone)]
struct BackendState<S: PrizeStore> {
    store: S,
    credentials: SharedCredentials,
}

impl<S: PrizeStore> FromRef<BackendState<S>> for SharedCredentials {
    fn from_ref(state: &BackendState<S>) -> Self {
        state.credentials.clone()
    }
}

impl<S: PrizeStore> BackendServer<S> {
    /// Create a new `BackendServer` over the given store, authenticating writers with
    /// `credentials`
    pub fn new(store: S, credentials: impl CredentialProvider + 'static) -> Self {
        BackendServer {
            state: BackendState {
                store,
                credentials: Arc::new(credentials),
            },
        }
    }

    /// the routes of the backend
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(all_prizes::<S>))
            .route("/prizes/{year}", get(prizes_by_year::<S>))
            .route(
                "/prizes/{year}/{category}",
                get(prizes_by_year_and_category::<S>)
                    .put(update_prize::<S>)
                    .delete(delete_prize::<S>),
            )
            .route("/prize", post(create_prize::<S>))
            .route("/prizes", post(create_prize::<S>))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// starts the server listening on the given address, until Ctrl+C or SIGTERM is received
    ///
    /// # Errors
    /// returns [`NobelError::Io`] if the server could not be started
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("backend listening on {}", listener.local_addr()?);
        self.serve(listener, crate::shutdown_signal()).await
    }

    /// serves requests on an already bound `listener` until `shutdown` completes
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("backend stopped");
        Ok(())
    }
}

/// GET / - the whole collection
async fn all_prizes<S: PrizeStore>(State(state): State<BackendState<S>>) -> Result<Json<Prizes>> {
    Ok(Json(state.store.all()?))
}

/// GET /prizes/{year}
async fn prizes_by_year<S: PrizeStore>(
    State(state): State<BackendState<S>>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<Prize>>> {
    Ok(Json(state.store.by_year(year)?))
}

/// GET /prizes/{year}/{category}
async fn prizes_by_year_and_category<S: PrizeStore>(
    State(state): State<BackendState<S>>,
    Path((year, category)): Path<(i32, String)>,
) -> Result<Json<Vec<Prize>>> {
    Ok(Json(state.store.by_year_and_category(year, &category)?))
}

/// PUT /prizes/{year}/{category} - partial update
async fn update_prize<S: PrizeStore>(
    State(state): State<BackendState<S>>,
    caller: Caller,
    Path((year, category)): Path<(i32, String)>,
    payload: std::result::Result<Json<PrizeUpdate>, JsonRejection>,
) -> Result<Json<Prize>> {
    caller.require(&[Role::Admin])?;
    let Json(update) = payload.map_err(validation)?;

    let store = state.store.clone();
    let target = category.clone();
    let prize = blocking(move || store.update(year, &target, update)).await?;
    info!("{} updated the {} {} prize", caller.identity, year, category);
    Ok(Json(prize))
}

/// DELETE /prizes/{year}/{category}
async fn delete_prize<S: PrizeStore>(
    State(state): State<BackendState<S>>,
    caller: Caller,
    Path((year, category)): Path<(i32, String)>,
) -> Result<Json<Deleted>> {
    caller.require(&[Role::Admin])?;

    let store = state.store.clone();
    let target = category.clone();
    let prize = blocking(move || store.delete(year, &target)).await?;
    info!("{} deleted the {} {} prize", caller.identity, year, category);
    Ok(Json(Deleted {
        message: format!("prize {} {} deleted", prize.year, prize.category),
        prize,
    }))
}

/// POST /prize
async fn create_prize<S: PrizeStore>(
    State(state): State<BackendState<S>>,
    caller: Caller,
    payload: std::result::Result<Json<Prize>, JsonRejection>,
) -> Result<(StatusCode, Json<Prize>)> {
    caller.require(&[Role::Admin])?;
    let Json(prize) = payload.map_err(validation)?;

    let store = state.store.clone();
    let prize = blocking(move || store.create(prize)).await?;
    info!("{} created the {} {} prize", caller.identity, prize.year, prize.category);
    Ok((StatusCode::CREATED, Json(prize)))
}

/// runs a store mutation, which rewrites the data file, on the blocking thread pool
async fn blocking<T, F>(mutation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(mutation)
        .await
        .map_err(|e| NobelError::Storage(format!("the store task failed: {}", e)))?
}

fn validation(rejection: JsonRejection) -> NobelError {
    NobelError::Validation(rejection.body_text())
}
