#![deny(missing_docs)]
//! A small two-tier service for reading and editing a collection of Nobel Prize records.
//!
//! This crate provides the [`JsonPrizeStore`] storage engine, the backend and gateway HTTP
//! services built on top of it, a [`NobelClient`] with its interactive [`Menu`], as well as
//! the `nobel-backend`, `nobel-gateway` and `nobel-client` executables that can be used to run
//! and interact with the services.
//!
//! ## Supported Operations
//! The store supports the following operations over the prize collection:
//!
//! - list every prize
//! - query prizes by year, or by year and category (categories match case-insensitively)
//! - partially `UPDATE` a prize, including individual laureates matched by id
//! - `DELETE` a prize
//! - `CREATE` a prize, assigning fresh laureate ids
//!
//! See the [`PrizeStore`] trait and the [`model`] module for more information on the
//! structure of these operations.
//!
//! ## JsonPrizeStore
//! [`JsonPrizeStore`] is the implementor of the [`PrizeStore`] trait.
//! It is responsible for the following tasks:
//! - maintaining the prize collection in memory, behind a single lock
//! - persisting the whole collection into one JSON file after every mutation. The file is
//! written to a temporary file first and then renamed over the old one, so a crash never leaves
//! a half written data file behind
//! - loading the collection from that file at start-up
//!
//! If the data file does not exist yet, the backend downloads the public dataset from
//! <https://api.nobelprize.org/v1/prize.json> first (see [`dataset`]).
//!
//! ## Backend / Gateway
//! The [`BackendServer`] owns the store and exposes it over HTTP+JSON. Reads are public,
//! mutations require HTTP Basic credentials resolving to the `admin` role.
//!
//! The [`GatewayServer`] is the client facing service. Every request it receives goes through:
//! 1. the per-client [`RateLimiter`] (5 requests per second per client IP by default)
//! 2. HTTP Basic authentication against a [`CredentialProvider`]
//! 3. a role check, `reader` may read, only `admin` may create/update/delete
//!
//! and is then forwarded to the backend using the gateway's own credentials. The backend's
//! response is passed back unchanged.
//!
//! ### HTTP routes
//! Both services expose the same routes:
//!
//! | method | path                          |                                  |
//! |--------|-------------------------------|----------------------------------|
//! | GET    | `/`                           | the whole collection             |
//! | GET    | `/prizes/{year}`              | prizes of a year                 |
//! | GET    | `/prizes/{year}/{category}`   | prizes of a year and category    |
//! | PUT    | `/prizes/{year}/{category}`   | partial update                   |
//! | DELETE | `/prizes/{year}/{category}`   | delete                           |
//! | POST   | `/prize` (or `/prizes`)       | create                           |
//!
//! Errors are returned as `{"error": "...", "code": 404}`, see [`NobelError`].
//!
//! [`dataset`]: ./dataset/index.html
pub use auth::{CredentialProvider, Role, StaticCredentials};
pub use backend::BackendServer;
pub use client::NobelClient;
pub use config::{BackendConfig, GatewayConfig};
pub use error::{ErrorBody, NobelError, Result};
pub use gateway::GatewayServer;
pub use menu::Menu;
pub use model::{Deleted, Laureate, LaureateUpdate, Prize, PrizeUpdate, Prizes};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use store::{JsonPrizeStore, PrizeStore};

pub mod auth;
mod backend;
mod client;
pub mod config;
pub mod dataset;
mod error;
mod gateway;
mod menu;
pub mod model;
pub mod rate_limit;
pub mod store;

/// completes when the process receives Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install the Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install the SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
