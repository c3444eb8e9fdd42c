//! Configuration of the backend and gateway services.
//!
//! The executables fill these structs from their command line arguments (each of which can
//! also be given through an environment variable). The [`Default`] implementations hold the
//! values used when nothing is specified.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::auth::{Role, StaticCredentials};
use crate::dataset::DEFAULT_DATASET_URL;
use crate::rate_limit::RateLimitConfig;
use crate::{NobelError, Result};

/// default listen address of the backend
pub const DEFAULT_BACKEND_ADDRESS: &str = "127.0.0.1:8001";
/// default listen address of the gateway
pub const DEFAULT_GATEWAY_ADDRESS: &str = "127.0.0.1:8000";
/// default location of the data file
pub const DEFAULT_DATA_FILE: &str = "./datos/bd.json";
/// identity the gateway uses when calling the backend
pub const DEFAULT_GATEWAY_IDENTITY: &str = "gateway";
/// secret the gateway uses when calling the backend
pub const DEFAULT_GATEWAY_SECRET: &str = "gateway-secret";

/// An `identity:secret:role` credential entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    /// the user name
    pub identity: String,
    /// the plaintext secret, hashed when the credential table is built
    pub secret: String,
    /// the role granted
    pub role: Role,
}

impl UserEntry {
    /// creates a new entry
    pub fn new(identity: &str, secret: &str, role: Role) -> Self {
        UserEntry {
            identity: identity.to_string(),
            secret: secret.to_string(),
            role,
        }
    }
}

impl FromStr for UserEntry {
    type Err = NobelError;

    /// parses `identity:secret:role`. The secret may itself contain colons
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || NobelError::Parsing(format!("could not parse {} into identity:secret:role", s));

        let (rest, role) = s.rsplit_once(':').ok_or_else(invalid)?;
        let (identity, secret) = rest.split_once(':').ok_or_else(invalid)?;
        if identity.is_empty() {
            return Err(invalid());
        }
        Ok(UserEntry::new(identity, secret, role.parse()?))
    }
}

/// builds a credential table from a list of entries
pub fn credentials(users: &[UserEntry]) -> StaticCredentials {
    users.iter().fold(StaticCredentials::new(), |creds, user| {
        creds.with_user(user.identity.clone(), &user.secret, user.role)
    })
}

/// Settings of the backend service
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// the address the backend listens on
    pub addr: SocketAddr,
    /// the JSON file holding the prize collection
    pub data_file: PathBuf,
    /// where the collection is downloaded from when `data_file` does not exist
    pub dataset_url: String,
    /// the callers allowed to modify prizes
    pub users: Vec<UserEntry>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            addr: DEFAULT_BACKEND_ADDRESS
                .parse()
                .expect("default backend address is valid"),
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            users: vec![UserEntry::new(
                DEFAULT_GATEWAY_IDENTITY,
                DEFAULT_GATEWAY_SECRET,
                Role::Admin,
            )],
        }
    }
}

impl BackendConfig {
    /// validates the raw option values and builds a config from them.
    ///
    /// An empty `users` list keeps the default users.
    ///
    /// # Errors
    /// returns [`NobelError::Parsing`] if one of the values is invalid
    pub fn build(addr: &str, data_file: &str, dataset_url: &str, users: &[&str]) -> Result<Self> {
        let defaults = BackendConfig::default();
        Ok(BackendConfig {
            addr: parse_addr(addr)?,
            data_file: PathBuf::from(data_file),
            dataset_url: parse_url(dataset_url)?.to_string(),
            users: parse_users(users, defaults.users)?,
        })
    }
}

/// Settings of the gateway service
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// the address the gateway listens on
    pub addr: SocketAddr,
    /// base URL of the backend
    pub backend_url: Url,
    /// identity used to call the backend
    pub backend_identity: String,
    /// secret used to call the backend
    pub backend_secret: String,
    /// timeout of a single backend call
    pub backend_timeout: Duration,
    /// per client request quota
    pub rate_limit: RateLimitConfig,
    /// the callers allowed to use the gateway
    pub users: Vec<UserEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            addr: DEFAULT_GATEWAY_ADDRESS
                .parse()
                .expect("default gateway address is valid"),
            backend_url: Url::parse(&format!("http://{}", DEFAULT_BACKEND_ADDRESS))
                .expect("default backend url is valid"),
            backend_identity: DEFAULT_GATEWAY_IDENTITY.to_string(),
            backend_secret: DEFAULT_GATEWAY_SECRET.to_string(),
            backend_timeout: Duration::from_secs(10),
            rate_limit: RateLimitConfig::default(),
            users: vec![
                UserEntry::new("admin", "1234", Role::Admin),
                UserEntry::new("reader", "reader", Role::Reader),
            ],
        }
    }
}

impl GatewayConfig {
    /// validates the raw option values and builds a config from them.
    ///
    /// An empty `users` list keeps the default users.
    ///
    /// # Errors
    /// returns [`NobelError::Parsing`] if one of the values is invalid
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        addr: &str,
        backend_url: &str,
        backend_identity: &str,
        backend_secret: &str,
        rate_limit: &str,
        rate_window_ms: &str,
        users: &[&str],
    ) -> Result<Self> {
        let defaults = GatewayConfig::default();
        let max_requests: usize = rate_limit
            .parse()
            .map_err(|_| NobelError::Parsing(format!("could not parse {} into a request count", rate_limit)))?;
        let window_ms: u64 = rate_window_ms
            .parse()
            .map_err(|_| NobelError::Parsing(format!("could not parse {} into milliseconds", rate_window_ms)))?;
        if max_requests == 0 {
            return Err(NobelError::Parsing("the rate limit must allow at least 1 request".to_string()));
        }
        if window_ms == 0 {
            return Err(NobelError::Parsing("the rate limit window must not be 0".to_string()));
        }

        Ok(GatewayConfig {
            addr: parse_addr(addr)?,
            backend_url: parse_url(backend_url)?,
            backend_identity: backend_identity.to_string(),
            backend_secret: backend_secret.to_string(),
            rate_limit: RateLimitConfig::new(max_requests, Duration::from_millis(window_ms)),
            backend_timeout: defaults.backend_timeout,
            users: parse_users(users, defaults.users)?,
        })
    }
}

/// parses an `IP:PORT` socket address
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse()
        .map_err(|_| NobelError::Parsing(format!("could not parse {} into an IP address and port", addr)))
}

/// parses an `http(s)://` URL
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|_| NobelError::Parsing(format!("could not parse {} into a URL", url)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(NobelError::Parsing(format!("unsupported URL scheme: {}", other))),
    }
}

fn parse_users(users: &[&str], defaults: Vec<UserEntry>) -> Result<Vec<UserEntry>> {
    if users.is_empty() {
        return Ok(defaults);
    }
    users.iter().map(|u| u.parse()).collect()
}
