//! Authentication and authorization.
//!
//! Callers present HTTP Basic credentials. A [`CredentialProvider`] resolves them to a
//! [`Role`], and each route declares the roles it allows. [`Role::Admin`] is allowed
//! everywhere.
//!
//! [`StaticCredentials`] never keeps plaintext secrets: every secret is stored as a
//! `salt$hmac` token, the hex encoded HMAC-SHA256 of the secret keyed with a random salt.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::{NobelError, Result};

type HmacSha256 = Hmac<Sha256>;

/// The roles a caller can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// may read prizes
    Reader,
    /// may do everything
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reader => write!(f, "reader"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = NobelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "admin" => Ok(Role::Admin),
            other => Err(NobelError::Parsing(format!("unknown role: {}", other))),
        }
    }
}

/// checks that `role` is one of the `allowed` roles. [`Role::Admin`] is always allowed.
///
/// # Errors
/// returns [`NobelError::Forbidden`], naming the allowed roles, if it is not
pub fn authorize(role: Role, allowed: &[Role]) -> Result<()> {
    if role == Role::Admin || allowed.contains(&role) {
        return Ok(());
    }

    let mut names: Vec<String> = allowed.iter().map(Role::to_string).collect();
    if !allowed.contains(&Role::Admin) {
        names.push(Role::Admin.to_string());
    }
    Err(NobelError::Forbidden {
        allowed: names.join(", "),
    })
}

/// Resolves the role of a caller from the identity and secret it presented.
///
/// This is the only thing the services need from an identity store, so a different store can be
/// plugged in by implementing this trait.
pub trait CredentialProvider: Send + Sync {
    /// returns the role of `identity`
    ///
    /// # Errors
    /// [`NobelError::Unauthorized`] if the identity is unknown or the secret does not match
    fn resolve_role(&self, identity: &str, secret: &str) -> Result<Role>;
}

/// A shareable [`CredentialProvider`], as kept in the services' state
pub type SharedCredentials = Arc<dyn CredentialProvider>;

#[derive(Debug, Clone)]
struct Credential {
    // salt$hmac
    token: String,
    role: Role,
}

/// A fixed, in-memory credential table
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: HashMap<String, Credential>,
}

impl StaticCredentials {
    /// creates an empty table, that rejects everyone
    pub fn new() -> Self {
        Self::default()
    }

    /// adds `identity` with the given `secret` and `role`, replacing any previous entry
    pub fn with_user(mut self, identity: impl Into<String>, secret: &str, role: Role) -> Self {
        let token = hash_secret(&random_salt(), secret);
        self.entries.insert(identity.into(), Credential { token, role });
        self
    }

    /// adds `identity` using an already hashed `salt$hmac` token, see [`hash_secret`]
    pub fn with_token(mut self, identity: impl Into<String>, token: impl Into<String>, role: Role) -> Self {
        self.entries.insert(
            identity.into(),
            Credential {
                token: token.into(),
                role,
            },
        );
        self
    }

    /// number of identities in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// true if the table holds no identities
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialProvider for StaticCredentials {
    fn resolve_role(&self, identity: &str, secret: &str) -> Result<Role> {
        let Some(credential) = self.entries.get(identity) else {
            warn!("unknown identity: {}", identity);
            return Err(NobelError::Unauthorized);
        };

        if verify_secret(secret, &credential.token) {
            debug!("authenticated {} as {}", identity, credential.role);
            Ok(credential.role)
        } else {
            warn!("invalid secret for {}", identity);
            Err(NobelError::Unauthorized)
        }
    }
}

/// hashes `secret` into a `salt$hmac` token, the hex encoded HMAC-SHA256 of `secret` using
/// `salt` as the key
pub fn hash_secret(salt: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(secret.as_bytes());
    format!("{}${}", salt, hex::encode(mac.finalize().into_bytes()))
}

fn random_salt() -> String {
    hex::encode(rand::thread_rng().gen::<[u8; 16]>())
}

/// checks `secret` against a `salt$hmac` token. The MAC comparison runs in constant time.
fn verify_secret(secret: &str, token: &str) -> bool {
    let Some((salt, expected)) = token.split_once('$') else {
        warn!("invalid credential token format, expected salt$hmac");
        return false;
    };
    let Ok(expected) = hex::decode(expected) else {
        warn!("invalid credential token, the hmac is not hex");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(salt.as_bytes()) else {
        return false;
    };
    mac.update(secret.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// splits a `Basic` authorization header value into identity and secret
///
/// # Errors
/// [`NobelError::Unauthorized`] if the header is not Basic, or is not valid
/// `base64(identity:secret)`
pub fn parse_basic(header: &str) -> Result<(String, String)> {
    let Some(encoded) = header.strip_prefix("Basic ") else {
        warn!("invalid Authorization header format, expected Basic auth");
        return Err(NobelError::Unauthorized);
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| {
            warn!("failed to decode Basic auth credentials");
            NobelError::Unauthorized
        })?;
    let decoded = String::from_utf8(decoded).map_err(|_| {
        warn!("invalid UTF-8 in Basic auth credentials");
        NobelError::Unauthorized
    })?;

    match decoded.split_once(':') {
        Some((identity, secret)) => Ok((identity.to_string(), secret.to_string())),
        None => {
            warn!("invalid Basic auth format");
            Err(NobelError::Unauthorized)
        }
    }
}

/// builds a `Basic` authorization header value for `identity` and `secret`
pub fn basic_header(identity: &str, secret: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", identity, secret));
    format!("Basic {}", encoded)
}

/// An authenticated caller, extracted from the request's `Authorization` header.
///
/// Handlers that take a `Caller` argument reject unauthenticated requests with `401`.
#[derive(Debug, Clone)]
pub struct Caller {
    /// the identity the caller authenticated as
    pub identity: String,
    /// the caller's role
    pub role: Role,
}

impl Caller {
    /// checks that this caller has one of the `allowed` roles, see [`authorize`]
    pub fn require(&self, allowed: &[Role]) -> Result<()> {
        authorize(self.role, allowed).map_err(|e| {
            warn!("{} ({}) is not allowed: {}", self.identity, self.role, e);
            e
        })
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    SharedCredentials: FromRef<S>,
{
    type Rejection = NobelError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                NobelError::Unauthorized
            })?;
        let (identity, secret) = parse_basic(header)?;

        let credentials = SharedCredentials::from_ref(state);
        let role = credentials.resolve_role(&identity, &secret)?;
        Ok(Caller { identity, role })
    }
}
