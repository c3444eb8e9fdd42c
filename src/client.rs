use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::parse_url;
use crate::model::{Deleted, Prize, PrizeUpdate, Prizes};
use crate::{NobelError, Result};

/// `NobelClient` contains the functionality for communicating with a [`GatewayServer`] (or
/// directly with a [`BackendServer`]).
///
/// Every request carries the client's HTTP Basic credentials.
///
/// [`GatewayServer`]: crate::GatewayServer
/// [`BackendServer`]: crate::BackendServer
#[derive(Debug, Clone)]
pub struct NobelClient {
    http: reqwest::Client,
    base: Url,
    identity: String,
    secret: String,
}

impl NobelClient {
    /// creates a client for the service at `base_url`, authenticating as `identity`
    ///
    /// # Errors
    /// `Err<NobelError::Parsing>` if `base_url` is not an http(s) URL
    pub fn connect(base_url: &str, identity: &str, secret: &str) -> Result<Self> {
        Ok(NobelClient {
            http: reqwest::Client::new(),
            base: parse_url(base_url)?,
            identity: identity.to_string(),
            secret: secret.to_string(),
        })
    }

    /// gets the whole prize collection
    pub async fn all(&self) -> Result<Prizes> {
        self.send(self.request(Method::GET, &[])?).await
    }

    /// gets the prizes awarded in `year`
    /// ## Returns
    /// `Err<NobelError::Remote>` with status 404 if there are none
    pub async fn by_year(&self, year: i32) -> Result<Vec<Prize>> {
        let year = year.to_string();
        self.send(self.request(Method::GET, &["prizes", &year])?).await
    }

    /// gets the prizes awarded in `year` for `category`
    /// ## Returns
    /// `Err<NobelError::Remote>` with status 404 if there are none
    pub async fn by_year_and_category(&self, year: i32, category: &str) -> Result<Vec<Prize>> {
        let year = year.to_string();
        self.send(self.request(Method::GET, &["prizes", &year, category])?)
            .await
    }

    /// creates a new prize and returns it, with its laureate ids assigned
    pub async fn create(&self, prize: &Prize) -> Result<Prize> {
        let request = self.request(Method::POST, &["prize"])?.json(prize);
        self.send(request).await
    }

    /// applies a partial update to a prize and returns the updated prize
    pub async fn update(&self, year: i32, category: &str, update: &PrizeUpdate) -> Result<Prize> {
        let year = year.to_string();
        let request = self
            .request(Method::PUT, &["prizes", &year, category])?
            .json(update);
        self.send(request).await
    }

    /// deletes a prize
    /// # Errors
    /// `Err<NobelError::Remote>` with status 404 if there is no such prize
    pub async fn delete(&self, year: i32, category: &str) -> Result<Deleted> {
        let year = year.to_string();
        self.send(self.request(Method::DELETE, &["prizes", &year, category])?)
            .await
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NobelError::Parsing(format!("{} can not be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        debug!("{} {}", method, url);

        Ok(self
            .http
            .request(method, url)
            .basic_auth(&self.identity, Some(&self.secret)))
    }

    /// sends the request, re-throwing any error status as `NobelError::Remote`
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NobelError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
