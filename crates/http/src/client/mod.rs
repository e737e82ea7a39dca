//! Anidex HTTP client

pub mod anime;
pub mod auth;
pub mod comments;
pub mod error;
pub mod lists;
pub mod request;
pub mod user;

use error::ClientError;
use request::{ApiRequest, RequestBody};
use reqwest::{Client, ClientBuilder, Response, cookie::Jar, header, multipart};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Applied to every request unless the builder or the request overrides it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_USER_AGENT: &str = concat!("anidex-client/", env!("CARGO_PKG_VERSION"));

/// Anidex API client
///
/// Cheap to clone; clones share the connection pool and the cookie jar that
/// holds the server-issued `refresh_token` cookie.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cookie jar shared with the underlying HTTP client
    pub fn cookie_jar(&self) -> Arc<Jar> {
        Arc::clone(&self.cookies)
    }

    /// Resolve the request path against the base URL
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ClientError::Configuration(format!("{} cannot be a base URL", self.base_url))
            })?;
            segments.pop_if_empty();
            segments.extend(request.segments());
        }
        Ok(url)
    }

    /// Build a `reqwest` request, attaching the bearer token when one is given
    pub fn request(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let url = self.url_for(request)?;
        let mut builder = self.client.request(request.method().clone(), url);

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        if let Some(timeout) = request.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(upload) => {
                let part = multipart::Part::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.content_type)?;
                builder.multipart(multipart::Form::new().part(upload.field.clone(), part))
            }
        };

        Ok(builder)
    }

    /// Send a request and return the raw response without checking its status
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<Response, ClientError> {
        debug!(
            method = %request.method(),
            path = %request.path(),
            authenticated = bearer.is_some(),
            "Sending API request"
        );
        Ok(self.request(request, bearer)?.send().await?)
    }

    /// Execute a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        let response = self.send(request, bearer).await?;
        Self::decode(response).await
    }

    /// Execute a request whose response body is irrelevant
    pub async fn execute_unit(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<(), ClientError> {
        let response = self.send(request, bearer).await?;
        Self::check(response).await.map(|_| ())
    }

    /// Turn a non-success response into a [`ClientError`]
    pub async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, body))
        }
    }

    /// Check the status and decode the JSON body
    pub async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    cookies: Option<Arc<Jar>>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use an existing cookie jar, e.g. one restored from disk
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookies = Some(jar);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        let base_url = Url::parse(&base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "{base_url} cannot be a base URL"
            )));
        }

        let cookies = self.cookies.unwrap_or_default();

        let client = ClientBuilder::new()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .build()?;

        Ok(ApiClient {
            client,
            base_url,
            cookies,
        })
    }
}
