//! HTTP client for the admin API.

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::query::encode_query;
use crate::response::EndpointResponse;
use crate::version::build_user_agent;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builder for constructing a [`Client`].
pub struct ClientBuilder {
    server_url: String,
    access_token: Option<String>,
    language: Option<String>,
    timeout: Duration,
    cache: Option<Arc<dyn Cache>>,
    user_agent_suffix: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder for the given server URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            access_token: None,
            language: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache: None,
            user_agent_suffix: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Prefix every endpoint with a language segment, e.g. `de`.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cache used by requests that ask for caching.
    ///
    /// Without a cache every request goes to the server.
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set a custom User-Agent suffix.
    pub fn user_agent_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.user_agent_suffix = Some(suffix.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        if self.server_url.is_empty() {
            return Err(Error::Config("server URL is required".into()));
        }

        if !self.server_url.starts_with("https://") {
            warn!(
                server_url = %self.server_url,
                "API server URL is not using HTTPS. This is insecure."
            );
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = build_user_agent(self.user_agent_suffix.as_deref());
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .map_err(|_| Error::Config("invalid User-Agent suffix".into()))?,
        );
        if let Some(token) = &self.access_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Config("invalid access token".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(Error::Http)?;

        Ok(Client {
            server_url: self.server_url,
            language: self.language.filter(|l| !l.is_empty()),
            http_client,
            cache: self.cache,
        })
    }
}

/// The admin API client.
///
/// # Example
///
/// ```rust,no_run
/// use headless_admin::{ApiAdminUser, Client, Endpoint, SortSpec};
///
/// #[tokio::main]
/// async fn main() -> Result<(), headless_admin::Error> {
///     let client = Client::builder("https://cms.example.com")
///         .access_token("secret")
///         .build()?;
///
///     let users: Vec<ApiAdminUser> = ApiAdminUser::find()?
///         .sort(SortSpec::new().desc("id"))
///         .per_page(10)
///         .all(&client)
///         .await?;
///
///     println!("{} users", users.len());
///     Ok(())
/// }
/// ```
pub struct Client {
    server_url: String,
    language: Option<String>,
    http_client: reqwest::Client,
    cache: Option<Arc<dyn Cache>>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder(server_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(server_url)
    }

    /// The configured cache, if any.
    pub fn cache(&self) -> Option<&dyn Cache> {
        self.cache.as_deref()
    }

    /// Full URL for an endpoint: server URL, language and endpoint joined by
    /// `/`, empty parts skipped.
    pub fn request_url(&self, endpoint: &str) -> String {
        [
            self.server_url.as_str(),
            self.language.as_deref().unwrap_or_default(),
            endpoint.trim_start_matches('/'),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
    }

    /// GET with `params` as query string.
    pub async fn get(&self, endpoint: &str, params: &Map<String, Value>) -> Result<EndpointResponse> {
        self.execute(Method::GET, endpoint, params).await
    }

    /// POST with `params` as JSON body.
    pub async fn post(&self, endpoint: &str, params: &Map<String, Value>) -> Result<EndpointResponse> {
        self.execute(Method::POST, endpoint, params).await
    }

    /// PUT with `params` as JSON body.
    pub async fn put(&self, endpoint: &str, params: &Map<String, Value>) -> Result<EndpointResponse> {
        self.execute(Method::PUT, endpoint, params).await
    }

    /// DELETE with `params` as query string.
    pub async fn delete(&self, endpoint: &str, params: &Map<String, Value>) -> Result<EndpointResponse> {
        self.execute(Method::DELETE, endpoint, params).await
    }

    /// Perform a single request.
    ///
    /// GET and DELETE send `params` bracket-encoded in the query string,
    /// other methods send them as a JSON body. The response is returned
    /// whatever its status; only network failures are errors.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        params: &Map<String, Value>,
    ) -> Result<EndpointResponse> {
        let url = self.request_url(endpoint);
        debug!(method = %method, url = %url, "sending request");

        let mut req = self.http_client.request(method.clone(), &url);
        if method == Method::GET || method == Method::DELETE {
            if !params.is_empty() {
                req = req.query(&encode_query(params));
            }
        } else {
            req = req.json(params);
        }

        let response = req.send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        let body = response.text().await.map_err(transport_error)?;

        debug!(method = %method, url = %url, status = status, "received response");

        Ok(EndpointResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(e)
    }
}
