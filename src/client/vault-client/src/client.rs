//! HTTP dispatch and the generic resource verbs.
//!
//! Every request goes to `{address}/v1{path}` and carries the token and user
//! agent headers. Paths are expected to begin with a slash.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Request, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, VaultError};
use crate::transit::Transit;

/// Client library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server API version every path is namespaced under.
pub const API_VERSION: &str = "v1";

/// Header carrying the client token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Library product string sent as (the start of) `User-Agent`.
pub const LIBRARY_USER_AGENT: &str = concat!("vault-go/", env!("CARGO_PKG_VERSION"));

/// Client for the Vault v1 API.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: HeaderValue,
    user_agent: HeaderValue,
    timeout: Duration,
}

impl Client {
    /// Creates a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] for an unparseable address or a token
    /// that cannot be sent as a header, and [`VaultError::Transport`] if the
    /// HTTP stack fails to initialize.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(VaultError::Transport)?;
        Self::with_http_client(config, http)
    }

    /// Creates a client on top of a caller-built `reqwest::Client`.
    ///
    /// `config.timeout` is still applied to each request.
    ///
    /// # Errors
    ///
    /// Same configuration errors as [`Client::new`].
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self> {
        let base_url = config.address.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| VaultError::Config(format!("invalid address {base_url:?}: {e}")))?;

        let mut token = HeaderValue::from_str(config.token.as_str())
            .map_err(|_| VaultError::Config("token contains invalid header characters".into()))?;
        token.set_sensitive(true);

        let user_agent = match config.user_agent.as_deref() {
            Some(ua) if !ua.is_empty() => format!("{LIBRARY_USER_AGENT} {ua}"),
            _ => LIBRARY_USER_AGENT.to_string(),
        };
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| VaultError::Config(format!("invalid user agent {user_agent:?}")))?;

        Ok(Self {
            http,
            base_url,
            token,
            user_agent,
            timeout: config.timeout,
        })
    }

    /// Base address this client talks to, without a trailing slash.
    pub fn address(&self) -> &str {
        &self.base_url
    }

    /// Helpers for the transit secrets engine.
    pub fn transit(&self) -> Transit<'_> {
        Transit::new(self)
    }

    /// Retrieves the instance `{resource}/{id}`.
    pub async fn get_resource<T>(&self, resource: &str, id: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.make_request(Method::GET, &join(resource, id), None::<&()>)
            .await
    }

    /// POSTs `data` to the collection `resource`.
    pub async fn create_resource<B, T>(&self, resource: &str, data: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.make_request(Method::POST, resource, Some(data)).await
    }

    /// POSTs `data` to the instance `{resource}/{id}`.
    pub async fn update_resource<B, T>(&self, resource: &str, id: &str, data: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.make_request(Method::POST, &join(resource, id), Some(data))
            .await
    }

    /// GETs the collection `resource`, with `query` as URL parameters.
    pub async fn list_resource<Q, T>(&self, resource: &str, query: Option<&Q>) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.make_request(Method::GET, resource, query).await
    }

    /// DELETEs `{resource}/{id}`. A 404 from the server counts as success.
    pub async fn delete_resource(&self, resource: &str, id: &str) -> Result<()> {
        let path = join(resource, id);
        match self
            .make_request::<(), IgnoredAny>(Method::DELETE, &path, None)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(path = %path, "delete target already absent");
                Ok(())
            },
            Err(err) => Err(err),
        }
    }

    /// Sends one request and decodes the response body into `T`.
    ///
    /// For GET, `payload` is URL-encoded into the query string. For POST and
    /// PUT it becomes the JSON body. Other methods send no payload. An empty
    /// success body decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Encoding, transport, non-2xx and decoding failures, each as its own
    /// [`VaultError`] variant.
    pub async fn make_request<B, T>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.build_request(method, path, payload)?;
        let method = request.method().clone();
        let url_path = request.url().path().to_string();

        let response = self
            .http
            .execute(request)
            .await
            .map_err(VaultError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(VaultError::Transport)?;

        debug!(%method, path = %url_path, status = status.as_u16(), "vault request");

        if !status.is_success() {
            return Err(VaultError::from_response(status, body));
        }
        decode_body(&body)
    }

    pub(crate) fn build_request<B>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&B>,
    ) -> Result<Request>
    where
        B: Serialize + ?Sized,
    {
        let query = match payload {
            Some(params) if method == Method::GET => Some(serde_urlencoded::to_string(params)?),
            _ => None,
        };
        let url = self.url(path, query.as_deref());

        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(TOKEN_HEADER, self.token.clone())
            .header(USER_AGENT, self.user_agent.clone())
            .timeout(self.timeout);

        if method == Method::POST || method == Method::PUT {
            if let Some(payload) = payload {
                let body = serde_json::to_vec(payload).map_err(VaultError::Encode)?;
                builder = builder.header(CONTENT_TYPE, "application/json").body(body);
            }
        }

        builder.build().map_err(VaultError::Transport)
    }

    fn url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = format!("{}/{}{}", self.base_url, API_VERSION, path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn join(resource: &str, id: &str) -> String {
    format!("{resource}/{id}")
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(VaultError::Decode)
}
