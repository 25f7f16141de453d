//! Authenticated HTTP client for the balena cloud API.
//!
//! `BalenaCloud` owns the request executor every resource operation goes
//! through. One call to [`BalenaCloud::request`] is one HTTP round trip:
//!
//! - The URL is the API base joined with the caller's relative path. The
//!   path is appended verbatim so OData key expressions such as
//!   `device(uuid='abc')` reach the server exactly as composed.
//! - Every request carries `Accept: application/json`, a bearer token and
//!   a `User-Agent` naming this crate and its version.
//! - The full round trip (send and body read) runs under the configured
//!   request timeout. Expiry abandons the request.
//! - 401 maps to [`BalenaCloudError::Authentication`], every other non-2xx
//!   status and every transport failure to [`BalenaCloudError::Connection`].
//! - GET and POST responses must be JSON; PATCH and DELETE responses are
//!   not inspected.
//!
//! Session ownership:
//! - A `reqwest::Client` passed to [`BalenaCloudBuilder::session`] is
//!   shared with the caller and never released by `BalenaCloud`.
//! - Without one, a client is created lazily on the first request and
//!   owned by `BalenaCloud`. Creation goes through a `OnceCell`, so two
//!   concurrent first requests still produce a single session. The owned
//!   session is released by [`BalenaCloud::close`] or on drop.

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{BalenaCloudError, Result};
use crate::odata::Collection;

const BASE_URL: &str = "https://api.balena-cloud.com/v7/";

/// Request timeout applied when the builder is not given one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Value of the `User-Agent` header sent with every request.
pub const CLIENT_IDENTIFIER: &str = concat!("balena-cloud-rs/", env!("CARGO_PKG_VERSION"));

/// The HTTP session behind a `BalenaCloud`, tagged with who owns it.
enum Session {
    /// Created on first use by this client. Released on close or drop.
    Owned(OnceCell<Client>),
    /// Supplied by the caller. Never released here.
    Shared(Client),
}

/// Authenticated client for the balena cloud REST API.
///
/// `BalenaCloud` is `Send + Sync`. Calls may be issued concurrently from
/// any number of tasks; nothing is serialized between them.
pub struct BalenaCloud {
    token: String,
    base_url: String,
    request_timeout: Duration,
    session: Session,
}

/// Builder for [`BalenaCloud`].
///
/// ```ignore
/// let client = BalenaCloud::builder("token")
///     .request_timeout(Duration::from_secs(30))
///     .build();
/// ```
pub struct BalenaCloudBuilder {
    token: String,
    base_url: String,
    request_timeout: Duration,
    session: Option<Client>,
}

impl BalenaCloudBuilder {
    /// Overrides the per-request timeout (default 10 seconds).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Uses a caller-owned `reqwest::Client` instead of creating one.
    pub fn session(mut self, session: Client) -> Self {
        self.session = Some(session);
        self
    }

    /// Points the client at a different API root, e.g. a local mock server.
    /// A trailing slash is added when missing so relative paths join cleanly.
    pub fn base_url(mut self, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Finishes construction. No session is created until the first
    /// request unless one was supplied.
    pub fn build(self) -> BalenaCloud {
        let session = match self.session {
            Some(client) => Session::Shared(client),
            None => Session::Owned(OnceCell::new()),
        };
        BalenaCloud {
            token: self.token,
            base_url: self.base_url,
            request_timeout: self.request_timeout,
            session,
        }
    }
}

impl BalenaCloud {
    /// Creates a client with the default timeout and an owned session.
    pub fn new(token: impl Into<String>) -> Self {
        Self::builder(token).build()
    }

    /// Starts a [`BalenaCloudBuilder`] with the public API root and the
    /// default timeout.
    pub fn builder(token: impl Into<String>) -> BalenaCloudBuilder {
        BalenaCloudBuilder {
            token: token.into(),
            base_url: BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session: None,
        }
    }

    /// The timeout applied to each request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Whether the session was created by this client (and is therefore
    /// released by it).
    pub fn owns_session(&self) -> bool {
        matches!(self.session, Session::Owned(_))
    }

    /// Whether a session currently exists. Always `true` for a shared
    /// session; for an owned one, `true` between the first request and
    /// [`close`](Self::close).
    pub fn has_open_session(&self) -> bool {
        match &self.session {
            Session::Owned(cell) => cell.initialized(),
            Session::Shared(_) => true,
        }
    }

    /// Releases the session if this client created it.
    ///
    /// A shared session is left untouched. A later request on the same
    /// client creates a fresh owned session.
    pub fn close(&mut self) {
        if let Session::Owned(cell) = &mut self.session {
            if cell.take().is_some() {
                debug!("closed owned balena cloud session");
            }
        }
    }

    async fn session(&self) -> Result<&Client> {
        match &self.session {
            Session::Shared(client) => Ok(client),
            Session::Owned(cell) => cell.get_or_try_init(|| async { build_session() }).await,
        }
    }

    /// Core HTTP method: sends one authenticated request and normalizes
    /// the outcome.
    ///
    /// `uri` is relative to the API base (no leading slash). `query` pairs
    /// are form-encoded onto the URL. `body` is serialized as JSON.
    ///
    /// Returns `Some(json)` for GET and POST (an empty body decodes to
    /// `Value::Null`) and `None` for PATCH and DELETE.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        uri: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, uri);
        let expects_body = method != Method::DELETE && method != Method::PATCH;

        let mut req = self
            .session()
            .await?
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_IDENTIFIER)
            .bearer_auth(&self.token);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(payload) = body {
            req = req.json(payload);
        }

        debug!(%method, %url, ?query, "sending balena cloud request");

        let round_trip = async {
            let response = req.send().await?;
            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, content_type, text))
        };

        let (status, content_type, text) =
            match tokio::time::timeout(self.request_timeout, round_trip).await {
                Ok(Ok(parts)) => parts,
                Ok(Err(err)) => {
                    warn!(%method, %url, error = %err, "balena cloud request failed");
                    return Err(BalenaCloudError::Connection {
                        message: "Error occurred while connecting to the balena cloud API"
                            .to_string(),
                        status: None,
                        body: String::new(),
                        source: Some(Box::new(err)),
                    });
                }
                Err(elapsed) => {
                    warn!(
                        %method,
                        %url,
                        timeout = ?self.request_timeout,
                        "balena cloud request timed out"
                    );
                    return Err(BalenaCloudError::Connection {
                        message: "Timeout occurred while connecting to the balena cloud API"
                            .to_string(),
                        status: None,
                        body: String::new(),
                        source: Some(Box::new(elapsed)),
                    });
                }
            };

        debug!(%method, %url, %status, "balena cloud response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(BalenaCloudError::Authentication {
                message: format!("The request to the balena cloud API was unauthorized: {text}"),
            });
        }

        if !status.is_success() {
            return Err(BalenaCloudError::Connection {
                message: format!(
                    "Error occurred while connecting to the balena cloud API ({status})"
                ),
                status: Some(status),
                body: text,
                source: None,
            });
        }

        if !expects_body {
            return Ok(None);
        }

        if !content_type.contains("application/json") {
            return Err(BalenaCloudError::Unexpected {
                message: "Unexpected content type response from the balena cloud API"
                    .to_string(),
                content_type,
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Sends a GET request and deserializes the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, uri: &str, query: &[(&str, String)]) -> Result<T> {
        let value = self.request::<()>(Method::GET, uri, query, None).await?;
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }

    /// Sends a POST request with a JSON body and deserializes the response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        uri: &str,
        body: &B,
    ) -> Result<T> {
        let value = self.request(Method::POST, uri, &[], Some(body)).await?;
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }

    /// Sends a PATCH request with a JSON body. The response is discarded.
    pub async fn patch<B: Serialize + ?Sized>(&self, uri: &str, body: &B) -> Result<()> {
        self.request(Method::PATCH, uri, &[], Some(body)).await?;
        Ok(())
    }

    /// Sends a DELETE request. The response is discarded.
    pub async fn delete(&self, uri: &str) -> Result<()> {
        self.request::<()>(Method::DELETE, uri, &[], None).await?;
        Ok(())
    }

    /// Fetches a collection endpoint and returns its rows in server order.
    ///
    /// Either every row decodes or the whole call fails.
    pub(crate) async fn get_collection<T: DeserializeOwned>(
        &self,
        uri: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let collection: Collection<T> = self.get(uri, query).await?;
        Ok(collection.d)
    }

    /// Fetches a single entity through a collection endpoint.
    ///
    /// The API answers an unknown key with `200 {"d": []}` rather than 404,
    /// so an empty result set is the not-found signal. Only the first row
    /// is decoded; any further rows are ignored.
    pub(crate) async fn get_first<T: DeserializeOwned>(
        &self,
        uri: &str,
        query: &[(&str, String)],
        not_found: impl FnOnce() -> String,
    ) -> Result<T> {
        let row = self
            .get_collection::<Value>(uri, query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BalenaCloudError::ResourceNotFound(not_found()))?;
        Ok(serde_json::from_value(row)?)
    }
}

fn build_session() -> Result<Client> {
    debug!("creating owned balena cloud session");
    Client::builder()
        .build()
        .map_err(|err| BalenaCloudError::Connection {
            message: "failed to create HTTP session for the balena cloud API".to_string(),
            status: None,
            body: String::new(),
            source: Some(Box::new(err)),
        })
}
