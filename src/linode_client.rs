//! Linode REST client.
//!
//! Unique responsibility: hold the HTTP client and its configuration, build
//! outbound requests, and resolve resource endpoints.
//!
//! API base:
//! - <https://api.linode.com/v4>
//! - Header: Authorization: Bearer <token>
//!
//! All configuration can be loaded from environment variables.

use std::{
    collections::{BTreeMap, HashMap},
    env, fmt,
    time::Duration,
};

use chrono::NaiveDateTime;
use reqwest::{Method, Url};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::linode_error::{Error, Result};

/// Default REST API URL.
pub const DEFAULT_API_URL: &str = "https://api.linode.com";

/// Default REST API version segment.
pub const DEFAULT_API_VERSION: &str = "v4";

/// Timestamp layout used by the API (`2018-01-01T00:01:01`).
const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Configuration for the Linode client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Personal access token sent as a bearer token.
    /// Env: `LINODE_TOKEN` (required by `from_env`)
    pub token: Option<String>,

    /// REST API URL.
    /// Env: `LINODE_URL` (default: "<https://api.linode.com>")
    pub base_url: String,

    /// REST API version path segment.
    /// Env: `LINODE_API_VERSION` (default: "v4")
    pub api_version: String,

    /// HTTP request timeout in milliseconds.
    /// Env: `LINODE_HTTP_TIMEOUT_MS` (default: 30000)
    pub timeout_ms: u64,

    /// User agent for HTTP requests.
    /// Env: `LINODE_USER_AGENT` (default: "linode-api-rust/<version>")
    pub user_agent: String,
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with every other field defaulted.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            token: None,
            base_url: base_url.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_ms: 30_000,
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// In local dev, this will also attempt to load `.env` from the current directory.
    /// If `.env` is missing, it does not fail.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            token: Some(must_env("LINODE_TOKEN")?),
            base_url: env::var("LINODE_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_version: env::var("LINODE_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout_ms: parse_u64_env("LINODE_HTTP_TIMEOUT_MS", 30_000)?,
            user_agent: env::var("LINODE_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        })
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the API version path segment.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Root every endpoint path is joined onto.
    fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Linode REST API client.
#[derive(Debug)]
pub struct Client {
    cfg: ClientConfig,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .user_agent(cfg.user_agent.clone())
            .build()?;

        Ok(Self { cfg, http })
    }

    /// Get a reference to the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    /// Start a new outbound request.
    #[must_use]
    pub fn request(&self) -> ApiRequest<'_> {
        ApiRequest {
            client: self,
            query: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    /// Absolute URL for an endpoint path, with query pairs in key order.
    fn url(&self, endpoint: &str, query: &HashMap<String, String>) -> Result<Url> {
        let raw = format!("{}/{}", self.cfg.api_root(), endpoint.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| Error::InvalidEndpoint {
            template: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !query.is_empty() {
            let sorted: BTreeMap<&String, &String> = query.iter().collect();
            let mut pairs = url.query_pairs_mut();
            for (key, value) in sorted {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

/// Outbound request under construction.
///
/// Collects query parameters and headers, then performs exactly one HTTP
/// exchange when one of the verb methods is awaited.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    client: &'a Client,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl ApiRequest<'_> {
    /// Set a single query parameter, replacing any previous value.
    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Merge a set of query parameters.
    pub fn set_query_params(&mut self, params: HashMap<String, String>) -> &mut Self {
        self.query.extend(params);
        self
    }

    /// Set a request header, replacing any previous value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Query parameters collected so far.
    #[must_use]
    pub const fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Value of a header set on this request.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// GET an endpoint and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body is not valid JSON for `T`.
    pub async fn get<T: DeserializeOwned>(self, endpoint: &str) -> Result<T> {
        let body = self.send::<()>(Method::GET, endpoint, None).await?;
        decode(body)
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body is not valid JSON for `T`.
    pub async fn post<B, T>(self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::POST, endpoint, Some(body)).await?;
        decode(body)
    }

    /// PUT a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with a
    /// non-success status, or the body is not valid JSON for `T`.
    pub async fn put<B, T>(self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::PUT, endpoint, Some(body)).await?;
        decode(body)
    }

    /// POST an optional JSON body and ignore the response payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn post_action<B>(self, endpoint: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::POST, endpoint, body).await.map(drop)
    }

    /// DELETE an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API answers with a
    /// non-success status.
    pub async fn delete(self, endpoint: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, endpoint, None).await.map(drop)
    }

    /// Perform the exchange and return the raw success body.
    async fn send<B>(self, method: Method, endpoint: &str, body: Option<&B>) -> Result<String>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.client.url(endpoint, &self.query)?;
        debug!(method = %method, url = %url, "sending linode api request");

        let mut req = self.client.http.request(method, url);
        if let Some(token) = &self.client.cfg.token {
            req = req.bearer_auth(token);
        }
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(status = %status, endpoint, "linode api returned an error");
            return Err(Error::Api { status, body: text });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(body: String) -> Result<T> {
    serde_json::from_str(&body).map_err(|source| Error::Json { source, body })
}

/// Id substituted into an endpoint template.
pub type EndpointId<'a> = &'a (dyn fmt::Display + Sync);

/// A REST resource addressed by an endpoint template.
///
/// Each `{}` in the template is replaced by the next id, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    template: &'static str,
}

impl Resource {
    /// Declare a resource from its endpoint template.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// The raw endpoint template.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        self.template
    }

    /// Render the endpoint path for the given ids.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEndpoint` if the number of ids does not match
    /// the number of placeholders.
    pub fn endpoint(&self, ids: &[EndpointId<'_>]) -> Result<String> {
        let placeholders = self.template.matches("{}").count();
        if placeholders != ids.len() {
            return Err(Error::InvalidEndpoint {
                template: self.template.to_string(),
                reason: format!("expected {placeholders} id(s), got {}", ids.len()),
            });
        }

        let mut parts = self.template.split("{}");
        let mut out = parts.next().unwrap_or_default().to_string();
        for (part, id) in parts.zip(ids) {
            out.push_str(&id.to_string());
            out.push_str(part);
        }
        Ok(out)
    }
}

/// Parse an optional API timestamp; unparseable values become `None`.
pub(crate) fn deserialize_api_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDateTime::parse_from_str(&s, API_DATE_FORMAT).ok()))
}

// ============================================================================
// Helper functions
// ============================================================================

fn default_user_agent() -> String {
    format!("linode-api-rust/{}", env!("CARGO_PKG_VERSION"))
}

#[inline]
fn must_env(key: &'static str) -> Result<String> {
    env::var(key).map_err(|_| Error::MissingEnv(key))
}

#[inline]
fn parse_u64_env(key: &'static str, default: u64) -> Result<u64> {
    env::var(key).map_or_else(
        |_| Ok(default),
        |v| {
            v.parse::<u64>().map_err(|_| Error::InvalidEnv {
                key,
                value: v,
                reason: "expected an unsigned integer",
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_substitutes_ids_in_order() {
        let res = Resource::new("linode/instances/{}/disks/{}");
        let linode_id = 123_u64;
        let ids: [EndpointId<'_>; 2] = [&linode_id, &"abc"];
        assert_eq!(res.endpoint(&ids).unwrap(), "linode/instances/123/disks/abc");
    }

    #[test]
    fn resource_without_placeholders() {
        let res = Resource::new("linode/instances");
        assert_eq!(res.endpoint(&[]).unwrap(), "linode/instances");
    }

    #[test]
    fn resource_rejects_id_count_mismatch() {
        let res = Resource::new("linode/instances/{}/volumes");
        let err = res.endpoint(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { ref reason, .. } if reason == "expected 1 id(s), got 0"));
    }

    #[test]
    fn url_joins_version_and_sorts_query() {
        let client = Client::new(ClientConfig::new("http://localhost:1234/")).unwrap();
        let mut query = HashMap::new();
        query.insert("page_size".to_string(), "25".to_string());
        query.insert("page".to_string(), "2".to_string());

        let url = client.url("/linode/instances", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/v4/linode/instances?page=2&page_size=25"
        );
    }

    #[test]
    fn url_without_query_has_no_question_mark() {
        let client = Client::new(ClientConfig::new("http://localhost:1234")).unwrap();
        let url = client.url("volumes", &HashMap::new()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1234/v4/volumes");
    }

    #[test]
    fn config_builder_overrides() {
        let cfg = ClientConfig::new("http://example.test")
            .with_token("secret")
            .with_api_version("v4beta")
            .with_timeout_ms(5_000);
        assert_eq!(cfg.token.as_deref(), Some("secret"));
        assert_eq!(cfg.api_root(), "http://example.test/v4beta");
        assert_eq!(cfg.timeout_ms, 5_000);
    }

    #[test]
    fn request_collects_params_and_headers() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let mut req = client.request();
        req.set_query_param("page", "3").set_header("X-Filter", "{}");
        assert_eq!(req.query_params().get("page").map(String::as_str), Some("3"));
        assert_eq!(req.header("X-Filter"), Some("{}"));
        assert_eq!(req.header("X-Other"), None);
    }

    #[test]
    fn api_date_parses_and_tolerates_garbage() {
        #[derive(Deserialize)]
        struct Stamp {
            #[serde(default, deserialize_with = "deserialize_api_date")]
            at: Option<NaiveDateTime>,
        }

        let ok: Stamp = serde_json::from_str(r#"{"at":"2018-01-01T00:01:01"}"#).unwrap();
        assert_eq!(ok.at.unwrap().to_string(), "2018-01-01 00:01:01");

        let bad: Stamp = serde_json::from_str(r#"{"at":"yesterday"}"#).unwrap();
        assert!(bad.at.is_none());

        let missing: Stamp = serde_json::from_str("{}").unwrap();
        assert!(missing.at.is_none());
    }
}
