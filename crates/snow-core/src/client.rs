//! Thin async client for the ServiceNow table API.
//!
//! Wraps `reqwest::Client` with basic-auth credentials and exposes the two
//! lookups the bot needs: by `sys_id` and by effective number. Every call is
//! a fresh round trip; there is no retry and no cache.

use std::fmt;
use std::time::Instant;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::ticket::{CanonicalTicket, RawTicket, json_kind};
use crate::{RecordKind, SnowError, link, normalize};

/// Connection settings for one ServiceNow instance.
///
/// # Examples
///
/// ```
/// use snow_core::SnowConfig;
///
/// let config = SnowConfig {
///     host: "acme.service-now.com".into(),
///     username: "svc-bot".into(),
///     password: "hunter2".into(),
/// };
/// assert!(!format!("{config:?}").contains("hunter2"));
/// ```
#[derive(Clone, Deserialize)]
pub struct SnowConfig {
    /// Instance host name without scheme, e.g. `acme.service-now.com`.
    pub host: String,
    /// Basic-auth user.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
}

impl fmt::Debug for SnowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// ServiceNow table API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SnowClient {
    http: reqwest::Client,
    config: SnowConfig,
    api_base: String,
}

impl SnowClient {
    /// Creates a client for `https://<host>`.
    pub fn new(config: SnowConfig) -> Self {
        let api_base = format!("https://{}", config.host);
        Self {
            http: reqwest::Client::new(),
            config,
            api_base,
        }
    }

    /// Sends API requests to `api_base` instead of `https://<host>`.
    ///
    /// UI links are still built from the configured host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the configured instance host.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Builds the classic-UI link for a record on this instance.
    pub fn build_ui_url(&self, table: &str, record_id: &str) -> String {
        link::build_ui_url(&self.config.host, table, record_id)
    }

    /// Fetches one record by `sys_id`.
    ///
    /// # Errors
    ///
    /// Returns `SnowError::Http` on a non-2xx status, `SnowError::Parse` if
    /// the body is not JSON or `result` is not an object, and
    /// `SnowError::Transport` if no response arrives.
    #[instrument(skip(self), fields(table = kind.table()))]
    pub async fn fetch_by_id(
        &self,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<RawTicket, SnowError> {
        let endpoint = format!(
            "{}/api/now/table/{}/{}",
            self.api_base,
            kind.table(),
            urlencoding::encode(record_id)
        );
        let result = self.get_result(&endpoint, None).await?;
        RawTicket::try_from(result)
    }

    /// Fetches the first record whose `task_effective_number` matches.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_by_id`](Self::fetch_by_id), plus
    /// `SnowError::NotFound` when the query matches nothing.
    #[instrument(skip(self), fields(table = kind.table()))]
    pub async fn fetch_by_number(
        &self,
        kind: RecordKind,
        number: &str,
    ) -> Result<RawTicket, SnowError> {
        let endpoint = format!("{}/api/now/table/{}", self.api_base, kind.table());
        let query = format!("task_effective_number={number}");
        let result = self
            .get_result(&endpoint, Some(("sysparm_query", &query)))
            .await?;

        let Value::Array(records) = result else {
            return Err(SnowError::Parse(format!(
                "expected a result array from {endpoint}, got {}",
                json_kind(&result)
            )));
        };
        let Some(first) = records.into_iter().next() else {
            return Err(SnowError::NotFound {
                table: kind.table().to_string(),
                number: number.to_string(),
            });
        };
        RawTicket::try_from(first)
    }

    /// Normalises a fetched record, pulling in whatever it links to.
    ///
    /// Tasks get their parent request item fetched so the card can show who
    /// raised the request.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors for the linked record and
    /// `SnowError::Validation` from normalisation.
    pub async fn resolve(
        &self,
        kind: RecordKind,
        raw: &RawTicket,
    ) -> Result<CanonicalTicket, SnowError> {
        let request_item = match (kind, raw.reference_id("request_item")) {
            (RecordKind::Task, Some(item_id)) => {
                Some(self.fetch_by_id(RecordKind::RequestItem, item_id).await?)
            }
            _ => None,
        };
        normalize(kind, &self.config.host, raw, request_item.as_ref())
    }

    /// Fetches and resolves a record by `sys_id`.
    ///
    /// # Errors
    ///
    /// See [`fetch_by_id`](Self::fetch_by_id) and [`resolve`](Self::resolve).
    pub async fn ticket_by_id(
        &self,
        kind: RecordKind,
        record_id: &str,
    ) -> Result<CanonicalTicket, SnowError> {
        let raw = self.fetch_by_id(kind, record_id).await?;
        self.resolve(kind, &raw).await
    }

    /// Fetches and resolves a record by effective number.
    ///
    /// # Errors
    ///
    /// See [`fetch_by_number`](Self::fetch_by_number) and
    /// [`resolve`](Self::resolve).
    pub async fn ticket_by_number(
        &self,
        kind: RecordKind,
        number: &str,
    ) -> Result<CanonicalTicket, SnowError> {
        let raw = self.fetch_by_number(kind, number).await?;
        self.resolve(kind, &raw).await
    }

    /// Issues an authenticated GET and unwraps the `result` envelope.
    async fn get_result(
        &self,
        endpoint: &str,
        query: Option<(&str, &str)>,
    ) -> Result<Value, SnowError> {
        let started = Instant::now();
        let mut request = self
            .http
            .get(endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "ServiceNow request failed");
            return Err(SnowError::Http {
                status: status.as_u16(),
                url: endpoint.to_string(),
            });
        }

        let body = resp.text().await?;
        let mut envelope: Value = serde_json::from_str(&body).map_err(|e| {
            SnowError::Parse(format!("response from {endpoint} is not JSON: {e}"))
        })?;
        let result = envelope
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| {
                SnowError::Parse(format!("response from {endpoint} has no 'result' field"))
            })?;

        info!(
            endpoint,
            query = query.map(|(_, v)| v),
            query_time_ms = started.elapsed().as_millis() as u64,
            "ServiceNow query complete"
        );
        Ok(result)
    }
}
