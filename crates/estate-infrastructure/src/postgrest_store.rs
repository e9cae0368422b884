//! Table store over the hosted PostgREST endpoint (`/rest/v1`).

use async_trait::async_trait;
use estate_core::error::{EstateError, Result};
use estate_core::store::{Condition, Filter, Query, StoreBackend, Table};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::BackendConfig;

/// Bearer token of the signed-in user, shared between the auth client
/// (which writes it) and the store (which sends it for row-level security).
#[derive(Clone, Default)]
pub struct AccessToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl AccessToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, token: Option<String>) {
        *self.inner.write().await = token;
    }
}

/// Store backend that talks to PostgREST over HTTP.
#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    token: AccessToken,
    timeout: Duration,
}

impl PostgrestStore {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        token: AccessToken,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            token,
            timeout,
        }
    }

    /// Builds a store from configuration; fails when URL or key is missing.
    pub fn from_config(config: &BackendConfig, token: AccessToken) -> Result<Self> {
        let (url, key) = config.credentials().ok_or_else(|| {
            EstateError::config("Backend is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY.")
        })?;
        Ok(Self::new(url, key, token, config.timeout()))
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Adds API key, bearer token and timeout to a request.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .token
            .get()
            .await
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .timeout(self.timeout)
    }

    async fn send_for_rows(&self, request: RequestBuilder, table: Table) -> Result<Vec<Value>> {
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, table).await?;
        let body: Value = response.json().await.map_err(transport_error)?;
        match body {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }
}

/// Query-string parameters for a select.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filter));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Query-string parameters for a row filter (`col=eq.v`, `col=in.(a,b)`).
pub fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions
        .iter()
        .map(|condition| match condition {
            Condition::Eq { column, value } => (column.clone(), format!("eq.{}", literal(value))),
            Condition::In { column, values } => {
                let list = values
                    .iter()
                    .map(|v| quoted_list_item(&literal(v)))
                    .collect::<Vec<_>>()
                    .join(",");
                (column.clone(), format!("in.({})", list))
            }
        })
        .collect()
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// List items containing reserved characters must be double-quoted.
fn quoted_list_item(item: &str) -> String {
    if item.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        item.to_string()
    }
}

fn transport_error(err: reqwest::Error) -> EstateError {
    if err.is_decode() {
        EstateError::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    } else {
        EstateError::network(err.to_string())
    }
}

async fn check_status(response: Response, table: Table) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or_else(|| format!("{} request failed", table));
    tracing::debug!(
        "[PostgrestStore] {} responded {}: {}",
        table,
        status.as_u16(),
        message
    );
    Err(EstateError::backend(Some(status.as_u16()), message))
}

/// Extracts the human-readable message from a PostgREST/GoTrue error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl StoreBackend for PostgrestStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&query_params(query));
        self.send_for_rows(request, table).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let mut rows = self.send_for_rows(request, table).await?;
        if rows.is_empty() {
            return Err(EstateError::backend(None, format!("{} insert returned no row", table)));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<usize> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&filter_params(filter))
            .header("Prefer", "return=representation")
            .json(&patch);
        Ok(self.send_for_rows(request, table).await?.len())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&filter_params(filter))
            .header("Prefer", "return=representation");
        Ok(self.send_for_rows(request, table).await?.len())
    }
}
