/**
 * Hosted Store HTTP Client
 *
 * Implements the remote store port against the PostgREST-style data API of
 * the hosted backend (`/rest/v1/<table>`) and its auth endpoint
 * (`/auth/v1/user`). Filters travel as query parameters
 * (`student_id=eq.s1`, `student_id=in.("s1","s2")`); upserts are a POST with
 * `on_conflict` and the `merge-duplicates` resolution preference.
 */

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Direction, Filter, Identity, Query, RemoteError, RemoteStore, Table};
use crate::client::config::Config;
use crate::shared::ConfigError;

/// HTTP adapter for the hosted store
#[derive(Debug)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    /// Replaced on sign-in/sign-out without rebuilding the client
    access_token: RwLock<Option<String>>,
}

impl RestStore {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config
            .app()
            .api_key
            .clone()
            .ok_or(ConfigError::MissingValue("api_key"))?;
        let client = Client::builder()
            .timeout(config.app().request_timeout)
            .build()
            .map_err(|e| ConfigError::invalid("request_timeout", e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.server_url().to_string(),
            api_key,
            access_token: RwLock::new(config.get_token().cloned()),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.read().await;
        let bearer = token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::transport(format!("request timed out: {}", e))
            } else {
                RemoteError::transport(e.to_string())
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::rejected(status.as_u16(), error_message(status, &body)))
    }
}

/// Pull the `message` field out of an error body, falling back to the raw text.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("msg"))
                .or_else(|| json.get("error_description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    let text = literal(value).replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", text)
}

/// Render filters as PostgREST query parameters
fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", literal(value))),
            Filter::In(column, values) => {
                let list = values.iter().map(quoted).collect::<Vec<_>>().join(",");
                (column.clone(), format!("in.({})", list))
            }
        })
        .collect()
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some((column, direction)) = &query.order {
        let suffix = match direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        params.push(("order".to_string(), format!("{}.{}", column, suffix)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn get_session(&self) -> Result<Option<Identity>, RemoteError> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Ok(None);
        };
        let request = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", token));

        match self.send(request).await {
            Ok(response) => {
                let identity: Identity = response
                    .json()
                    .await
                    .map_err(|e| RemoteError::decode(e.to_string()))?;
                Ok(Some(identity))
            }
            Err(RemoteError::Rejected { status: 401 | 403, .. }) => {
                tracing::debug!("[REST] session token rejected, treating as signed out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError> {
        tracing::debug!("[REST] select {} ({} filters)", table.name(), query.filters.len());
        let request = self
            .authorize(self.client.get(self.table_url(table)))
            .await
            .query(&query_params(query));
        let response = self.send(request).await?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()))
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), RemoteError> {
        tracing::debug!("[REST] insert {} rows into {}", rows.len(), table.name());
        let request = self
            .authorize(self.client.post(self.table_url(table)))
            .await
            .header("Prefer", "return=minimal")
            .json(&rows);
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), RemoteError> {
        if filters.is_empty() {
            return Err(RemoteError::rejected(400, "refusing to update without filters"));
        }
        tracing::debug!("[REST] update {} ({} filters)", table.name(), filters.len());
        let request = self
            .authorize(self.client.patch(self.table_url(table)))
            .await
            .header("Prefer", "return=minimal")
            .query(&filter_params(filters))
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), RemoteError> {
        if filters.is_empty() {
            return Err(RemoteError::rejected(400, "refusing to delete without filters"));
        }
        tracing::debug!("[REST] delete from {} ({} filters)", table.name(), filters.len());
        let request = self
            .authorize(self.client.delete(self.table_url(table)))
            .await
            .header("Prefer", "return=minimal")
            .query(&filter_params(filters));
        self.send(request).await?;
        Ok(())
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &[&str]) -> Result<(), RemoteError> {
        tracing::debug!("[REST] upsert {} rows into {}", rows.len(), table.name());
        let request = self
            .authorize(self.client.post(self.table_url(table)))
            .await
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", on_conflict.join(","))])
            .json(&rows);
        self.send(request).await?;
        Ok(())
    }

    async fn set_access_token(&self, token: Option<String>) {
        tracing::debug!("[REST] access token {}", if token.is_some() { "replaced" } else { "cleared" });
        *self.access_token.write().await = token;
    }
}
