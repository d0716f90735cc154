use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode store response: {0}")]
    Decode(String),
}

/// Percent-encode a filter value for use inside a PostgREST query string.
/// Usernames are phone numbers, so a literal `+` must not decode to a space.
pub fn encode_param(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

/// The one timestamp form the store sees, in filters and payloads alike:
/// RFC 3339 at seconds precision with a `Z` suffix instead of a numeric
/// offset, so no `+` ever lands in a query string.
pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Thin client for the PostgREST interface the relational store exposes.
/// Filters use the `col=op.value` dialect; writes that need the created row
/// back send `Prefer: return=representation`.
pub struct StoreClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making store request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => StoreError::Unauthorized(error_text),
                404 => StoreError::NotFound(error_text),
                409 => StoreError::Conflict(error_text),
                code => StoreError::Api {
                    status: code,
                    message: error_text,
                },
            });
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(data)
    }

    /// Insert a row and return the created representation.
    pub async fn insert_returning<T>(
        &self,
        table: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/{}", table);
        let rows: Vec<T> = self
            .request_with_headers(Method::POST, &path, auth_token, Some(body), Some(headers))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no rows", table)))
    }

    /// Update the rows matched by the already-filtered `path` and return them.
    /// An empty vector means no row matched the filter.
    pub async fn update_returning<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(Method::PATCH, path, auth_token, Some(body), Some(headers))
            .await
    }

    /// Delete the rows matched by the already-filtered `path`. PostgREST
    /// answers 204 with no body, so nothing is decoded.
    pub async fn delete(&self, path: &str, auth_token: Option<&str>) -> Result<(), StoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Deleting via {}", url);

        let response = self
            .client
            .delete(&url)
            .headers(self.get_headers(auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store delete error ({}): {}", status, error_text);
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(())
    }

    /// Exact row count for a table, read from the Content-Range header.
    pub async fn count(&self, table: &str, auth_token: Option<&str>) -> Result<i64, StoreError> {
        let url = format!("{}/rest/v1/{}?select=id", self.base_url, table);
        debug!("Counting rows via {}", url);

        let mut headers = self.get_headers(auth_token);
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));
        headers.insert("Range", HeaderValue::from_static("0-0"));
        headers.insert("Range-Unit", HeaderValue::from_static("items"));

        let response = self.client.get(&url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store count error ({}): {}", status, error_text);
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Decode("missing Content-Range header".to_string()))?;

        // "0-0/42" for populated tables, "*/0" for empty ones
        content_range
            .rsplit('/')
            .next()
            .and_then(|total| total.parse::<i64>().ok())
            .ok_or_else(|| {
                StoreError::Decode(format!("unparseable Content-Range: {}", content_range))
            })
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
