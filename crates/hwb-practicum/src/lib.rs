//! Review API adapter.
//!
//! One `GET` per call against the homework statuses endpoint, authorized with
//! the `OAuth <token>` scheme and filtered by `from_date`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, StatusCode};
use serde_json::Value;

use hwb_core::{config::Config, domain::Cursor, errors::Error, ports::HomeworkSource, Result};

/// Keys the API uses to signal its own errors inside a 200 body.
const ERROR_KEYS: [&str; 2] = ["error", "code"];

#[derive(Clone)]
pub struct PracticumClient {
    endpoint: String,
    token: String,
    http: reqwest::Client,
}

impl PracticumClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            token: token.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.endpoint.clone(), cfg.practicum_token.clone(), cfg.http_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport(&self, from_date: Cursor, e: reqwest::Error) -> Error {
        Error::Transport {
            endpoint: self.endpoint.clone(),
            from_date: from_date.0,
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl HomeworkSource for PracticumClient {
    async fn fetch(&self, from_date: Cursor) -> Result<Value> {
        tracing::debug!(
            endpoint = %self.endpoint,
            from_date = from_date.0,
            "requesting homework statuses"
        );

        let resp = self
            .http
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date.0)])
            .send()
            .await
            .map_err(|e| self.transport(from_date, e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: self.endpoint.clone(),
                from_date: from_date.0,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| self.transport(from_date, e))?;
        let v: Value = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidBody(format!(
                "{e}: {}",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        if let Some(obj) = v.as_object() {
            if ERROR_KEYS.iter().any(|k| obj.contains_key(*k)) {
                return Err(Error::UpstreamApi(
                    v.to_string().chars().take(500).collect(),
                ));
            }
        }

        Ok(v)
    }
}
