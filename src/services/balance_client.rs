use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::{BalanceRequest, BalanceResponse};
use crate::telemetry::CallContext;

#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("balance request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("balance request timed out after {0:?}")]
    Timeout(Duration),

    #[error("balance service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed balance response: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// HTTP client for the balance service's `POST /balance-check`.
#[derive(Clone)]
pub struct BalanceClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BalanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteCallError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteCallError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Opens a client span under `ctx` and sends it as `traceparent`/`baggage`
    /// headers alongside the request.
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn check_balance(&self, ctx: &CallContext, user_id: i64) -> Result<i64, RemoteCallError> {
        let url = format!("{}/balance-check", self.base_url);
        let call = ctx.child("POST /balance-check");

        let response = self
            .http
            .post(&url)
            .headers(call.to_headers())
            .json(&BalanceRequest { user_id })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(RemoteCallError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: BalanceResponse = serde_json::from_slice(&body).map_err(RemoteCallError::Malformed)?;
        debug!(balance = parsed.balance, "Balance received");
        Ok(parsed.balance)
    }

    fn classify(&self, error: reqwest::Error) -> RemoteCallError {
        if error.is_timeout() {
            RemoteCallError::Timeout(self.timeout)
        } else {
            RemoteCallError::Transport(error)
        }
    }
}
