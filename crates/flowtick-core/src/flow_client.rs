//! Authenticated fetch of the flow feed.
//!
//! A 401 on the first attempt triggers exactly one back-off, re-login, and
//! retry. The retry path calls [`FlowClient::send`] directly and surfaces a
//! second 401 as [`FetchError::Unauthorized`], so retries never chain.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::credential::{Credential, CredentialManager};
use crate::domain::RawTradeRecord;
use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::FlowRequestSpec;

enum Attempt {
    Records(Vec<RawTradeRecord>),
    Unauthorized,
}

pub struct FlowClient {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<CredentialManager>,
    config: UpstreamConfig,
}

impl FlowClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<CredentialManager>,
        config: UpstreamConfig,
    ) -> Self {
        Self {
            http_client,
            credentials,
            config,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Fetch the flow events matching `spec`.
    pub async fn fetch(&self, spec: &FlowRequestSpec) -> Result<Vec<RawTradeRecord>, FetchError> {
        let body = encode_body(spec)?;

        let credential = self.credentials.current()?;
        match self.send(&body, &credential).await? {
            Attempt::Records(records) => return Ok(records),
            Attempt::Unauthorized => {}
        }

        warn!(
            backoff_ms = self.config.auth_backoff_ms,
            "flow request unauthorized; re-authenticating"
        );
        tokio::time::sleep(self.config.auth_backoff()).await;
        let credential = self.credentials.login().await?;

        match self.send(&body, &credential).await? {
            Attempt::Records(records) => Ok(records),
            Attempt::Unauthorized => Err(FetchError::Unauthorized),
        }
    }

    async fn send(&self, body: &str, credential: &Credential) -> Result<Attempt, FetchError> {
        let request = HttpRequest::post(self.config.flow_url())
            .with_header("accept", "application/json")
            .with_header("content-type", "application/json")
            .with_header("origin", self.config.origin.as_str())
            .with_header("referer", self.config.referer.as_str())
            .with_header("user-agent", self.config.user_agent.as_str())
            .with_auth(&credential.auth())
            .with_body(body)
            .with_timeout_ms(self.config.request_timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(FetchError::Transport)?;

        match response.status {
            200 => {
                let records: Vec<RawTradeRecord> = serde_json::from_str(&response.body)?;
                debug!(fetched = records.len(), "flow response decoded");
                Ok(Attempt::Records(records))
            }
            401 => Ok(Attempt::Unauthorized),
            status => Err(FetchError::UpstreamStatus { status }),
        }
    }
}

fn encode_body<T: Serialize + ?Sized>(payload: &T) -> Result<String, FetchError> {
    serde_json::to_string(payload).map_err(FetchError::Encode)
}
