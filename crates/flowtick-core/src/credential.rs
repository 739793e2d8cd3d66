//! Bearer credential lifecycle: login, hold, replace.

use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::UpstreamConfig;
use crate::error::AuthError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};

/// Bearer token from a successful login. Valid until the upstream rejects it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    token_type: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Authorization for the flow endpoint, under the scheme the login
    /// response announced.
    pub fn auth(&self) -> HttpAuth {
        if self.token_type.eq_ignore_ascii_case("bearer") {
            HttpAuth::BearerToken(self.access_token.clone())
        } else {
            HttpAuth::Token {
                scheme: self.token_type.clone(),
                token: self.access_token.clone(),
            }
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    device: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<LoginData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

/// Owns the process credential and refreshes it through the login endpoint.
///
/// Readers get a snapshot; a successful login swaps the whole credential.
pub struct CredentialManager {
    http_client: Arc<dyn HttpClient>,
    config: UpstreamConfig,
    credential: RwLock<Option<Credential>>,
}

impl CredentialManager {
    pub fn new(http_client: Arc<dyn HttpClient>, config: UpstreamConfig) -> Self {
        Self {
            http_client,
            config,
            credential: RwLock::new(None),
        }
    }

    /// Log in and replace the held credential. No internal retry.
    pub async fn login(&self) -> Result<Credential, AuthError> {
        let payload = LoginRequest {
            username: &self.config.username,
            password: &self.config.password,
            device: &self.config.device,
        };
        let request = HttpRequest::post(self.config.login_url())
            .with_header("accept", "application/json")
            .with_json(&payload)
            .map_err(|error| AuthError::Malformed(error.to_string()))?
            .with_timeout_ms(self.config.request_timeout_ms);

        let response = self.http_client.execute(request).await?;

        if response.status != 200 {
            warn!(status = response.status, "login rejected by upstream");
            return Err(AuthError::Rejected {
                status: response.status,
                message: truncate(&response.body),
            });
        }

        let parsed: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|error| AuthError::Malformed(error.to_string()))?;

        if !parsed.success {
            let message = parsed
                .error
                .unwrap_or_else(|| String::from("login unsuccessful"));
            warn!(status = response.status, %message, "login rejected by upstream");
            return Err(AuthError::Rejected {
                status: response.status,
                message,
            });
        }

        let data = parsed
            .data
            .filter(|data| !data.access_token.is_empty())
            .ok_or_else(|| AuthError::Malformed(String::from("missing access token")))?;

        let credential = Credential::new(
            data.access_token,
            data.token_type
                .filter(|token_type| !token_type.trim().is_empty())
                .unwrap_or_else(|| String::from("Bearer")),
        );
        *self
            .credential
            .write()
            .expect("credential lock poisoned") = Some(credential.clone());

        info!(username = %self.config.username, "login succeeded");
        Ok(credential)
    }

    /// Snapshot of the last successful login.
    pub fn current(&self) -> Result<Credential, AuthError> {
        self.credential
            .read()
            .expect("credential lock poisoned")
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
