//! Client for the remote token service.
//!
//! The middleware only depends on [`TokenRefresher`]; [`HttpTokenRefresher`]
//! is the production implementation talking JSON over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::cookie::is_cookie_value;
use crate::api::{ApiError, Code, ErrorResponse};

/// Token pair returned by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Errors from a refresh call.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The token service answered with an error status.
    #[error("token service rejected refresh: {0}")]
    Rejected(ApiError),
    /// The token service could not be reached.
    #[error("token service unreachable: {0}")]
    Transport(String),
    /// The client's own deadline elapsed.
    #[error("token service did not answer in time")]
    Timeout,
    /// The token service answered successfully but the body was unusable.
    #[error("invalid token service response: {0}")]
    InvalidResponse(String),
}

impl From<RefreshError> for ApiError {
    fn from(e: RefreshError) -> Self {
        match e {
            // Callers depend on the remote status, so it passes through untouched.
            RefreshError::Rejected(remote) => remote,
            RefreshError::Transport(_) => ApiError::unavailable("token service unavailable"),
            RefreshError::Timeout => {
                ApiError::new(Code::DeadlineExceeded, "token service timed out")
            }
            RefreshError::InvalidResponse(_) => {
                ApiError::internal("invalid token service response")
            }
        }
    }
}

/// Exchanges a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Token service client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenRefresher {
    /// Path of the refresh endpoint relative to the token service base URL.
    pub const TOKEN_PATH: &'static str = "api/v1/token";

    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, RefreshError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base
            .join(Self::TOKEN_PATH)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn transport_error(e: reqwest::Error) -> RefreshError {
    if e.is_timeout() {
        RefreshError::Timeout
    } else {
        RefreshError::Transport(e.to_string())
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let remote = match serde_json::from_slice::<ErrorResponse>(&body) {
                Ok(error) => ApiError::from_body(error),
                Err(_) => ApiError::new(
                    Code::from_http_status(status),
                    format!("token service returned {}", status),
                ),
            };
            return Err(RefreshError::Rejected(remote));
        }

        let tokens: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(RefreshError::InvalidResponse("empty token".into()));
        }
        if !is_cookie_value(&tokens.access_token) || !is_cookie_value(&tokens.refresh_token) {
            return Err(RefreshError::InvalidResponse(
                "token is not a valid cookie value".into(),
            ));
        }

        Ok(TokenPair {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}
