//! OAuth token lifecycle for the Drive integration.
//!
//! Tokens live in the credential store, never in memory. Every consumer asks
//! `TokenManager::get_valid` per operation, which refreshes proactively when
//! the stored token is within the skew window of expiry.

use arca_core::models::DriveCredential;
use arca_core::stores::CredentialStore;
use arca_core::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A token expiring within this window is treated as already expired, so a
/// token handed out is valid for at least this long.
const REFRESH_SKEW_SECONDS: i64 = 300;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Token expired and no refresh token is on record. The integration must
    /// be reconnected by an operator.
    #[error("access token expired and no refresh token is available; reconnect the integration")]
    RefreshUnavailable,

    /// The authorization server rejected the refresh (revoked grant, bad
    /// client credentials). Not retryable.
    #[error("token refresh rejected: {0}")]
    RefreshFailed(String),

    /// Transport or server-side failure during refresh. Retryable.
    #[error("token refresh failed transiently: {0}")]
    RefreshTransient(String),

    #[error("credential store error: {0}")]
    Store(#[from] AppError),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::RefreshUnavailable => AppError::UpstreamPermanent(
                "access token expired and no refresh token is available".to_string(),
            ),
            TokenError::RefreshFailed(msg) => AppError::UpstreamPermanent(msg),
            TokenError::RefreshTransient(msg) => AppError::UpstreamTransient(msg),
            TokenError::Store(inner) => inner,
        }
    }
}

/// A freshly issued or to-be-stored token set.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
    pub token_kind: String,
}

/// What a refresh endpoint returns.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Authorization servers often omit this on refresh; the previously
    /// stored refresh token stays in effect then.
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub scope: Option<String>,
    pub token_kind: Option<String>,
}

/// The refresh grant against an authorization server.
#[async_trait::async_trait]
pub trait RefreshEndpoint: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, TokenError>;
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
    token_type: Option<String>,
}

/// Google's OAuth token endpoint.
pub struct GoogleRefreshEndpoint {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: String,
}

impl GoogleRefreshEndpoint {
    pub fn new(client_id: Option<String>, client_secret: Option<String>, token_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            token_url,
        }
    }
}

#[async_trait::async_trait]
impl RefreshEndpoint for GoogleRefreshEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, TokenError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
            _ => {
                return Err(TokenError::RefreshFailed(
                    "oauth client credentials not configured".to_string(),
                ))
            }
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TokenError::RefreshTransient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 4xx means the grant itself is bad; 5xx is the server's problem.
            if status.is_client_error() {
                return Err(TokenError::RefreshFailed(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    body
                )));
            }
            return Err(TokenError::RefreshTransient(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::RefreshTransient(e.to_string()))?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            scope: token.scope,
            token_kind: token.token_type,
        })
    }
}

/// Manages the single stored credential set.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn RefreshEndpoint>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn RefreshEndpoint>) -> Self {
        Self { store, refresher }
    }

    /// Persist a token set, fully replacing any previous record. When the new
    /// set carries no refresh token, the previously stored one is carried
    /// forward (refresh responses routinely omit it).
    pub async fn store_tokens(&self, tokens: TokenSet) -> Result<(), TokenError> {
        let previous = self.store.load().await?;

        let refresh_token = tokens
            .refresh_token
            .or_else(|| previous.and_then(|c| c.refresh_token));

        let credential = DriveCredential {
            id: Uuid::new_v4(),
            access_token: tokens.access_token,
            refresh_token,
            expires_at: tokens.expires_at,
            scope: tokens.scope,
            token_kind: tokens.token_kind,
            created_at: Utc::now(),
        };

        self.store.replace(&credential).await?;

        tracing::info!(
            expires_at = %credential.expires_at,
            has_refresh_token = credential.refresh_token.is_some(),
            "stored drive credentials"
        );

        Ok(())
    }

    /// Return a currently valid access token, refreshing first when the
    /// stored one expires within the skew window.
    ///
    /// `Ok(None)` means the integration is not connected at all — a distinct
    /// state from a failed refresh.
    pub async fn get_valid(&self) -> Result<Option<String>, TokenError> {
        let Some(credential) = self.store.load().await? else {
            return Ok(None);
        };

        let deadline = Utc::now() + Duration::seconds(REFRESH_SKEW_SECONDS);
        if credential.expires_at > deadline {
            return Ok(Some(credential.access_token));
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(TokenError::RefreshUnavailable);
        };

        tracing::info!(expires_at = %credential.expires_at, "refreshing drive access token");

        let refreshed = self.refresher.refresh(&refresh_token).await?;
        let access_token = refreshed.access_token.clone();

        self.store_tokens(TokenSet {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_at: Utc::now() + Duration::seconds(refreshed.expires_in),
            scope: refreshed.scope.or(credential.scope),
            token_kind: refreshed
                .token_kind
                .unwrap_or_else(|| credential.token_kind.clone()),
        })
        .await?;

        Ok(Some(access_token))
    }

    /// Drop the stored credentials. The next operation sees a disconnected
    /// integration immediately.
    pub async fn disconnect(&self) -> Result<(), TokenError> {
        self.store.clear().await?;
        tracing::info!("drive credentials cleared");
        Ok(())
    }

    /// Connection status without touching the authorization server.
    pub async fn status(&self) -> Result<Option<DriveCredential>, TokenError> {
        Ok(self.store.load().await?)
    }
}
