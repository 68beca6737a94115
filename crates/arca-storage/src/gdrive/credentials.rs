//! Dual-credential resolution for Drive calls.
//!
//! User OAuth tokens take priority; a service account is the fallback. The
//! decision is made per call against the credential store, so connecting or
//! disconnecting the OAuth integration takes effect immediately.

use crate::token::{TokenError, TokenManager};
use crate::traits::{StorageError, StorageResult};
use arca_core::StorageBackend;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

#[derive(Debug, Serialize)]
struct ServiceClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct ServiceTokenResponse {
    access_token: String,
}

/// Service-account authentication via the JWT-bearer grant.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    email: String,
    key: EncodingKey,
    token_endpoint: String,
}

impl ServiceAccountAuth {
    pub fn new(email: String, private_key_pem: &str, token_endpoint: String) -> StorageResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
            StorageError::Config(format!("invalid service account key: {}", e))
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            email,
            key,
            token_endpoint,
        })
    }

    async fn access_token(&self) -> StorageResult<String> {
        let now = Utc::now().timestamp();
        let claims = ServiceClaims {
            iss: &self.email,
            scope: DRIVE_SCOPE,
            aud: &self.token_endpoint,
            iat: now,
            exp: now + 3600,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| {
                StorageError::Config(format!("failed to sign service account assertion: {}", e))
            })?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                StorageError::from_request(StorageBackend::GoogleDrive, "service-token", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(
                StorageBackend::GoogleDrive,
                "service-token",
                status.as_u16(),
                body,
            ));
        }

        let token: ServiceTokenResponse = response.json().await.map_err(|e| {
            StorageError::inconsistent(StorageBackend::GoogleDrive, "service-token", e)
        })?;

        Ok(token.access_token)
    }
}

/// Picks the credential for each Drive call.
pub struct CredentialResolver {
    tokens: Arc<TokenManager>,
    service: Option<ServiceAccountAuth>,
}

impl CredentialResolver {
    pub fn new(tokens: Arc<TokenManager>, service: Option<ServiceAccountAuth>) -> Self {
        Self { tokens, service }
    }

    /// Resolve an access token for the next Drive call. Never cached here:
    /// freshness and fallback are re-evaluated every time.
    pub async fn access_token(&self) -> StorageResult<String> {
        match self.tokens.get_valid().await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {
                tracing::debug!("no oauth connection, trying service account");
            }
            Err(TokenError::RefreshUnavailable) => {
                tracing::warn!(
                    "oauth token expired without refresh token, trying service account"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "oauth token refresh failed, trying service account");
            }
        }

        match &self.service {
            Some(service) => service.access_token().await,
            None => Err(StorageError::permission_denied(
                StorageBackend::GoogleDrive,
                "auth",
                "no usable credentials: oauth not connected and no service account configured",
            )),
        }
    }
}
