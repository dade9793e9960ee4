//! OAuth2 access for the provider API.
//!
//! Components never hold credentials themselves. They ask a [`TokenProvider`]
//! for an [`AuthenticatedClient`] right before every HTTP call.
//! [`OAuthTokenProvider`] caches the token it gets from the client-credentials
//! grant and only goes back to the token endpoint when the cached token is
//! within [`REFRESH_MARGIN`] of expiring.

use crate::auth::error::AuthError;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A cached token is replaced once it has less than this left to live.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// An HTTP client paired with a bearer token. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http: Client,
    token: String,
}

impl AuthenticatedClient {
    pub fn new(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
        }
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.token)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.token)
    }
}

/// Source of authenticated clients.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_client(&self) -> Result<AuthenticatedClient, AuthError>;
}

/// Hands out a fixed token. Useful when the token is obtained elsewhere, and
/// in tests.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    client: AuthenticatedClient,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: AuthenticatedClient::new(Client::new(), token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_client(&self) -> Result<AuthenticatedClient, AuthError> {
        Ok(self.client.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    client: AuthenticatedClient,
    expires_at: Instant,
}

/// Client-credentials grant against the provider's token endpoint.
pub struct OAuthTokenProvider {
    http: Client,
    token_url: String,
    key: String,
    secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl OAuthTokenProvider {
    pub fn new(token_url: impl Into<String>, key: &str, secret: &str) -> Self {
        Self {
            http: Client::new(),
            token_url: token_url.into(),
            key: key.trim().to_string(),
            secret: secret.trim().to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, AuthError> {
        debug!("Requesting access token from {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.key, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AuthError::NetworkRequest(self.token_url.clone(), e))?;

        let response = response.error_for_status().map_err(|e| match e.status() {
            Some(status) => AuthError::HttpStatus {
                url: self.token_url.clone(),
                status,
                source: e,
            },
            None => AuthError::NetworkRequest(self.token_url.clone(), e),
        })?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenDecode(self.token_url.clone(), e))?;

        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Ok(CachedToken {
            client: AuthenticatedClient::new(self.http.clone(), token.access_token),
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn get_client(&self) -> Result<AuthenticatedClient, AuthError> {
        // Held across the fetch so concurrent callers wait for one refresh.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + REFRESH_MARGIN < token.expires_at {
                return Ok(token.client.clone());
            }
        }
        let fresh = self.fetch_token().await?;
        let client = fresh.client.clone();
        *cached = Some(fresh);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_server(expires_in: u64, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", "Basic azpz")) // base64("k:s")
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-1",
                "expires_in": expires_in,
            })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_token_is_cached() -> Result<(), AuthError> {
        let server = token_server(3600, 1).await;
        let provider =
            OAuthTokenProvider::new(format!("{}/oauth/token", server.uri()), " k ", "s\n");

        provider.get_client().await?;
        provider.get_client().await?;
        provider.get_client().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() -> Result<(), AuthError> {
        // Lifetime inside the refresh margin, so every call refetches.
        let server = token_server(30, 2).await;
        let provider = OAuthTokenProvider::new(format!("{}/oauth/token", server.uri()), "k", "s");

        provider.get_client().await?;
        provider.get_client().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_bearer_header_is_attached() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = StaticTokenProvider::new("abc").get_client().await?;
        let status = client
            .get(&format!("{}/ping", server.uri()))
            .send()
            .await?
            .status();
        assert_eq!(status, reqwest::StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let provider = OAuthTokenProvider::new(format!("{}/oauth/token", server.uri()), "k", "s");

        let err = provider.get_client().await.unwrap_err();
        assert!(matches!(err, AuthError::HttpStatus { status, .. } if status == 401));
    }
}
