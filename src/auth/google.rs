use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::TokenSource;
use crate::report::{ProviderErrorKind, ReportError};

const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Refresh this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Fields of a service-account key file needed for the JWT grant
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, ReportError> {
        serde_json::from_str(raw).map_err(|e| {
            ReportError::Configuration(format!("service account credentials are not valid JSON: {e}"))
        })
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// RwLock-guarded token cache shared by both grant types
#[derive(Clone, Default)]
struct TokenCache {
    current: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    async fn fresh(&self) -> Option<String> {
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|token| Instant::now() + EXPIRY_MARGIN < token.expires_at)
            .map(|token| token.value.clone())
    }

    async fn store(&self, response: TokenResponse) -> String {
        let token = CachedToken {
            value: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in.unwrap_or(3600)),
        };
        let value = token.value.clone();
        *self.current.write().await = Some(token);
        value
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Exchanges a signed service-account assertion for an access token
#[derive(Clone)]
pub struct ServiceAccountTokenSource {
    client_email: String,
    token_uri: String,
    key: Arc<EncodingKey>,
    client: Client,
    cache: TokenCache,
}

impl ServiceAccountTokenSource {
    pub fn new(
        key: &ServiceAccountKey,
        default_token_uri: &str,
        client: Client,
    ) -> Result<Self, ReportError> {
        if key.client_email.trim().is_empty() {
            return Err(ReportError::Configuration(
                "service account credentials are missing client_email".to_string(),
            ));
        }
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ReportError::Configuration(format!("service account private key is not a valid RSA PEM: {e}"))
        })?;

        Ok(Self {
            client_email: key.client_email.clone(),
            token_uri: key
                .token_uri
                .clone()
                .unwrap_or_else(|| default_token_uri.to_string()),
            key: Arc::new(encoding_key),
            client,
            cache: TokenCache::default(),
        })
    }

    fn assertion(&self) -> Result<String, ReportError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: ANALYTICS_READONLY_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key).map_err(|e| {
            ReportError::provider(
                ProviderErrorKind::Unauthenticated,
                format!("failed to sign service account assertion: {e}"),
            )
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, ReportError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }

        debug!("Requesting analytics access token for {}", self.client_email);
        let assertion = self.assertion()?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        let response = request_token(&self.client, &self.token_uri, body).await?;
        Ok(self.cache.store(response).await)
    }
}

/// Exchanges a long-lived OAuth refresh token for access tokens
#[derive(Clone)]
pub struct RefreshTokenSource {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
    client: Client,
    cache: TokenCache,
}

impl RefreshTokenSource {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        token_uri: &str,
        client: Client,
    ) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            token_uri: token_uri.to_string(),
            client,
            cache: TokenCache::default(),
        }
    }
}

#[async_trait]
impl TokenSource for RefreshTokenSource {
    async fn access_token(&self) -> Result<String, ReportError> {
        if let Some(token) = self.cache.fresh().await {
            return Ok(token);
        }

        debug!("Refreshing ads access token");
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("refresh_token", &self.refresh_token)
            .finish();

        let response = request_token(&self.client, &self.token_uri, body).await?;
        Ok(self.cache.store(response).await)
    }
}

async fn request_token(client: &Client, token_uri: &str, body: String) -> Result<TokenResponse, ReportError> {
    let response = client
        .post(token_uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let kind = match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderErrorKind::Unauthenticated
            }
            _ => ProviderErrorKind::Unknown,
        };
        return Err(ReportError::provider(
            kind,
            format!("token endpoint returned {status}"),
        )
        .with_details(text));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| ReportError::Format(format!("failed to parse token response: {e}")))
}
