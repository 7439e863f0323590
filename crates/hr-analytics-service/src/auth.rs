//! Authentication extractors and JWT validation.
//!
//! This module provides extractors for:
//! - `AuthUser` - Dashboard user authentication via identity-provider JWT
//! - `ServiceAuth` - Service-to-service authentication via API key

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600); // 1 hour

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepted values of the `token_use` claim.
const ACCEPTED_TOKEN_USES: [&str; 2] = ["id", "access"];

// ============================================================================
// Extractors
// ============================================================================

/// An authenticated dashboard user extracted from a bearer JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The raw subject claim from the JWT.
    pub subject: String,
    /// Directory username, when the token carries one.
    pub username: Option<String>,
    /// Email address, when the token carries one.
    pub email: Option<String>,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = validate_jwt(token, state).await?;

        tracing::debug!(subject = %claims.sub, "User authenticated");

        Ok(AuthUser {
            subject: claims.sub,
            username: claims.username,
            email: claims.email,
        })
    }
}

/// Service authentication via API key.
///
/// Used by ingestion pipelines and the admin CLI to write records.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .service_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if api_key != expected_key {
            return Err(ApiError::Unauthorized);
        }

        let service_name = parts
            .headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(ServiceAuth { service_name })
    }
}

// ============================================================================
// Claims
// ============================================================================

/// JWT claims issued by the identity provider.
///
/// ID tokens carry the app client in `aud`; access tokens carry it in
/// `client_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Audience (can be string or array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    /// App client ID (access tokens).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// `id` or `access`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    /// Directory username.
    #[serde(
        rename = "cognito:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenClaims {
    /// Client identifiers the token was issued to.
    fn client_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = match &self.aud {
            Some(serde_json::Value::String(aud)) => vec![aud.as_str()],
            Some(serde_json::Value::Array(values)) => {
                values.iter().filter_map(serde_json::Value::as_str).collect()
            }
            _ => Vec::new(),
        };
        if let Some(client_id) = &self.client_id {
            ids.push(client_id);
        }
        ids
    }
}

// ============================================================================
// JWKS Cache
// ============================================================================

/// JWKS (JSON Web Key Set) document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256").
    pub alg: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
    /// Key use (e.g., "sig" for signature).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
}

/// Where the key set comes from.
enum KeySource {
    /// Fetched from the issuer and refreshed hourly.
    Remote { client: reqwest::Client, url: String },
    /// Loaded once; never refreshed.
    Static,
}

struct CachedKeys {
    /// Cached keys mapped by kid.
    keys: HashMap<String, DecodingKey>,
    /// Default key (for tokens without kid).
    default_key: Option<DecodingKey>,
    /// When the cache was last updated.
    last_updated: Instant,
}

impl CachedKeys {
    fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            default_key: None,
            // Force initial fetch
            last_updated: Instant::now()
                .checked_sub(JWKS_CACHE_DURATION)
                .unwrap_or_else(Instant::now),
        }
    }

    fn from_jwks(jwks: &Jwks) -> Self {
        let mut cached = Self::empty();
        cached.last_updated = Instant::now();

        for jwk in &jwks.keys {
            if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
                if let Some(ref key_kid) = jwk.kid {
                    cached.keys.insert(key_kid.clone(), decoding_key.clone());
                }
                if cached.default_key.is_none() {
                    cached.default_key = Some(decoding_key);
                }
            }
        }

        cached
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }
}

/// Signing keys used to verify bearer tokens.
pub struct JwksCache {
    source: KeySource,
    cached: RwLock<CachedKeys>,
}

impl JwksCache {
    /// Keys fetched from `{issuer}/.well-known/jwks.json` on first use.
    #[must_use]
    pub fn remote(issuer: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            source: KeySource::Remote {
                client,
                url: format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/')),
            },
            cached: RwLock::new(CachedKeys::empty()),
        }
    }

    /// A fixed key set.
    #[must_use]
    pub fn fixed(jwks: &Jwks) -> Self {
        Self {
            source: KeySource::Static,
            cached: RwLock::new(CachedKeys::from_jwks(jwks)),
        }
    }

    /// Load a fixed key set from a JWKS file.
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let jwks: Jwks = serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self::fixed(&jwks))
    }

    /// Select the key source from configuration.
    #[must_use]
    pub fn from_config(config: &ServiceConfig) -> Self {
        if let Some(path) = &config.auth_jwks_path {
            match Self::from_file(path) {
                Ok(cache) => {
                    tracing::info!(path = %path, "Loaded static JWKS");
                    return cache;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        path = %path,
                        "Failed to load JWKS file, falling back to issuer"
                    );
                }
            }
        }
        Self::remote(&config.auth_issuer)
    }

    /// Get a decoding key from cache or refresh from the issuer.
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, ApiError> {
        let (client, url) = match &self.source {
            KeySource::Static => {
                return self
                    .cached
                    .read()
                    .await
                    .lookup(kid)
                    .ok_or(ApiError::Unauthorized);
            }
            KeySource::Remote { client, url } => (client, url),
        };

        {
            let cache_read = self.cached.read().await;
            if cache_read.last_updated.elapsed() < JWKS_CACHE_DURATION {
                if let Some(key) = cache_read.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        // Cache miss or expired
        let jwks = fetch_jwks(client, url).await?;
        let refreshed = CachedKeys::from_jwks(&jwks);
        let key = refreshed.lookup(kid);
        *self.cached.write().await = refreshed;

        key.ok_or(ApiError::Unauthorized)
    }
}

/// Fetch JWKS from the identity provider.
async fn fetch_jwks(client: &reqwest::Client, url: &str) -> Result<Jwks, ApiError> {
    tracing::debug!(url = %url, "Fetching JWKS");

    let response = client.get(url).send().await.map_err(|e| {
        tracing::error!(error = %e, url = %url, "Failed to fetch JWKS");
        ApiError::ExternalService("Failed to fetch authentication keys".into())
    })?;

    if !response.status().is_success() {
        tracing::error!(
            status = %response.status(),
            url = %url,
            "JWKS fetch returned non-success status"
        );
        return Err(ApiError::ExternalService(
            "Failed to fetch authentication keys".into(),
        ));
    }

    let jwks: Jwks = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse JWKS response");
        ApiError::ExternalService("Failed to parse authentication keys".into())
    })?;

    tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched successfully");

    Ok(jwks)
}

/// Convert a JWK to a `DecodingKey`.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}

// ============================================================================
// Validation
// ============================================================================

/// Validate a JWT against the key set and the configured issuer and clients.
async fn validate_jwt(token: &str, state: &AppState) -> Result<TokenClaims, ApiError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!(error = %e, "Failed to decode JWT header");
        ApiError::Unauthorized
    })?;

    let decoding_key = state.jwks.decoding_key(header.kid.as_deref()).await?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[&state.config.auth_issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Audience is checked below against aud or client_id.
    validation.validate_aud = false;

    let claims = decode::<TokenClaims>(token, &decoding_key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })?
        .claims;

    check_claims(&claims, &state.config.auth_client_ids)?;

    Ok(claims)
}

fn check_claims(claims: &TokenClaims, allowed_clients: &[String]) -> Result<(), ApiError> {
    if let Some(token_use) = &claims.token_use {
        if !ACCEPTED_TOKEN_USES.contains(&token_use.as_str()) {
            tracing::debug!(token_use = %token_use, "Rejected token_use");
            return Err(ApiError::Unauthorized);
        }
    }

    if !allowed_clients.is_empty()
        && !claims
            .client_ids()
            .iter()
            .any(|id| allowed_clients.iter().any(|allowed| allowed == id))
    {
        tracing::debug!(subject = %claims.sub, "Token issued to an unknown client");
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}
