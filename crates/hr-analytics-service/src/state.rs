//! Application state.

use std::sync::Arc;

use hr_analytics_store::Store;

use crate::auth::{Jwks, JwksCache};
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The analytics table.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Token signing keys.
    pub jwks: Arc<JwksCache>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Signing keys come from `auth_jwks_path` when set, otherwise from the
    /// issuer's JWKS endpoint.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let jwks = Arc::new(JwksCache::from_config(&config));

        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - record ingestion is disabled");
        }

        Self {
            store,
            config,
            jwks,
        }
    }

    /// Create application state that verifies tokens against a fixed key set.
    #[must_use]
    pub fn with_key_set(store: Arc<dyn Store>, config: ServiceConfig, jwks: &Jwks) -> Self {
        Self {
            store,
            config,
            jwks: Arc::new(JwksCache::fixed(jwks)),
        }
    }
}
