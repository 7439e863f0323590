//! HR Analytics HTTP API Service.
//!
//! This crate serves the metrics behind the HR assistant dashboard:
//!
//! - Usage (query volume, active users)
//! - Category distribution and trending topics
//! - Satisfaction and resolution performance
//! - Department and seniority demographics
//! - Record ingestion for pipelines and the admin CLI
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Identity-provider JWTs** - For dashboard requests to the metric routes
//! 2. **Service API keys** - For record ingestion

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers must be async

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, Jwk, Jwks, JwksCache, ServiceAuth};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
