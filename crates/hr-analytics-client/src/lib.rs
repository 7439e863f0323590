//! HR Analytics Client SDK.
//!
//! Typed access to the hr-analytics API for dashboards (metric routes, bearer
//! JWT) and for pipelines that load records (ingest routes, service API key).
//!
//! # Example
//!
//! ```no_run
//! use hr_analytics_client::AnalyticsClient;
//! use hr_analytics_core::{RangePreset, WindowParams};
//!
//! # async fn example() -> Result<(), hr_analytics_client::ClientError> {
//! let client = AnalyticsClient::new("http://hr-analytics:8080")?
//!     .with_bearer_token("eyJraWQiOi...");
//!
//! let usage = client.usage(&WindowParams::preset(RangePreset::ThirtyDays)).await?;
//! println!("{} queries from {} users", usage.total_queries, usage.unique_users);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{AnalyticsClient, ClientOptions};
pub use error::ClientError;
pub use types::*;
