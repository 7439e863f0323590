//! HR Analytics HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use hr_analytics_core::{
    CategoryMetrics, DashboardStats, DemographicMetrics, PerformanceMetrics, QueryRecord,
    RecordInput, UsageMetrics, WindowParams,
};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BatchRecordsRequest, HealthStatus, StoredResponse, MAX_BATCH_RECORDS,
};

/// HR Analytics API client.
///
/// Metric calls need a bearer token; ingest calls need a service API key.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    api_key: Option<String>,
    service_name: String,
}

impl AnalyticsClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://hr-analytics:8080"`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            api_key: None,
            service_name: options.service_name,
        })
    }

    /// Use a dashboard user's JWT for metric requests.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Use a service API key for ingest requests.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Query volume and active users.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn usage(&self, window: &WindowParams) -> Result<UsageMetrics, ClientError> {
        self.get_metric("usage", Some(window)).await
    }

    /// Category distribution and trending topics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn categories(&self) -> Result<CategoryMetrics, ClientError> {
        self.get_metric("categories", None).await
    }

    /// Satisfaction and resolution rates. An unspecified window covers all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn performance(
        &self,
        window: &WindowParams,
    ) -> Result<PerformanceMetrics, ClientError> {
        self.get_metric("performance", Some(window)).await
    }

    /// Department, seniority, and new-user breakdowns.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn demographics(
        &self,
        window: &WindowParams,
    ) -> Result<DemographicMetrics, ClientError> {
        self.get_metric("demographics", Some(window)).await
    }

    /// Headline dashboard numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn dashboard_stats(
        &self,
        window: &WindowParams,
    ) -> Result<DashboardStats, ClientError> {
        self.get_metric("dashboard_stats", Some(window)).await
    }

    async fn get_metric<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        window: Option<&WindowParams>,
    ) -> Result<T, ClientError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(ClientError::MissingCredentials("bearer token"))?;

        let url = format!("{}/{route}", self.base_url);
        let mut request = self.client.get(&url).bearer_auth(token);
        if let Some(window) = window {
            request = request.query(window);
        }

        tracing::debug!(url = %url, "Fetching metric");
        Self::send(request).await
    }

    // ========================================================================
    // Ingest
    // ========================================================================

    /// Store one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn put_record(&self, record: &QueryRecord) -> Result<StoredResponse, ClientError> {
        let url = format!("{}/records", self.base_url);
        let request = self.with_service_key(self.client.post(&url))?;
        Self::send(request.json(&RecordInput::from(record))).await
    }

    /// Store records in batches of at most [`MAX_BATCH_RECORDS`].
    ///
    /// Each batch is atomic on the server; a failure stops before the next
    /// batch is sent, leaving earlier batches stored.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails or the server returns an error.
    pub async fn put_records(
        &self,
        records: &[QueryRecord],
    ) -> Result<StoredResponse, ClientError> {
        let url = format!("{}/records/batch", self.base_url);
        let mut stored = 0;

        for chunk in records.chunks(MAX_BATCH_RECORDS) {
            let inputs: Vec<RecordInput> = chunk.iter().map(RecordInput::from).collect();
            let request = self
                .with_service_key(self.client.post(&url))?
                .json(&BatchRecordsRequest { records: &inputs });

            let response: StoredResponse = Self::send(request).await?;
            stored += response.stored;
            tracing::debug!(stored, total = records.len(), "Batch stored");
        }

        Ok(StoredResponse { stored })
    }

    /// Service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = format!("{}/health", self.base_url);
        Self::send(self.client.get(&url)).await
    }

    fn with_service_key(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientError::MissingCredentials("service API key"))?;

        Ok(request
            .header("x-api-key", api_key)
            .header("x-service-name", &self.service_name))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => match api_error.error.code.as_str() {
                "unauthorized" => Err(ClientError::Unauthorized {
                    message: api_error.error.message,
                }),
                _ => Err(ClientError::Api {
                    code: api_error.error.code,
                    message: api_error.error.message,
                    status: status.as_u16(),
                }),
            },
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name sent with ingest requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "hr-analytics-client".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
