use crate::errors::DashboardError;
use crate::models::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing;

pub const SUMMARY: &str = "/api/summary";
pub const BRANCHES: &str = "/api/branches";
pub const INSIGHTS: &str = "/api/ai/insights";
pub const CUSTOMERS: &str = "/api/customers";
pub const LOANS: &str = "/api/loans";
pub const CREDIT_SCORE: &str = "/api/credit-score/calculate";
pub const PORTFOLIO_ANALYSIS: &str = "/api/reports/portfolio-analysis";
pub const MESSAGING_STATUS: &str = "/api/messaging/status";
pub const SETTINGS_STATUS: &str = "/api/settings/status";
pub const SETTINGS_UPDATE: &str = "/api/settings/update";

/// Client for the dashboard backend's JSON-over-HTTP API.
///
/// Every method parses the body into the endpoint's type at the boundary, so
/// a shape mismatch surfaces as [`DashboardError::Malformed`] instead of
/// reaching a view.
#[derive(Clone)]
pub struct DashboardApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DashboardApi {
    /// Creates a new `DashboardApi`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend root, e.g. `http://localhost:8000`.
    /// * `timeout` - Per-request limit; elapsed requests fail with `Timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DashboardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DashboardError::Transport(format!("Failed to create backend client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn summary(&self) -> Result<SummaryMetric, DashboardError> {
        self.get_json(SUMMARY, &[]).await
    }

    pub async fn branches(&self) -> Result<Vec<BranchMetric>, DashboardError> {
        self.get_json(BRANCHES, &[]).await
    }

    pub async fn insights(&self) -> Result<Vec<String>, DashboardError> {
        let body: InsightsResponse = self.get_json(INSIGHTS, &[]).await?;
        Ok(body.insights)
    }

    /// Fetches the first `limit` customers. Pagination is the server's job.
    pub async fn customers(&self, limit: u32) -> Result<CustomerPage, DashboardError> {
        self.get_json(CUSTOMERS, &[("limit", limit.to_string())])
            .await
    }

    pub async fn loans(&self, limit: u32) -> Result<LoanPage, DashboardError> {
        self.get_json(LOANS, &[("limit", limit.to_string())]).await
    }

    pub async fn calculate_credit_score(
        &self,
        customer_id: &str,
    ) -> Result<CreditScoreResult, DashboardError> {
        tracing::info!("Requesting credit score for customer {}", customer_id);
        let response = self
            .client
            .post(self.url(CREDIT_SCORE))
            .query(&[("customer_id", customer_id)])
            .send()
            .await
            .map_err(|e| self.transport_error(CREDIT_SCORE, e))?;

        self.parse(CREDIT_SCORE, response).await
    }

    pub async fn portfolio_analysis(&self) -> Result<PortfolioAnalysis, DashboardError> {
        self.get_json(PORTFOLIO_ANALYSIS, &[]).await
    }

    pub async fn messaging_status(&self) -> Result<MessagingStatus, DashboardError> {
        self.get_json(MESSAGING_STATUS, &[]).await
    }

    pub async fn settings_status(&self) -> Result<SettingsStatus, DashboardError> {
        self.get_json(SETTINGS_STATUS, &[]).await
    }

    /// Triggers an outbound message. Parameters travel in the query string;
    /// the response body is ignored on success.
    pub async fn trigger_message(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<(), DashboardError> {
        tracing::info!("Triggering outbound message via {}", endpoint);
        let response = self
            .client
            .post(self.url(endpoint))
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        Self::ensure_success(endpoint, response).await?;
        tracing::info!("✓ {} accepted", endpoint);
        Ok(())
    }

    /// Saves credentials. Write-only: nothing from the body is kept.
    pub async fn update_settings<B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<(), DashboardError> {
        let response = self
            .client
            .post(self.url(SETTINGS_UPDATE))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(SETTINGS_UPDATE, e))?;

        Self::ensure_success(SETTINGS_UPDATE, response).await?;
        tracing::info!("✓ Settings update accepted");
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, DashboardError> {
        tracing::debug!("GET {}{}", self.base_url, endpoint);

        let response = self
            .client
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        self.parse(endpoint, response).await
    }

    async fn parse<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, DashboardError> {
        let response = Self::ensure_success(endpoint, response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        serde_json::from_str(&text).map_err(|e| DashboardError::Malformed {
            resource: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn ensure_success(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, DashboardError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let detail = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<ErrorBody>(&text).ok())
            .and_then(|body| body.detail_text());

        tracing::debug!("{} returned {} (detail: {:?})", endpoint, status, detail);
        Err(DashboardError::Status {
            resource: endpoint.to_string(),
            status: status.as_u16(),
            detail,
        })
    }

    fn transport_error(&self, endpoint: &str, err: reqwest::Error) -> DashboardError {
        if err.is_timeout() {
            DashboardError::Timeout {
                resource: endpoint.to_string(),
                after: self.timeout,
            }
        } else {
            DashboardError::Transport(format!("{}: {}", endpoint, err))
        }
    }
}
