//! Endpoint sets behind each view's polling store.
//!
//! Each set issues its calls concurrently with `tokio::join!` and waits for all
//! of them to settle before reporting. The first failure in endpoint order
//! fails the whole cycle; partial snapshots are never committed.

use crate::api_client::DashboardApi;
use crate::errors::DashboardError;
use crate::models::*;
use crate::polling::ResourceSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewSnapshot {
    pub summary: SummaryMetric,
    pub branches: Vec<BranchMetric>,
    pub insights: Vec<String>,
}

/// `/api/summary`, `/api/branches` and `/api/ai/insights`.
pub struct OverviewResources {
    api: DashboardApi,
}

impl OverviewResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for OverviewResources {
    type Snapshot = OverviewSnapshot;

    fn name(&self) -> &'static str {
        "overview"
    }

    async fn fetch(&self) -> Result<OverviewSnapshot, DashboardError> {
        let (summary, branches, insights) = tokio::join!(
            self.api.summary(),
            self.api.branches(),
            self.api.insights()
        );
        Ok(OverviewSnapshot {
            summary: summary?,
            branches: branches?,
            insights: insights?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub summary: SummaryMetric,
    pub branches: Vec<BranchMetric>,
}

/// `/api/summary` and `/api/branches`.
pub struct AnalyticsResources {
    api: DashboardApi,
}

impl AnalyticsResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for AnalyticsResources {
    type Snapshot = AnalyticsSnapshot;

    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn fetch(&self) -> Result<AnalyticsSnapshot, DashboardError> {
        let (summary, branches) = tokio::join!(self.api.summary(), self.api.branches());
        Ok(AnalyticsSnapshot {
            summary: summary?,
            branches: branches?,
        })
    }
}

/// `/api/branches` alone.
pub struct BranchResources {
    api: DashboardApi,
}

impl BranchResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for BranchResources {
    type Snapshot = Vec<BranchMetric>;

    fn name(&self) -> &'static str {
        "branches"
    }

    async fn fetch(&self) -> Result<Vec<BranchMetric>, DashboardError> {
        self.api.branches().await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomersSnapshot {
    pub page: CustomerPage,
    /// Feeds the branch selector.
    pub branches: Vec<BranchMetric>,
}

/// `/api/customers?limit=N` and `/api/branches`.
pub struct CustomerResources {
    api: DashboardApi,
    limit: u32,
}

impl CustomerResources {
    pub fn new(api: DashboardApi, limit: u32) -> Self {
        Self { api, limit }
    }
}

impl ResourceSet for CustomerResources {
    type Snapshot = CustomersSnapshot;

    fn name(&self) -> &'static str {
        "customers"
    }

    async fn fetch(&self) -> Result<CustomersSnapshot, DashboardError> {
        let (page, branches) = tokio::join!(self.api.customers(self.limit), self.api.branches());
        Ok(CustomersSnapshot {
            page: page?,
            branches: branches?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoansSnapshot {
    pub page: LoanPage,
    pub branches: Vec<BranchMetric>,
}

/// `/api/loans?limit=N` and `/api/branches`.
pub struct LoanResources {
    api: DashboardApi,
    limit: u32,
}

impl LoanResources {
    pub fn new(api: DashboardApi, limit: u32) -> Self {
        Self { api, limit }
    }
}

impl ResourceSet for LoanResources {
    type Snapshot = LoansSnapshot;

    fn name(&self) -> &'static str {
        "loans"
    }

    async fn fetch(&self) -> Result<LoansSnapshot, DashboardError> {
        let (page, branches) = tokio::join!(self.api.loans(self.limit), self.api.branches());
        Ok(LoansSnapshot {
            page: page?,
            branches: branches?,
        })
    }
}

/// `/api/customers?limit=N` for the scoring table.
pub struct ScoringResources {
    api: DashboardApi,
    limit: u32,
}

impl ScoringResources {
    pub fn new(api: DashboardApi, limit: u32) -> Self {
        Self { api, limit }
    }
}

impl ResourceSet for ScoringResources {
    type Snapshot = CustomerPage;

    fn name(&self) -> &'static str {
        "credit-scoring"
    }

    async fn fetch(&self) -> Result<CustomerPage, DashboardError> {
        self.api.customers(self.limit).await
    }
}

/// `/api/reports/portfolio-analysis`.
pub struct ReportResources {
    api: DashboardApi,
}

impl ReportResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for ReportResources {
    type Snapshot = PortfolioAnalysis;

    fn name(&self) -> &'static str {
        "reports"
    }

    async fn fetch(&self) -> Result<PortfolioAnalysis, DashboardError> {
        self.api.portfolio_analysis().await
    }
}

/// `/api/messaging/status`.
pub struct MessagingResources {
    api: DashboardApi,
}

impl MessagingResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for MessagingResources {
    type Snapshot = MessagingStatus;

    fn name(&self) -> &'static str {
        "messaging"
    }

    async fn fetch(&self) -> Result<MessagingStatus, DashboardError> {
        self.api.messaging_status().await
    }
}

/// `/api/settings/status`.
pub struct SettingsResources {
    api: DashboardApi,
}

impl SettingsResources {
    pub fn new(api: DashboardApi) -> Self {
        Self { api }
    }
}

impl ResourceSet for SettingsResources {
    type Snapshot = SettingsStatus;

    fn name(&self) -> &'static str {
        "settings"
    }

    async fn fetch(&self) -> Result<SettingsStatus, DashboardError> {
        self.api.settings_status().await
    }
}
