use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============ Portfolio Aggregates ============

/// Per-branch performance row from `GET /api/branches`.
///
/// `collection_rate` is taken from the server as-is; it is never recomputed
/// from the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMetric {
    /// Branch name, unique within a snapshot.
    pub branch: String,
    pub total_disbursements: f64,
    pub total_collections: f64,
    pub total_arrears: f64,
    /// Percentage in 0–100.
    pub collection_rate: f64,
    pub customer_count: u64,
}

/// Portfolio-wide totals from `GET /api/summary`.
///
/// The backend's sample-data fallback omits some totals (notably
/// `overall_collection_rate` and `branch_count`); a missing total reads as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetric {
    #[serde(default)]
    pub total_disbursements: f64,
    #[serde(default)]
    pub total_collections: f64,
    #[serde(default)]
    pub total_arrears: f64,
    #[serde(default)]
    pub overall_collection_rate: f64,
    #[serde(default)]
    pub branch_count: u64,
    #[serde(default)]
    pub total_customers: u64,
}

/// Body of `GET /api/ai/insights`; index 0 is the most important insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: Vec<String>,
}

// ============ Customers & Loans ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub phone: String,
    pub branch: String,
    pub region: String,
    pub registration_date: NaiveDate,
}

/// One page of `GET /api/customers?limit=N`. `total` counts every customer,
/// not just this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Completed,
    Overdue,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 3] = [LoanStatus::Active, LoanStatus::Completed, LoanStatus::Overdue];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "completed" => Ok(LoanStatus::Completed),
            "overdue" => Ok(LoanStatus::Overdue),
            other => Err(format!("unknown loan status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub branch: String,
    pub disbursement_amount: f64,
    pub disbursement_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: LoanStatus,
}

/// One page of `GET /api/loans?limit=N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPage {
    pub loans: Vec<Loan>,
    pub total: u64,
}

// ============ Credit Scoring ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::Excellent,
        RiskCategory::Good,
        RiskCategory::Fair,
        RiskCategory::Poor,
        RiskCategory::HighRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Excellent => "Excellent",
            RiskCategory::Good => "Good",
            RiskCategory::Fair => "Fair",
            RiskCategory::Poor => "Poor",
            RiskCategory::HighRisk => "High Risk",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = String;

    /// Case-insensitive; accepts `high risk`, `high-risk` and `high_risk`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "excellent" => Ok(RiskCategory::Excellent),
            "good" => Ok(RiskCategory::Good),
            "fair" => Ok(RiskCategory::Fair),
            "poor" => Ok(RiskCategory::Poor),
            "high risk" => Ok(RiskCategory::HighRisk),
            other => Err(format!("unknown risk category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRecommendation {
    pub max_loan_amount: f64,
    pub recommended_interest_rate: f64,
    pub approval_likelihood: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Result of `POST /api/credit-score/calculate?customer_id=...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScoreResult {
    pub customer_id: String,
    pub customer_name: String,
    /// 300–850.
    pub credit_score: i32,
    pub risk_category: RiskCategory,
    pub recommendation: CreditRecommendation,
    /// Model inputs (collection rate, tenure, overdue count, ...).
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

// ============ Reports ============

/// Grouped sums and counts keyed by group name (status or region).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    #[serde(default)]
    pub disbursement_amount: BTreeMap<String, f64>,
    #[serde(default)]
    pub loan_id: BTreeMap<String, u64>,
}

/// Body of `GET /api/reports/portfolio-analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub total_portfolio_value: f64,
    pub total_collected: f64,
    pub portfolio_at_risk: f64,
    pub par_ratio: f64,
    pub collection_rate: f64,
    #[serde(default)]
    pub by_status: Breakdown,
    #[serde(default)]
    pub by_region: Breakdown,
    pub total_branches: u64,
    pub total_loans: u64,
}

// ============ Messaging & Settings ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub configured: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Body of `GET /api/messaging/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingStatus {
    pub whatsapp: ChannelStatus,
    pub telegram: ChannelStatus,
}

/// Body of `GET /api/settings/status`: which credentials exist server-side.
/// The values themselves are never returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsStatus {
    pub configured: BTreeMap<String, bool>,
}

/// Error body returned with non-2xx responses.
///
/// FastAPI-style backends send `detail` either as a string or as a list of
/// validation entries carrying `msg`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Array(entries) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loan_parses_backend_row() {
        let loan: Loan = serde_json::from_value(json!({
            "id": 17,
            "loan_id": "LOAN000017",
            "customer_id": "CUST000004",
            "customer_name": "Achieng Otieno",
            "branch": "Kisumu",
            "branch_id": 3,
            "region": "Nyanza",
            "disbursement_amount": 45000,
            "disbursement_date": "2026-03-02",
            "due_date": "2026-05-01",
            "status": "overdue",
            "payment_behavior": "poor"
        }))
        .unwrap();

        assert_eq!(loan.status, LoanStatus::Overdue);
        assert_eq!(loan.disbursement_amount, 45000.0);
        assert_eq!(loan.due_date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    }

    #[test]
    fn test_unknown_loan_status_is_rejected() {
        let result: Result<LoanStatus, _> = serde_json::from_value(json!("written_off"));
        assert!(result.is_err());
    }

    #[test]
    fn test_risk_category_wire_names() {
        let high: RiskCategory = serde_json::from_value(json!("High Risk")).unwrap();
        assert_eq!(high, RiskCategory::HighRisk);
        assert_eq!(serde_json::to_value(RiskCategory::Fair).unwrap(), json!("Fair"));
        assert_eq!("high-risk".parse::<RiskCategory>(), Ok(RiskCategory::HighRisk));
        assert_eq!("EXCELLENT".parse::<RiskCategory>(), Ok(RiskCategory::Excellent));
        assert!("unknown".parse::<RiskCategory>().is_err());
    }

    #[test]
    fn test_error_body_detail_forms() {
        let plain: ErrorBody = serde_json::from_value(json!({"detail": "Customer not found"})).unwrap();
        assert_eq!(plain.detail_text().as_deref(), Some("Customer not found"));

        let validation: ErrorBody = serde_json::from_value(json!({
            "detail": [
                {"loc": ["query", "to_number"], "msg": "field required", "type": "value_error.missing"}
            ]
        }))
        .unwrap();
        assert_eq!(validation.detail_text().as_deref(), Some("field required"));

        let empty: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.detail_text(), None);
    }

    #[test]
    fn test_portfolio_breakdowns_default_when_missing() {
        let report: PortfolioAnalysis = serde_json::from_value(json!({
            "total_portfolio_value": 0.0,
            "total_collected": 0.0,
            "portfolio_at_risk": 0.0,
            "par_ratio": 0,
            "collection_rate": 0,
            "total_branches": 0,
            "total_loans": 0
        }))
        .unwrap();
        assert!(report.by_status.disbursement_amount.is_empty());
        assert!(report.by_region.loan_id.is_empty());
    }
}
