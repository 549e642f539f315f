//! View models composed from a store snapshot, the filter engine and the metrics.
//!
//! Models borrow from the snapshot they were built from and are serialized
//! straight into the response. Nothing here fetches, except the score
//! calculation on [`CreditScoring`].

use crate::api_client::DashboardApi;
use crate::errors::{DashboardError, ResultExt};
use crate::filters::{self, Choice, CustomerFacet, FilterSpec, LoanFacet, RateBucket, ScoredCustomer};
use crate::format::{format_count, format_kes, format_kes_millions, format_pct, format_reported_pct};
use crate::metrics::{self, CreditGrade, LoanStatusTally, RateDistribution};
use crate::models::{
    BranchMetric, Breakdown, ChannelStatus, CreditScoreResult, Customer, CustomerPage, Loan,
    LoanStatus, MessagingStatus, PortfolioAnalysis, RiskCategory, SettingsStatus,
};
use crate::resources::{AnalyticsSnapshot, CustomersSnapshot, LoansSnapshot, OverviewSnapshot};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Branches plotted on the overview chart.
pub const OVERVIEW_CHART_BRANCHES: usize = 6;
/// Insights listed on the overview.
pub const OVERVIEW_INSIGHTS: usize = 5;
/// Collection-rate target shown on the analytics view.
pub const COLLECTION_TARGET_PCT: f64 = 90.0;

/// A headline metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub title: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Card {
    fn new(title: &'static str, value: String) -> Self {
        Self {
            title,
            value,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Looks a card up by title.
pub fn card<'c>(cards: &'c [Card], title: &str) -> Option<&'c Card> {
    cards.iter().find(|c| c.title == title)
}

/// One branch in a bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchBar<'a> {
    pub branch: &'a str,
    pub disbursements: f64,
    pub collections: f64,
    pub arrears: f64,
    pub collection_rate: f64,
}

impl<'a> From<&'a BranchMetric> for BranchBar<'a> {
    fn from(b: &'a BranchMetric) -> Self {
        Self {
            branch: &b.branch,
            disbursements: b.total_disbursements,
            collections: b.total_collections,
            arrears: b.total_arrears,
            collection_rate: b.collection_rate,
        }
    }
}

// ============ Overview ============

#[derive(Debug, Clone, Serialize)]
pub struct RankedInsight<'a> {
    pub rank: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewModel<'a> {
    pub cards: Vec<Card>,
    pub branch_chart: Vec<BranchBar<'a>>,
    pub insights: Vec<RankedInsight<'a>>,
}

pub fn overview(snapshot: &OverviewSnapshot) -> OverviewModel<'_> {
    let summary = &snapshot.summary;
    let cards = vec![
        Card::new("Total Disbursements", format_kes(summary.total_disbursements))
            .with_detail(format!("Across {} branches", format_count(summary.branch_count))),
        Card::new("Total Collections", format_kes(summary.total_collections)).with_detail(
            format!(
                "{} collection ratio",
                format_pct(metrics::collection_ratio_pct(summary), 1)
            ),
        ),
        Card::new("Total Arrears", format_kes(summary.total_arrears)).with_detail(format!(
            "{} of disbursements",
            format_pct(metrics::arrears_ratio_pct(summary), 1)
        )),
        Card::new(
            "Collection Rate",
            format_reported_pct(summary.overall_collection_rate),
        ),
        Card::new("Total Customers", format_count(summary.total_customers)),
        Card::new(
            "Average per Branch",
            format_kes(metrics::average_per_branch(summary)),
        ),
        Card::new("Active Branches", format_count(summary.branch_count)),
    ];

    OverviewModel {
        cards,
        branch_chart: snapshot
            .branches
            .iter()
            .take(OVERVIEW_CHART_BRANCHES)
            .map(BranchBar::from)
            .collect(),
        insights: snapshot
            .insights
            .iter()
            .take(OVERVIEW_INSIGHTS)
            .enumerate()
            .map(|(i, text)| RankedInsight {
                rank: i + 1,
                text: text.as_str(),
            })
            .collect(),
    }
}

// ============ Analytics ============

#[derive(Debug, Clone, Serialize)]
pub struct DisbursementShare<'a> {
    pub branch: &'a str,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceBlock<'a> {
    pub top_performer: Option<&'a str>,
    pub top_rate: Option<String>,
    pub total_branches: usize,
    pub average_collection_rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionBlock {
    pub total_collected: String,
    pub overall_rate: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskBlock {
    pub total_arrears: String,
    pub at_risk_branches: usize,
    pub arrears_ratio: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsModel<'a> {
    pub series: Vec<BranchBar<'a>>,
    pub share: Vec<DisbursementShare<'a>>,
    pub performance: PerformanceBlock<'a>,
    pub collection: CollectionBlock,
    pub risk: RiskBlock,
    pub distribution: RateDistribution,
}

pub fn analytics(snapshot: &AnalyticsSnapshot) -> AnalyticsModel<'_> {
    let summary = &snapshot.summary;
    let branches = &snapshot.branches;
    let top = metrics::top_performer(branches);

    AnalyticsModel {
        series: branches.iter().map(BranchBar::from).collect(),
        share: branches
            .iter()
            .map(|b| DisbursementShare {
                branch: &b.branch,
                share_pct: metrics::ratio_pct(b.total_disbursements, summary.total_disbursements),
            })
            .collect(),
        performance: PerformanceBlock {
            top_performer: top.map(|b| b.branch.as_str()),
            top_rate: top.map(|b| format_reported_pct(b.collection_rate)),
            total_branches: branches.len(),
            average_collection_rate: format_pct(metrics::average_collection_rate(branches), 1),
        },
        collection: CollectionBlock {
            total_collected: format_kes(summary.total_collections),
            overall_rate: format_reported_pct(summary.overall_collection_rate),
            target: format_reported_pct(COLLECTION_TARGET_PCT),
        },
        risk: RiskBlock {
            total_arrears: format_kes(summary.total_arrears),
            at_risk_branches: metrics::at_risk_branch_count(branches),
            arrears_ratio: format_pct(metrics::arrears_ratio_pct(summary), 1),
        },
        distribution: metrics::rate_distribution(branches),
    }
}

// ============ Branches ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub rate: RateBucket,
    /// Branch to show in the detail panel.
    #[serde(default)]
    pub selected: Option<String>,
}

impl BranchQuery {
    pub fn spec(&self) -> FilterSpec<RateBucket> {
        FilterSpec::new(self.search.as_str(), self.rate)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchStats<'a> {
    pub average_collection_rate: String,
    pub top_performer: Option<&'a str>,
    pub at_risk: usize,
    pub total_customers: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchDetail<'a> {
    pub branch: &'a str,
    pub disbursements: String,
    pub collections: String,
    pub arrears: String,
    pub collection_rate: String,
    pub customers: String,
    pub performance: RateBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchesModel<'a> {
    pub branches: Vec<&'a BranchMetric>,
    pub showing: usize,
    pub total: usize,
    pub stats: BranchStats<'a>,
    pub selected: Option<BranchDetail<'a>>,
}

/// Stats cover every branch; the table shows only the filtered ones.
pub fn branches<'a>(all: &'a [BranchMetric], query: &BranchQuery) -> BranchesModel<'a> {
    let rows = filters::apply(all, &query.spec());
    let selected = query
        .selected
        .as_deref()
        .and_then(|name| all.iter().find(|b| b.branch == name))
        .map(|b| BranchDetail {
            branch: &b.branch,
            disbursements: format_kes(b.total_disbursements),
            collections: format_kes(b.total_collections),
            arrears: format_kes(b.total_arrears),
            collection_rate: format_reported_pct(b.collection_rate),
            customers: format_count(b.customer_count),
            performance: RateBucket::classify(b.collection_rate),
        });

    BranchesModel {
        showing: rows.len(),
        total: all.len(),
        branches: rows,
        stats: BranchStats {
            average_collection_rate: format_pct(metrics::average_collection_rate(all), 1),
            top_performer: metrics::top_performer(all).map(|b| b.branch.as_str()),
            at_risk: metrics::at_risk_branch_count(all),
            total_customers: format_count(metrics::total_branch_customers(all)),
        },
        selected,
    }
}

fn branch_options(branches: &[BranchMetric]) -> Vec<&str> {
    branches.iter().map(|b| b.branch.as_str()).collect()
}

// ============ Customers ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub branch: Choice<String>,
}

impl CustomerQuery {
    pub fn spec(&self) -> FilterSpec<CustomerFacet> {
        FilterSpec::new(
            self.search.as_str(),
            CustomerFacet {
                branch: self.branch.clone(),
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    /// Server-side total, not just this page.
    pub total: u64,
    pub listed: usize,
    pub showing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomersModel<'a> {
    pub customers: Vec<&'a Customer>,
    pub stats: CustomerStats,
    pub branches: Vec<&'a str>,
}

pub fn customers<'a>(snapshot: &'a CustomersSnapshot, query: &CustomerQuery) -> CustomersModel<'a> {
    let rows = filters::apply(&snapshot.page.customers, &query.spec());
    CustomersModel {
        stats: CustomerStats {
            total: snapshot.page.total,
            listed: snapshot.page.customers.len(),
            showing: rows.len(),
        },
        customers: rows,
        branches: branch_options(&snapshot.branches),
    }
}

// ============ Loans ============

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub branch: Choice<String>,
    #[serde(default)]
    pub status: Choice<LoanStatus>,
}

impl LoanQuery {
    pub fn spec(&self) -> FilterSpec<LoanFacet> {
        FilterSpec::new(
            self.search.as_str(),
            LoanFacet {
                branch: self.branch.clone(),
                status: self.status.clone(),
            },
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoansModel<'a> {
    pub loans: Vec<&'a Loan>,
    pub showing: usize,
    pub tally: LoanStatusTally,
    pub branches: Vec<&'a str>,
    pub statuses: [LoanStatus; 3],
}

pub fn loans<'a>(snapshot: &'a LoansSnapshot, query: &LoanQuery) -> LoansModel<'a> {
    let rows = filters::apply(&snapshot.page.loans, &query.spec());
    LoansModel {
        showing: rows.len(),
        loans: rows,
        tally: metrics::loan_status_tally(&snapshot.page.loans, snapshot.page.total),
        branches: branch_options(&snapshot.branches),
        statuses: LoanStatus::ALL,
    }
}

// ============ Credit scoring ============

/// A score with its letter grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedScore {
    #[serde(flatten)]
    pub result: CreditScoreResult,
    pub grade: CreditGrade,
}

impl From<CreditScoreResult> for GradedScore {
    fn from(result: CreditScoreResult) -> Self {
        let grade = metrics::credit_grade(result.credit_score);
        Self { result, grade }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub risk: Choice<RiskCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoringRow {
    pub customer: Customer,
    pub score: Option<GradedScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditScoringModel {
    pub customers: Vec<ScoringRow>,
    pub showing: usize,
    pub scored: usize,
    pub risk_tally: BTreeMap<RiskCategory, usize>,
    pub average_score: f64,
    pub average_grade: Option<CreditGrade>,
}

/// Score calculation plus the per-customer result cache.
///
/// Results are kept until evicted; a customer
/// without a cached score never matches a specific risk filter.
#[derive(Clone)]
pub struct CreditScoring {
    api: DashboardApi,
    cache: Cache<String, CreditScoreResult>,
}

impl CreditScoring {
    pub fn new(api: DashboardApi) -> Self {
        Self {
            api,
            cache: Cache::builder().max_capacity(10_000).build(),
        }
    }

    /// Computes a fresh score and caches it.
    pub async fn calculate(&self, customer_id: &str) -> Result<GradedScore, DashboardError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(DashboardError::Validation(
                "customer_id is required".to_string(),
            ));
        }

        let result = self
            .api
            .calculate_credit_score(customer_id)
            .await
            .with_context(|| format!("Scoring {}", customer_id))?;
        tracing::info!(
            "Scored {}: {} ({})",
            result.customer_id,
            result.credit_score,
            result.risk_category
        );
        self.cache
            .insert(customer_id.to_string(), result.clone())
            .await;
        Ok(GradedScore::from(result))
    }

    pub async fn cached(&self, customer_id: &str) -> Option<CreditScoreResult> {
        self.cache.get(customer_id).await
    }


    /// Joins the fetched customers with their cached scores, then filters.
    ///
    /// Tallies and the average cover every scored customer on the page, not
    /// only the filtered rows.
    pub async fn model(&self, page: &CustomerPage, query: &ScoringQuery) -> CreditScoringModel {
        let mut joined = Vec::with_capacity(page.customers.len());
        for customer in &page.customers {
            joined.push(ScoredCustomer {
                score: self.cached(&customer.customer_id).await,
                customer: customer.clone(),
            });
        }
        scoring_model(&joined, query)
    }
}

/// Builds the scoring table from already-joined rows.
pub fn scoring_model(joined: &[ScoredCustomer], query: &ScoringQuery) -> CreditScoringModel {
    let scores: Vec<&CreditScoreResult> = joined.iter().filter_map(|c| c.score.as_ref()).collect();
    let average = metrics::average_score(scores.iter().copied());

    let spec = FilterSpec::new(query.search.as_str(), query.risk.clone());
    let rows: Vec<ScoringRow> = filters::apply(joined, &spec)
        .into_iter()
        .map(|c| ScoringRow {
            customer: c.customer.clone(),
            score: c.score.clone().map(GradedScore::from),
        })
        .collect();

    CreditScoringModel {
        showing: rows.len(),
        customers: rows,
        scored: scores.len(),
        risk_tally: metrics::risk_tally(scores.iter().copied()),
        average_grade: (!scores.is_empty()).then(|| metrics::credit_grade(average.round() as i32)),
        average_score: average,
    }
}

// ============ Reports ============

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub name: String,
    pub amount: String,
    pub loans: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportsModel {
    pub cards: Vec<Card>,
    pub by_status: Vec<BreakdownRow>,
    pub by_region: Vec<BreakdownRow>,
    pub total_branches: u64,
    pub total_loans: u64,
}

pub fn reports(report: &PortfolioAnalysis) -> ReportsModel {
    let cards = vec![
        Card::new(
            "Total Portfolio Value",
            format_kes_millions(report.total_portfolio_value),
        )
        .with_detail(format!("{} loans", format_count(report.total_loans))),
        Card::new("Total Collected", format_kes_millions(report.total_collected)).with_detail(
            format!("{} collection rate", format_reported_pct(report.collection_rate)),
        ),
        Card::new(
            "Portfolio at Risk",
            format_kes_millions(report.portfolio_at_risk),
        )
        .with_detail(format!(
            "PAR ratio {}",
            format_pct(metrics::par_ratio_pct(report), 2)
        )),
        Card::new(
            "Average Loan Size",
            format_kes(metrics::average_loan_size(report)),
        ),
        Card::new(
            "Outstanding Balance",
            format_kes_millions(metrics::outstanding_balance(report)),
        ),
    ];

    ReportsModel {
        cards,
        by_status: breakdown_rows(&report.by_status, capitalize),
        by_region: breakdown_rows(&report.by_region, str::to_string),
        total_branches: report.total_branches,
        total_loans: report.total_loans,
    }
}

/// One row per group found in either the amount or the count map.
fn breakdown_rows(breakdown: &Breakdown, label: impl Fn(&str) -> String) -> Vec<BreakdownRow> {
    let names: BTreeSet<&String> = breakdown
        .disbursement_amount
        .keys()
        .chain(breakdown.loan_id.keys())
        .collect();

    names
        .into_iter()
        .map(|name| BreakdownRow {
            name: label(name.as_str()),
            amount: format_kes_millions(
                breakdown.disbursement_amount.get(name).copied().unwrap_or(0.0),
            ),
            loans: breakdown.loan_id.get(name).copied().unwrap_or(0),
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============ Messaging & Settings ============

#[derive(Debug, Clone, Serialize)]
pub struct ChannelModel<'a> {
    pub configured: bool,
    pub status: &'a str,
    pub features: &'a [String],
    pub actions: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagingModel<'a> {
    pub whatsapp: ChannelModel<'a>,
    pub telegram: ChannelModel<'a>,
}

pub fn messaging(status: &MessagingStatus) -> MessagingModel<'_> {
    fn channel<'a>(
        c: &'a ChannelStatus,
        actions: &'static [&'static str],
    ) -> ChannelModel<'a> {
        ChannelModel {
            configured: c.configured,
            status: c
                .status
                .as_deref()
                .unwrap_or(if c.configured { "Configured" } else { "Not configured" }),
            features: &c.features,
            actions,
        }
    }

    MessagingModel {
        whatsapp: channel(
            &status.whatsapp,
            &["daily-summary", "branch-performance", "motivational"],
        ),
        telegram: channel(&status.telegram, &["daily-summary", "branch-performance"]),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsModel {
    pub configured: Vec<(String, bool)>,
}

pub fn settings(status: &SettingsStatus) -> SettingsModel {
    SettingsModel {
        configured: crate::settings::configured_flags(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreditRecommendation, SummaryMetric};
    use chrono::NaiveDate;

    fn branch(name: &str, rate: f64) -> BranchMetric {
        BranchMetric {
            branch: name.to_string(),
            total_disbursements: 200_000.0,
            total_collections: 2_000.0 * rate,
            total_arrears: 200_000.0 - 2_000.0 * rate,
            collection_rate: rate,
            customer_count: 40,
        }
    }

    fn summary() -> SummaryMetric {
        SummaryMetric {
            total_disbursements: 1_000_000.0,
            total_collections: 850_000.0,
            total_arrears: 150_000.0,
            overall_collection_rate: 85.0,
            branch_count: 5,
            total_customers: 1_200,
        }
    }

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            customer_id: id.to_string(),
            name: name.to_string(),
            phone: "+254712345678".to_string(),
            branch: "Thika".to_string(),
            region: "Central".to_string(),
            registration_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        }
    }

    fn score(id: &str, value: i32, risk: RiskCategory) -> CreditScoreResult {
        CreditScoreResult {
            customer_id: id.to_string(),
            customer_name: "Test".to_string(),
            credit_score: value,
            risk_category: risk,
            recommendation: CreditRecommendation {
                max_loan_amount: 50_000.0,
                recommended_interest_rate: 14.0,
                approval_likelihood: "High".to_string(),
                suggestions: vec![],
            },
            features: BTreeMap::new(),
        }
    }

    #[test]
    fn test_overview_cards() {
        let snapshot = OverviewSnapshot {
            summary: summary(),
            branches: (0..8).map(|i| branch(&format!("B{}", i), 85.0)).collect(),
            insights: (0..7).map(|i| format!("insight {}", i)).collect(),
        };
        let model = overview(&snapshot);

        let collections = card(&model.cards, "Total Collections").unwrap();
        assert_eq!(collections.detail.as_deref(), Some("85.0% collection ratio"));
        assert_eq!(
            card(&model.cards, "Average per Branch").unwrap().value,
            "KES 200,000"
        );
        assert_eq!(
            card(&model.cards, "Total Disbursements").unwrap().detail.as_deref(),
            Some("Across 5 branches")
        );
        assert_eq!(model.branch_chart.len(), OVERVIEW_CHART_BRANCHES);
        assert_eq!(model.insights.len(), OVERVIEW_INSIGHTS);
        assert_eq!(model.insights[0].rank, 1);
        assert_eq!(model.insights[0].text, "insight 0");
    }

    #[test]
    fn test_overview_with_empty_portfolio() {
        let snapshot = OverviewSnapshot {
            summary: SummaryMetric {
                total_disbursements: 0.0,
                total_collections: 0.0,
                total_arrears: 0.0,
                overall_collection_rate: 0.0,
                branch_count: 0,
                total_customers: 0,
            },
            branches: vec![],
            insights: vec![],
        };
        let model = overview(&snapshot);
        assert_eq!(
            card(&model.cards, "Total Collections").unwrap().detail.as_deref(),
            Some("0.0% collection ratio")
        );
        assert_eq!(card(&model.cards, "Average per Branch").unwrap().value, "KES 0");
    }

    #[test]
    fn test_analytics_blocks() {
        let snapshot = AnalyticsSnapshot {
            summary: summary(),
            branches: vec![branch("Nyeri", 95.0), branch("Thika", 85.0), branch("Kitui", 70.0)],
        };
        let model = analytics(&snapshot);
        assert_eq!(model.performance.top_performer, Some("Nyeri"));
        assert_eq!(model.performance.average_collection_rate, "83.3%");
        assert_eq!(model.collection.target, "90%");
        assert_eq!(model.risk.at_risk_branches, 1);
        assert_eq!(model.risk.arrears_ratio, "15.0%");
        assert_eq!(
            model.distribution,
            RateDistribution {
                high: 1,
                medium: 1,
                low: 1
            }
        );
        // Share of the portfolio total, not of the listed branches
        assert_eq!(model.share[0].branch, "Nyeri");
        assert!((model.share[0].share_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_analytics_share_without_portfolio_total() {
        let snapshot = AnalyticsSnapshot {
            summary: SummaryMetric::default(),
            branches: vec![branch("Nyeri", 95.0)],
        };
        let model = analytics(&snapshot);
        assert_eq!(model.share[0].share_pct, 0.0);
    }

    #[test]
    fn test_branches_filter_and_detail() {
        let all = vec![branch("Nyeri", 95.0), branch("Thika", 85.0), branch("Kitui", 70.0)];
        let query = BranchQuery {
            search: String::new(),
            rate: RateBucket::Low,
            selected: Some("Nyeri".to_string()),
        };
        let model = branches(&all, &query);
        assert_eq!(model.showing, 1);
        assert_eq!(model.branches[0].branch, "Kitui");
        assert_eq!(model.stats.at_risk, 1);
        assert_eq!(model.stats.total_customers, "120");
        let detail = model.selected.unwrap();
        assert_eq!(detail.branch, "Nyeri");
        assert_eq!(detail.performance, RateBucket::High);
    }

    #[test]
    fn test_scoring_model_joins_cache() {
        let joined = vec![
            ScoredCustomer {
                customer: customer("CUST001", "Achieng Otieno"),
                score: Some(score("CUST001", 760, RiskCategory::Excellent)),
            },
            ScoredCustomer {
                customer: customer("CUST002", "Brian Mwangi"),
                score: None,
            },
            ScoredCustomer {
                customer: customer("CUST003", "Faith Njeri"),
                score: Some(score("CUST003", 640, RiskCategory::Fair)),
            },
        ];

        let all = scoring_model(&joined, &ScoringQuery::default());
        assert_eq!(all.showing, 3);
        assert_eq!(all.scored, 2);
        assert_eq!(all.average_score, 700.0);
        assert_eq!(all.average_grade, Some(CreditGrade::A));
        assert_eq!(all.risk_tally[&RiskCategory::Excellent], 1);
        assert_eq!(all.risk_tally[&RiskCategory::HighRisk], 0);
        assert_eq!(
            all.customers[0].score.as_ref().unwrap().grade,
            CreditGrade::APlus
        );

        let fair = scoring_model(
            &joined,
            &ScoringQuery {
                search: String::new(),
                risk: Choice::Only(RiskCategory::Fair),
            },
        );
        assert_eq!(fair.showing, 1);
        assert_eq!(fair.customers[0].customer.customer_id, "CUST003");
    }

    #[test]
    fn test_reports_breakdowns() {
        let mut by_status = Breakdown::default();
        by_status
            .disbursement_amount
            .insert("active".to_string(), 12_300_000.0);
        by_status.loan_id.insert("active".to_string(), 410);
        by_status.loan_id.insert("overdue".to_string(), 35);

        let report = PortfolioAnalysis {
            total_portfolio_value: 20_000_000.0,
            total_collected: 15_000_000.0,
            portfolio_at_risk: 1_000_000.0,
            par_ratio: 5.0,
            collection_rate: 75.0,
            by_status,
            by_region: Breakdown::default(),
            total_branches: 10,
            total_loans: 0,
        };
        let model = reports(&report);

        assert_eq!(
            model.by_status,
            vec![
                BreakdownRow {
                    name: "Active".to_string(),
                    amount: "KES 12.3M".to_string(),
                    loans: 410
                },
                BreakdownRow {
                    name: "Overdue".to_string(),
                    amount: "KES 0.0M".to_string(),
                    loans: 35
                },
            ]
        );
        assert_eq!(
            card(&model.cards, "Average Loan Size").unwrap().value,
            "KES 20,000,000"
        );
        assert_eq!(
            card(&model.cards, "Outstanding Balance").unwrap().value,
            "KES 5.0M"
        );
        assert_eq!(
            card(&model.cards, "Portfolio at Risk").unwrap().detail.as_deref(),
            Some("PAR ratio 5.00%")
        );
    }
}
