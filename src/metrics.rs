//! Read-only aggregates over branch, loan and portfolio snapshots.
//!
//! Every function is pure and recomputed per render. Ratios are guarded so a
//! zero or missing denominator yields `0.0`, never NaN or infinity.

use crate::models::{
    BranchMetric, CreditScoreResult, Loan, LoanStatus, PortfolioAnalysis, RiskCategory,
    SummaryMetric,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Branches below this collection rate count as at risk.
pub const AT_RISK_THRESHOLD: f64 = 80.0;
/// Collection rate at or above which a branch is a high performer.
pub const HIGH_PERFORMANCE_THRESHOLD: f64 = 90.0;

/// `numerator / denominator * 100`, or `0.0` when the result would not be finite.
pub fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return 0.0;
    }
    let pct = numerator / denominator * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

pub fn collection_ratio_pct(summary: &SummaryMetric) -> f64 {
    ratio_pct(summary.total_collections, summary.total_disbursements)
}

pub fn arrears_ratio_pct(summary: &SummaryMetric) -> f64 {
    ratio_pct(summary.total_arrears, summary.total_disbursements)
}

/// Disbursements per branch, with the branch count floored at 1.
pub fn average_per_branch(summary: &SummaryMetric) -> f64 {
    let per_branch = summary.total_disbursements / summary.branch_count.max(1) as f64;
    if per_branch.is_finite() {
        per_branch
    } else {
        0.0
    }
}

pub fn average_collection_rate(branches: &[BranchMetric]) -> f64 {
    if branches.is_empty() {
        return 0.0;
    }
    branches.iter().map(|b| b.collection_rate).sum::<f64>() / branches.len() as f64
}

/// Branch with the highest collection rate; the first one wins a tie.
pub fn top_performer(branches: &[BranchMetric]) -> Option<&BranchMetric> {
    branches.iter().fold(None, |best: Option<&BranchMetric>, b| match best {
        Some(current) if current.collection_rate >= b.collection_rate => Some(current),
        _ => Some(b),
    })
}

pub fn at_risk_branch_count(branches: &[BranchMetric]) -> usize {
    branches
        .iter()
        .filter(|b| b.collection_rate < AT_RISK_THRESHOLD)
        .count()
}

pub fn total_branch_customers(branches: &[BranchMetric]) -> u64 {
    branches.iter().map(|b| b.customer_count).sum()
}

/// Number of branches in each collection-rate bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

pub fn rate_distribution(branches: &[BranchMetric]) -> RateDistribution {
    branches
        .iter()
        .fold(RateDistribution::default(), |mut dist, b| {
            if b.collection_rate >= HIGH_PERFORMANCE_THRESHOLD {
                dist.high += 1;
            } else if b.collection_rate >= AT_RISK_THRESHOLD {
                dist.medium += 1;
            } else {
                dist.low += 1;
            }
            dist
        })
}

/// Loan counts by status over the fetched page, next to the server total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoanStatusTally {
    pub total: u64,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn loan_status_tally(loans: &[Loan], server_total: u64) -> LoanStatusTally {
    let mut tally = LoanStatusTally {
        total: server_total,
        ..Default::default()
    };
    for loan in loans {
        match loan.status {
            LoanStatus::Active => tally.active += 1,
            LoanStatus::Completed => tally.completed += 1,
            LoanStatus::Overdue => tally.overdue += 1,
        }
    }
    tally
}

/// Portfolio at risk as a share of portfolio value, recomputed with the zero guard.
pub fn par_ratio_pct(report: &PortfolioAnalysis) -> f64 {
    ratio_pct(report.portfolio_at_risk, report.total_portfolio_value)
}

pub fn average_loan_size(report: &PortfolioAnalysis) -> f64 {
    let avg = report.total_portfolio_value / report.total_loans.max(1) as f64;
    if avg.is_finite() {
        avg
    } else {
        0.0
    }
}

pub fn outstanding_balance(report: &PortfolioAnalysis) -> f64 {
    report.total_portfolio_value - report.total_collected
}

// ============ Credit Grades ============

/// Letter grade for a credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CreditGrade {
    APlus,
    A,
    BPlus,
    B,
    CPlus,
    C,
    D,
    F,
}

impl CreditGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditGrade::APlus => "A+",
            CreditGrade::A => "A",
            CreditGrade::BPlus => "B+",
            CreditGrade::B => "B",
            CreditGrade::CPlus => "C+",
            CreditGrade::C => "C",
            CreditGrade::D => "D",
            CreditGrade::F => "F",
        }
    }
}

impl fmt::Display for CreditGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CreditGrade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Lower bound of each grade, highest first.
const GRADE_FLOORS: [(i32, CreditGrade); 7] = [
    (750, CreditGrade::APlus),
    (700, CreditGrade::A),
    (650, CreditGrade::BPlus),
    (600, CreditGrade::B),
    (550, CreditGrade::CPlus),
    (500, CreditGrade::C),
    (450, CreditGrade::D),
];

pub fn credit_grade(score: i32) -> CreditGrade {
    GRADE_FLOORS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(CreditGrade::F)
}

/// Cached scores per risk category, every category present.
pub fn risk_tally<'a, I>(scores: I) -> BTreeMap<RiskCategory, usize>
where
    I: IntoIterator<Item = &'a CreditScoreResult>,
{
    let mut tally: BTreeMap<RiskCategory, usize> =
        RiskCategory::ALL.iter().map(|c| (*c, 0)).collect();
    for score in scores {
        *tally.entry(score.risk_category).or_insert(0) += 1;
    }
    tally
}

pub fn average_score<'a, I>(scores: I) -> f64
where
    I: IntoIterator<Item = &'a CreditScoreResult>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0i64, 0usize), |(sum, n), s| (sum + s.credit_score as i64, n + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
