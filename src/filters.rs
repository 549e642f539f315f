//! Search-and-facet filtering over snapshot records.
//!
//! A [`FilterSpec`] pairs a free-text search term with a per-record-type facet.
//! Both must match (logical AND). Filtering is stable: the output keeps the
//! input order and never resorts.

use crate::metrics::{AT_RISK_THRESHOLD, HIGH_PERFORMANCE_THRESHOLD};
use crate::models::{BranchMetric, CreditScoreResult, Customer, Loan, LoanStatus, RiskCategory};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Either "all" or one specific value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice<T> {
    All,
    Only(T),
}

impl<T> Default for Choice<T> {
    fn default() -> Self {
        Choice::All
    }
}

impl<T: PartialEq> Choice<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(expected) => expected == value,
        }
    }
}

impl<T: FromStr> FromStr for Choice<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Ok(Choice::All)
        } else {
            trimmed.parse().map(Choice::Only)
        }
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str("all"),
            Choice::Only(value) => value.fmt(f),
        }
    }
}

impl<'de, T> Deserialize<'de> for Choice<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl<T: fmt::Display> Serialize for Choice<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Collection-rate bucket used by the branches view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBucket {
    #[default]
    All,
    /// ≥ 90
    High,
    /// 80 ≤ rate < 90
    Medium,
    /// < 80
    Low,
}

impl RateBucket {
    /// The concrete bucket a rate falls in (never `All`).
    pub fn classify(rate: f64) -> RateBucket {
        if rate >= HIGH_PERFORMANCE_THRESHOLD {
            RateBucket::High
        } else if rate >= AT_RISK_THRESHOLD {
            RateBucket::Medium
        } else {
            RateBucket::Low
        }
    }

    pub fn contains(&self, rate: f64) -> bool {
        match self {
            RateBucket::All => true,
            RateBucket::High => rate >= HIGH_PERFORMANCE_THRESHOLD,
            RateBucket::Medium => (AT_RISK_THRESHOLD..HIGH_PERFORMANCE_THRESHOLD).contains(&rate),
            RateBucket::Low => rate < AT_RISK_THRESHOLD,
        }
    }
}

/// Free-text term plus facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec<F> {
    pub search_term: String,
    pub facet: F,
}

impl<F> FilterSpec<F> {
    pub fn new(search_term: impl Into<String>, facet: F) -> Self {
        Self {
            search_term: search_term.into(),
            facet,
        }
    }
}

/// A record the filter engine can search and facet.
pub trait Filterable {
    type Facet;

    /// Text fields the search term is matched against.
    fn search_fields(&self) -> Vec<&str>;

    fn matches_facet(&self, facet: &Self::Facet) -> bool;
}

/// Returns the records matching both the search term and the facet, in input order.
///
/// The term is a case-insensitive literal substring; an empty term matches
/// every record.
pub fn apply<'a, T: Filterable>(records: &'a [T], spec: &FilterSpec<T::Facet>) -> Vec<&'a T> {
    let needle = spec.search_term.to_lowercase();
    records
        .iter()
        .filter(|record| {
            contains_folded(&record.search_fields(), &needle) && record.matches_facet(&spec.facet)
        })
        .collect()
}

fn contains_folded(fields: &[&str], needle: &str) -> bool {
    needle.is_empty()
        || fields
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}

// ============ Record Implementations ============

impl Filterable for BranchMetric {
    type Facet = RateBucket;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.branch.as_str()]
    }

    fn matches_facet(&self, facet: &RateBucket) -> bool {
        facet.contains(self.collection_rate)
    }
}

/// Branch selection for the customers view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFacet {
    pub branch: Choice<String>,
}

impl Filterable for Customer {
    type Facet = CustomerFacet;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.customer_id.as_str(), self.phone.as_str()]
    }

    fn matches_facet(&self, facet: &CustomerFacet) -> bool {
        facet.branch.admits(&self.branch)
    }
}

/// Branch and status selection for the loans view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanFacet {
    pub branch: Choice<String>,
    pub status: Choice<LoanStatus>,
}

impl Filterable for Loan {
    type Facet = LoanFacet;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.loan_id.as_str(),
            self.customer_name.as_str(),
            self.customer_id.as_str(),
        ]
    }

    fn matches_facet(&self, facet: &LoanFacet) -> bool {
        facet.branch.admits(&self.branch) && facet.status.admits(&self.status)
    }
}

/// A customer next to their cached score, if one has been computed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub customer: Customer,
    pub score: Option<CreditScoreResult>,
}

impl Filterable for ScoredCustomer {
    type Facet = Choice<RiskCategory>;

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.customer.name.as_str(),
            self.customer.customer_id.as_str(),
        ]
    }

    /// A specific risk only matches customers whose score is already cached.
    fn matches_facet(&self, facet: &Choice<RiskCategory>) -> bool {
        match facet {
            Choice::All => true,
            Choice::Only(risk) => self
                .score
                .as_ref()
                .is_some_and(|s| s.risk_category == *risk),
        }
    }
}
