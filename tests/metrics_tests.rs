/// Derived metrics, formatting and CSV export
/// Plain unit-level checks of the render-time calculations
use kechita_dashboard::export::{export_filename, to_csv};
use kechita_dashboard::format::{format_kes, format_kes_millions, format_pct};
use kechita_dashboard::metrics::*;
use kechita_dashboard::models::{BranchMetric, Loan, LoanStatus, SummaryMetric};
use chrono::NaiveDate;

fn branch(name: &str, rate: f64) -> BranchMetric {
    BranchMetric {
        branch: name.to_string(),
        total_disbursements: 100.0,
        total_collections: rate,
        total_arrears: 100.0 - rate,
        collection_rate: rate,
        customer_count: 10,
    }
}

fn loan(id: &str, status: LoanStatus) -> Loan {
    Loan {
        loan_id: id.to_string(),
        customer_id: "CUST001".to_string(),
        customer_name: "Achieng Otieno".to_string(),
        branch: "Kisumu".to_string(),
        disbursement_amount: 30_000.0,
        disbursement_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        status,
    }
}

#[test]
fn test_grade_boundaries() {
    assert_eq!(credit_grade(850).as_str(), "A+");
    assert_eq!(credit_grade(750).as_str(), "A+");
    assert_eq!(credit_grade(749).as_str(), "A");
    assert_eq!(credit_grade(700).as_str(), "A");
    assert_eq!(credit_grade(699).as_str(), "B+");
    assert_eq!(credit_grade(650).as_str(), "B+");
    assert_eq!(credit_grade(600).as_str(), "B");
    assert_eq!(credit_grade(599).as_str(), "C+");
    assert_eq!(credit_grade(550).as_str(), "C+");
    assert_eq!(credit_grade(500).as_str(), "C");
    assert_eq!(credit_grade(499).as_str(), "D");
    assert_eq!(credit_grade(450).as_str(), "D");
    assert_eq!(credit_grade(449).as_str(), "F");
    assert_eq!(credit_grade(300).as_str(), "F");
}

#[test]
fn test_top_performer_first_seen_wins_tie() {
    let branches = vec![branch("A", 95.0), branch("B", 95.0), branch("C", 60.0)];
    assert_eq!(top_performer(&branches).unwrap().branch, "A");
    assert!(top_performer(&[]).is_none());
}

#[test]
fn test_branch_aggregates() {
    let branches = vec![branch("A", 95.0), branch("B", 79.9), branch("C", 80.0)];
    assert!((average_collection_rate(&branches) - 84.966_666).abs() < 1e-3);
    assert_eq!(at_risk_branch_count(&branches), 1);
    assert_eq!(total_branch_customers(&branches), 30);
    assert_eq!(average_collection_rate(&[]), 0.0);
}

#[test]
fn test_overview_scenario() {
    let summary = SummaryMetric {
        total_disbursements: 1_000_000.0,
        total_collections: 850_000.0,
        total_arrears: 150_000.0,
        overall_collection_rate: 85.0,
        branch_count: 5,
        total_customers: 900,
    };
    assert_eq!(format_pct(collection_ratio_pct(&summary), 1), "85.0%");
    assert_eq!(format_kes(average_per_branch(&summary)), "KES 200,000");
    assert_eq!(format_pct(arrears_ratio_pct(&summary), 1), "15.0%");
}

#[test]
fn test_empty_portfolio_average_is_zero() {
    let summary = SummaryMetric {
        total_disbursements: 0.0,
        total_collections: 0.0,
        total_arrears: 0.0,
        overall_collection_rate: 0.0,
        branch_count: 0,
        total_customers: 0,
    };
    assert_eq!(average_per_branch(&summary), 0.0);
    assert_eq!(collection_ratio_pct(&summary), 0.0);
}

#[test]
fn test_loan_tally_uses_server_total() {
    let loans = vec![
        loan("L1", LoanStatus::Active),
        loan("L2", LoanStatus::Overdue),
        loan("L3", LoanStatus::Active),
    ];
    let tally = loan_status_tally(&loans, 1_250);
    assert_eq!(
        tally,
        LoanStatusTally {
            total: 1_250,
            active: 2,
            completed: 0,
            overdue: 1
        }
    );
}

#[test]
fn test_currency_formatting() {
    assert_eq!(format_kes(1_234_567.0), "KES 1,234,567");
    assert_eq!(format_kes(1_234.5), "KES 1,234.5");
    assert_eq!(format_kes(f64::NAN), "KES 0");
    assert_eq!(format_kes_millions(12_345_678.0), "KES 12.3M");
}

#[test]
fn test_csv_quotes_embedded_comma() {
    let mut nairobi = branch("Nairobi, Central", 85.0);
    nairobi.total_disbursements = 100.0;
    let csv = to_csv(&[&nairobi]).unwrap();

    let row = csv.lines().nth(1).unwrap();
    assert_eq!(row, "\"Nairobi, Central\",100,85,15,85,10");

    // The row still parses back into six fields
    let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());
    let record = reader.records().next().unwrap().unwrap();
    assert_eq!(record.len(), 6);
    assert_eq!(&record[0], "Nairobi, Central");
}

#[test]
fn test_csv_quotes_newlines_and_quotes() {
    let odd = branch("Thika \"East\"\nAnnex", 90.0);
    let csv = to_csv(&[&odd]).unwrap();
    assert!(csv.contains("\"Thika \"\"East\"\"\nAnnex\""));
}

#[test]
fn test_export_filename() {
    let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    assert_eq!(export_filename("loans", date), "kechita-loans-2026-01-05.csv");
}
