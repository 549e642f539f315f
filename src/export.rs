//! CSV export of the currently filtered rows of a view.
//!
//! Fields go through the `csv` writer, so a value holding a comma, quote or
//! newline is quoted instead of splitting the row.

use crate::errors::DashboardError;
use crate::models::{BranchMetric, Customer, Loan};
use chrono::NaiveDate;

/// A row type with a fixed, human-readable header.
pub trait CsvRecord {
    const HEADERS: &'static [&'static str];

    fn csv_fields(&self) -> Vec<String>;
}

impl CsvRecord for BranchMetric {
    const HEADERS: &'static [&'static str] = &[
        "Branch",
        "Disbursements",
        "Collections",
        "Arrears",
        "Collection Rate (%)",
        "Customers",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.branch.clone(),
            self.total_disbursements.to_string(),
            self.total_collections.to_string(),
            self.total_arrears.to_string(),
            self.collection_rate.to_string(),
            self.customer_count.to_string(),
        ]
    }
}

impl CsvRecord for Customer {
    const HEADERS: &'static [&'static str] = &[
        "Customer ID",
        "Name",
        "Phone",
        "Branch",
        "Region",
        "Registration Date",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.customer_id.clone(),
            self.name.clone(),
            self.phone.clone(),
            self.branch.clone(),
            self.region.clone(),
            self.registration_date.to_string(),
        ]
    }
}

impl CsvRecord for Loan {
    const HEADERS: &'static [&'static str] = &[
        "Loan ID",
        "Customer ID",
        "Customer Name",
        "Branch",
        "Amount",
        "Disbursement Date",
        "Due Date",
        "Status",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.loan_id.clone(),
            self.customer_id.clone(),
            self.customer_name.clone(),
            self.branch.clone(),
            self.disbursement_amount.to_string(),
            self.disbursement_date.to_string(),
            self.due_date.to_string(),
            self.status.to_string(),
        ]
    }
}

/// Serializes the header plus one line per record, `\n`-terminated.
pub fn to_csv<T: CsvRecord>(records: &[&T]) -> Result<String, DashboardError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(T::HEADERS)?;
    for record in records {
        writer.write_record(record.csv_fields())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}

/// `kechita-<view>-YYYY-MM-DD.csv`
pub fn export_filename(view: &str, date: NaiveDate) -> String {
    format!("kechita-{}-{}.csv", view, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoanStatus;

    #[test]
    fn test_branch_export() {
        let branch = BranchMetric {
            branch: "Eldoret".to_string(),
            total_disbursements: 1_500_000.0,
            total_collections: 1_275_000.0,
            total_arrears: 225_000.0,
            collection_rate: 85.0,
            customer_count: 320,
        };
        let csv = to_csv(&[&branch]).unwrap();
        assert_eq!(
            csv,
            "Branch,Disbursements,Collections,Arrears,Collection Rate (%),Customers\n\
             Eldoret,1500000,1275000,225000,85,320\n"
        );
    }

    #[test]
    fn test_loan_export_uses_iso_dates_and_status() {
        let loan = Loan {
            loan_id: "LOAN000001".to_string(),
            customer_id: "CUST000001".to_string(),
            customer_name: "Wanjiru Kamau".to_string(),
            branch: "Nyeri".to_string(),
            disbursement_amount: 25_000.5,
            disbursement_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
            status: LoanStatus::Active,
        };
        let csv = to_csv(&[&loan]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "LOAN000001,CUST000001,Wanjiru Kamau,Nyeri,25000.5,2026-01-15,2026-04-15,active"
        );
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let csv = to_csv::<Customer>(&[]).unwrap();
        assert_eq!(
            csv,
            "Customer ID,Name,Phone,Branch,Region,Registration Date\n"
        );
    }

    #[test]
    fn test_filename_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(
            export_filename("branches", date),
            "kechita-branches-2026-10-14.csv"
        );
    }
}
