use chrono::NaiveDate;
use serde::Serialize;

/// Column count of a complete billing grid row.
pub const BILL_COLUMNS: usize = 13;

const ISSUE_DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// One billing period as rendered by the portal. Every value stays as the
/// formatted text the page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    pub bill_number: String,
    pub issue_date: String,
    pub bill_month: String,
    pub water_charge: String,
    pub sewer_charge: String,
    pub vat: String,
    pub bill_amount: String,
    pub surcharge: String,
    pub total_bill: String,
    pub paid_date: String,
    pub paid_amount: String,
    pub status: String,
    pub balance: String,
}

impl BillRecord {
    /// Maps cells by position. Missing trailing columns become empty strings.
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();

        BillRecord {
            bill_number: cell(0),
            issue_date: cell(1),
            bill_month: cell(2),
            water_charge: cell(3),
            sewer_charge: cell(4),
            vat: cell(5),
            bill_amount: cell(6),
            surcharge: cell(7),
            total_bill: cell(8),
            paid_date: cell(9),
            paid_amount: cell(10),
            status: cell(11),
            balance: cell(12),
        }
    }

    pub fn parsed_issue_date(&self) -> Option<NaiveDate> {
        let raw = self.issue_date.trim();
        ISSUE_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
    }

    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Bill No", self.bill_number.clone()),
            ("Issue Date", self.issue_date.clone()),
            ("Bill Month", self.bill_month.clone()),
            ("Water Bill", self.water_charge.clone()),
            ("Sewer Bill", self.sewer_charge.clone()),
            ("VAT", self.vat.clone()),
            ("Bill Amt", self.bill_amount.clone()),
            ("Surcharge", self.surcharge.clone()),
            ("Total Bill", self.total_bill.clone()),
            ("Paid Date", self.paid_date.clone()),
            ("Paid Amt", self.paid_amount.clone()),
            ("Status", self.status.clone()),
            ("Balance", self.balance.clone()),
        ]
    }
}

/// A bill row has at least `min_columns` cells and starts with a numeric bill
/// number. Header, spacer and "Total" rows fail the second check.
pub fn is_valid_bill_row(cells: &[String], min_columns: usize) -> bool {
    if cells.len() < min_columns {
        return false;
    }

    match cells.first() {
        Some(first) => !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
