use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::format::parse_amount;

/// Label used for any missing grouping key.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Column names of a cashbook export, in export order.
pub const FIELD_NAMES: [&str; 12] = [
    "type",
    "date",
    "payee",
    "reference",
    "vat",
    "centre",
    "centre_name",
    "account",
    "account_name",
    "amount",
    "total_amount",
    "detail",
];

/// One cashbook line. Text fields hold the source cell verbatim; grouping
/// labels are resolved on read so that exports keep empty cells empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    /// Day-first `DD/MM/YYYY`, displayed as given.
    pub date: String,
    pub payee: String,
    pub reference: String,
    pub vat: f64,
    pub centre: String,
    pub centre_name: String,
    pub account: String,
    pub account_name: String,
    /// Net of VAT.
    pub amount: f64,
    /// Gross.
    pub total_amount: f64,
    pub detail: String,
}

fn label_or_unknown(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_LABEL
    } else {
        trimmed
    }
}

impl TransactionRecord {
    /// Builds a record from a column lookup. Columns the lookup does not know
    /// about read as empty; numeric columns go through [`parse_amount`].
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let text = |name: &str| lookup(name).unwrap_or("").to_string();
        let number = |name: &str| parse_amount(lookup(name).unwrap_or(""));

        Self {
            record_type: text("type"),
            date: text("date"),
            payee: text("payee"),
            reference: text("reference"),
            vat: number("vat"),
            centre: text("centre"),
            centre_name: text("centre_name"),
            account: text("account"),
            account_name: text("account_name"),
            amount: number("amount"),
            total_amount: number("total_amount"),
            detail: text("detail"),
        }
    }

    pub fn type_label(&self) -> &str {
        label_or_unknown(&self.record_type)
    }

    pub fn centre_label(&self) -> &str {
        label_or_unknown(&self.centre_name)
    }

    pub fn account_label(&self) -> &str {
        label_or_unknown(&self.account_name)
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%d/%m/%Y").ok()
    }

    /// Cell values in [`FIELD_NAMES`] order.
    pub fn field_values(&self) -> [String; 12] {
        [
            self.record_type.clone(),
            self.date.clone(),
            self.payee.clone(),
            self.reference.clone(),
            self.vat.to_string(),
            self.centre.clone(),
            self.centre_name.clone(),
            self.account.clone(),
            self.account_name.clone(),
            self.amount.to_string(),
            self.total_amount.to_string(),
            self.detail.clone(),
        ]
    }
}
