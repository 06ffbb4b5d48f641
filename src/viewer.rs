use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, Aggregation, EXPENSE_TYPE, INCOME_TYPE};
use crate::error::{LedgerError, Result};
use crate::export::{export_csv, export_file_name};
use crate::format::{format_currency, format_unsigned_currency};
use crate::ingestion::LedgerBundle;
use crate::period::{tab_label, FiscalPeriod};
use crate::record::TransactionRecord;
use crate::render::{render, ExpansionState, NodePath, Row};

pub const COMPLETE_YEAR_TEXT: &str = "Complete year data";

/// Headline figures for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub income: f64,
    /// Negative by convention.
    pub expense: f64,
    pub net: f64,
    pub opening_balance: Option<f64>,
    pub closing_balance: Option<f64>,
}

impl PeriodSummary {
    pub fn from_records(records: &[TransactionRecord], opening_balance: Option<f64>) -> Self {
        let total_of = |kind: &str| -> f64 {
            records
                .iter()
                .filter(|r| r.type_label() == kind)
                .map(|r| r.total_amount)
                .sum()
        };
        let income = total_of(INCOME_TYPE);
        let expense = total_of(EXPENSE_TYPE);
        let net = income + expense;
        Self {
            income,
            expense,
            net,
            opening_balance,
            closing_balance: opening_balance.map(|opening| opening + net),
        }
    }

    /// `(caption, value)` pairs as shown above the table. Expenditure is shown
    /// unsigned since its label carries the sign.
    pub fn display_lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();
        if let Some(opening) = self.opening_balance {
            lines.push(("Opening Balance", format_currency(opening)));
        }
        lines.push(("Total Income", format_currency(self.income)));
        lines.push(("Total Expenditure", format_unsigned_currency(self.expense)));
        lines.push(("Net", format_currency(self.net)));
        if let Some(closing) = self.closing_balance {
            lines.push(("Closing Balance", format_currency(closing)));
        }
        lines
    }
}

/// "Complete year data" or "Data to: 30 Nov 2025".
pub fn data_currency(period: &FiscalPeriod) -> String {
    if period.is_complete {
        COMPLETE_YEAR_TEXT.to_string()
    } else {
        format!(
            "Data to: {}",
            period.as_of_description.as_deref().unwrap_or("unknown")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTab {
    pub key: String,
    pub label: String,
    pub is_complete: bool,
    pub active: bool,
}

impl PeriodTab {
    /// Label with a trailing `*` marking a part-year period.
    pub fn display_label(&self) -> String {
        if self.is_complete {
            self.label.clone()
        } else {
            format!("{}*", self.label)
        }
    }
}

/// Owns the loaded periods, the active period and its expansion state.
///
/// Every change (period switch or node toggle) re-renders the full row set.
#[derive(Debug, Clone)]
pub struct PeriodViewer {
    bundle: LedgerBundle,
    active: Option<String>,
    aggregation: Aggregation,
    expansion: ExpansionState,
    rows: Vec<Row>,
}

impl PeriodViewer {
    /// Opens on the newest period, if there is one.
    pub fn new(bundle: LedgerBundle) -> Self {
        let first = bundle.period_order.first().cloned();
        let mut viewer = Self {
            bundle,
            active: None,
            aggregation: Aggregation::default(),
            expansion: ExpansionState::new(),
            rows: Vec::new(),
        };
        match first {
            Some(key) => viewer.activate(key),
            None => viewer.rerender(),
        }
        viewer
    }

    fn activate(&mut self, key: String) {
        let records = self
            .bundle
            .period(&key)
            .map(|p| p.records.as_slice())
            .unwrap_or_default();
        self.aggregation = aggregate(records);
        self.expansion.clear();
        info!("Activated period {} ({} records)", key, records.len());
        self.active = Some(key);
        self.rerender();
    }

    fn rerender(&mut self) {
        self.rows = render(&self.aggregation, &self.expansion);
    }

    /// Switches period. Expansion always resets, even between periods that
    /// share labels.
    pub fn select(&mut self, key: &str) -> Result<()> {
        if self.bundle.period(key).is_none() {
            return Err(LedgerError::UnknownPeriod(key.to_string()));
        }
        self.activate(key.to_string());
        Ok(())
    }

    pub fn toggle(&mut self, path: &NodePath) -> &[Row] {
        self.expansion = self.expansion.toggle(path);
        debug!(
            "Toggled {} (expanded: {})",
            path,
            self.expansion.is_expanded(path)
        );
        self.rerender();
        &self.rows
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    pub fn bundle(&self) -> &LedgerBundle {
        &self.bundle
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_period(&self) -> Option<&FiscalPeriod> {
        self.active.as_deref().and_then(|key| self.bundle.period(key))
    }

    pub fn summary(&self) -> Option<PeriodSummary> {
        self.active_period()
            .map(|p| PeriodSummary::from_records(&p.records, p.opening_balance))
    }

    pub fn data_currency(&self) -> Option<String> {
        self.active_period().map(data_currency)
    }

    pub fn tabs(&self) -> Vec<PeriodTab> {
        self.bundle
            .ordered_periods()
            .map(|p| PeriodTab {
                key: p.key.clone(),
                label: tab_label(&p.key),
                is_complete: p.is_complete,
                active: self.active.as_deref() == Some(p.key.as_str()),
            })
            .collect()
    }

    /// `(file name, contents)` of the active period's raw records.
    pub fn export(&self) -> Result<Option<(String, String)>> {
        match self.active_period() {
            Some(period) => Ok(Some((
                export_file_name(&period.key),
                export_csv(&period.records)?,
            ))),
            None => Ok(None),
        }
    }
}
