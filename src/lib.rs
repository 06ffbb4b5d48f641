//! # Parish Ledger
//!
//! A library for turning a folder of parish council cashbook exports into a
//! drill-down pivot table of income and expenditure.
//!
//! ## Core Concepts
//!
//! - **Fiscal Period**: A year running 1 April to 31 March, keyed as
//!   `<startYear>-<endDigit>` (`2024-5` is April 2024 to March 2025)
//! - **Classification**: Each export's period, as-of date and completeness are
//!   inferred from its filename alone
//! - **Rollup**: Lines are grouped Type → Cost Centre → Account, with amount,
//!   VAT and total summed at every level
//! - **Expansion State**: Which nodes are open; rendering is a pure function of
//!   the tree and this state, and switching period resets it
//! - **Data Currency**: "Complete year data" or the date a part-year export
//!   runs to
//!
//! ## Example
//!
//! ```rust,ignore
//! use parish_ledger::*;
//!
//! let config = LedgerConfig::for_directory("/srv/parish/cashbook");
//! let mut viewer = match open_viewer(&config) {
//!     Ok(viewer) => viewer,
//!     Err(reason) => {
//!         eprintln!("{}", reason);
//!         return;
//!     }
//! };
//!
//! viewer.toggle(&NodePath::new(["Expense"]));
//! println!("{}", viewer.data_currency().unwrap_or_default());
//! println!("{}", render_text(viewer.rows()));
//! ```

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod ingestion;
pub mod period;
pub mod record;
pub mod render;
pub mod viewer;

pub use aggregate::{aggregate, compare_type_labels, Aggregation, GroupLevel, GroupNode, Totals};
pub use classifier::{classify, Classification};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use export::{export_csv, export_file_name};
pub use format::{format_currency, format_number, format_unsigned_currency, parse_amount};
pub use ingestion::*;
pub use period::{start_year, tab_label, FiscalPeriod, PeriodMetadata, UNKNOWN_PERIOD};
pub use record::{TransactionRecord, FIELD_NAMES, UNKNOWN_LABEL};
pub use render::{render, render_text, ExpansionState, NodePath, Row, RowKind};
pub use viewer::{data_currency, PeriodSummary, PeriodTab, PeriodViewer};

use log::info;

/// Ingests the configured folder and opens a viewer on the newest period.
///
/// A missing, unconfigured or empty source comes back as the reason to show
/// the user instead of a table.
pub fn open_viewer(config: &LedgerConfig) -> std::result::Result<PeriodViewer, SourceUnavailable> {
    match ingest(config) {
        IngestOutcome::Loaded(bundle) => {
            info!("Opening viewer over {} periods", bundle.periods.len());
            Ok(PeriodViewer::new(bundle))
        }
        IngestOutcome::Unavailable(reason) => Err(reason),
    }
}
