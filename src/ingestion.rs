use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classifier::classify;
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::period::{sort_period_keys, FiscalPeriod, PeriodMetadata};
use crate::record::TransactionRecord;

/// Why no ledger could be shown. The display text is meant for end users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceUnavailable {
    #[error("No data folder has been configured. Choose the folder holding your cashbook exports.")]
    NotConfigured,

    #[error("The data folder {0} does not exist.")]
    Missing(PathBuf),

    #[error("The data folder {0} could not be read.")]
    Unreadable(PathBuf),

    #[error("No cashbook export files were found in {0}.")]
    NoMatchingFiles(PathBuf),

    #[error("None of the cashbook export files in {0} could be read.")]
    NoReadableFiles(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Loaded(LedgerBundle),
    Unavailable(SourceUnavailable),
}

impl IngestOutcome {
    pub fn into_bundle(self) -> Option<LedgerBundle> {
        match self {
            IngestOutcome::Loaded(bundle) => Some(bundle),
            IngestOutcome::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&SourceUnavailable> {
        match self {
            IngestOutcome::Loaded(_) => None,
            IngestOutcome::Unavailable(reason) => Some(reason),
        }
    }
}

/// Every loaded period plus the order tabs should appear in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerBundle {
    pub periods: BTreeMap<String, FiscalPeriod>,
    /// Newest start year first.
    pub period_order: Vec<String>,
}

impl LedgerBundle {
    pub fn from_periods(periods: BTreeMap<String, FiscalPeriod>) -> Self {
        let mut period_order: Vec<String> = periods.keys().cloned().collect();
        sort_period_keys(&mut period_order);
        Self {
            periods,
            period_order,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period(&self, key: &str) -> Option<&FiscalPeriod> {
        self.periods.get(key)
    }

    pub fn metadata(&self, key: &str) -> Option<PeriodMetadata> {
        self.period(key).map(FiscalPeriod::metadata)
    }

    pub fn metadata_map(&self) -> BTreeMap<String, PeriodMetadata> {
        self.periods
            .iter()
            .map(|(key, period)| (key.clone(), period.metadata()))
            .collect()
    }

    pub fn ordered_periods(&self) -> impl Iterator<Item = &FiscalPeriod> {
        self.period_order.iter().filter_map(|key| self.periods.get(key))
    }
}

/// Decodes a cashbook export. Header names are trimmed and cells are looked up
/// by name, so column order does not matter and unknown columns are ignored.
///
/// Cells are decoded lossily: bytes that are not UTF-8 (a Windows-1252 `£`,
/// say) become U+FFFD and the row is kept.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns: HashMap<String, usize> = csv_reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (String::from_utf8_lossy(name).trim().to_string(), i))
        .collect();

    let mut records = Vec::new();
    for row in csv_reader.byte_records() {
        let row = row?;
        let cells: Vec<Cow<str>> = row.iter().map(String::from_utf8_lossy).collect();
        records.push(TransactionRecord::from_lookup(|name| {
            columns
                .get(name)
                .and_then(|&i| cells.get(i))
                .map(|cell| &**cell)
        }));
    }
    Ok(records)
}

pub fn read_records_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionRecord>> {
    read_records(File::open(path)?)
}

/// Reads the period key to opening balance side table. Anything other than a
/// readable JSON object of numbers yields no balances.
pub fn load_opening_balances(path: &Path) -> BTreeMap<String, f64> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No opening balances at {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unparseable opening balances {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };
    let Some(object) = value.as_object() else {
        debug!("Opening balances in {} are not a JSON object", path.display());
        return BTreeMap::new();
    };

    object
        .iter()
        .filter_map(|(key, balance)| match balance.as_f64() {
            Some(balance) => Some((key.clone(), balance)),
            None => {
                debug!("Skipping non-numeric opening balance for {}", key);
                None
            }
        })
        .collect()
}

/// Export files in `dir`, sorted by name, with case-only duplicates dropped.
fn list_export_files(dir: &Path, config: &LedgerConfig) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && config.matches_extension(path))
        .collect();
    paths.sort();

    let mut seen = HashSet::new();
    paths.retain(|path| {
        let lowered = file_name(path).to_lowercase();
        if seen.insert(lowered) {
            true
        } else {
            debug!("Skipping case-duplicate export {}", path.display());
            false
        }
    });
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Classifies each `(file name, decode result)` into its period. Failed files
/// are logged and skipped; a later file replaces an earlier one with the same
/// period key.
fn collect_periods<I>(loaded: I) -> BTreeMap<String, FiscalPeriod>
where
    I: IntoIterator<Item = (String, Result<Vec<TransactionRecord>>)>,
{
    let mut periods: BTreeMap<String, FiscalPeriod> = BTreeMap::new();
    for (name, result) in loaded {
        let records = match result {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping unreadable export '{}': {}", name, e);
                continue;
            }
        };
        let classification = classify(&name);
        debug!(
            "Loaded {} records from '{}' into period {}",
            records.len(),
            name,
            classification.period_key
        );

        let period = FiscalPeriod {
            key: classification.period_key.clone(),
            records,
            as_of_description: classification.as_of,
            is_complete: classification.is_complete,
            opening_balance: None,
            source_label: name,
        };
        if let Some(replaced) = periods.insert(classification.period_key, period) {
            warn!(
                "Period {} from '{}' replaced by a later export",
                replaced.key, replaced.source_label
            );
        }
    }
    periods
}

/// Loads every export in the configured folder into fiscal periods.
///
/// Never fails outright: a missing or empty source is reported as
/// [`IngestOutcome::Unavailable`] for the caller to show, as is a folder in
/// which no export could be read. Files that cannot be read are logged and
/// skipped. When two files resolve to the same period
/// the later one (by filename) replaces the earlier.
pub fn ingest(config: &LedgerConfig) -> IngestOutcome {
    let Some(dir) = config.data_dir.as_deref() else {
        return IngestOutcome::Unavailable(SourceUnavailable::NotConfigured);
    };
    if !dir.is_dir() {
        return IngestOutcome::Unavailable(SourceUnavailable::Missing(dir.to_path_buf()));
    }

    let files = match list_export_files(dir, config) {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not list {}: {}", dir.display(), e);
            return IngestOutcome::Unavailable(SourceUnavailable::Unreadable(dir.to_path_buf()));
        }
    };
    if files.is_empty() {
        return IngestOutcome::Unavailable(SourceUnavailable::NoMatchingFiles(
            dir.to_path_buf(),
        ));
    }

    let loaded = files
        .iter()
        .map(|path| (file_name(path), read_records_from_path(path)));
    let periods = collect_periods(loaded);
    let balances = config
        .opening_balances_path()
        .map(|path| load_opening_balances(&path))
        .unwrap_or_default();
    assemble(dir, files.len(), periods, balances)
}

/// Attaches opening balances and orders the periods. A folder whose exports
/// all failed to read is reported rather than shown as an empty table.
fn assemble(
    dir: &Path,
    file_count: usize,
    mut periods: BTreeMap<String, FiscalPeriod>,
    balances: BTreeMap<String, f64>,
) -> IngestOutcome {
    if periods.is_empty() {
        warn!("None of {} exports in {} could be read", file_count, dir.display());
        return IngestOutcome::Unavailable(SourceUnavailable::NoReadableFiles(
            dir.to_path_buf(),
        ));
    }

    for (key, balance) in balances {
        if let Some(period) = periods.get_mut(&key) {
            period.opening_balance = Some(balance);
        }
    }

    let bundle = LedgerBundle::from_periods(periods);
    info!(
        "Loaded {} periods from {} export files in {}",
        bundle.periods.len(),
        file_count,
        dir.display()
    );
    IngestOutcome::Loaded(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use std::io::{self, Write};

    fn denied() -> Result<Vec<TransactionRecord>> {
        Err(LedgerError::IoError(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }

    #[test]
    fn test_read_records_by_header_name() {
        let csv = " amount ,type,centre_name,account_name,total_amount,extra\n\
                   100,Income,Admin,Precept,100,ignored\n\
                   ,Expense,Admin,Clerk,-50,\n";
        let records = read_records(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, 100.0);
        assert_eq!(records[0].record_type, "Income");
        assert_eq!(records[0].payee, "");
        assert_eq!(records[1].amount, 0.0);
        assert_eq!(records[1].total_amount, -50.0);
        assert_eq!(records[1].account_name, "Clerk");
    }

    #[test]
    fn test_read_records_quoted_fields() {
        let csv = "type,payee,detail,total_amount\n\
                   Expense,\"Smith, J\",\"said \"\"hello\"\"\",-12.5\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].payee, "Smith, J");
        assert_eq!(records[0].detail, "said \"hello\"");
        assert_eq!(records[0].total_amount, -12.5);
    }

    #[test]
    fn test_load_opening_balances_variants() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("balances.json");
        let mut file = File::create(&path).unwrap();
        write!(file, r#"{{ "2024-5": 1500.25, "2023-4": "oops" }}"#).unwrap();
        let balances = load_opening_balances(&path);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances.get("2024-5"), Some(&1500.25));

        let array_path = dir.path().join("array.json");
        fs::write(&array_path, "[1, 2, 3]").unwrap();
        assert!(load_opening_balances(&array_path).is_empty());

        let broken_path = dir.path().join("broken.json");
        fs::write(&broken_path, "{ not json").unwrap();
        assert!(load_opening_balances(&broken_path).is_empty());

        assert!(load_opening_balances(&dir.path().join("absent.json")).is_empty());
    }

    #[test]
    fn test_ingest_not_configured() {
        let outcome = ingest(&LedgerConfig::default());
        assert_eq!(
            outcome.unavailable_reason(),
            Some(&SourceUnavailable::NotConfigured)
        );
    }

    #[test]
    fn test_ingest_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let outcome = ingest(&LedgerConfig::for_directory(&missing));
        assert_eq!(
            outcome.unavailable_reason(),
            Some(&SourceUnavailable::Missing(missing))
        );
    }

    #[test]
    fn test_ingest_no_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        let outcome = ingest(&LedgerConfig::for_directory(dir.path()));
        assert!(matches!(
            outcome,
            IngestOutcome::Unavailable(SourceUnavailable::NoMatchingFiles(_))
        ));
    }

    #[test]
    fn test_bundle_order_and_metadata() {
        let mut periods = BTreeMap::new();
        for (key, complete) in [("2022-3", true), ("2024-5", false), ("Unknown", false)] {
            periods.insert(
                key.to_string(),
                FiscalPeriod {
                    key: key.to_string(),
                    records: vec![TransactionRecord::default()],
                    as_of_description: None,
                    is_complete: complete,
                    opening_balance: None,
                    source_label: format!("{}.csv", key),
                },
            );
        }
        let bundle = LedgerBundle::from_periods(periods);
        assert_eq!(bundle.period_order, vec!["2024-5", "2022-3", "Unknown"]);

        let meta = bundle.metadata("2022-3").unwrap();
        assert!(meta.is_complete);
        assert_eq!(meta.record_count, 1);
        assert_eq!(meta.source_label, "2022-3.csv");
        assert_eq!(bundle.metadata_map().len(), 3);
        assert_eq!(
            bundle.ordered_periods().map(|p| p.key.as_str()).collect::<Vec<_>>(),
            vec!["2024-5", "2022-3", "Unknown"]
        );
    }

    #[test]
    fn test_read_records_keeps_rows_with_non_utf8_bytes() {
        let csv: &[u8] = b"type,payee,detail,total_amount\n\
                           Income,Council,Precept,100\n\
                           Expense,Mowers,cost \xA35,-5\n";
        let records = read_records(csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].detail, "Precept");
        assert_eq!(records[1].detail, "cost \u{FFFD}5");
        assert_eq!(records[1].payee, "Mowers");
        assert_eq!(records[1].total_amount, -5.0);
    }

    #[test]
    fn test_ingest_keeps_period_with_windows_pound_sign() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Receipts and Payments 2022-3.csv"),
            b"type,centre_name,account_name,total_amount,detail\n\
              Income,Admin,Precept,1000,First half\n\
              Expense,Admin,Hall Hire,-35,hire at \xA335\n",
        )
        .unwrap();

        let bundle = ingest(&LedgerConfig::for_directory(dir.path()))
            .into_bundle()
            .unwrap();
        let period = bundle.period("2022-3").unwrap();
        assert_eq!(period.record_count(), 2);
        assert_eq!(period.records[1].account_name, "Hall Hire");
        assert_eq!(period.records[1].total_amount, -35.0);
    }

    #[test]
    fn test_collect_periods_skips_failed_files() {
        let periods = collect_periods(vec![
            ("Receipts 2021-2.csv".to_string(), denied()),
            (
                "Receipts 2022-3.csv".to_string(),
                Ok(vec![TransactionRecord::default()]),
            ),
        ]);

        assert_eq!(periods.keys().collect::<Vec<_>>(), vec!["2022-3"]);
        assert_eq!(periods["2022-3"].record_count(), 1);
    }

    #[test]
    fn test_all_exports_unreadable_is_reported() {
        let periods = collect_periods(vec![
            ("Receipts 2021-2.csv".to_string(), denied()),
            ("Receipts 2022-3.csv".to_string(), denied()),
        ]);
        let outcome = assemble(Path::new("/srv/cashbook"), 2, periods, BTreeMap::new());

        let reason = outcome.unavailable_reason().unwrap();
        assert_eq!(
            reason,
            &SourceUnavailable::NoReadableFiles(PathBuf::from("/srv/cashbook"))
        );
        assert!(reason.to_string().contains("could be read"));
    }

    #[test]
    fn test_assemble_attaches_balances_to_known_periods() {
        let periods = collect_periods(vec![(
            "Receipts 2022-3.csv".to_string(),
            Ok(vec![TransactionRecord::default()]),
        )]);
        let balances = BTreeMap::from([
            ("2022-3".to_string(), 750.0),
            ("2030-1".to_string(), 1.0),
        ]);

        let bundle = assemble(Path::new("/srv/cashbook"), 1, periods, balances)
            .into_bundle()
            .unwrap();
        assert_eq!(bundle.periods.len(), 1);
        assert_eq!(bundle.period("2022-3").unwrap().opening_balance, Some(750.0));
    }
}
