use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::record::TransactionRecord;

/// Period key given to files whose name carries no recognisable period.
pub const UNKNOWN_PERIOD: &str = "Unknown";

/// Start year of a `<startYear>-<endDigit>` period key.
pub fn start_year(period_key: &str) -> Option<i32> {
    period_key.split('-').next()?.trim().parse().ok()
}

/// Tab label for a period key: `2024-5` becomes `2024/25`.
///
/// Keys without a numeric start year are shown as-is.
pub fn tab_label(period_key: &str) -> String {
    match start_year(period_key) {
        Some(year) => format!("{}/{:02}", year, (year + 1).rem_euclid(100)),
        None => period_key.to_string(),
    }
}

/// Presentation order: newest start year first, then by key. Keys without
/// a start year go last.
pub fn compare_period_keys(a: &str, b: &str) -> Ordering {
    match (start_year(a), start_year(b)) {
        (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_period_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| compare_period_keys(a, b));
}

/// One fiscal year's worth of cashbook lines, as loaded from a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub key: String,
    pub records: Vec<TransactionRecord>,
    pub as_of_description: Option<String>,
    /// True only when the file covers the full year to 31 March.
    pub is_complete: bool,
    pub opening_balance: Option<f64>,
    /// Originating filename.
    pub source_label: String,
}

impl FiscalPeriod {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn start_year(&self) -> Option<i32> {
        start_year(&self.key)
    }

    pub fn tab_label(&self) -> String {
        tab_label(&self.key)
    }

    pub fn metadata(&self) -> PeriodMetadata {
        PeriodMetadata {
            as_of_description: self.as_of_description.clone(),
            is_complete: self.is_complete,
            record_count: self.record_count(),
            source_label: self.source_label.clone(),
            opening_balance: self.opening_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetadata {
    pub as_of_description: Option<String>,
    pub is_complete: bool,
    pub record_count: usize,
    pub source_label: String,
    pub opening_balance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_year() {
        assert_eq!(start_year("2024-5"), Some(2024));
        assert_eq!(start_year("Unknown"), None);
        assert_eq!(start_year(""), None);
    }

    #[test]
    fn test_tab_label() {
        assert_eq!(tab_label("2024-5"), "2024/25");
        assert_eq!(tab_label("2009-0"), "2009/10");
        assert_eq!(tab_label("2099-0"), "2099/00");
        assert_eq!(tab_label("Unknown"), "Unknown");
    }

    #[test]
    fn test_sort_period_keys_descending() {
        let mut keys = vec![
            "2022-3".to_string(),
            "Unknown".to_string(),
            "2025-6".to_string(),
            "2023-4".to_string(),
        ];
        sort_period_keys(&mut keys);
        assert_eq!(keys, vec!["2025-6", "2023-4", "2022-3", "Unknown"]);
    }

    #[test]
    fn test_sort_is_numeric_not_lexicographic() {
        let mut keys = vec!["999-0".to_string(), "2001-2".to_string()];
        sort_period_keys(&mut keys);
        assert_eq!(keys, vec!["2001-2", "999-0"]);
    }
}
