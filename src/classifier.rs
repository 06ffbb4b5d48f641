//! Fiscal period inference from free-form cashbook filenames.
//!
//! Fiscal years run 1 April to 31 March and are keyed as
//! `<startYear>-<last digit of endYear>`, so `2024-5` is April 2024 to March
//! 2025. Filenames carry either such a key, a full `DD-MM-YYYY` snapshot date,
//! or a key plus a `to DD-MM` partial-year marker.

use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::format::month_abbrev;
use crate::period::UNKNOWN_PERIOD;

const FISCAL_YEAR_START_MONTH: u32 = 4;

static YEAR_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d)").expect("hardcoded regex should be valid"));
static FULL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("hardcoded regex should be valid")
});
static SHORT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bto\s*(\d{1,2})-(\d{1,2})").expect("hardcoded regex should be valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub period_key: String,
    /// Human-readable "data to" date, e.g. `30 Nov 2025`.
    pub as_of: Option<String>,
    pub is_complete: bool,
    /// The as-of date, when it names a real calendar day.
    pub as_of_date: Option<NaiveDate>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            period_key: UNKNOWN_PERIOD.to_string(),
            as_of: None,
            is_complete: false,
            as_of_date: None,
        }
    }

    fn dated(period_key: String, day: u32, month: u32, year: i32, is_complete: bool) -> Self {
        Self {
            period_key,
            as_of: Some(describe_date(day, month, year)),
            is_complete,
            as_of_date: NaiveDate::from_ymd_opt(year, month, day),
        }
    }
}

/// `30 Nov 2025`. Months outside 1..=12 keep their number.
fn describe_date(day: u32, month: u32, year: i32) -> String {
    match month_abbrev(month) {
        Some(name) => format!("{} {} {}", day, name, year),
        None => format!("{} {} {}", day, month, year),
    }
}

fn capture_num<T: std::str::FromStr>(caps: &Captures, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

struct Rule {
    name: &'static str,
    applies: fn(&str) -> bool,
    extract: fn(&str) -> Option<Classification>,
}

/// Evaluated top to bottom, first match wins.
const RULES: &[Rule] = &[
    Rule {
        name: "complete-year",
        applies: names_complete_year,
        extract: complete_year,
    },
    Rule {
        name: "snapshot-date",
        applies: names_snapshot_date,
        extract: snapshot_date,
    },
    Rule {
        name: "year-to-date",
        applies: names_year_to_date,
        extract: year_to_date,
    },
];

// A bare year key is a full year only when no day-month fragment narrows it.
fn names_complete_year(filename: &str) -> bool {
    YEAR_KEY.is_match(filename) && !FULL_DATE.is_match(filename) && !SHORT_DATE.is_match(filename)
}

fn names_snapshot_date(filename: &str) -> bool {
    FULL_DATE.is_match(filename)
}

fn names_year_to_date(filename: &str) -> bool {
    YEAR_KEY.is_match(filename) && SHORT_DATE.is_match(filename)
}

fn complete_year(filename: &str) -> Option<Classification> {
    let caps = YEAR_KEY.captures(filename)?;
    let start_year: i32 = capture_num(&caps, 1)?;
    let end_digit: u32 = capture_num(&caps, 2)?;
    // A trailing 0 pushes the year-end a decade out: 2019-0 ends 31 Mar 2029.
    let end_year = if end_digit == 0 {
        start_year + 10
    } else {
        start_year + 1
    };
    Some(Classification::dated(
        format!("{}-{}", start_year, end_digit),
        31,
        3,
        end_year,
        true,
    ))
}

fn snapshot_date(filename: &str) -> Option<Classification> {
    let caps = FULL_DATE.captures(filename)?;
    let day: u32 = capture_num(&caps, 1)?;
    let month: u32 = capture_num(&caps, 2)?;
    let year: i32 = capture_num(&caps, 3)?;
    let period_key = if month >= FISCAL_YEAR_START_MONTH {
        format!("{}-{}", year, (year + 1).rem_euclid(10))
    } else {
        format!("{}-{}", year - 1, year.rem_euclid(10))
    };
    Some(Classification::dated(period_key, day, month, year, false))
}

fn year_to_date(filename: &str) -> Option<Classification> {
    let key = YEAR_KEY.captures(filename)?;
    let start_year: i32 = capture_num(&key, 1)?;
    let end_digit: u32 = capture_num(&key, 2)?;
    let short = SHORT_DATE.captures(filename)?;
    let day: u32 = capture_num(&short, 1)?;
    let month: u32 = capture_num(&short, 2)?;
    let year = if month >= FISCAL_YEAR_START_MONTH {
        start_year
    } else {
        start_year + 1
    };
    Some(Classification::dated(
        format!("{}-{}", start_year, end_digit),
        day,
        month,
        year,
        false,
    ))
}

/// Infers the fiscal period, as-of date and completeness of a cashbook file
/// from its name. Unrecognised names land in the `Unknown` period.
pub fn classify(filename: &str) -> Classification {
    for rule in RULES {
        if !(rule.applies)(filename) {
            continue;
        }
        if let Some(classification) = (rule.extract)(filename) {
            debug!(
                "Classified '{}' as {} via {} rule",
                filename, classification.period_key, rule.name
            );
            return classification;
        }
    }
    debug!("No period pattern in '{}'", filename);
    Classification::unknown()
}
