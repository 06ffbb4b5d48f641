use num_format::{Locale, ToFormattedString as _};

pub const CURRENCY_SYMBOL: &str = "£";

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Three-letter month name for a 1-indexed month number.
pub fn month_abbrev(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTH_ABBREVIATIONS[(month - 1) as usize]),
        _ => None,
    }
}

/// Splits an amount into whole pence, returning `(is_negative, pence)`.
///
/// Anything that rounds to zero pence is reported as non-negative so that
/// `-0.001` never renders as `(£0.00)`.
fn to_pence(amount: f64) -> (bool, u64) {
    if !amount.is_finite() {
        return (false, 0);
    }
    let pence = (amount.abs() * 100.0).round() as u64;
    (amount < 0.0 && pence > 0, pence)
}

fn grouped(pence: u64) -> String {
    format!(
        "{}.{:02}",
        (pence / 100).to_formatted_string(&Locale::en),
        pence % 100
    )
}

/// Grouped two-decimal rendering of the magnitude of `amount`
/// (ex. `-1234.5` becomes `1,234.50`).
pub fn format_number(amount: f64) -> String {
    let (_, pence) = to_pence(amount);
    grouped(pence)
}

/// Signed currency rendering with accounting-style parentheses for negatives:
/// `1234.5` becomes `£1,234.50`, `-1234.5` becomes `(£1,234.50)`.
pub fn format_currency(amount: f64) -> String {
    let (negative, pence) = to_pence(amount);
    let body = format!("{}{}", CURRENCY_SYMBOL, grouped(pence));
    if negative {
        format!("({})", body)
    } else {
        body
    }
}

/// Currency rendering of the absolute value, for figures whose sign is
/// implied by their label.
pub fn format_unsigned_currency(amount: f64) -> String {
    format_currency(amount.abs())
}

/// Lenient numeric coercion for ledger cells.
///
/// Accepts thousands separators, a leading currency symbol and accounting
/// parentheses. Empty, non-numeric, NaN and infinite input all yield `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let (negated, inner) = match trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = inner
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOL.contains(*c) && !c.is_whitespace())
        .collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if negated {
                -value
            } else {
                value
            }
        }
        _ => 0.0,
    }
}
