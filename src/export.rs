use crate::error::{LedgerError, Result};
use crate::record::{TransactionRecord, FIELD_NAMES};

/// Download name for a period's export, e.g. `financial-data-2024-5.csv`.
pub fn export_file_name(period_key: &str) -> String {
    format!("financial-data-{}.csv", period_key)
}

/// Re-serializes raw records with the fixed cashbook header.
///
/// Cells containing a comma, quote or line break are quoted with embedded
/// quotes doubled. Empty cells stay empty.
pub fn export_csv(records: &[TransactionRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(FIELD_NAMES)?;
    for record in records {
        writer.write_record(record.field_values())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LedgerError::IoError(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}
