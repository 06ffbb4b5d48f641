use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

pub const DEFAULT_FILE_EXTENSION: &str = "csv";
pub const DEFAULT_OPENING_BALANCES_FILE: &str = "opening_balances.json";

/// Where the cashbook exports live and how to recognise them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory holding one export per fiscal period. `None` until the
    /// user has pointed the viewer at a folder.
    pub data_dir: Option<PathBuf>,
    /// Extension of export files, matched case-insensitively, without the dot.
    pub file_extension: String,
    /// JSON object of period key to opening balance, next to the exports.
    pub opening_balances_file: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            opening_balances_file: DEFAULT_OPENING_BALANCES_FILE.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn for_directory<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let ext = self.file_extension.trim();
        if ext.is_empty() || ext.contains('.') {
            return Err(LedgerError::Config(format!(
                "file_extension must be a bare extension such as 'csv', got '{}'",
                self.file_extension
            )));
        }
        if self.opening_balances_file.trim().is_empty() {
            return Err(LedgerError::Config(
                "opening_balances_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn opening_balances_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(&self.opening_balances_file))
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.file_extension.trim()))
    }
}
