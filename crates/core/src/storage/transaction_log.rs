use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::models::transaction::Transaction;

use super::write_atomic;

/// The full transaction log as one JSON file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct TransactionLogFile {
    path: PathBuf,
}

impl TransactionLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the log. A file that does not exist yet is an empty log.
    pub fn load(&self) -> Result<Vec<Transaction>, CoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Deserialization(format!("Failed to read transaction log: {e}")))
    }

    pub fn save(&self, transactions: &[Transaction]) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec_pretty(transactions)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize transaction log: {e}")))?;
        write_atomic(&self.path, &bytes)
    }

    /// Move an unreadable log aside to `<name>.corrupt-<timestamp>` so the
    /// next save cannot overwrite it. Returns the new path.
    pub fn quarantine(&self) -> Result<PathBuf, CoreError> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transactions.json".to_string());
        let target = self.path.with_file_name(format!(
            "{name}.corrupt-{}",
            Utc::now().format("%Y%m%d%H%M%S%3f")
        ));
        std::fs::rename(&self.path, &target)?;
        Ok(target)
    }
}
