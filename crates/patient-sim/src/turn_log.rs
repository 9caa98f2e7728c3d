//! Append-only JSON Lines log of completed turns.
//!
//! Each completed turn becomes one line:
//!
//! ```text
//! {"doctor_question":"...","tone_evaluation":"acceptable","patient_response":"...","disease":"Migraine"}
//! ```
//!
//! The file is opened in append mode for every write and synced before
//! [`TurnLogger::log`] returns, so a record survives a crash that happens
//! during the next turn. Existing lines are never rewritten.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;

/// One doctor question, its tone label and the patient's reply.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TurnRecord {
    pub doctor_question: String,
    pub tone_evaluation: String,
    pub patient_response: String,
    pub disease: String,
}

/// Writes [`TurnRecord`]s to a JSON Lines file.
#[derive(Debug, Clone)]
pub struct TurnLogger {
    path: PathBuf,
}

impl TurnLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and sync it to disk.
    pub fn log(&self, record: &TurnRecord) -> Result<(), SimError> {
        let mut line = serde_json::to_string(record).map_err(|e| {
            SimError::persistence(&self.path, format!("failed to encode turn record: {e}"))
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| SimError::persistence_io(&self.path, "failed to open for append", e))?;

        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_data())
            .map_err(|e| SimError::persistence_io(&self.path, "failed to write turn record", e))?;

        debug!(
            "Logged turn ({} bytes) to {}",
            line.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Read every record back from a turn log, in append order.
///
/// Blank lines are skipped. A line that is not a valid record is an error
/// naming its 1-based line number.
pub fn read_log(path: &Path) -> Result<Vec<TurnRecord>, SimError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| SimError::persistence_io(path, "failed to read", e))?;

    let mut records = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: TurnRecord = serde_json::from_str(line).map_err(|e| {
            SimError::persistence(path, format!("line {} is not a turn record: {e}", idx + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}
