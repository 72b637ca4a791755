//! Append-only JSON-lines check history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use watchdog::Verdict;
use watchdog::sinks::CheckLog;

/// One line of the check log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub timestamp: DateTime<Utc>,
    pub flag_name: String,
    pub status: Verdict,
}

/// Writes one JSON object per check to a file, creating it on first use
pub struct JsonlCheckLog {
    path: PathBuf,
}

impl JsonlCheckLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append(&self, record: &CheckRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}

#[async_trait]
impl CheckLog for JsonlCheckLog {
    async fn log_check(&self, label: &str, verdict: Verdict) -> common::Result<()> {
        let record = CheckRecord {
            timestamp: Utc::now(),
            flag_name: label.to_string(),
            status: verdict,
        };

        self.append(&record)
            .await
            .map_err(|e| common::Error::check_log(format!("{}: {}", self.path.display(), e)))?;

        debug!(check = label, status = %verdict, "Logged check");
        Ok(())
    }
}
