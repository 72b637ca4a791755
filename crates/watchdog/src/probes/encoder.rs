//! CPU activity of the encoder process.

use super::SignalProbe;
use crate::types::{ProbeOutcome, ProbeReport};
use async_trait::async_trait;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// First pid printed by `pidof`, if any
pub fn parse_pidof(stdout: &str) -> Option<u32> {
    stdout.split_whitespace().next()?.parse().ok()
}

/// CPU percentage printed by `ps -o %cpu=`
pub fn parse_cpu(stdout: &str) -> Option<f64> {
    stdout.trim().parse().ok()
}

/// Flags the encoder as idle when its CPU usage drops below a floor.
///
/// An encoder that is alive but not encoding sits near 0% CPU, so low
/// usage is the failure condition here, not high usage.
pub struct EncoderCpuProbe {
    process_name: String,
    cpu_threshold: f64,
}

impl EncoderCpuProbe {
    /// Create a new probe for `process_name` with a CPU floor in percent
    pub fn new(process_name: impl Into<String>, cpu_threshold: f64) -> Self {
        Self {
            process_name: process_name.into(),
            cpu_threshold,
        }
    }

    async fn find_pid(&self) -> std::io::Result<Option<u32>> {
        let output = Command::new("pidof")
            .arg(&self.process_name)
            .kill_on_drop(true)
            .output()
            .await?;
        // pidof exits 1 with empty output when nothing matches
        Ok(parse_pidof(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn cpu_usage(&self, pid: u32) -> Result<f64, String> {
        let output = Command::new("ps")
            .args(["-p", &pid.to_string(), "-o", "%cpu="])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run ps: {}", e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_cpu(&stdout).ok_or_else(|| format!("unexpected ps output {:?}", stdout.trim()))
    }
}

#[async_trait]
impl SignalProbe for EncoderCpuProbe {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();

        let pid = match self.find_pid().await {
            Ok(Some(pid)) => pid,
            Ok(None) => {
                warn!(process = %self.process_name, "Encoder process is not running");
                return ProbeReport::new(
                    ProbeOutcome::error(format!("{} process is not running", self.process_name)),
                    start.elapsed(),
                );
            }
            Err(e) => {
                warn!(process = %self.process_name, error = %e, "Failed to look up encoder pid");
                return ProbeReport::new(
                    ProbeOutcome::error(format!("failed to run pidof: {}", e)),
                    start.elapsed(),
                );
            }
        };

        let outcome = match self.cpu_usage(pid).await {
            Ok(cpu) if cpu < self.cpu_threshold => {
                warn!(pid, cpu, threshold = self.cpu_threshold, "Encoder CPU usage below threshold");
                ProbeOutcome::fail(format!(
                    "CPU usage {}% is below {}%",
                    cpu, self.cpu_threshold
                ))
            }
            Ok(cpu) => {
                info!(pid, cpu, "Encoder CPU usage");
                ProbeOutcome::Pass
            }
            Err(e) => {
                debug!(pid, error = %e, "Failed to read encoder CPU usage");
                ProbeOutcome::error(e)
            }
        };

        ProbeReport::new(outcome, start.elapsed()).with_process_id(Some(pid))
    }

    fn name(&self) -> &str {
        "encoder_cpu"
    }
}
