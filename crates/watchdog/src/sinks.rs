//! Outbound collaborators: notifications, check history and remediation.
//!
//! The engine only decides *what* to send and *when*. Delivery is behind
//! these traits so that failures on the delivery side stay local to a
//! cycle and can be exercised in tests without a live endpoint.

use crate::report::StatusReport;
use crate::types::Verdict;
use async_trait::async_trait;
use common::Result;

/// Channel for alerts and periodic status reports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a free-form alert message
    async fn alert(&self, message: &str) -> Result<()>;

    /// Send an aggregated status report
    async fn report(&self, report: &StatusReport) -> Result<()>;
}

/// Durable per-check history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckLog: Send + Sync {
    /// Record one signal's verdict for the current cycle
    async fn log_check(&self, label: &str, verdict: Verdict) -> Result<()>;
}

/// Action taken when enough signals fail together
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Remediation: Send + Sync {
    /// Start the standby backup instance.
    ///
    /// Returns a short description of what was started.
    async fn start_backup(&self) -> Result<String>;
}

/// Sink that accepts and drops everything.
///
/// Stands in for a notifier or check log that has been switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

#[async_trait]
impl Notifier for Discard {
    async fn alert(&self, _message: &str) -> Result<()> {
        Ok(())
    }

    async fn report(&self, _report: &StatusReport) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CheckLog for Discard {
    async fn log_check(&self, _label: &str, _verdict: Verdict) -> Result<()> {
        Ok(())
    }
}
