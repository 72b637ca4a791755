//! Stream watchdog service.
//!
//! Wires the [`watchdog`] engine to its production collaborators:
//!
//! - **Config**: YAML file with validated sections
//! - **Notifier**: Discord webhook alerts and status embeds
//! - **Check log**: JSON-lines history of every verdict
//! - **Remediation**: starts the backup EC2 instance through the AWS CLI
//! - **Metrics**: optional Prometheus endpoint

pub mod check_log;
pub mod config;
pub mod http_server;
pub mod notifier;
pub mod remediation;
pub mod server;

pub use check_log::{CheckRecord, JsonlCheckLog};
pub use config::{Config, ConfigError};
pub use http_server::MetricsServer;
pub use notifier::{DiscordNotifier, WebhookMessage};
pub use remediation::AwsCliRemediation;
pub use server::WatchdogServer;
