//! Builds the watchdog from configuration and runs it.

use crate::check_log::JsonlCheckLog;
use crate::config::Config;
use crate::http_server::MetricsServer;
use crate::notifier::DiscordNotifier;
use crate::remediation::AwsCliRemediation;
use std::sync::Arc;
use tracing::{info, warn};
use watchdog::probes::{EncoderCpuProbe, IcecastProbe, SegmentCountProbe, StaleSegmentsProbe};
use watchdog::sinks::{CheckLog, Discard, Notifier};
use watchdog::{MetricsRegistry, Signal, SignalKind, SignalSpec, Sinks, Watchdog};

/// Watchdog process: probes, sinks and the optional metrics endpoint
pub struct WatchdogServer {
    config: Config,
}

impl WatchdogServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The four pipeline signals in reporting order
    pub fn build_signals(&self) -> common::Result<Vec<Signal>> {
        let cfg = &self.config;

        let icecast = IcecastProbe::new(
            &cfg.icecast.url,
            cfg.icecast.username.clone(),
            cfg.icecast.password.clone(),
            cfg.watchdog.probe_timeout,
        )?;

        Ok(vec![
            Signal::new(
                SignalSpec::new("icecast", "Icecast Sources", SignalKind::Presence)
                    .with_threshold(cfg.icecast.threshold),
                Arc::new(icecast),
            ),
            Signal::new(
                SignalSpec::new("liquidsoap_cpu", "Liquidsoap CPU", SignalKind::ProcessActivity)
                    .with_threshold(cfg.encoder.threshold),
                Arc::new(EncoderCpuProbe::new(
                    cfg.encoder.process_name.clone(),
                    cfg.encoder.cpu_threshold,
                )),
            ),
            Signal::new(
                SignalSpec::new("ts_file_count", "TS File Count", SignalKind::Backlog)
                    .with_threshold(cfg.segments.count_threshold),
                Arc::new(SegmentCountProbe::new(
                    cfg.segments.directory.clone(),
                    cfg.segments.extension.clone(),
                    cfg.segments.max_files,
                )),
            ),
            Signal::new(
                SignalSpec::new("hls_old_files", "HLS Old Files", SignalKind::Staleness)
                    .with_threshold(cfg.segments.stale_threshold),
                Arc::new(StaleSegmentsProbe::new(
                    cfg.segments.directory.clone(),
                    cfg.segments.extension.clone(),
                    cfg.segments.stale_age,
                    cfg.segments.exclude.iter().cloned(),
                )),
            ),
        ])
    }

    /// Alert, check-log and remediation sinks
    pub fn build_sinks(&self) -> common::Result<Sinks> {
        let cfg = &self.config;

        let notifications = &cfg.notifications;
        let notifier: Arc<dyn Notifier> = match (&notifications.webhook_url, notifications.enabled) {
            (Some(url), true) => Arc::new(DiscordNotifier::new(
                url.clone(),
                notifications.username.clone(),
                cfg.watchdog.probe_timeout,
            )?),
            (None, true) => {
                warn!("Notifications enabled but no webhook_url set, alerts will be dropped");
                Arc::new(Discard)
            }
            (_, false) => {
                info!("Notifications disabled");
                Arc::new(Discard)
            }
        };

        let check_log: Arc<dyn CheckLog> = if cfg.check_log.enabled {
            info!(path = %cfg.check_log.path.display(), "Check log enabled");
            Arc::new(JsonlCheckLog::new(cfg.check_log.path.clone()))
        } else {
            Arc::new(Discard)
        };

        if cfg.remediation.instance_id.is_none() {
            warn!("No backup instance id configured, remediation will fail");
        }
        let remediation = Arc::new(AwsCliRemediation::new(
            cfg.remediation.aws_cli(),
            cfg.remediation.instance_id.clone(),
            cfg.remediation.region.clone(),
            cfg.remediation.timeout,
        ));

        Ok(Sinks {
            notifier,
            check_log,
            remediation,
        })
    }

    /// Run until the process is stopped
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting stream watchdog");

        let metrics = if self.config.metrics.enabled {
            let registry = Arc::new(MetricsRegistry::new());
            let server =
                MetricsServer::new(registry.clone(), self.config.metrics.listen_addr.clone());
            tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    warn!(error = %e, "Metrics server error");
                }
            });
            info!("Metrics enabled on {}", self.config.metrics.listen_addr);
            Some(registry)
        } else {
            info!("Metrics disabled");
            None
        };

        let signals = self.build_signals()?;
        let sinks = self.build_sinks()?;
        let watchdog = Watchdog::new(self.config.to_watchdog_settings(), signals, sinks, metrics);

        watchdog.run().await;
        Ok(())
    }
}
