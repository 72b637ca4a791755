//! Health watchdog for a live audio-streaming pipeline.
//!
//! Every cycle the watchdog samples a fixed set of signals (stream-source
//! presence, encoder CPU activity, segment backlog, segment staleness),
//! turns each raw sample into a stable verdict with per-signal hysteresis,
//! and starts a standby backup instance when enough signals fail together.
//! Aggregated status reports go out on their own cadence.
//!
//! # Components
//!
//! - [`HysteresisEvaluator`]: consecutive-failure counter per signal
//! - [`EscalationPolicy`]: failing-signal count, remediation and cooldown
//! - [`ReportScheduler`]: rate-limited status reports
//! - [`Watchdog`]: the driver loop tying them together
//!
//! Delivery (alerts, check history, starting the instance) is behind the
//! traits in [`sinks`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use watchdog::{Signal, SignalKind, SignalSpec, Sinks, Watchdog, WatchdogSettings};
//! use watchdog::probes::SegmentCountProbe;
//! use watchdog::sinks::Discard;
//! # use watchdog::sinks::Remediation;
//!
//! # async fn example(remediation: Arc<dyn Remediation>) {
//! let signals = vec![Signal::new(
//!     SignalSpec::new("ts_file_count", "TS File Count", SignalKind::Backlog),
//!     Arc::new(SegmentCountProbe::new("/var/www/hls", "ts", 10)),
//! )];
//!
//! let watchdog = Watchdog::new(
//!     WatchdogSettings::default(),
//!     signals,
//!     Sinks {
//!         notifier: Arc::new(Discard),
//!         check_log: Arc::new(Discard),
//!         remediation,
//!     },
//!     None,
//! );
//! watchdog.run().await;
//! # }
//! ```

pub mod engine;
pub mod escalation;
pub mod hysteresis;
pub mod metrics;
pub mod probes;
pub mod report;
pub mod sinks;
pub mod types;

pub use engine::{Signal, Sinks, Watchdog, WatchdogSettings};
pub use escalation::{EscalationDecision, EscalationOutcome, EscalationPolicy};
pub use hysteresis::HysteresisEvaluator;
pub use metrics::MetricsRegistry;
pub use report::{ReportRow, ReportScheduler, StatusReport};
pub use types::{
    CycleSnapshot, ProbeAux, ProbeOutcome, ProbeReport, SignalKind, SignalSpec, SignalStatus,
    Verdict,
};
