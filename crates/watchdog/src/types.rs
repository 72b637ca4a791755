//! Signal, outcome and snapshot types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Raw outcome of one probe invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// Signal is in a good state
    Pass,
    /// Signal is genuinely in a bad state
    Fail(String),
    /// The probe could not be executed
    Error(String),
}

impl ProbeOutcome {
    /// Create a failing outcome
    pub fn fail(reason: impl Into<String>) -> Self {
        ProbeOutcome::Fail(reason.into())
    }

    /// Create an execution error outcome
    pub fn error(detail: impl Into<String>) -> Self {
        ProbeOutcome::Error(detail.into())
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Pass => write!(f, "PASS"),
            ProbeOutcome::Fail(reason) => write!(f, "FAIL ({})", reason),
            ProbeOutcome::Error(detail) => write!(f, "ERROR ({})", detail),
        }
    }
}

/// Auxiliary values reported alongside an outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeAux {
    /// Process identifier of the monitored process, if it is running
    pub process_id: Option<u32>,

    /// Current item count (e.g. output segments on disk)
    pub item_count: Option<usize>,
}

/// Everything one probe produced during a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub outcome: ProbeOutcome,
    pub aux: ProbeAux,
    pub duration: Duration,
}

impl ProbeReport {
    pub fn new(outcome: ProbeOutcome, duration: Duration) -> Self {
        Self {
            outcome,
            aux: ProbeAux::default(),
            duration,
        }
    }

    pub fn with_process_id(mut self, pid: Option<u32>) -> Self {
        self.aux.process_id = pid;
        self
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.aux.item_count = Some(count);
        self
    }
}

/// Post-hysteresis state of a signal for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_fail(self) -> bool {
        self == Verdict::Fail
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "Pass"),
            Verdict::Fail => write!(f, "Fail"),
        }
    }
}

/// Nature of a monitored signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Stream source presence on the streaming server
    Presence,
    /// CPU activity of the encoder process
    ProcessActivity,
    /// Number of output segments waiting on disk
    Backlog,
    /// Output segments that stopped being rewritten
    Staleness,
}

impl SignalKind {
    /// Default consecutive-failure threshold for this kind of signal.
    ///
    /// Binary signals fail on the first bad sample; usage-style signals
    /// are noisy and need a sustained failure.
    pub fn default_threshold(self) -> u32 {
        match self {
            SignalKind::ProcessActivity => 3,
            SignalKind::Presence | SignalKind::Backlog | SignalKind::Staleness => 1,
        }
    }
}

/// Static description of a signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSpec {
    /// Stable identifier (e.g. "icecast")
    pub id: String,

    /// Human-readable label used in check logs and reports
    pub label: String,

    pub kind: SignalKind,

    /// Consecutive raw failures required before the verdict flips to fail
    pub threshold: u32,
}

impl SignalSpec {
    /// Create a spec with the kind's default threshold
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            threshold: kind.default_threshold(),
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// One signal's evaluated state within a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStatus {
    pub id: String,
    pub label: String,
    pub kind: SignalKind,
    pub verdict: Verdict,
    pub streak: u32,
    pub aux: ProbeAux,
}

/// Verdicts of a single cycle plus auxiliary metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    /// Cycle sequence number, starting at 1
    pub cycle: u64,

    pub signals: Vec<SignalStatus>,

    /// Segments currently on disk, when the backlog probe could count them
    pub backlog_count: Option<usize>,

    /// Encoder process id, `None` when the encoder is not running
    pub encoder_pid: Option<u32>,
}

impl CycleSnapshot {
    /// Assemble a snapshot, lifting auxiliary metrics out of the signal rows
    pub fn new(cycle: u64, signals: Vec<SignalStatus>) -> Self {
        let backlog_count = signals
            .iter()
            .filter(|s| s.kind == SignalKind::Backlog)
            .find_map(|s| s.aux.item_count);
        let encoder_pid = signals
            .iter()
            .filter(|s| s.kind == SignalKind::ProcessActivity)
            .find_map(|s| s.aux.process_id);

        Self {
            cycle,
            signals,
            backlog_count,
            encoder_pid,
        }
    }

    /// Number of signals whose verdict is fail
    pub fn failing_count(&self) -> usize {
        self.signals.iter().filter(|s| s.verdict.is_fail()).count()
    }

    /// Number of signals whose verdict is pass
    pub fn passing_count(&self) -> usize {
        self.signals.len() - self.failing_count()
    }

    /// Verdict of the signal with the given id
    pub fn verdict(&self, id: &str) -> Option<Verdict> {
        self.signals.iter().find(|s| s.id == id).map(|s| s.verdict)
    }

    /// Ids of the failing signals, in configuration order
    pub fn failing_ids(&self) -> Vec<&str> {
        self.signals
            .iter()
            .filter(|s| s.verdict.is_fail())
            .map(|s| s.id.as_str())
            .collect()
    }
}
