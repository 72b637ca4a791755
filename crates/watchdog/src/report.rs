//! Periodic aggregated status reports.

use crate::types::{CycleSnapshot, SignalKind, Verdict};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Decide whether a report is due.
///
/// Returns the timestamp to carry forward: `now` when a report is due,
/// otherwise `last_report` unchanged. Elapsed time exactly equal to the
/// interval is enough.
pub fn maybe_report(now: Instant, last_report: Instant, interval: Duration) -> (bool, Instant) {
    if now.saturating_duration_since(last_report) >= interval {
        (true, now)
    } else {
        (false, last_report)
    }
}

/// One row of a status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub label: String,
    pub kind: SignalKind,
    pub verdict: Verdict,
    /// Extra context shown next to the verdict, e.g. "(PID: 1234)"
    pub note: Option<String>,
}

impl ReportRow {
    /// Verdict text with the note appended, if any
    pub fn value(&self) -> String {
        match &self.note {
            Some(note) => format!("{} {}", self.verdict, note),
            None => self.verdict.to_string(),
        }
    }
}

/// Aggregated status built from one cycle snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Local wall-clock time the report was built
    pub checked_at: String,
    pub cycle: u64,
    pub rows: Vec<ReportRow>,
    pub backlog_count: Option<usize>,
    pub encoder_pid: Option<u32>,
    pub passes: usize,
    pub fails: usize,
}

impl StatusReport {
    /// Build a report from a snapshot
    pub fn from_snapshot(snapshot: &CycleSnapshot, checked_at: impl Into<String>) -> Self {
        let rows = snapshot
            .signals
            .iter()
            .map(|s| ReportRow {
                id: s.id.clone(),
                label: s.label.clone(),
                kind: s.kind,
                verdict: s.verdict,
                note: match s.kind {
                    SignalKind::ProcessActivity => Some(match s.aux.process_id {
                        Some(pid) => format!("(PID: {})", pid),
                        None => "(PID: Not Running)".to_string(),
                    }),
                    _ => None,
                },
            })
            .collect();

        Self {
            checked_at: checked_at.into(),
            cycle: snapshot.cycle,
            rows,
            backlog_count: snapshot.backlog_count,
            encoder_pid: snapshot.encoder_pid,
            passes: snapshot.passing_count(),
            fails: snapshot.failing_count(),
        }
    }

    /// Backlog count as display text
    pub fn backlog_text(&self) -> String {
        self.backlog_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Rate-limits status reports to one per interval
#[derive(Debug, Clone)]
pub struct ReportScheduler {
    interval: Duration,
    last_report: Instant,
}

impl ReportScheduler {
    /// Create a scheduler whose first report is due one interval after `started`
    pub fn new(interval: Duration, started: Instant) -> Self {
        Self {
            interval,
            last_report: started,
        }
    }

    /// Build a report if one is due.
    ///
    /// The timestamp advances as soon as a report is built; delivery
    /// failures do not roll it back.
    pub fn maybe_report(&mut self, now: Instant, snapshot: &CycleSnapshot) -> Option<StatusReport> {
        let (due, last) = maybe_report(now, self.last_report, self.interval);
        self.last_report = last;
        if !due {
            return None;
        }

        let checked_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Some(StatusReport::from_snapshot(snapshot, checked_at))
    }

    pub fn last_report(&self) -> Instant {
        self.last_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeAux, SignalStatus};

    fn row(id: &str, kind: SignalKind, verdict: Verdict, aux: ProbeAux) -> SignalStatus {
        SignalStatus {
            id: id.to_string(),
            label: id.to_uppercase(),
            kind,
            verdict,
            streak: 0,
            aux,
        }
    }

    fn sample_snapshot(pid: Option<u32>) -> CycleSnapshot {
        CycleSnapshot::new(
            7,
            vec![
                row("icecast", SignalKind::Presence, Verdict::Pass, ProbeAux::default()),
                row(
                    "liquidsoap_cpu",
                    SignalKind::ProcessActivity,
                    Verdict::Fail,
                    ProbeAux {
                        process_id: pid,
                        item_count: None,
                    },
                ),
                row(
                    "ts_file_count",
                    SignalKind::Backlog,
                    Verdict::Pass,
                    ProbeAux {
                        process_id: None,
                        item_count: Some(6),
                    },
                ),
                row("hls_old_files", SignalKind::Staleness, Verdict::Pass, ProbeAux::default()),
            ],
        )
    }

    #[test]
    fn test_maybe_report_boundaries() {
        let start = Instant::now();
        let interval = Duration::from_secs(300);

        let (due, last) = maybe_report(start + Duration::from_secs(299), start, interval);
        assert!(!due);
        assert_eq!(last, start);

        let now = start + Duration::from_secs(300);
        let (due, last) = maybe_report(now, start, interval);
        assert!(due);
        assert_eq!(last, now);
    }

    #[test]
    fn test_report_contents() {
        let report = StatusReport::from_snapshot(&sample_snapshot(Some(812)), "2024-05-01 10:00:00");

        assert_eq!(report.cycle, 7);
        assert_eq!(report.passes, 3);
        assert_eq!(report.fails, 1);
        assert_eq!(report.backlog_count, Some(6));
        assert_eq!(report.rows[1].value(), "Fail (PID: 812)");
        assert_eq!(report.rows[0].value(), "Pass");
    }

    #[test]
    fn test_report_marks_missing_encoder() {
        let report = StatusReport::from_snapshot(&sample_snapshot(None), "now");
        assert_eq!(report.rows[1].value(), "Fail (PID: Not Running)");
        assert_eq!(report.encoder_pid, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_emits_at_most_once_per_interval() {
        let start = Instant::now();
        let mut scheduler = ReportScheduler::new(Duration::from_secs(300), start);
        let snapshot = sample_snapshot(Some(1));

        assert!(scheduler.maybe_report(start, &snapshot).is_none());
        assert!(
            scheduler
                .maybe_report(start + Duration::from_secs(120), &snapshot)
                .is_none()
        );

        let t1 = start + Duration::from_secs(300);
        assert!(scheduler.maybe_report(t1, &snapshot).is_some());
        assert_eq!(scheduler.last_report(), t1);

        // Same instant again: not due
        assert!(scheduler.maybe_report(t1, &snapshot).is_none());
        assert!(
            scheduler
                .maybe_report(t1 + Duration::from_secs(600), &snapshot)
                .is_some()
        );
    }
}
