//! Escalation policy: decides when enough signals fail to start the backup.

use crate::sinks::{Notifier, Remediation};
use crate::types::CycleSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Result of assessing one cycle's verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Not enough failing signals
    None,
    /// Failing count met the threshold
    Trigger { failing: usize },
}

/// What happened during an escalation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationOutcome {
    pub failing: usize,
    /// Whether the remediation trigger reported success
    pub remediated: bool,
    /// Instance description on success, error text on failure
    pub detail: String,
}

/// Counts failing verdicts and triggers remediation at the threshold.
///
/// Every cycle that meets the threshold triggers again; the only thing
/// spacing repeated triggers out is the cooldown pause taken after each one.
pub struct EscalationPolicy {
    threshold: usize,
    cooldown: Duration,
    last_escalation: Option<Instant>,
    escalations: u64,
    notifier: Arc<dyn Notifier>,
    remediation: Arc<dyn Remediation>,
}

impl EscalationPolicy {
    /// Create a policy. A threshold of 0 is treated as 1.
    pub fn new(
        threshold: usize,
        cooldown: Duration,
        notifier: Arc<dyn Notifier>,
        remediation: Arc<dyn Remediation>,
    ) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            last_escalation: None,
            escalations: 0,
            notifier,
            remediation,
        }
    }

    /// Decide whether this snapshot warrants remediation
    pub fn assess(&self, snapshot: &CycleSnapshot) -> EscalationDecision {
        let failing = snapshot.failing_count();
        if failing >= self.threshold {
            EscalationDecision::Trigger { failing }
        } else {
            EscalationDecision::None
        }
    }

    /// Invoke remediation once, narrate the result, then hold for the cooldown.
    ///
    /// Remediation is best-effort: a failed trigger is alerted but not
    /// retried, and the cooldown applies either way.
    pub async fn escalate(&mut self, failing: usize) -> EscalationOutcome {
        warn!(failing, threshold = self.threshold, "Escalating: starting backup instance");
        self.alert(&format!(
            "Warning: {} parameters are in a failed state. Bringing up the backup instance.",
            failing
        ))
        .await;

        let outcome = match self.remediation.start_backup().await {
            Ok(instance) => {
                info!(instance = %instance, "Backup instance started");
                self.alert(&format!("Backup instance {} started successfully.", instance))
                    .await;
                EscalationOutcome {
                    failing,
                    remediated: true,
                    detail: instance,
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to start backup instance");
                self.alert(&format!("Failed to start backup instance: {}", e)).await;
                EscalationOutcome {
                    failing,
                    remediated: false,
                    detail: e.to_string(),
                }
            }
        };

        self.last_escalation = Some(Instant::now());
        self.escalations += 1;

        info!(cooldown_secs = self.cooldown.as_secs(), "Entering post-escalation cooldown");
        tokio::time::sleep(self.cooldown).await;

        outcome
    }

    async fn alert(&self, message: &str) {
        if let Err(e) = self.notifier.alert(message).await {
            warn!(error = %e, "Failed to deliver escalation alert");
        }
    }

    /// When remediation was last triggered
    pub fn last_escalation(&self) -> Option<Instant> {
        self.last_escalation
    }

    /// Total escalations since startup
    pub fn escalations(&self) -> u64 {
        self.escalations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MockNotifier, MockRemediation};
    use crate::types::{ProbeAux, SignalKind, SignalStatus, Verdict};

    fn snapshot(verdicts: &[Verdict]) -> CycleSnapshot {
        let signals = verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| SignalStatus {
                id: format!("signal_{}", i),
                label: format!("Signal {}", i),
                kind: SignalKind::Presence,
                verdict: *v,
                streak: if v.is_fail() { 1 } else { 0 },
                aux: ProbeAux::default(),
            })
            .collect();
        CycleSnapshot::new(1, signals)
    }

    fn policy(notifier: MockNotifier, remediation: MockRemediation) -> EscalationPolicy {
        EscalationPolicy::new(
            2,
            Duration::from_secs(300),
            Arc::new(notifier),
            Arc::new(remediation),
        )
    }

    #[test]
    fn test_assess_requires_two_failures() {
        let p = policy(MockNotifier::new(), MockRemediation::new());
        use Verdict::{Fail, Pass};

        assert_eq!(p.assess(&snapshot(&[Pass, Pass, Pass, Pass])), EscalationDecision::None);
        assert_eq!(p.assess(&snapshot(&[Fail, Pass, Pass, Pass])), EscalationDecision::None);
        assert_eq!(
            p.assess(&snapshot(&[Fail, Pass, Fail, Pass])),
            EscalationDecision::Trigger { failing: 2 }
        );
        assert_eq!(
            p.assess(&snapshot(&[Fail, Fail, Fail, Fail])),
            EscalationDecision::Trigger { failing: 4 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalate_triggers_once_and_cools_down() {
        let mut notifier = MockNotifier::new();
        notifier.expect_alert().times(2).returning(|_| Ok(()));
        let mut remediation = MockRemediation::new();
        remediation
            .expect_start_backup()
            .times(1)
            .returning(|| Ok("i-0abc".to_string()));

        let mut p = policy(notifier, remediation);
        let start = Instant::now();
        let outcome = p.escalate(2).await;

        assert!(outcome.remediated);
        assert_eq!(outcome.detail, "i-0abc");
        assert!(start.elapsed() >= Duration::from_secs(300));
        assert_eq!(p.escalations(), 1);
        assert!(p.last_escalation().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_remediation_still_cools_down() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_alert()
            .withf(|message| message.starts_with("Warning"))
            .times(1)
            .returning(|_| Ok(()));
        notifier
            .expect_alert()
            .withf(|message| message.starts_with("Failed to start backup instance"))
            .times(1)
            .returning(|_| Ok(()));
        let mut remediation = MockRemediation::new();
        remediation
            .expect_start_backup()
            .times(1)
            .returning(|| Err(common::Error::remediation("InvalidInstanceID")));

        let mut p = policy(notifier, remediation);
        let start = Instant::now();
        let outcome = p.escalate(3).await;

        assert!(!outcome.remediated);
        assert!(outcome.detail.contains("InvalidInstanceID"));
        assert!(start.elapsed() >= Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_delivery_failure_does_not_abort_escalation() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_alert()
            .returning(|_| Err(common::Error::notify("webhook unreachable")));
        let mut remediation = MockRemediation::new();
        remediation
            .expect_start_backup()
            .times(1)
            .returning(|| Ok("i-0abc".to_string()));

        let mut p = policy(notifier, remediation);
        let outcome = p.escalate(2).await;
        assert!(outcome.remediated);
    }
}
