//! Per-item state machine and batch outcome
//!
//! Item lifecycle:
//! NotStarted → Submitted → Polling* → Succeeded | Failed | TimedOut | Abandoned
//!
//! A submit error goes straight from NotStarted to Failed.

use serde::Serialize;
use uuid::Uuid;

use super::{JobResult, JobStatus};

/// State of one item inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    NotStarted,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    /// Polling stopped by shutdown; the provider job may still be running
    Abandoned,
}

impl ItemState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemState::Succeeded | ItemState::Failed | ItemState::TimedOut | ItemState::Abandoned
        )
    }

    /// Legal transitions of the item state machine
    pub fn can_transition_to(self, next: ItemState) -> bool {
        use ItemState::*;
        match (self, next) {
            (NotStarted, Submitted) | (NotStarted, Failed) | (NotStarted, Abandoned) => true,
            (Submitted, Polling) | (Submitted, Abandoned) | (Submitted, TimedOut) => true,
            (Polling, Polling)
            | (Polling, Succeeded)
            | (Polling, Failed)
            | (Polling, TimedOut)
            | (Polling, Abandoned) => true,
            _ => false,
        }
    }
}

/// Why an item ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Input the provider cannot use (e.g. inline audio)
    Validation,
    /// Submit call failed (network, rejected request)
    Submission,
    /// Provider reported failed or canceled
    ProviderReported,
    /// Poll request rejected (revoked credential, unknown job id)
    Poll,
    /// Provider reported success without a usable output
    MalformedSuccess,
    /// Result could not be written back to storage
    Persistence,
    /// Unexpected fault inside item processing
    Internal,
}

/// Why an item was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoAudio,
    AnimationDisabled,
    AlreadyAnimated,
}

/// Terminal outcome of one batch member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded { output_url: String },
    Failed { kind: FailureKind, detail: String },
    TimedOut { detail: Option<String> },
    Abandoned,
    Skipped { reason: SkipReason },
}

impl ItemOutcome {
    /// Short name used in logs and events
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Succeeded { .. } => "succeeded",
            ItemOutcome::Failed { .. } => "failed",
            ItemOutcome::TimedOut { .. } => "timed_out",
            ItemOutcome::Abandoned => "abandoned",
            ItemOutcome::Skipped { .. } => "skipped",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            ItemOutcome::Failed { detail, .. } => Some(detail.clone()),
            ItemOutcome::TimedOut { detail } => {
                Some(detail.clone().unwrap_or_else(|| "poll ceiling reached".to_string()))
            }
            ItemOutcome::Abandoned => Some("polling stopped by shutdown".to_string()),
            _ => None,
        }
    }
}

/// Per-item record of one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub item_id: Uuid,
    /// Provider job id, if submission succeeded
    pub provider_job_id: Option<String>,
    /// Number of polls performed
    pub attempts: u32,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn skipped(item_id: Uuid, reason: SkipReason) -> Self {
        Self {
            item_id,
            provider_job_id: None,
            attempts: 0,
            outcome: ItemOutcome::Skipped { reason },
        }
    }

    /// Job status equivalent of the outcome; `None` for items never submitted
    pub fn status(&self) -> Option<JobStatus> {
        match &self.outcome {
            ItemOutcome::Succeeded { .. } => Some(JobStatus::Succeeded),
            ItemOutcome::Failed { .. } => Some(JobStatus::Failed),
            ItemOutcome::TimedOut { .. } => Some(JobStatus::TimedOut),
            ItemOutcome::Abandoned | ItemOutcome::Skipped { .. } => None,
        }
    }

    /// Result for attempted items
    pub fn job_result(&self) -> Option<JobResult> {
        match &self.outcome {
            ItemOutcome::Succeeded { output_url } => {
                Some(JobResult::succeeded(self.item_id, output_url.clone()))
            }
            ItemOutcome::Skipped { .. } => None,
            other => other
                .detail()
                .map(|detail| JobResult::failed(self.item_id, detail)),
        }
    }
}

/// Aggregate result of one batch
///
/// `attempted == succeeded + failed + timed_out + abandoned`; skipped items are
/// never attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub session_id: Uuid,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub abandoned: usize,
    pub skipped: usize,
    pub items: Vec<ItemReport>,
}

impl BatchOutcome {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            ..Default::default()
        }
    }

    pub fn record(&mut self, report: ItemReport) {
        match &report.outcome {
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Succeeded { .. } => self.succeeded += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::TimedOut { .. } => self.timed_out += 1,
            ItemOutcome::Abandoned => self.abandoned += 1,
        }
        if !matches!(report.outcome, ItemOutcome::Skipped { .. }) {
            self.attempted += 1;
        }
        self.items.push(report);
    }

    pub fn report_for(&self, item_id: Uuid) -> Option<&ItemReport> {
        self.items.iter().find(|r| r.item_id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use ItemState::*;
        assert!(NotStarted.can_transition_to(Submitted));
        assert!(NotStarted.can_transition_to(Failed));
        assert!(Submitted.can_transition_to(Polling));
        assert!(Polling.can_transition_to(Polling));
        assert!(Polling.can_transition_to(TimedOut));

        assert!(!NotStarted.can_transition_to(Succeeded));
        assert!(!Submitted.can_transition_to(Succeeded));
        assert!(!Succeeded.can_transition_to(Polling));
        assert!(!TimedOut.can_transition_to(Failed));
    }

    #[test]
    fn test_record_counts() {
        let mut outcome = BatchOutcome::new(Uuid::new_v4());
        outcome.record(ItemReport {
            item_id: Uuid::new_v4(),
            provider_job_id: Some("p1".into()),
            attempts: 1,
            outcome: ItemOutcome::Succeeded {
                output_url: "v1".into(),
            },
        });
        outcome.record(ItemReport {
            item_id: Uuid::new_v4(),
            provider_job_id: Some("p2".into()),
            attempts: 2,
            outcome: ItemOutcome::TimedOut { detail: None },
        });
        outcome.record(ItemReport::skipped(Uuid::new_v4(), SkipReason::NoAudio));

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.timed_out, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.items.len(), 3);
    }

    #[test]
    fn test_timed_out_is_not_failed() {
        let report = ItemReport {
            item_id: Uuid::new_v4(),
            provider_job_id: Some("p".into()),
            attempts: 2,
            outcome: ItemOutcome::TimedOut { detail: None },
        };
        assert_eq!(report.status(), Some(JobStatus::TimedOut));
        assert_eq!(report.outcome.label(), "timed_out");
        let result = report.job_result().unwrap();
        assert!(result.output_url.is_none());
        assert!(result.error_detail.is_some());
    }

    #[test]
    fn test_job_result_per_outcome() {
        let item_id = Uuid::new_v4();
        let succeeded = ItemReport {
            item_id,
            provider_job_id: Some("p".into()),
            attempts: 1,
            outcome: ItemOutcome::Succeeded {
                output_url: "https://v/1.mp4".into(),
            },
        };
        assert_eq!(
            succeeded.job_result(),
            Some(JobResult::succeeded(item_id, "https://v/1.mp4"))
        );

        let abandoned = ItemReport {
            outcome: ItemOutcome::Abandoned,
            ..succeeded.clone()
        };
        assert_eq!(
            abandoned.job_result(),
            Some(JobResult::failed(item_id, "polling stopped by shutdown"))
        );
        assert_eq!(abandoned.status(), None);

        assert!(ItemReport::skipped(item_id, SkipReason::NoAudio)
            .job_result()
            .is_none());
    }
}
