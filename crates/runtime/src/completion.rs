//! The interview completion workflow.
//!
//! Runs once per session (idempotent on re-entry): validate the interview,
//! notify the external queue, then flip the row to COMPLETED. The
//! notification goes first so downstream consumers cannot miss a completed
//! interview; if it fails, the status write is skipped and the whole
//! workflow can be retried. If the status write fails after a successful
//! notification, that divergence is critical-logged and surfaced.

use std::sync::Arc;

use viva_domain::enums::InterviewStatus;
use viva_queue::CompletionNotifier;
use viva_store::InterviewStore;

/// Outcome of one completion attempt.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CompletionResult {
    pub candidate_interview_id: String,
    pub database_updated: bool,
    pub notification_sent: bool,
    pub already_completed: bool,
    pub message_id: Option<String>,
    pub errors: Vec<String>,
}

impl CompletionResult {
    /// Success requires both the notification and the status write.
    pub fn success(&self) -> bool {
        self.notification_sent && self.database_updated
    }
}

pub struct CompletionWorkflow {
    interviews: Arc<dyn InterviewStore>,
    notifier: Arc<dyn CompletionNotifier>,
}

impl CompletionWorkflow {
    pub fn new(interviews: Arc<dyn InterviewStore>, notifier: Arc<dyn CompletionNotifier>) -> Self {
        Self {
            interviews,
            notifier,
        }
    }

    pub async fn complete(&self, candidate_interview_id: &str) -> CompletionResult {
        let mut result = CompletionResult {
            candidate_interview_id: candidate_interview_id.to_string(),
            ..Default::default()
        };

        tracing::info!(candidate_interview_id, "starting interview completion workflow");

        // Step 1: the interview must exist.
        let interview = match self.interviews.get(candidate_interview_id).await {
            Ok(Some(interview)) => interview,
            Ok(None) => {
                tracing::error!(candidate_interview_id, "interview not found for completion");
                result.errors.push("interview not found".into());
                return result;
            }
            Err(e) => {
                tracing::error!(candidate_interview_id, error = %e, "failed to load interview");
                result.errors.push(format!("load failed: {e}"));
                return result;
            }
        };

        // Step 2: idempotency.
        if interview.status == InterviewStatus::Completed {
            tracing::warn!(
                candidate_interview_id,
                "interview already COMPLETED, skipping duplicate completion"
            );
            result.already_completed = true;
            return result;
        }

        // Step 3: notification before the status flip. A failure here stops
        // the workflow so the row stays IN_PROGRESS and a later call can
        // retry the whole sequence.
        match self.notifier.notify_completion(candidate_interview_id).await {
            Ok(receipt) => {
                result.notification_sent = true;
                result.message_id = receipt.message_id;
            }
            Err(e) => {
                tracing::error!(candidate_interview_id, error = %e, "completion notification failed");
                result.errors.push(format!("notification failed: {e}"));
                return result;
            }
        }

        // Step 4: status flip.
        match self
            .interviews
            .update_status(candidate_interview_id, InterviewStatus::Completed)
            .await
        {
            Ok(()) => {
                result.database_updated = true;
                tracing::info!(
                    candidate_interview_id,
                    previous_status = %interview.status,
                    "interview marked COMPLETED"
                );
            }
            Err(e) => {
                // The external world believes completion, the store does not.
                tracing::error!(
                    candidate_interview_id,
                    message_id = ?result.message_id,
                    error = %e,
                    critical = true,
                    "notification sent but status update failed"
                );
                result.errors.push(format!("status update failed: {e}"));
            }
        }

        if result.success() {
            tracing::info!(candidate_interview_id, "completion workflow finished");
        } else {
            tracing::warn!(
                candidate_interview_id,
                database_updated = result.database_updated,
                notification_sent = result.notification_sent,
                errors = ?result.errors,
                "completion workflow finished with issues"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{MemoryStore, OpsLog, RecordingNotifier};

    async fn seeded(status: InterviewStatus) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed_interview("ci1", "m1", "u1", status);
        store
    }

    #[tokio::test]
    async fn happy_path_notifies_then_updates() {
        let ops = OpsLog::default();
        let store = Arc::new(MemoryStore::new().with_ops(ops.clone()));
        store.seed_interview("ci1", "m1", "u1", InterviewStatus::InProgress);
        let notifier = Arc::new(RecordingNotifier::ok().with_ops(ops.clone()));
        let workflow = CompletionWorkflow::new(store.clone(), notifier.clone());

        let result = workflow.complete("ci1").await;
        assert!(result.success());
        assert!(result.notification_sent);
        assert!(result.database_updated);
        assert!(result.message_id.is_some());
        assert_eq!(notifier.sent(), vec!["ci1"]);
        assert_eq!(
            store.interview_status("ci1"),
            Some(InterviewStatus::Completed)
        );
        // The notification precedes the status flip.
        assert_eq!(*ops.lock(), vec!["notify", "status_update"]);
    }

    #[tokio::test]
    async fn second_call_reports_already_completed() {
        let store = seeded(InterviewStatus::InProgress).await;
        let notifier = Arc::new(RecordingNotifier::ok());
        let workflow = CompletionWorkflow::new(store.clone(), notifier.clone());

        assert!(workflow.complete("ci1").await.success());
        let second = workflow.complete("ci1").await;

        assert!(second.already_completed);
        assert!(!second.success());
        assert_eq!(notifier.sent().len(), 1, "exactly one notification overall");
    }

    #[tokio::test]
    async fn missing_interview_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::ok());
        let workflow = CompletionWorkflow::new(store, notifier.clone());

        let result = workflow.complete("ghost").await;
        assert!(!result.success());
        assert!(result.errors.iter().any(|e| e.contains("not found")));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn notification_failure_skips_status_update() {
        let store = seeded(InterviewStatus::InProgress).await;
        let notifier = Arc::new(RecordingNotifier::failing());
        let workflow = CompletionWorkflow::new(store.clone(), notifier);

        let result = workflow.complete("ci1").await;
        assert!(!result.notification_sent);
        assert!(!result.database_updated);
        assert!(!result.success());
        // The row is retryable.
        assert_eq!(
            store.interview_status("ci1"),
            Some(InterviewStatus::InProgress)
        );
    }

    #[tokio::test]
    async fn db_failure_after_notification_is_partial() {
        let store = seeded(InterviewStatus::InProgress).await;
        store.fail_status_updates();
        let notifier = Arc::new(RecordingNotifier::ok());
        let workflow = CompletionWorkflow::new(store.clone(), notifier.clone());

        let result = workflow.complete("ci1").await;
        assert!(result.notification_sent);
        assert!(!result.database_updated);
        assert!(!result.success());
        assert_eq!(notifier.sent(), vec!["ci1"]);
        assert!(result.errors.iter().any(|e| e.contains("status update failed")));
    }
}
