//! Completion notifications to the external queue.
//!
//! Delivery is at-least-once; downstream consumers dedupe on the
//! candidate interview id.

use viva_domain::error::{Error, Result};

/// Receipt for a delivered notification.
#[derive(Debug, Clone)]
pub struct NotificationReceipt {
    pub message_id: Option<String>,
}

/// Seam for the completion workflow's outbound notification.
#[async_trait::async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Announce that an interview finished. The payload carries only the
    /// candidate interview id.
    async fn notify_completion(&self, candidate_interview_id: &str)
        -> Result<NotificationReceipt>;
}

/// SQS-backed notifier. The client is built lazily on first use so process
/// startup does not depend on AWS connectivity.
pub struct SqsNotifier {
    queue_url: String,
    region: String,
    client: tokio::sync::OnceCell<aws_sdk_sqs::Client>,
}

impl SqsNotifier {
    pub fn new(queue_url: &str, region: &str) -> Self {
        Self {
            queue_url: queue_url.to_string(),
            region: region.to_string(),
            client: tokio::sync::OnceCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.queue_url.is_empty()
    }

    async fn client(&self) -> &aws_sdk_sqs::Client {
        self.client
            .get_or_init(|| async {
                let config = aws_config::from_env()
                    .region(aws_config::Region::new(self.region.clone()))
                    .load()
                    .await;
                aws_sdk_sqs::Client::new(&config)
            })
            .await
    }
}

#[async_trait::async_trait]
impl CompletionNotifier for SqsNotifier {
    async fn notify_completion(
        &self,
        candidate_interview_id: &str,
    ) -> Result<NotificationReceipt> {
        if !self.is_enabled() {
            return Err(Error::Queue("completion queue not configured".into()));
        }

        let body = serde_json::json!({ "candidateInterviewId": candidate_interview_id });
        let attribute = aws_sdk_sqs::types::MessageAttributeValue::builder()
            .data_type("String")
            .string_value(candidate_interview_id)
            .build()
            .map_err(|e| Error::Queue(e.to_string()))?;

        let response = self
            .client()
            .await
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body.to_string())
            .message_attributes("candidateInterviewId", attribute)
            .send()
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;

        tracing::info!(
            candidate_interview_id,
            message_id = ?response.message_id(),
            "interview completion notification sent"
        );

        Ok(NotificationReceipt {
            message_id: response.message_id().map(str::to_owned),
        })
    }
}
