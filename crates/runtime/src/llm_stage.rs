//! The LLM stage.
//!
//! Owns the conversation context for the session: the initial system prompt
//! plus every appended turn. `LlmUpdate`/`LlmAppend` frames extend the
//! context and, when `run_llm` is set, trigger a generation whose text is
//! emitted downstream as `BotText`. A raw `UserText` frame (out of STT) is
//! treated as a user turn that always triggers generation.
//!
//! Provider failures are logged and the pipeline continues; the session is
//! never crashed for a transient external error.

use std::sync::Arc;

use viva_domain::chat::Message;
use viva_domain::error::Result;
use viva_domain::frames::Frame;
use viva_providers::traits::{ChatRequest, LlmProvider};

use crate::pipeline::{Outlet, Processor};

pub struct LlmStage {
    provider: Arc<dyn LlmProvider>,
    history: Vec<Message>,
    temperature: Option<f32>,
}

impl LlmStage {
    pub fn new(provider: Arc<dyn LlmProvider>, system_prompt: &str) -> Self {
        Self {
            provider,
            history: vec![Message::system(system_prompt)],
            temperature: None,
        }
    }

    async fn generate(&mut self, out: &Outlet) {
        let request = ChatRequest {
            messages: self.history.clone(),
            temperature: self.temperature,
            max_tokens: None,
            model: None,
        };

        match self.provider.chat(request).await {
            Ok(response) => {
                if response.content.is_empty() {
                    tracing::debug!("LLM returned empty content, nothing to speak");
                    return;
                }
                self.history.push(Message::assistant(&response.content));
                out.push(Frame::BotText {
                    text: response.content,
                })
                .await;
            }
            Err(e) => {
                tracing::error!(
                    provider = self.provider.provider_id(),
                    error = %e,
                    "LLM generation failed, continuing session"
                );
            }
        }
    }
}

#[async_trait::async_trait]
impl Processor for LlmStage {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match frame {
            Frame::UserText { text, .. } => {
                self.history.push(Message::user(text));
                self.generate(out).await;
            }
            Frame::LlmAppend { messages, run_llm } | Frame::LlmUpdate { messages, run_llm } => {
                self.history.extend(messages);
                if run_llm {
                    self.generate(out).await;
                }
            }
            other => out.push(other).await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::CaptureLlm;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use viva_domain::chat::Role;

    fn stage(provider: Arc<CaptureLlm>) -> LlmStage {
        LlmStage::new(provider, "You are the interviewer.")
    }

    #[tokio::test]
    async fn user_text_triggers_generation_with_full_history() {
        let provider = Arc::new(CaptureLlm::new());
        let mut llm = stage(provider.clone());
        let (tx, mut rx) = mpsc::channel(4);

        llm.process(
            Frame::UserText {
                text: "I'd use a hash map".into(),
                timestamp: Utc::now(),
            },
            &Outlet::new(tx),
        )
        .await
        .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        assert_eq!(requests[0][1].content, "I'd use a hash map");

        assert!(matches!(rx.try_recv().unwrap(), Frame::BotText { .. }));
    }

    #[tokio::test]
    async fn update_without_run_llm_only_extends_context() {
        let provider = Arc::new(CaptureLlm::new());
        let mut llm = stage(provider.clone());
        let (tx, mut rx) = mpsc::channel(4);

        llm.process(
            Frame::LlmUpdate {
                messages: vec![Message::system("new phase")],
                run_llm: false,
            },
            &Outlet::new(tx.clone()),
        )
        .await
        .unwrap();
        assert!(provider.requests().is_empty());
        assert!(rx.try_recv().is_err());

        // The injected system message is visible to the next generation.
        llm.process(
            Frame::UserText {
                text: "ready".into(),
                timestamp: Utc::now(),
            },
            &Outlet::new(tx),
        )
        .await
        .unwrap();
        let requests = provider.requests();
        assert!(requests[0]
            .iter()
            .any(|m| m.role == Role::System && m.content == "new phase"));
    }

    #[tokio::test]
    async fn assistant_turns_accumulate_in_history() {
        let provider = Arc::new(CaptureLlm::new());
        let mut llm = stage(provider.clone());
        let (tx, _rx) = mpsc::channel(8);
        let out = Outlet::new(tx);

        for text in ["one", "two"] {
            llm.process(
                Frame::UserText {
                    text: text.into(),
                    timestamp: Utc::now(),
                },
                &out,
            )
            .await
            .unwrap();
        }

        let second = &provider.requests()[1];
        // system + user(one) + assistant + user(two)
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn unrelated_frames_pass_through() {
        let provider = Arc::new(CaptureLlm::new());
        let mut llm = stage(provider.clone());
        let (tx, mut rx) = mpsc::channel(4);

        llm.process(Frame::Start, &Outlet::new(tx)).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Frame::Start));
        assert!(provider.requests().is_empty());
    }
}
