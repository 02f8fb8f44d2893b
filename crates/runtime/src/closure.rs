//! Closure handling.
//!
//! Sits immediately before the LLM stage and converts an in-band closure
//! frame into a user-turn append that makes the model produce the final
//! utterance. Closure frames are system-class, so they survive the sealed
//! gate.

use viva_domain::chat::Message;
use viva_domain::error::Result;
use viva_domain::frames::Frame;

use crate::pipeline::{Outlet, Processor};

#[derive(Default)]
pub struct ClosureHandler;

#[async_trait::async_trait]
impl Processor for ClosureHandler {
    fn name(&self) -> &'static str {
        "closure_handler"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match frame {
            Frame::Closure {
                message,
                session_duration_secs,
                reason,
            } => {
                tracing::info!(
                    session_duration_secs,
                    reason,
                    "converting closure frame to final LLM turn"
                );
                out.push(Frame::LlmAppend {
                    messages: vec![Message::user(message)],
                    run_llm: true,
                })
                .await;
            }
            other => out.push(other).await,
        }
        Ok(())
    }
}
