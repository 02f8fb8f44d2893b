//! The design artifact pipeline.
//!
//! Same debounce pattern as the code pipeline, with a transformation step:
//! the raw Excalidraw scene becomes a description plus a Mermaid diagram
//! before anything reaches the LLM. Change detection compares both outputs
//! against the last pending-or-submitted pair, so duplicate scenes arriving
//! while a debounce is in flight do not re-fire. Persistence happens when
//! the debounce fires, storing the full JSON envelope under the `DESIGN`
//! language sentinel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use viva_diagram::parse_design;
use viva_domain::chat::Message;
use viva_domain::enums::DESIGN_LANGUAGE;
use viva_domain::error::Result;
use viva_domain::frames::{ClientEvent, DesignContent, Frame};
use viva_store::SolutionStore;

use crate::debounce::Debounce;
use crate::pipeline::{Outlet, Processor};

#[derive(Default)]
struct DesignState {
    submission_count: u32,
    /// Last (description, mermaid) actually sent to the LLM.
    last_submitted: Option<(String, String)>,
    /// Last (description, mermaid) scheduled but not yet sent.
    last_pending: Option<(String, String)>,
}

pub struct DesignPipeline {
    solutions: Arc<dyn SolutionStore>,
    state: Arc<Mutex<DesignState>>,
    debounce: Debounce,
}

impl DesignPipeline {
    pub fn new(solutions: Arc<dyn SolutionStore>, quiet: Duration) -> Self {
        Self {
            solutions,
            state: Arc::new(Mutex::new(DesignState::default())),
            debounce: Debounce::new(quiet),
        }
    }

    async fn handle(&mut self, design: DesignContent, out: &Outlet) {
        let summary = match parse_design(&design.content) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    question_id = %design.question_id,
                    error = %e,
                    "malformed design content, dropping event"
                );
                return;
            }
        };

        // Change detection against the pending pair first, then the
        // submitted one, to avoid duplicate fires mid-debounce.
        let is_first = {
            let mut state = self.state.lock();
            let unchanged = state
                .last_pending
                .as_ref()
                .or(state.last_submitted.as_ref())
                .is_some_and(|(prev_desc, prev_mermaid)| {
                    *prev_desc == summary.description && *prev_mermaid == summary.mermaid
                });
            if unchanged {
                tracing::debug!(
                    question_id = %design.question_id,
                    "design unchanged, skipping debounce"
                );
                return;
            }
            let is_first = state.last_pending.is_none() && state.last_submitted.is_none();
            state.last_pending = Some((summary.description.clone(), summary.mermaid.clone()));
            is_first
        };

        tracing::info!(
            question_id = %design.question_id,
            components = summary.structure.components.len(),
            connections = summary.structure.connections.len(),
            is_first,
            "design change detected, arming debounce"
        );

        let solutions = self.solutions.clone();
        let state = self.state.clone();
        let out = out.clone();
        let quiet_secs = self.debounce.quiet().as_secs();
        self.debounce.schedule(move || async move {
            let (count, is_first_fire) = {
                let mut s = state.lock();
                s.submission_count += 1;
                (s.submission_count, s.last_submitted.is_none())
            };

            // Persist the full envelope. A failure is logged and the prompt
            // still goes out.
            let envelope = serde_json::json!({
                "original_design": design.content,
                "description": summary.description,
                "mermaid": summary.mermaid,
                "timestamp": design.timestamp,
            });
            if let Err(e) = solutions
                .upsert(
                    &design.question_id,
                    &design.candidate_interview_id,
                    &envelope.to_string(),
                    DESIGN_LANGUAGE,
                )
                .await
            {
                tracing::error!(
                    question_id = %design.question_id,
                    error = %e,
                    "failed to persist design revision"
                );
            }

            let prompt = build_design_prompt(
                is_first_fire,
                count,
                &summary.description,
                &summary.mermaid,
                quiet_secs,
            );
            tracing::info!(
                question_id = %design.question_id,
                submission_count = count,
                "debounce elapsed, sending design to LLM"
            );
            out.push(Frame::LlmAppend {
                messages: vec![Message::user(prompt)],
                run_llm: true,
            })
            .await;

            let mut s = state.lock();
            s.last_submitted = Some((summary.description, summary.mermaid));
            s.last_pending = None;
        });
    }
}

#[async_trait::async_trait]
impl Processor for DesignPipeline {
    fn name(&self) -> &'static str {
        "design_pipeline"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match frame {
            Frame::Client(ClientEvent::Design(design)) => {
                self.handle(design, out).await;
            }
            other => out.push(other).await,
        }
        Ok(())
    }
}

fn build_design_prompt(
    is_first: bool,
    submission_count: u32,
    description: &str,
    mermaid: &str,
    quiet_secs: u64,
) -> String {
    let heading = if is_first {
        "CANDIDATE DESIGN SUBMISSION - INITIAL DESIGN"
    } else {
        "CANDIDATE DESIGN SUBMISSION - INCREMENTAL UPDATE"
    };
    let context = if is_first {
        format!(
            "This is the candidate's first design submission, captured after \
             {quiet_secs} seconds of inactivity. It is likely an early-stage \
             design; look for major structural issues but allow iterative \
             refinement."
        )
    } else {
        format!(
            "The candidate kept evolving their design; this snapshot was \
             captured after another {quiet_secs} seconds of inactivity. Assess \
             the refinement since the previous version, and discuss \
             scalability or alternatives only once the design looks \
             substantially complete."
        )
    };

    format!(
        "{heading}\n\n\
         Submission count: {submission_count}\n\n\
         Design description:\n{description}\n\n\
         Diagram structure (Mermaid):\n```mermaid\n{mermaid}\n```\n\n\
         {context}\n\n\
         Respond only if meaningful feedback is warranted; otherwise keep \
         observing."
    )
}
