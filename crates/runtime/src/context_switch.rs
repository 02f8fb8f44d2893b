//! System-prompt injection at phase boundaries.
//!
//! The pipeline stage itself is a pass-through; the paired [`Injector`]
//! pushes system-role messages into the stage's downstream channel, so an
//! injection enqueued for phase N is visible to the LLM before any user turn
//! of phase N.

use viva_domain::chat::Message;
use viva_domain::error::Result;
use viva_domain::frames::Frame;
use viva_domain::planner::PlannerField;

use crate::pipeline::{Outlet, Processor};

/// Pass-through stage marking the injection point in the pipeline.
#[derive(Default)]
pub struct ContextSwitch;

#[async_trait::async_trait]
impl Processor for ContextSwitch {
    fn name(&self) -> &'static str {
        "context_switch"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        out.push(frame).await;
        Ok(())
    }
}

/// Handle for injecting system messages downstream of the context switch
/// stage. Held by the orchestrator and driven from the timer signal loop.
#[derive(Clone)]
pub struct Injector {
    out: Outlet,
}

impl Injector {
    pub fn new(out: Outlet) -> Self {
        Self { out }
    }

    /// Inject the instructions for a phase being entered.
    pub async fn inject_planner_instructions(&self, planner: &PlannerField, total_phases: usize) {
        let instructions = planner
            .interview_instructions
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_PHASE_INSTRUCTIONS);

        let message = phase_transition_message(planner, total_phases, instructions);
        self.out
            .push(Frame::LlmUpdate {
                messages: vec![Message::system(message)],
                run_llm: true,
            })
            .await;

        tracing::info!(
            sequence = planner.sequence,
            duration_minutes = planner.duration_minutes,
            question_id = %planner.question_id,
            "injected phase instructions"
        );
    }

    /// Inject a short elapsed-time signal. `is_final` marks expiry.
    pub async fn inject_time_nudge(
        &self,
        progress_pct: f64,
        planner: &PlannerField,
        is_final: bool,
    ) {
        let message = if is_final {
            format!(
                "Time check: the allotted {} minutes for this phase are fully elapsed. \
                 Bring the current discussion to a natural close.",
                planner.duration_minutes
            )
        } else {
            format!(
                "Time check: roughly {:.0}% of the {} minutes for this phase has elapsed. \
                 Start steering the conversation toward a conclusion for this phase.",
                progress_pct, planner.duration_minutes
            )
        };

        self.out
            .push(Frame::LlmUpdate {
                messages: vec![Message::system(message)],
                run_llm: true,
            })
            .await;

        tracing::info!(
            progress_pct,
            is_final,
            sequence = planner.sequence,
            "injected time nudge"
        );
    }

    /// Inject the terminal closure context once every phase is done.
    ///
    /// Context-only: the generation itself is triggered by the closure
    /// frame the orchestrator pushes right after, which the closure handler
    /// turns into the final user turn.
    pub async fn inject_closure_context(&self, session_duration_secs: u64, transitions: u32) {
        let message = format!(
            "--- INTERVIEW COMPLETION ---\n\n\
             The interview has completed all planned phases ({transitions} transitions).\n\
             Total session duration: {} minutes and {} seconds.\n\n\
             {CLOSURE_INSTRUCTIONS}\n\n\
             --- END INTERVIEW ---",
            session_duration_secs / 60,
            session_duration_secs % 60,
        );

        self.out
            .push(Frame::LlmUpdate {
                messages: vec![Message::system(message)],
                run_llm: false,
            })
            .await;

        tracing::info!(transitions, "injected interview closure context");
    }
}

/// Banner carried with every phase's instructions.
pub fn phase_transition_message(
    planner: &PlannerField,
    total_phases: usize,
    instructions: &str,
) -> String {
    format!(
        "--- INTERVIEW PHASE TRANSITION ---\n\n\
         You are now entering phase {} of {total_phases}.\n\
         Duration: {} minutes\n\
         Question ID: {}\n\n\
         Transition smoothly, keep the conversational flow, and follow the \
         new instructions from here on.\n\n\
         {instructions}\n\n\
         --- END PHASE TRANSITION ---",
        planner.sequence + 1,
        planner.duration_minutes,
        planner.question_id,
    )
}

pub const DEFAULT_PHASE_INSTRUCTIONS: &str = "Continue the interview following standard \
professional practice: ask relevant questions, evaluate the responses, and keep the \
conversation engaging while assessing the candidate's technical and problem-solving skills.";

const CLOSURE_INSTRUCTIONS: &str = "The interview session is now complete. Thank the candidate \
for their time, offer brief constructive feedback, explain the next steps, ask for any final \
questions, and end the session professionally.";

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use viva_domain::chat::Role;

    fn planner_with_instructions(instructions: Option<&str>) -> PlannerField {
        let mut planner = PlannerField::new(0, 5, "q1", "kb").unwrap();
        planner.interview_instructions = instructions.map(str::to_owned);
        planner
    }

    fn capture() -> (Injector, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        (Injector::new(Outlet::new(tx)), rx)
    }

    fn system_content(frame: Frame) -> String {
        match frame {
            Frame::LlmUpdate { messages, run_llm } => {
                assert!(run_llm);
                assert_eq!(messages[0].role, Role::System);
                messages[0].content.clone()
            }
            other => panic!("unexpected frame {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn phase_injection_carries_banner_and_instructions() {
        let (injector, mut rx) = capture();
        let planner = planner_with_instructions(Some("Probe on hash maps."));
        injector.inject_planner_instructions(&planner, 3).await;

        let content = system_content(rx.try_recv().unwrap());
        assert!(content.contains("phase 1 of 3"));
        assert!(content.contains("Duration: 5 minutes"));
        assert!(content.contains("Question ID: q1"));
        assert!(content.contains("Probe on hash maps."));
    }

    #[tokio::test]
    async fn empty_instructions_fall_back_to_default() {
        let (injector, mut rx) = capture();
        let planner = planner_with_instructions(Some("   "));
        injector.inject_planner_instructions(&planner, 1).await;

        let content = system_content(rx.try_recv().unwrap());
        assert!(content.contains(DEFAULT_PHASE_INSTRUCTIONS));
    }

    #[tokio::test]
    async fn nudge_wording_differs_for_final() {
        let (injector, mut rx) = capture();
        let planner = planner_with_instructions(None);

        injector.inject_time_nudge(83.3, &planner, false).await;
        let content = system_content(rx.try_recv().unwrap());
        assert!(content.contains("83%"));

        injector.inject_time_nudge(100.0, &planner, true).await;
        let content = system_content(rx.try_recv().unwrap());
        assert!(content.contains("fully elapsed"));
    }

    #[tokio::test]
    async fn closure_context_mentions_duration_without_generating() {
        let (injector, mut rx) = capture();
        injector.inject_closure_context(125, 2).await;
        match rx.try_recv().unwrap() {
            Frame::LlmUpdate { messages, run_llm } => {
                // The closure frame that follows triggers generation, not
                // this context update.
                assert!(!run_llm);
                assert_eq!(messages[0].role, Role::System);
                assert!(messages[0].content.contains("2 minutes and 5 seconds"));
                assert!(messages[0].content.contains("Thank the candidate"));
            }
            other => panic!("unexpected frame {}", other.kind()),
        }
    }
}
