//! The per-session orchestrator.
//!
//! Wires the pipeline, timer, SSE bus, transcript bus, and completion
//! workflow into one session. Owns the `InterviewContext` exclusively.
//! Phase transitions — whether timer-driven or externally requested — are
//! serialized on a per-session transition lock so a near-simultaneous expiry
//! and external request cannot double-advance.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use viva_domain::chat::Message;
use viva_domain::enums::{parse_tool_names, InterviewStatus, SseEventType};
use viva_domain::error::{Error, Result};
use viva_domain::events::{TaskEvent, TranscriptEvent};
use viva_domain::frames::{ClientEvent, Frame};
use viva_domain::planner::{InterviewContext, PlannerField};
use viva_providers::traits::{LlmProvider, TextToSpeech};
use viva_queue::CompletionNotifier;
use viva_store::{
    InterviewStore, PlannerStore, QuestionStore, SolutionStore, TranscriptStore,
};

use crate::closure::ClosureHandler;
use crate::code_pipeline::CodePipeline;
use crate::completion::{CompletionResult, CompletionWorkflow};
use crate::context_switch::{
    phase_transition_message, ContextSwitch, Injector, DEFAULT_PHASE_INSTRUCTIONS,
};
use crate::design_pipeline::DesignPipeline;
use crate::gate::{GateHandle, InterviewGate};
use crate::llm_stage::LlmStage;
use crate::pipeline::{self, Outlet};
use crate::sse::{SseBus, SseEnvelope};
use crate::timer::{PhaseTimer, TimerSignal, TimerStatus};
use crate::transcript::{
    register_store_subscriber, TapSide, TranscriptBus, TranscriptTap, TOPIC_SESSION_ENDED,
    TOPIC_SESSION_STARTED,
};
use crate::tts_stage::TtsStage;

const GREETING_PROMPT: &str =
    "Greet the candidate warmly, introduce yourself as the interviewer, and begin the interview.";

const CLOSURE_TURN: &str = "The interview time is over. Please thank the candidate for their \
time, offer brief encouraging feedback, mention the next steps, and say goodbye.";

/// Everything a session needs from the outside world.
#[derive(Clone)]
pub struct BotDeps {
    pub interviews: Arc<dyn InterviewStore>,
    pub planners: Arc<dyn PlannerStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub solutions: Arc<dyn SolutionStore>,
    pub transcripts: Arc<dyn TranscriptStore>,
    pub llm: Arc<dyn LlmProvider>,
    pub tts: Arc<dyn TextToSpeech>,
    pub notifier: Arc<dyn CompletionNotifier>,
    pub debounce_quiet: Duration,
}

pub struct InterviewBot {
    context: Mutex<InterviewContext>,
    head: Outlet,
    injector: Injector,
    gate: GateHandle,
    timer: PhaseTimer,
    sse: Arc<SseBus>,
    transcript_bus: Arc<TranscriptBus>,
    completion: CompletionWorkflow,

    transition_lock: tokio::sync::Mutex<()>,
    wrap_up_sent: AtomicBool,
    transitions_completed: AtomicU32,
    running: AtomicBool,

    pipeline_handles: Vec<JoinHandle<()>>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
    /// Frames leaving the pipeline (the transport-out feed). Taken once by
    /// the transport integration.
    output: Mutex<Option<mpsc::Receiver<Frame>>>,
}

/// Load and validate everything needed to run one session.
pub async fn build_context(
    deps: &BotDeps,
    mock_interview_id: &str,
    user_id: &str,
    session_id: &str,
) -> Result<InterviewContext> {
    let interview = deps
        .interviews
        .get_by_mock_and_user(mock_interview_id, user_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "no candidate interview for mock {mock_interview_id} and user {user_id}"
            ))
        })?;

    let rows = deps.planners.plan(&interview.id).await?;
    if rows.is_empty() {
        return Err(Error::NotFound(format!(
            "no interview plan for candidate interview {}",
            interview.id
        )));
    }

    let mut planners = Vec::with_capacity(rows.len());
    let mut question_ids = Vec::with_capacity(rows.len());
    for row in rows {
        let mut planner = PlannerField::new(
            row.sequence,
            row.duration_minutes,
            row.question_id.clone(),
            row.knowledge_bank_id,
        )?;
        planner.tool_names = parse_tool_names(&row.tool_names);
        planner.tool_properties = row.tool_properties;
        planner.interview_instructions = row.interview_instructions;
        question_ids.push(row.question_id);
        planners.push(planner);
    }

    let mut context = InterviewContext::new(
        mock_interview_id,
        &interview.id,
        user_id,
        session_id,
        planners,
    )?;

    let questions = deps.questions.get_many(&question_ids).await?;
    let texts = questions
        .into_iter()
        .map(|(id, q)| (id, q.question))
        .collect();
    context.populate_question_texts(&texts);

    Ok(context)
}

/// Initial LLM system prompt: the first phase's instructions wrapped in the
/// session banner, or the default when the phase carries none.
fn initial_system_prompt(context: &InterviewContext) -> String {
    match context.current_planner() {
        Some(planner)
            if planner
                .interview_instructions
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty()) =>
        {
            phase_transition_message(
                planner,
                context.planners.len(),
                planner.interview_instructions.as_deref().unwrap_or_default(),
            )
        }
        _ => DEFAULT_PHASE_INSTRUCTIONS.to_string(),
    }
}

impl InterviewBot {
    /// Bring up a session: build the context, compose the pipeline, start
    /// the phase-0 timer, and emit the phase-started SSE event.
    pub async fn start(
        deps: BotDeps,
        mock_interview_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Arc<Self>> {
        let mut context =
            build_context(&deps, mock_interview_id, user_id, session_id).await?;

        // A fresh session moves the durable row to IN_PROGRESS.
        let candidate_interview_id = context.candidate_interview_id.clone();
        if let Ok(Some(interview)) = deps.interviews.get(&candidate_interview_id).await {
            if interview.status == InterviewStatus::Pending {
                if let Err(e) = deps
                    .interviews
                    .update_status(&candidate_interview_id, InterviewStatus::InProgress)
                    .await
                {
                    tracing::warn!(error = %e, "failed to mark interview IN_PROGRESS");
                }
            }
        }

        let system_prompt = initial_system_prompt(&context);
        let gate = GateHandle::new();
        let transcript_bus = Arc::new(TranscriptBus::new());
        register_store_subscriber(&transcript_bus, deps.transcripts.clone()).await;

        let stages: Vec<Box<dyn crate::pipeline::Processor>> = vec![
            Box::new(ContextSwitch),
            Box::new(InterviewGate::new(gate.clone())),
            Box::new(CodePipeline::new(deps.solutions.clone(), deps.debounce_quiet)),
            Box::new(DesignPipeline::new(deps.solutions.clone(), deps.debounce_quiet)),
            Box::new(TranscriptTap::new(
                TapSide::Candidate,
                transcript_bus.clone(),
                &candidate_interview_id,
                session_id,
            )),
            Box::new(ClosureHandler),
            Box::new(LlmStage::new(deps.llm.clone(), &system_prompt)),
            Box::new(TtsStage::new(deps.tts.clone())),
            Box::new(TranscriptTap::new(
                TapSide::Interviewer,
                transcript_bus.clone(),
                &candidate_interview_id,
                session_id,
            )),
        ];

        let spawned = pipeline::spawn(stages);
        let head = spawned.head();
        // Injections enter just downstream of the context switch stage.
        let injector = Injector::new(spawned.inlets[1].clone());

        let (timer, signal_rx) = PhaseTimer::new();

        let first_planner = match context.current_planner_mut() {
            Some(planner) => {
                planner.start_time = Some(Utc::now());
                planner.clone()
            }
            None => return Err(Error::InvalidArgument("empty interview plan".into())),
        };

        let bot = Arc::new(Self {
            context: Mutex::new(context),
            head: head.clone(),
            injector,
            gate,
            timer,
            sse: Arc::new(SseBus::new()),
            transcript_bus: transcript_bus.clone(),
            completion: CompletionWorkflow::new(deps.interviews.clone(), deps.notifier.clone()),
            transition_lock: tokio::sync::Mutex::new(()),
            wrap_up_sent: AtomicBool::new(false),
            transitions_completed: AtomicU32::new(0),
            running: AtomicBool::new(true),
            pipeline_handles: spawned.handles,
            signal_task: Mutex::new(None),
            output: Mutex::new(Some(spawned.tail)),
        });

        let signal_task = tokio::spawn(run_signal_loop(bot.clone(), signal_rx));
        *bot.signal_task.lock() = Some(signal_task);

        head.push(Frame::Start).await;
        bot.transcript_bus
            .publish(
                TOPIC_SESSION_STARTED,
                bot.session_marker("Interview session started"),
            )
            .await;

        bot.timer.start(&first_planner).await;
        bot.sse.publish(
            SseEventType::Interview,
            TaskEvent::from_planner(&first_planner),
        );

        let phases = bot.context.lock().planners.len();
        tracing::info!(
            mock_interview_id,
            candidate_interview_id = %candidate_interview_id,
            session_id,
            phases,
            "interview session started"
        );

        Ok(bot)
    }

    // ── Transport events ──────────────────────────────────────────────

    /// The candidate's client connected: prime the model with a greeting.
    pub async fn handle_client_connected(&self) {
        self.head
            .push(Frame::LlmAppend {
                messages: vec![Message::user(GREETING_PROMPT)],
                run_llm: true,
            })
            .await;
    }

    /// The candidate's client disconnected: stop the timer, close out the
    /// transcript session, and tear down the pipeline. The interview is NOT
    /// marked completed here — a dropped candidate is not a finished
    /// interview.
    pub async fn handle_client_disconnected(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.timer.stop();
        self.transcript_bus
            .publish(
                TOPIC_SESSION_ENDED,
                self.session_marker("Interview session ended"),
            )
            .await;
        self.head.push(Frame::End).await;

        for handle in &self.pipeline_handles {
            handle.abort();
        }
        if let Some(task) = self.signal_task.lock().take() {
            task.abort();
        }
        tracing::info!(
            session_id = %self.context.lock().session_id,
            "session cleaned up on disconnect"
        );
    }

    // ── Inbound frames & client events ────────────────────────────────

    /// Inject a frame at the pipeline head (STT text, closure frames,
    /// synthetic test input).
    pub async fn push_frame(&self, frame: Frame) {
        self.head.push(frame).await;
    }

    /// Dispatch a structured UI event to the artifact pipelines.
    pub async fn handle_client_event(&self, event: ClientEvent) {
        self.head.push(Frame::Client(event)).await;
    }

    // ── Phase control ─────────────────────────────────────────────────

    /// Externally requested transition (e.g. the model decided the phase is
    /// done). Validated against the caller's view of the session, then
    /// serialized on the transition lock.
    pub async fn advance_phase(
        &self,
        candidate_interview_id: &str,
        current_sequence: u32,
    ) -> Result<u32> {
        let _guard = self.transition_lock.lock().await;
        {
            let ctx = self.context.lock();
            if ctx.candidate_interview_id != candidate_interview_id {
                return Err(Error::InvalidArgument(
                    "candidate interview id mismatch".into(),
                ));
            }
            if ctx.current_sequence != current_sequence {
                return Err(Error::InvalidArgument(format!(
                    "phase sequence mismatch: requested {current_sequence}, at {}",
                    ctx.current_sequence
                )));
            }
            if ctx.next_planner().is_none() {
                return Err(Error::InvalidArgument("no next phase available".into()));
            }
        }
        self.timer.stop();
        self.advance_locked("external").await
    }

    async fn handle_expiry(&self) {
        let _guard = self.transition_lock.lock().await;
        if let Err(e) = self.advance_locked("timer").await {
            tracing::error!(error = %e, "phase transition after expiry failed");
        }
    }

    /// Advance to the next phase or finalize. Caller holds the transition
    /// lock.
    async fn advance_locked(&self, initiated_by: &str) -> Result<u32> {
        let next = {
            let mut ctx = self.context.lock();
            if let Some(current) = ctx.current_planner_mut() {
                current.end_time = Some(Utc::now());
            }
            ctx.next_planner().cloned()
        };

        if next.is_none() {
            self.finalize().await;
            return Ok(self.context.lock().current_sequence);
        }

        let (planner, is_last, total) = {
            let mut ctx = self.context.lock();
            ctx.advance();
            let planner = match ctx.current_planner_mut() {
                Some(planner) => {
                    planner.start_time = Some(Utc::now());
                    planner.clone()
                }
                None => {
                    return Err(Error::Other(
                        "cursor past plan after validated advance".into(),
                    ))
                }
            };
            (planner, ctx.is_last_phase(), ctx.planners.len())
        };
        let transitions = self.transitions_completed.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            initiated_by,
            new_sequence = planner.sequence,
            question_id = %planner.question_id,
            duration_minutes = planner.duration_minutes,
            transitions,
            "transitioning to next phase"
        );

        self.injector
            .inject_planner_instructions(&planner, total)
            .await;
        self.timer.start(&planner).await;
        self.sse
            .publish(SseEventType::Interview, TaskEvent::from_planner(&planner));

        if is_last {
            self.send_wrap_up_once();
        }

        Ok(planner.sequence)
    }

    /// All phases done: closure context, completion workflow, seal.
    async fn finalize(&self) {
        let (candidate_interview_id, session_duration) = {
            let ctx = self.context.lock();
            (
                ctx.candidate_interview_id.clone(),
                ctx.session_duration_secs(),
            )
        };
        let transitions = self.transitions_completed.load(Ordering::SeqCst);

        tracing::info!(
            candidate_interview_id = %candidate_interview_id,
            session_duration_secs = session_duration,
            transitions,
            "all phases complete, finalizing interview"
        );

        self.timer.stop();
        self.injector
            .inject_closure_context(session_duration, transitions)
            .await;

        self.gate.seal();
        let result = self.completion.complete(&candidate_interview_id).await;
        if !result.success() && !result.already_completed {
            tracing::warn!(
                candidate_interview_id = %candidate_interview_id,
                errors = ?result.errors,
                "completion workflow reported failure"
            );
        }

        // Entering the last phase normally emits this; single-phase
        // sessions reach finalization without a transition, so emit the
        // fallback here.
        self.send_wrap_up_once();

        // The closure frame is system-class, so it survives the sealed gate
        // and the closure handler converts it into the final user turn.
        self.head
            .push(Frame::Closure {
                message: CLOSURE_TURN.to_string(),
                session_duration_secs: session_duration,
                reason: "timer_expired".to_string(),
            })
            .await;
    }

    fn send_wrap_up_once(&self) {
        if self.wrap_up_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sse.publish(SseEventType::System, TaskEvent::wrap_up());
        tracing::info!("WRAP_UP event sent");
    }

    // ── Introspection & plumbing ──────────────────────────────────────

    pub fn subscribe_events(&self) -> mpsc::Receiver<SseEnvelope> {
        self.sse.subscribe()
    }

    /// The transport-out feed. Yields `None` after the first call.
    pub fn take_output(&self) -> Option<mpsc::Receiver<Frame>> {
        self.output.lock().take()
    }

    pub fn pause_timer(&self) -> bool {
        self.timer.pause()
    }

    pub fn resume_timer(&self) -> bool {
        self.timer.resume()
    }

    pub fn timer_status(&self) -> TimerStatus {
        self.timer.status()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_sealed(&self) -> bool {
        self.gate.is_sealed()
    }

    pub fn candidate_interview_id(&self) -> String {
        self.context.lock().candidate_interview_id.clone()
    }

    /// Serializable session status for the HTTP surface.
    pub fn status(&self) -> serde_json::Value {
        let summary = self.context.lock().summary();
        serde_json::json!({
            "interview": summary,
            "timer": self.timer.status(),
            "running": self.is_running(),
            "sealed": self.is_sealed(),
            "transitions_completed": self.transitions_completed.load(Ordering::SeqCst),
        })
    }

    /// Run the completion workflow directly (operational retry path).
    pub async fn complete_now(&self) -> CompletionResult {
        let id = self.candidate_interview_id();
        self.completion.complete(&id).await
    }

    fn session_marker(&self, message: &str) -> TranscriptEvent {
        let ctx = self.context.lock();
        TranscriptEvent::new(
            &ctx.candidate_interview_id,
            &ctx.session_id,
            viva_domain::enums::TranscriptSender::Interviewer,
            message,
        )
    }

    fn current_planner_clone(&self) -> Option<PlannerField> {
        self.context.lock().current_planner().cloned()
    }
}

async fn run_signal_loop(bot: Arc<InterviewBot>, mut rx: mpsc::Receiver<TimerSignal>) {
    while let Some(signal) = rx.recv().await {
        match signal {
            TimerSignal::Started { sequence } => {
                tracing::debug!(sequence, "timer started");
            }
            TimerSignal::Tick(status) => {
                tracing::debug!(
                    remaining_secs = status.remaining_secs,
                    progress_pct = status.progress_pct,
                    "timer tick"
                );
            }
            TimerSignal::Nudge {
                progress_pct,
                is_final,
            } => {
                if let Some(planner) = bot.current_planner_clone() {
                    bot.injector
                        .inject_time_nudge(progress_pct, &planner, is_final)
                        .await;
                }
            }
            TimerSignal::Expired { sequence } => {
                tracing::info!(sequence, "phase expired, requesting transition");
                bot.handle_expiry().await;
            }
        }
    }
}
