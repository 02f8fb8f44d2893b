//! Test doubles shared by unit and integration tests.
//!
//! An in-memory store implementing every persistence trait, a recording
//! completion notifier, a capture LLM, and a silent TTS. All record enough
//! to assert ordering and coalescing properties.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use viva_domain::chat::Message;
use viva_domain::enums::InterviewStatus;
use viva_domain::error::{Error, Result};
use viva_domain::events::TranscriptEvent;
use viva_providers::traits::{ChatRequest, ChatResponse, LlmProvider, TextToSpeech};
use viva_queue::{CompletionNotifier, NotificationReceipt};
use viva_store::{
    CandidateInterview, InterviewQuestion, InterviewStore, PlannerRow, PlannerStore,
    QuestionSolution, QuestionStore, SolutionStore, TranscriptStore,
};

/// Shared operation log for cross-component ordering assertions.
pub type OpsLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct MemoryStore {
    interviews: Mutex<HashMap<String, CandidateInterview>>,
    planners: Mutex<Vec<PlannerRow>>,
    questions: Mutex<HashMap<String, InterviewQuestion>>,
    solutions: Mutex<HashMap<(String, String), QuestionSolution>>,
    transcripts: Mutex<Vec<TranscriptEvent>>,
    upsert_calls: Mutex<u32>,
    fail_status_updates: AtomicBool,
    ops: OpsLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ops(mut self, ops: OpsLog) -> Self {
        self.ops = ops;
        self
    }

    // ── Seeding ───────────────────────────────────────────────────────

    pub fn seed_interview(&self, id: &str, mock: &str, user: &str, status: InterviewStatus) {
        self.interviews.lock().insert(
            id.to_string(),
            CandidateInterview {
                id: id.to_string(),
                mock_interview_id: mock.to_string(),
                user_id: user.to_string(),
                status,
                recording_url: None,
                code_editor_snapshot: None,
                design_editor_snapshot: None,
                created_at: Utc::now(),
            },
        );
    }

    pub fn seed_planner(
        &self,
        candidate_interview_id: &str,
        sequence: u32,
        duration_minutes: u32,
        question_id: &str,
        tool_names: &str,
        instructions: Option<&str>,
    ) {
        self.planners.lock().push(PlannerRow {
            id: uuid::Uuid::new_v4().to_string(),
            candidate_interview_id: candidate_interview_id.to_string(),
            sequence,
            duration_minutes,
            question_id: question_id.to_string(),
            knowledge_bank_id: "kb1".to_string(),
            interview_instructions: instructions.map(str::to_owned),
            tool_names: tool_names.to_string(),
            tool_properties: serde_json::Map::new(),
            created_at: Utc::now(),
        });
    }

    pub fn seed_question(&self, id: &str, text: &str) {
        self.questions.lock().insert(
            id.to_string(),
            InterviewQuestion {
                id: id.to_string(),
                question: text.to_string(),
            },
        );
    }

    // ── Inspection ────────────────────────────────────────────────────

    pub fn interview_status(&self, id: &str) -> Option<InterviewStatus> {
        self.interviews.lock().get(id).map(|i| i.status)
    }

    pub fn solution(&self, question_id: &str, candidate_interview_id: &str) -> Option<QuestionSolution> {
        self.solutions
            .lock()
            .get(&(question_id.to_string(), candidate_interview_id.to_string()))
            .cloned()
    }

    /// Number of `upsert` calls seen (revision writes, not rows).
    pub fn upsert_calls(&self) -> u32 {
        *self.upsert_calls.lock()
    }

    pub fn transcripts(&self) -> Vec<TranscriptEvent> {
        self.transcripts.lock().clone()
    }

    // ── Failure injection ─────────────────────────────────────────────

    pub fn fail_status_updates(&self) {
        self.fail_status_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl InterviewStore for MemoryStore {
    async fn get(&self, candidate_interview_id: &str) -> Result<Option<CandidateInterview>> {
        Ok(self.interviews.lock().get(candidate_interview_id).cloned())
    }

    async fn get_by_mock_and_user(
        &self,
        mock_interview_id: &str,
        user_id: &str,
    ) -> Result<Option<CandidateInterview>> {
        Ok(self
            .interviews
            .lock()
            .values()
            .find(|i| i.mock_interview_id == mock_interview_id && i.user_id == user_id)
            .cloned())
    }

    async fn update_status(
        &self,
        candidate_interview_id: &str,
        status: InterviewStatus,
    ) -> Result<()> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(Error::Store("injected status update failure".into()));
        }
        let mut interviews = self.interviews.lock();
        let interview = interviews
            .get_mut(candidate_interview_id)
            .ok_or_else(|| Error::NotFound(candidate_interview_id.to_string()))?;
        interview.status = status;
        self.ops.lock().push("status_update".to_string());
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlannerStore for MemoryStore {
    async fn plan(&self, candidate_interview_id: &str) -> Result<Vec<PlannerRow>> {
        let mut rows: Vec<PlannerRow> = self
            .planners
            .lock()
            .iter()
            .filter(|p| p.candidate_interview_id == candidate_interview_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl QuestionStore for MemoryStore {
    async fn get_many(&self, ids: &[String]) -> Result<HashMap<String, InterviewQuestion>> {
        let questions = self.questions.lock();
        Ok(ids
            .iter()
            .filter_map(|id| questions.get(id).map(|q| (id.clone(), q.clone())))
            .collect())
    }
}

#[async_trait::async_trait]
impl SolutionStore for MemoryStore {
    async fn get(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
    ) -> Result<Option<QuestionSolution>> {
        Ok(self
            .solutions
            .lock()
            .get(&(question_id.to_string(), candidate_interview_id.to_string()))
            .cloned())
    }

    async fn upsert(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
        answer: &str,
        language: &str,
    ) -> Result<QuestionSolution> {
        *self.upsert_calls.lock() += 1;
        let key = (question_id.to_string(), candidate_interview_id.to_string());
        let mut solutions = self.solutions.lock();
        let entry = solutions.entry(key).or_insert_with(|| QuestionSolution {
            id: uuid::Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            candidate_interview_id: candidate_interview_id.to_string(),
            answer: String::new(),
            language: String::new(),
            updated_at: Utc::now(),
        });
        entry.answer = answer.to_string();
        entry.language = language.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[async_trait::async_trait]
impl TranscriptStore for MemoryStore {
    async fn append(&self, event: &TranscriptEvent) -> Result<()> {
        self.transcripts.lock().push(event.clone());
        Ok(())
    }
}

/// Completion notifier double: records every send, optionally failing.
pub struct RecordingNotifier {
    fail: AtomicBool,
    sent: Mutex<Vec<String>>,
    ops: OpsLog,
}

impl RecordingNotifier {
    pub fn ok() -> Self {
        Self {
            fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            ops: OpsLog::default(),
        }
    }

    pub fn failing() -> Self {
        let notifier = Self::ok();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn with_ops(mut self, ops: OpsLog) -> Self {
        self.ops = ops;
        self
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn notify_completion(
        &self,
        candidate_interview_id: &str,
    ) -> Result<NotificationReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Queue("injected queue failure".into()));
        }
        self.sent.lock().push(candidate_interview_id.to_string());
        self.ops.lock().push("notify".to_string());
        Ok(NotificationReceipt {
            message_id: Some(format!("msg-{}", self.sent.lock().len())),
        })
    }
}

/// LLM double: captures every request, answers with a fixed line.
#[derive(Default)]
pub struct CaptureLlm {
    requests: Mutex<Vec<Vec<Message>>>,
}

impl CaptureLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message lists of every `chat` call, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().clone()
    }

    /// User-role contents across all calls, flattened.
    pub fn user_turns(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .flatten()
            .filter(|m| m.role == viva_domain::chat::Role::User)
            .map(|m| m.content.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmProvider for CaptureLlm {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req.messages.clone());
        Ok(ChatResponse {
            content: "Understood.".to_string(),
            model: "capture".to_string(),
        })
    }

    fn provider_id(&self) -> &str {
        "capture"
    }
}

/// TTS double: returns one byte per input char so tests can observe output.
#[derive(Default)]
pub struct SilentTts {
    synthesized: Mutex<Vec<String>>,
}

impl SilentTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.lock().clone()
    }
}

#[async_trait::async_trait]
impl TextToSpeech for SilentTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesized.lock().push(text.to_string());
        Ok(vec![0u8; text.len()])
    }
}
