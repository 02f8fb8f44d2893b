//! Storage traits and row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use viva_domain::enums::InterviewStatus;
use viva_domain::error::Result;
use viva_domain::events::TranscriptEvent;

/// Durable record of one interview instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInterview {
    pub id: String,
    pub mock_interview_id: String,
    pub user_id: String,
    pub status: InterviewStatus,
    #[serde(default)]
    pub recording_url: Option<String>,
    /// Opaque storage slots populated by persistence services.
    #[serde(default)]
    pub code_editor_snapshot: Option<String>,
    #[serde(default)]
    pub design_editor_snapshot: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One stored phase of an interview plan.
///
/// `tool_names` keeps the comma-delimited storage form; it is parsed to a
/// typed set at context-build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerRow {
    pub id: String,
    pub candidate_interview_id: String,
    pub sequence: u32,
    pub duration_minutes: u32,
    pub question_id: String,
    pub knowledge_bank_id: String,
    #[serde(default)]
    pub interview_instructions: Option<String>,
    #[serde(default)]
    pub tool_names: String,
    #[serde(default)]
    pub tool_properties: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Catalogue entry for a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: String,
    pub question: String,
}

/// Latest artifact for a (question, candidate interview) pair.
///
/// `language` is a canonical code language name, or the sentinel `DESIGN`
/// for design artifacts (whose `answer` is a JSON envelope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSolution {
    pub id: String,
    pub question_id: String,
    pub candidate_interview_id: String,
    pub answer: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait InterviewStore: Send + Sync {
    async fn get(&self, candidate_interview_id: &str) -> Result<Option<CandidateInterview>>;

    async fn get_by_mock_and_user(
        &self,
        mock_interview_id: &str,
        user_id: &str,
    ) -> Result<Option<CandidateInterview>>;

    async fn update_status(
        &self,
        candidate_interview_id: &str,
        status: InterviewStatus,
    ) -> Result<()>;
}

#[async_trait::async_trait]
pub trait PlannerStore: Send + Sync {
    /// The plan for an interview, ordered by sequence then creation time.
    async fn plan(&self, candidate_interview_id: &str) -> Result<Vec<PlannerRow>>;
}

#[async_trait::async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get_many(
        &self,
        ids: &[String],
    ) -> Result<std::collections::HashMap<String, InterviewQuestion>>;
}

#[async_trait::async_trait]
pub trait SolutionStore: Send + Sync {
    async fn get(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
    ) -> Result<Option<QuestionSolution>>;

    /// Latest-wins upsert keyed on (question, candidate interview).
    async fn upsert(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
        answer: &str,
        language: &str,
    ) -> Result<QuestionSolution>;
}

#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, event: &TranscriptEvent) -> Result<()>;
}
