//! JSON-file backed store.
//!
//! Each collection lives in one JSON file under the state directory;
//! transcripts are an append-only JSONL file. Maps are held in memory behind
//! `parking_lot` locks and written through on mutation. Locks are released
//! before disk I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use viva_domain::enums::InterviewStatus;
use viva_domain::error::{Error, Result};
use viva_domain::events::TranscriptEvent;

use crate::traits::{
    CandidateInterview, InterviewQuestion, InterviewStore, PlannerRow, PlannerStore,
    QuestionSolution, QuestionStore, SolutionStore, TranscriptStore,
};

pub struct FileStore {
    dir: PathBuf,
    interviews: RwLock<HashMap<String, CandidateInterview>>,
    planners: RwLock<Vec<PlannerRow>>,
    questions: RwLock<HashMap<String, InterviewQuestion>>,
    /// Keyed on `(question_id, candidate_interview_id)`.
    solutions: RwLock<HashMap<(String, String), QuestionSolution>>,
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        return T::default();
    }
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file, starting empty");
            T::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable store file, starting empty");
            T::default()
        }
    }
}

impl FileStore {
    /// Load or create the store under `state_dir`.
    pub fn new(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir).map_err(Error::Io)?;

        let store = Self {
            dir: state_dir.to_path_buf(),
            interviews: RwLock::new(load_or_default(&state_dir.join("interviews.json"))),
            planners: RwLock::new(load_or_default(&state_dir.join("planners.json"))),
            questions: RwLock::new(load_or_default(&state_dir.join("questions.json"))),
            solutions: RwLock::new(
                load_or_default::<Vec<QuestionSolution>>(&state_dir.join("solutions.json"))
                    .into_iter()
                    .map(|s| ((s.question_id.clone(), s.candidate_interview_id.clone()), s))
                    .collect(),
            ),
        };

        tracing::info!(
            path = %state_dir.display(),
            interviews = store.interviews.read().len(),
            planners = store.planners.read().len(),
            "file store loaded"
        );
        Ok(store)
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let raw = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, raw).map_err(Error::Io)
    }

    fn save_interviews(&self) -> Result<()> {
        let snapshot = self.interviews.read().clone();
        self.save("interviews.json", &snapshot)
    }

    fn save_solutions(&self) -> Result<()> {
        let snapshot: Vec<QuestionSolution> = self.solutions.read().values().cloned().collect();
        self.save("solutions.json", &snapshot)
    }

    // ── Seeding (catalogue fixtures, tests) ───────────────────────────

    pub fn insert_interview(&self, interview: CandidateInterview) -> Result<()> {
        self.interviews
            .write()
            .insert(interview.id.clone(), interview);
        self.save_interviews()
    }

    pub fn insert_planner(&self, planner: PlannerRow) -> Result<()> {
        self.planners.write().push(planner);
        let snapshot = self.planners.read().clone();
        self.save("planners.json", &snapshot)
    }

    pub fn insert_question(&self, question: InterviewQuestion) -> Result<()> {
        self.questions
            .write()
            .insert(question.id.clone(), question);
        let snapshot = self.questions.read().clone();
        self.save("questions.json", &snapshot)
    }
}

#[async_trait::async_trait]
impl InterviewStore for FileStore {
    async fn get(&self, candidate_interview_id: &str) -> Result<Option<CandidateInterview>> {
        Ok(self.interviews.read().get(candidate_interview_id).cloned())
    }

    async fn get_by_mock_and_user(
        &self,
        mock_interview_id: &str,
        user_id: &str,
    ) -> Result<Option<CandidateInterview>> {
        Ok(self
            .interviews
            .read()
            .values()
            .find(|i| i.mock_interview_id == mock_interview_id && i.user_id == user_id)
            .cloned())
    }

    async fn update_status(
        &self,
        candidate_interview_id: &str,
        status: InterviewStatus,
    ) -> Result<()> {
        {
            let mut interviews = self.interviews.write();
            let interview = interviews.get_mut(candidate_interview_id).ok_or_else(|| {
                Error::NotFound(format!("candidate interview {candidate_interview_id}"))
            })?;
            interview.status = status;
        }
        self.save_interviews()
    }
}

#[async_trait::async_trait]
impl PlannerStore for FileStore {
    async fn plan(&self, candidate_interview_id: &str) -> Result<Vec<PlannerRow>> {
        let mut rows: Vec<PlannerRow> = self
            .planners
            .read()
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
impl QuestionStore for FileStore {
    async fn get_many(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, InterviewQuestion>> {
        let questions = self.questions.read();
        Ok(ids
            .iter()
            .filter_map(|id| questions.get(id).map(|q| (id.clone(), q.clone())))
            .collect())
    }
}

#[async_trait::async_trait]
impl SolutionStore for FileStore {
    async fn get(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
    ) -> Result<Option<QuestionSolution>> {
        let key = (question_id.to_owned(), candidate_interview_id.to_owned());
        Ok(self.solutions.read().get(&key).cloned())
    }

    async fn upsert(
        &self,
        question_id: &str,
        candidate_interview_id: &str,
        answer: &str,
        language: &str,
    ) -> Result<QuestionSolution> {
        let key = (question_id.to_owned(), candidate_interview_id.to_owned());
        let solution = {
            let mut solutions = self.solutions.write();
            let entry = solutions.entry(key).or_insert_with(|| QuestionSolution {
                id: uuid::Uuid::new_v4().to_string(),
                question_id: question_id.to_owned(),
                candidate_interview_id: candidate_interview_id.to_owned(),
                answer: String::new(),
                language: String::new(),
                updated_at: Utc::now(),
            });
            entry.answer = answer.to_owned();
            entry.language = language.to_owned();
            entry.updated_at = Utc::now();
            entry.clone()
        };
        self.save_solutions()?;
        Ok(solution)
    }
}

#[async_trait::async_trait]
impl TranscriptStore for FileStore {
    async fn append(&self, event: &TranscriptEvent) -> Result<()> {
        use std::io::Write;

        let line = serde_json::to_string(event)?;
        let path = self.dir.join("transcripts.jsonl");
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Error::Io)?;
        writeln!(file, "{line}").map_err(Error::Io)?;
        Ok(())
    }
}
