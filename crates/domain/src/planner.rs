//! Per-session interview state: the ordered phase plan and the cursor into it.
//!
//! The orchestrator exclusively owns the [`InterviewContext`]; every other
//! component receives it by reference (or receives copies of individual
//! fields) and never mutates it. Planner entries carry an explicit
//! `candidate_interview_id` instead of a back-pointer to the parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{format_tool_names, ToolName};
use crate::error::{Error, Result};

/// One phase of an interview: question, tools, duration, instructions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerField {
    /// Dense ordinal within the session, starting at 0.
    pub sequence: u32,
    /// Phase length in minutes. Always positive.
    pub duration_minutes: u32,
    pub question_id: String,
    pub knowledge_bank_id: String,
    /// Resolved lazily from the question catalogue.
    #[serde(default)]
    pub question_text: Option<String>,
    #[serde(default)]
    pub tool_names: Vec<ToolName>,
    /// Opaque per-tool settings (e.g. permitted languages), passed through
    /// to the front end untouched.
    #[serde(default)]
    pub tool_properties: serde_json::Map<String, serde_json::Value>,
    /// System-prompt text for this phase. May be empty.
    #[serde(default)]
    pub interview_instructions: Option<String>,
    /// Wall-clock stamps set on phase entry/exit.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl PlannerField {
    pub fn new(
        sequence: u32,
        duration_minutes: u32,
        question_id: impl Into<String>,
        knowledge_bank_id: impl Into<String>,
    ) -> Result<Self> {
        if duration_minutes == 0 {
            return Err(Error::InvalidArgument(
                "duration_minutes must be positive".into(),
            ));
        }
        Ok(Self {
            sequence,
            duration_minutes,
            question_id: question_id.into(),
            knowledge_bank_id: knowledge_bank_id.into(),
            question_text: None,
            tool_names: Vec::new(),
            tool_properties: serde_json::Map::new(),
            interview_instructions: None,
            start_time: None,
            end_time: None,
        })
    }

    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn tools_as_string(&self) -> String {
        format_tool_names(&self.tool_names)
    }
}

/// Canonical state of one live interview session.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewContext {
    pub mock_interview_id: String,
    pub candidate_interview_id: String,
    pub user_id: String,
    pub session_id: String,

    /// Ordered by `sequence`; sequences are dense starting at 0.
    pub planners: Vec<PlannerField>,
    /// Cursor into `planners`. Equals `planners.len()` once terminal.
    pub current_sequence: u32,
    pub started_at: DateTime<Utc>,

    // Denormalized view of the current phase for quick access.
    pub current_question_id: Option<String>,
    pub current_question_text: Option<String>,
    pub current_tool_names: Vec<ToolName>,
    pub current_workflow_step_id: Option<String>,
}

impl InterviewContext {
    /// Build a context from identifiers plus the loaded plan.
    ///
    /// Fails with `InvalidArgument` on empty identifiers or when planner
    /// sequences are not dense and unique starting at 0.
    pub fn new(
        mock_interview_id: impl Into<String>,
        candidate_interview_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        mut planners: Vec<PlannerField>,
    ) -> Result<Self> {
        let mock_interview_id = mock_interview_id.into();
        let candidate_interview_id = candidate_interview_id.into();
        let user_id = user_id.into();
        let session_id = session_id.into();

        for (name, value) in [
            ("mock_interview_id", &mock_interview_id),
            ("candidate_interview_id", &candidate_interview_id),
            ("user_id", &user_id),
            ("session_id", &session_id),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidArgument(format!("{name} cannot be empty")));
            }
        }

        planners.sort_by_key(|p| p.sequence);
        for (i, planner) in planners.iter().enumerate() {
            if planner.sequence as usize != i {
                return Err(Error::InvalidArgument(format!(
                    "planner sequences must be dense and unique starting at 0, found {} at position {i}",
                    planner.sequence
                )));
            }
        }

        let mut ctx = Self {
            mock_interview_id,
            candidate_interview_id,
            user_id,
            session_id,
            planners,
            current_sequence: 0,
            started_at: Utc::now(),
            current_question_id: None,
            current_question_text: None,
            current_tool_names: Vec::new(),
            current_workflow_step_id: None,
        };
        ctx.refresh_current();
        Ok(ctx)
    }

    /// The planner the cursor addresses, or `None` once terminal.
    pub fn current_planner(&self) -> Option<&PlannerField> {
        self.planners.get(self.current_sequence as usize)
    }

    pub fn current_planner_mut(&mut self) -> Option<&mut PlannerField> {
        self.planners.get_mut(self.current_sequence as usize)
    }

    /// The planner that would follow the current one.
    pub fn next_planner(&self) -> Option<&PlannerField> {
        self.planners.get(self.current_sequence as usize + 1)
    }

    /// Move the cursor forward by exactly one and refresh the denormalized
    /// current-phase fields.
    pub fn advance(&mut self) {
        self.current_sequence += 1;
        self.refresh_current();
    }

    /// Whether the cursor sits on the final planner.
    pub fn is_last_phase(&self) -> bool {
        !self.planners.is_empty()
            && self.current_sequence as usize == self.planners.len() - 1
    }

    /// Whether the cursor has moved past the last planner.
    pub fn is_terminal(&self) -> bool {
        self.current_sequence as usize >= self.planners.len()
    }

    fn refresh_current(&mut self) {
        match self.planners.get(self.current_sequence as usize) {
            Some(planner) => {
                self.current_question_id = Some(planner.question_id.clone());
                self.current_question_text = planner.question_text.clone();
                self.current_tool_names = planner.tool_names.clone();
            }
            None => {
                self.current_question_id = None;
                self.current_question_text = None;
                self.current_tool_names.clear();
            }
        }
    }

    /// One-time hydration of question texts from the catalogue.
    pub fn populate_question_texts(
        &mut self,
        questions: &std::collections::HashMap<String, String>,
    ) {
        for planner in &mut self.planners {
            if let Some(text) = questions.get(&planner.question_id) {
                planner.question_text = Some(text.clone());
            }
        }
        self.refresh_current();
    }

    /// One-time hydration of tool lists from the stored comma-delimited form.
    pub fn populate_tool_names(
        &mut self,
        tools_by_question: &std::collections::HashMap<String, Vec<ToolName>>,
    ) {
        for planner in &mut self.planners {
            if let Some(tools) = tools_by_question.get(&planner.question_id) {
                planner.tool_names = tools.clone();
            }
        }
        self.refresh_current();
    }

    pub fn session_duration_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Serializable view for status endpoints.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "mock_interview_id": self.mock_interview_id,
            "candidate_interview_id": self.candidate_interview_id,
            "user_id": self.user_id,
            "session_id": self.session_id,
            "current_sequence": self.current_sequence,
            "current_question_id": self.current_question_id,
            "current_tool_names": self.current_tool_names,
            "started_at": self.started_at.to_rfc3339(),
            "session_duration_seconds": self.session_duration_secs(),
            "planner_count": self.planners.len(),
            "terminal": self.is_terminal(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(seq: u32, minutes: u32) -> PlannerField {
        PlannerField::new(seq, minutes, format!("q{seq}"), "kb1").unwrap()
    }

    fn context(planners: Vec<PlannerField>) -> InterviewContext {
        InterviewContext::new("mock1", "ci1", "user1", "sess1", planners).unwrap()
    }

    #[test]
    fn rejects_zero_duration() {
        assert!(PlannerField::new(0, 0, "q", "kb").is_err());
    }

    #[test]
    fn rejects_empty_identifiers() {
        let err = InterviewContext::new("", "ci", "u", "s", vec![planner(0, 1)]);
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_non_dense_sequences() {
        let err = InterviewContext::new(
            "m",
            "ci",
            "u",
            "s",
            vec![planner(0, 1), planner(2, 1)],
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_duplicate_sequences() {
        let err = InterviewContext::new(
            "m",
            "ci",
            "u",
            "s",
            vec![planner(0, 1), planner(0, 1)],
        );
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn sorts_planners_by_sequence() {
        let ctx = context(vec![planner(1, 2), planner(0, 1)]);
        assert_eq!(ctx.planners[0].sequence, 0);
        assert_eq!(ctx.current_planner().unwrap().question_id, "q0");
    }

    #[test]
    fn advance_moves_cursor_and_refreshes() {
        let mut ctx = context(vec![planner(0, 1), planner(1, 2)]);
        assert_eq!(ctx.current_question_id.as_deref(), Some("q0"));
        assert!(!ctx.is_last_phase());

        ctx.advance();
        assert_eq!(ctx.current_sequence, 1);
        assert_eq!(ctx.current_question_id.as_deref(), Some("q1"));
        assert!(ctx.is_last_phase());
        assert!(!ctx.is_terminal());

        ctx.advance();
        assert!(ctx.is_terminal());
        assert!(ctx.current_planner().is_none());
        assert!(ctx.current_question_id.is_none());
    }

    #[test]
    fn single_phase_is_last_phase_immediately() {
        let ctx = context(vec![planner(0, 1)]);
        assert!(ctx.is_last_phase());
    }

    #[test]
    fn hydration_fills_question_texts_and_tools() {
        let mut ctx = context(vec![planner(0, 1), planner(1, 1)]);

        let mut questions = std::collections::HashMap::new();
        questions.insert("q0".to_string(), "Reverse a list".to_string());
        ctx.populate_question_texts(&questions);
        assert_eq!(ctx.current_question_text.as_deref(), Some("Reverse a list"));
        assert!(ctx.planners[1].question_text.is_none());

        let mut tools = std::collections::HashMap::new();
        tools.insert("q0".to_string(), vec![ToolName::CodeEditor]);
        ctx.populate_tool_names(&tools);
        assert_eq!(ctx.current_tool_names, vec![ToolName::CodeEditor]);
    }
}
