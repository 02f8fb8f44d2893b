//! Outbound event shapes: SSE task events and transcript lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{TaskType, ToolName, TranscriptSender};
use crate::planner::PlannerField;

/// Task-specific properties carried inside a [`TaskEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProperties {
    #[serde(rename = "questionId", skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// Structured payload of a server-sent event, serialized for the front end
/// as `{taskType, toolName, task_definition, task_properties, tool_properties}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(rename = "taskType")]
    pub task_type: TaskType,
    #[serde(rename = "toolName")]
    pub tool_names: Vec<ToolName>,
    pub task_definition: Option<String>,
    pub task_properties: TaskProperties,
    #[serde(default)]
    pub tool_properties: serde_json::Map<String, serde_json::Value>,
}

impl TaskEvent {
    /// Build the event describing one interview phase.
    pub fn from_planner(planner: &PlannerField) -> Self {
        Self {
            task_type: TaskType::from_tools(&planner.tool_names),
            tool_names: planner.tool_names.clone(),
            task_definition: planner.question_text.clone(),
            task_properties: TaskProperties {
                question_id: Some(planner.question_id.clone()),
            },
            tool_properties: planner.tool_properties.clone(),
        }
    }

    /// The terminal wrap-up event, emitted once per session.
    pub fn wrap_up() -> Self {
        Self {
            task_type: TaskType::WrapUp,
            tool_names: Vec::new(),
            task_definition: Some("Interview wrap-up phase".to_string()),
            task_properties: TaskProperties::default(),
            tool_properties: serde_json::Map::new(),
        }
    }
}

/// One line of conversation, as published on the transcript bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub candidate_interview_id: String,
    pub sender: TranscriptSender,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default)]
    pub is_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_language: Option<String>,
}

impl TranscriptEvent {
    pub fn new(
        candidate_interview_id: impl Into<String>,
        session_id: impl Into<String>,
        sender: TranscriptSender,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let is_code = looks_like_code(&message);
        Self {
            candidate_interview_id: candidate_interview_id.into(),
            sender,
            message,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            is_code,
            code_language: None,
        }
    }
}

/// Cheap heuristic for flagging transcript lines that contain code.
fn looks_like_code(content: &str) -> bool {
    const INDICATORS: &[&str] = &[
        "```", "def ", "function ", "class ", "import ", "=>", "};",
    ];
    INDICATORS.iter().any(|marker| content.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ToolName;

    #[test]
    fn task_event_wire_shape() {
        let mut planner = PlannerField::new(0, 5, "q-1", "kb-1").unwrap();
        planner.tool_names = vec![ToolName::CodeEditor];
        planner.question_text = Some("Implement an LRU cache".into());
        planner
            .tool_properties
            .insert("languages".into(), serde_json::json!(["PYTHON"]));

        let event = TaskEvent::from_planner(&planner);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["taskType"], "CODING");
        assert_eq!(json["toolName"][0], "CODE_EDITOR");
        assert_eq!(json["task_definition"], "Implement an LRU cache");
        assert_eq!(json["task_properties"]["questionId"], "q-1");
        assert_eq!(json["tool_properties"]["languages"][0], "PYTHON");
    }

    #[test]
    fn wrap_up_event_shape() {
        let json = serde_json::to_value(TaskEvent::wrap_up()).unwrap();
        assert_eq!(json["taskType"], "WRAP_UP");
        assert!(json["toolName"].as_array().unwrap().is_empty());
    }

    #[test]
    fn transcript_code_detection() {
        let plain = TranscriptEvent::new("ci", "s", TranscriptSender::Candidate, "hello there");
        assert!(!plain.is_code);

        let code = TranscriptEvent::new(
            "ci",
            "s",
            TranscriptSender::Candidate,
            "def solve(xs):\n    return xs[::-1]",
        );
        assert!(code.is_code);
    }
}
