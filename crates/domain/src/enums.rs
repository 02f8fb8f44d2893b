//! Enumerations shared across the runtime and the storage layer.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a candidate interview row.
///
/// Transitions are monotone: once `Completed`, a row never moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InterviewStatus::Pending => "PENDING",
            InterviewStatus::InProgress => "IN_PROGRESS",
            InterviewStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Tools a phase may enable in the candidate UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolName {
    Base,
    CodeEditor,
    DesignEditor,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Base => "BASE",
            ToolName::CodeEditor => "CODE_EDITOR",
            ToolName::DesignEditor => "DESIGN_EDITOR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BASE" => Some(ToolName::Base),
            "CODE_EDITOR" => Some(ToolName::CodeEditor),
            "DESIGN_EDITOR" => Some(ToolName::DesignEditor),
            _ => None,
        }
    }
}

/// Parse a comma-delimited tool string from storage into a typed list.
///
/// Unknown tokens are skipped with a warning rather than failing the load.
pub fn parse_tool_names(raw: &str) -> Vec<ToolName> {
    let mut tools = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match ToolName::parse(token) {
            Some(tool) => {
                if !tools.contains(&tool) {
                    tools.push(tool);
                }
            }
            None => tracing::warn!(token, "unknown tool name in storage, skipping"),
        }
    }
    tools
}

/// Format a tool list back to the comma-delimited storage form.
pub fn format_tool_names(tools: &[ToolName]) -> String {
    tools
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Canonical programming languages accepted by the code pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeLanguage {
    Javascript,
    Typescript,
    Python,
    Java,
    Go,
    Cpp,
    Csharp,
    Ruby,
    Php,
    Sql,
}

/// Sentinel language string stored for design artifacts.
pub const DESIGN_LANGUAGE: &str = "DESIGN";

impl CodeLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeLanguage::Javascript => "JAVASCRIPT",
            CodeLanguage::Typescript => "TYPESCRIPT",
            CodeLanguage::Python => "PYTHON",
            CodeLanguage::Java => "JAVA",
            CodeLanguage::Go => "GO",
            CodeLanguage::Cpp => "CPP",
            CodeLanguage::Csharp => "CSHARP",
            CodeLanguage::Ruby => "RUBY",
            CodeLanguage::Php => "PHP",
            CodeLanguage::Sql => "SQL",
        }
    }

    /// Normalize a user-facing language name to the canonical set.
    ///
    /// Unknown values default to `Javascript` with a warning, matching the
    /// editor's own default.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" => CodeLanguage::Javascript,
            "typescript" | "ts" => CodeLanguage::Typescript,
            "python" | "py" => CodeLanguage::Python,
            "java" => CodeLanguage::Java,
            "go" | "golang" => CodeLanguage::Go,
            "cpp" | "c++" => CodeLanguage::Cpp,
            "csharp" | "c#" => CodeLanguage::Csharp,
            "ruby" => CodeLanguage::Ruby,
            "php" => CodeLanguage::Php,
            "sql" => CodeLanguage::Sql,
            other => {
                tracing::warn!(language = other, "unknown language, defaulting to JAVASCRIPT");
                CodeLanguage::Javascript
            }
        }
    }
}

/// High-level kind of an interview phase, sent to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Intro,
    Coding,
    SystemDesign,
    Behavioral,
    Qna,
    WrapUp,
}

impl TaskType {
    /// Infer the task type from the tools a phase enables.
    pub fn from_tools(tools: &[ToolName]) -> Self {
        if tools.contains(&ToolName::CodeEditor) {
            TaskType::Coding
        } else if tools.contains(&ToolName::DesignEditor) {
            TaskType::SystemDesign
        } else {
            TaskType::Behavioral
        }
    }
}

/// Envelope type for server-sent events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SseEventType {
    Interview,
    System,
}

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptSender {
    Interviewer,
    Candidate,
}
