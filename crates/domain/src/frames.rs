//! Frames flowing through the session pipeline.
//!
//! Every stage receives frames in order and either transforms, consumes, or
//! forwards them. Classification matters at two points: the gate (which only
//! lets system-class frames through once sealed) and the closure handler
//! (which reacts to [`Frame::Closure`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::Message;

/// A code snapshot from the candidate's editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeContent {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "candidateInterviewId")]
    pub candidate_interview_id: String,
    pub language: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A design snapshot (raw Excalidraw JSON) from the candidate's canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignContent {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "candidateInterviewId")]
    pub candidate_interview_id: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Structured events from the candidate UI, classified by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "CodeContent")]
    Code(CodeContent),
    #[serde(rename = "DesignContent")]
    Design(DesignContent),
}

/// The unit of work in the session pipeline.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Pipeline bring-up. Always passes every stage.
    Start,
    /// Pipeline teardown. Always passes every stage.
    End,
    /// A candidate utterance out of STT.
    UserText {
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// A structured artifact event from the candidate UI.
    Client(ClientEvent),
    /// Append messages to the LLM context, optionally triggering generation.
    LlmAppend { messages: Vec<Message>, run_llm: bool },
    /// System-role injection into the LLM context (phase entry, nudges,
    /// closure). Survives the sealed gate.
    LlmUpdate { messages: Vec<Message>, run_llm: bool },
    /// An interviewer utterance out of the LLM, heading to TTS.
    BotText { text: String },
    /// Synthesized speech heading to the transport, with the source text
    /// kept for the assistant-side transcript tap.
    BotSpeech { text: String, audio: Vec<u8> },
    /// In-band closure request carrying the final prompt. System-class so it
    /// survives sealing.
    Closure {
        message: String,
        session_duration_secs: u64,
        reason: String,
    },
}

impl Frame {
    /// Lifecycle frames pass every stage unconditionally.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Frame::Start | Frame::End)
    }

    /// System-class frames are the only non-lifecycle frames that pass a
    /// sealed gate.
    pub fn is_system(&self) -> bool {
        matches!(self, Frame::LlmUpdate { .. } | Frame::Closure { .. })
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Start => "start",
            Frame::End => "end",
            Frame::UserText { .. } => "user_text",
            Frame::Client(ClientEvent::Code(_)) => "code_content",
            Frame::Client(ClientEvent::Design(_)) => "design_content",
            Frame::LlmAppend { .. } => "llm_append",
            Frame::LlmUpdate { .. } => "llm_update",
            Frame::BotText { .. } => "bot_text",
            Frame::BotSpeech { .. } => "bot_speech",
            Frame::Closure { .. } => "closure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_wire_format() {
        let raw = serde_json::json!({
            "type": "CodeContent",
            "data": {
                "questionId": "q1",
                "candidateInterviewId": "ci1",
                "language": "python",
                "content": "print(1)",
                "timestamp": 1700000000
            }
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::Code(code) => {
                assert_eq!(code.question_id, "q1");
                assert_eq!(code.candidate_interview_id, "ci1");
                assert_eq!(code.language, "python");
            }
            _ => panic!("expected CodeContent"),
        }
    }

    #[test]
    fn design_event_carries_raw_json() {
        let raw = serde_json::json!({
            "type": "DesignContent",
            "data": {
                "questionId": "q2",
                "candidateInterviewId": "ci1",
                "content": {"elements": []}
            }
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::Design(design) => {
                assert!(design.content.get("elements").is_some());
                assert!(design.timestamp.is_none());
            }
            _ => panic!("expected DesignContent"),
        }
    }

    #[test]
    fn classification() {
        assert!(Frame::Start.is_lifecycle());
        assert!(Frame::End.is_lifecycle());
        assert!(Frame::LlmUpdate { messages: vec![], run_llm: false }.is_system());
        assert!(Frame::Closure {
            message: "wrap".into(),
            session_duration_secs: 60,
            reason: "timer_expired".into()
        }
        .is_system());
        assert!(!Frame::UserText { text: "hi".into(), timestamp: Utc::now() }.is_system());
        assert!(!Frame::BotText { text: "hi".into() }.is_system());
    }
}
