//! Shared domain types for the viva interview runtime.
//!
//! Everything here is a plain value: identifiers, the per-session
//! [`InterviewContext`] with its ordered planner phases, the frames flowing
//! through the session pipeline, and the event shapes sent to the front end
//! and the transcript store. No I/O lives in this crate.

pub mod chat;
pub mod config;
pub mod enums;
pub mod error;
pub mod events;
pub mod frames;
pub mod planner;

pub use chat::{Message, Role};
pub use config::Config;
pub use enums::{CodeLanguage, InterviewStatus, SseEventType, TaskType, ToolName, TranscriptSender};
pub use error::{Error, Result};
pub use events::{TaskEvent, TaskProperties, TranscriptEvent};
pub use frames::{ClientEvent, CodeContent, DesignContent, Frame};
pub use planner::{InterviewContext, PlannerField};
