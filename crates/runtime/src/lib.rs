//! The per-session interview runtime.
//!
//! One [`InterviewBot`] owns a frame pipeline (context switch → gate →
//! artifact pipelines → transcript tap → closure handler → LLM → TTS →
//! transcript tap), a phase timer, a per-session SSE fan-out, a transcript
//! bus, and the completion workflow. Multiple sessions run in parallel with
//! no shared mutable state between them.

pub mod bot;
pub mod closure;
pub mod code_pipeline;
pub mod completion;
pub mod context_switch;
pub mod debounce;
pub mod design_pipeline;
pub mod gate;
pub mod llm_stage;
pub mod pipeline;
pub mod sse;
pub mod testkit;
pub mod timer;
pub mod transcript;
pub mod tts_stage;

pub use bot::{BotDeps, InterviewBot};
pub use completion::{CompletionResult, CompletionWorkflow};
pub use context_switch::Injector;
pub use gate::GateHandle;
pub use pipeline::{Outlet, Processor};
pub use sse::{SseBus, SseEnvelope};
pub use timer::{PhaseTimer, TimerSignal, TimerStatus};
pub use transcript::TranscriptBus;
