//! Provider adapters: LLM (OpenAI-compatible, Google Gemini), STT and TTS
//! (Deepgram). Each adapter translates between the internal request types and
//! one provider's HTTP wire format.

pub mod deepgram;
pub mod google;
pub mod markdown;
pub mod openai;
pub mod traits;

pub use deepgram::{DeepgramStt, DeepgramTts};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, SpeechToText, TextToSpeech};
