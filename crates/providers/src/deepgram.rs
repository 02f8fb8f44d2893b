//! Deepgram STT and TTS adapters.
//!
//! STT posts audio to the `listen` endpoint and returns the top transcript
//! alternative. TTS posts text to the `speak` endpoint and returns raw audio
//! bytes, optionally filtering markdown first so code is not read aloud.

use serde_json::Value;

use viva_domain::error::{Error, Result};

use crate::markdown::filter_markdown;
use crate::traits::{SpeechToText, TextToSpeech};

const LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";
const SPEAK_URL: &str = "https://api.deepgram.com/v1/speak";

pub struct DeepgramStt {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl DeepgramStt {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            api_key: api_key.to_string(),
            model: "nova-2".to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl SpeechToText for DeepgramStt {
    async fn transcribe(&self, audio: &[u8], content_type: &str) -> Result<String> {
        let url = format!("{LISTEN_URL}?model={}&smart_format=true", self.model);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", content_type)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: "deepgram".into(),
                message: format!("listen: {status}"),
            });
        }

        Ok(payload["results"]["channels"][0]["alternatives"][0]["transcript"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

pub struct DeepgramTts {
    api_key: String,
    voice: String,
    filter_markdown: bool,
    client: reqwest::Client,
}

impl DeepgramTts {
    pub fn new(api_key: &str, filter_markdown: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            api_key: api_key.to_string(),
            voice: "aura-asteria-en".to_string(),
            filter_markdown,
            client,
        })
    }
}

#[async_trait::async_trait]
impl TextToSpeech for DeepgramTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let spoken = if self.filter_markdown {
            filter_markdown(text)
        } else {
            text.to_string()
        };
        if spoken.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{SPEAK_URL}?model={}", self.voice);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&serde_json::json!({ "text": spoken }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Provider {
                provider: "deepgram".into(),
                message: format!("speak: {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
