//! The TTS stage.
//!
//! Turns `BotText` into `BotSpeech` carrying the synthesized audio. On a
//! synthesis failure the text still flows downstream (with empty audio) so
//! the assistant transcript is not lost.

use std::sync::Arc;

use viva_domain::error::Result;
use viva_domain::frames::Frame;
use viva_providers::traits::TextToSpeech;

use crate::pipeline::{Outlet, Processor};

pub struct TtsStage {
    tts: Arc<dyn TextToSpeech>,
}

impl TtsStage {
    pub fn new(tts: Arc<dyn TextToSpeech>) -> Self {
        Self { tts }
    }
}

#[async_trait::async_trait]
impl Processor for TtsStage {
    fn name(&self) -> &'static str {
        "tts"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match frame {
            Frame::BotText { text } => {
                let audio = match self.tts.synthesize(&text).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        tracing::error!(error = %e, "TTS synthesis failed, passing text only");
                        Vec::new()
                    }
                };
                out.push(Frame::BotSpeech { text, audio }).await;
            }
            other => out.push(other).await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::SilentTts;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn bot_text_becomes_speech() {
        let tts = Arc::new(SilentTts::new());
        let mut stage = TtsStage::new(tts.clone());
        let (tx, mut rx) = mpsc::channel(4);

        stage
            .process(Frame::BotText { text: "hello".into() }, &Outlet::new(tx))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            Frame::BotSpeech { text, audio } => {
                assert_eq!(text, "hello");
                assert_eq!(audio.len(), 5);
            }
            other => panic!("unexpected frame {}", other.kind()),
        }
        assert_eq!(tts.synthesized(), vec!["hello"]);
    }

    #[tokio::test]
    async fn other_frames_pass_untouched() {
        let tts = Arc::new(SilentTts::new());
        let mut stage = TtsStage::new(tts);
        let (tx, mut rx) = mpsc::channel(4);

        stage.process(Frame::End, &Outlet::new(tx)).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), Frame::End));
    }
}
