//! Startup wiring: store, providers, queue client, dependency container.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use viva_domain::config::LlmProviderKind;
use viva_domain::Config;
use viva_providers::traits::LlmProvider;
use viva_providers::{DeepgramStt, DeepgramTts, GoogleProvider, OpenAiProvider};
use viva_queue::SqsNotifier;
use viva_runtime::bot::BotDeps;
use viva_store::FileStore;

use crate::state::{AppState, SessionRegistry};

pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let store = Arc::new(FileStore::new(Path::new(&config.state_dir))?);

    let llm: Arc<dyn LlmProvider> = match config.llm_provider {
        LlmProviderKind::Openai => Arc::new(OpenAiProvider::new(
            &config.openai_base_url,
            &config.openai_api_key,
            &config.openai_model,
        )?),
        LlmProviderKind::Google => Arc::new(GoogleProvider::new(
            &config.google_api_key,
            &config.google_model,
        )?),
    };

    let stt = Arc::new(DeepgramStt::new(&config.deepgram_api_key)?);
    let tts = Arc::new(DeepgramTts::new(
        &config.deepgram_api_key,
        config.tts_filter_markdown,
    )?);
    let notifier = Arc::new(SqsNotifier::new(
        &config.sqs_completion_queue_url,
        &config.aws_region,
    ));
    if !notifier.is_enabled() {
        tracing::warn!("completion queue not configured, notifications will fail");
    }

    let deps = BotDeps {
        interviews: store.clone(),
        planners: store.clone(),
        questions: store.clone(),
        solutions: store.clone(),
        transcripts: store,
        llm,
        tts,
        notifier,
        debounce_quiet: Duration::from_secs(config.debounce_quiet_secs),
    };

    tracing::info!(
        environment = %config.environment,
        state_dir = %config.state_dir,
        llm = ?config.llm_provider,
        debounce_quiet_secs = config.debounce_quiet_secs,
        "gateway state initialized"
    );

    Ok(AppState {
        config: Arc::new(config),
        deps,
        stt,
        sessions: Arc::new(SessionRegistry::default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_state_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_dir: dir.path().to_string_lossy().into_owned(),
            ..Config::default()
        };

        let state = build_state(config).await.unwrap();
        assert!(state.sessions.is_empty());
        assert_eq!(state.deps.llm.provider_id(), "google");
        assert_eq!(state.deps.debounce_quiet, Duration::from_secs(30));
    }
}
