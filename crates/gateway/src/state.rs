//! Shared application state for the HTTP surface.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use viva_domain::Config;
use viva_providers::traits::SpeechToText;
use viva_runtime::bot::{BotDeps, InterviewBot};

/// Live sessions keyed by session id. Each entry is one running bot; there
/// is no shared mutable state between sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<InterviewBot>>>,
}

impl SessionRegistry {
    pub fn insert(&self, session_id: &str, bot: Arc<InterviewBot>) {
        self.sessions.lock().insert(session_id.to_string(), bot);
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<InterviewBot>> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<Arc<InterviewBot>> {
        self.sessions.lock().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Dependency container built once at startup and threaded into every
/// handler. Replaces the module-level singletons of older designs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub deps: BotDeps,
    pub stt: Arc<dyn SpeechToText>,
    pub sessions: Arc<SessionRegistry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use viva_runtime::testkit::{CaptureLlm, MemoryStore, RecordingNotifier, SilentTts};

    #[tokio::test]
    async fn registry_tracks_sessions() {
        let registry = SessionRegistry::default();
        assert!(registry.is_empty());

        let store = Arc::new(MemoryStore::new());
        store.seed_interview("ci1", "m1", "u1", viva_domain::InterviewStatus::InProgress);
        store.seed_planner("ci1", 0, 1, "q1", "BASE", None);
        let deps = BotDeps {
            interviews: store.clone(),
            planners: store.clone(),
            questions: store.clone(),
            solutions: store.clone(),
            transcripts: store,
            llm: Arc::new(CaptureLlm::new()),
            tts: Arc::new(SilentTts::new()),
            notifier: Arc::new(RecordingNotifier::ok()),
            debounce_quiet: Duration::from_secs(30),
        };
        let bot = InterviewBot::start(deps, "m1", "u1", "s1").await.unwrap();

        registry.insert("s1", bot);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("s1").is_some());
        assert!(registry.get("ghost").is_none());

        let removed = registry.remove("s1").unwrap();
        removed.handle_client_disconnected().await;
        assert!(registry.is_empty());
    }
}
