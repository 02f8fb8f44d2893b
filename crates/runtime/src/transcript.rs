//! Transcript pub/sub and the pipeline taps that feed it.
//!
//! The bus decouples transcript capture from storage: taps publish, the
//! store subscriber (and anything else registered) consumes. Publication
//! delivers to all subscribers concurrently and waits for each; a failing
//! subscriber is logged, never raised to the publisher.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;

use viva_domain::enums::TranscriptSender;
use viva_domain::error::Result;
use viva_domain::events::TranscriptEvent;
use viva_domain::frames::Frame;
use viva_store::TranscriptStore;

use crate::pipeline::{Outlet, Processor};

pub const TOPIC_TRANSCRIPT_CREATED: &str = "transcript_created";
pub const TOPIC_SESSION_STARTED: &str = "session_started";
pub const TOPIC_SESSION_ENDED: &str = "session_ended";

type SubscriberFn =
    Arc<dyn Fn(TranscriptEvent) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

struct Subscriber {
    name: String,
    callback: SubscriberFn,
}

/// In-process topic bus for transcript events.
#[derive(Default)]
pub struct TranscriptBus {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl TranscriptBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async callback for one topic.
    pub async fn subscribe<F, Fut>(&self, topic: &str, name: &str, callback: F)
    where
        F: Fn(TranscriptEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let callback: SubscriberFn = Arc::new(move |event| Box::pin(callback(event)));
        self.subscribers
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber {
                name: name.to_string(),
                callback,
            });
        tracing::debug!(topic, subscriber = name, "transcript subscriber registered");
    }

    /// Deliver an event to every subscriber of `topic`, concurrently,
    /// isolating failures.
    pub async fn publish(&self, topic: &str, event: TranscriptEvent) {
        let subscribers = self.subscribers.read().await;
        let Some(list) = subscribers.get(topic) else {
            tracing::debug!(topic, "no subscribers for transcript topic");
            return;
        };

        let futures: Vec<_> = list
            .iter()
            .map(|s| {
                let name = s.name.clone();
                let fut = (s.callback)(event.clone());
                async move { (name, fut.await) }
            })
            .collect();

        for (name, result) in futures_util::future::join_all(futures).await {
            if let Err(e) = result {
                tracing::error!(topic, subscriber = %name, error = %e, "transcript subscriber failed");
            }
        }
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Register the default subscriber that persists every transcript topic.
pub async fn register_store_subscriber(bus: &TranscriptBus, store: Arc<dyn TranscriptStore>) {
    for topic in [
        TOPIC_TRANSCRIPT_CREATED,
        TOPIC_SESSION_STARTED,
        TOPIC_SESSION_ENDED,
    ] {
        let store = store.clone();
        bus.subscribe(topic, "store", move |event| {
            let store = store.clone();
            async move { store.append(&event).await }
        })
        .await;
    }
}

/// Which side of the conversation a tap observes.
#[derive(Clone, Copy)]
pub enum TapSide {
    Candidate,
    Interviewer,
}

/// Pipeline stage that publishes conversation turns onto the bus and
/// forwards every frame unchanged.
pub struct TranscriptTap {
    side: TapSide,
    bus: Arc<TranscriptBus>,
    candidate_interview_id: String,
    session_id: String,
}

impl TranscriptTap {
    pub fn new(
        side: TapSide,
        bus: Arc<TranscriptBus>,
        candidate_interview_id: &str,
        session_id: &str,
    ) -> Self {
        Self {
            side,
            bus,
            candidate_interview_id: candidate_interview_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    async fn publish(&self, sender: TranscriptSender, text: &str) {
        let event = TranscriptEvent::new(
            &self.candidate_interview_id,
            &self.session_id,
            sender,
            text,
        );
        self.bus.publish(TOPIC_TRANSCRIPT_CREATED, event).await;
    }
}

#[async_trait::async_trait]
impl Processor for TranscriptTap {
    fn name(&self) -> &'static str {
        match self.side {
            TapSide::Candidate => "transcript_tap_user",
            TapSide::Interviewer => "transcript_tap_assistant",
        }
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        match (&self.side, &frame) {
            (TapSide::Candidate, Frame::UserText { text, .. }) => {
                self.publish(TranscriptSender::Candidate, text).await;
            }
            (TapSide::Interviewer, Frame::BotSpeech { text, .. }) => {
                self.publish(TranscriptSender::Interviewer, text).await;
            }
            _ => {}
        }
        out.push(frame).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use viva_domain::error::Error;

    fn event(message: &str) -> TranscriptEvent {
        TranscriptEvent::new("ci1", "s1", TranscriptSender::Candidate, message)
    }

    #[tokio::test]
    async fn all_subscribers_observe_in_publish_order() {
        let bus = TranscriptBus::new();
        let seen_a: Arc<Mutex<Vec<String>>> = Arc::default();
        let seen_b: Arc<Mutex<Vec<String>>> = Arc::default();

        for (name, seen) in [("a", seen_a.clone()), ("b", seen_b.clone())] {
            bus.subscribe(TOPIC_TRANSCRIPT_CREATED, name, move |e| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(e.message);
                    Ok(())
                }
            })
            .await;
        }

        bus.publish(TOPIC_TRANSCRIPT_CREATED, event("first")).await;
        bus.publish(TOPIC_TRANSCRIPT_CREATED, event("second")).await;

        assert_eq!(*seen_a.lock(), vec!["first", "second"]);
        assert_eq!(*seen_b.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_affect_others() {
        let bus = TranscriptBus::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();

        bus.subscribe(TOPIC_TRANSCRIPT_CREATED, "flaky", |_| async {
            Err(Error::Store("disk on fire".into()))
        })
        .await;
        let seen2 = seen.clone();
        bus.subscribe(TOPIC_TRANSCRIPT_CREATED, "solid", move |e| {
            let seen = seen2.clone();
            async move {
                seen.lock().push(e.message);
                Ok(())
            }
        })
        .await;

        bus.publish(TOPIC_TRANSCRIPT_CREATED, event("kept")).await;
        assert_eq!(*seen.lock(), vec!["kept"]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = TranscriptBus::new();
        bus.publish("nobody_home", event("x")).await;
        assert_eq!(bus.subscriber_count("nobody_home").await, 0);
    }

    #[tokio::test]
    async fn taps_publish_only_their_side() {
        let bus = Arc::new(TranscriptBus::new());
        let seen: Arc<Mutex<Vec<(TranscriptSender, String)>>> = Arc::default();
        let seen2 = seen.clone();
        bus.subscribe(TOPIC_TRANSCRIPT_CREATED, "collect", move |e| {
            let seen = seen2.clone();
            async move {
                seen.lock().push((e.sender, e.message));
                Ok(())
            }
        })
        .await;

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let out = Outlet::new(tx);

        let mut user_tap = TranscriptTap::new(TapSide::Candidate, bus.clone(), "ci1", "s1");
        let mut bot_tap = TranscriptTap::new(TapSide::Interviewer, bus.clone(), "ci1", "s1");

        user_tap
            .process(
                Frame::UserText {
                    text: "my answer".into(),
                    timestamp: chrono::Utc::now(),
                },
                &out,
            )
            .await
            .unwrap();
        // The user tap must not record bot speech.
        user_tap
            .process(
                Frame::BotSpeech {
                    text: "a question".into(),
                    audio: vec![],
                },
                &out,
            )
            .await
            .unwrap();
        bot_tap
            .process(
                Frame::BotSpeech {
                    text: "a question".into(),
                    audio: vec![],
                },
                &out,
            )
            .await
            .unwrap();

        let records = seen.lock().clone();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, TranscriptSender::Candidate);
        assert_eq!(records[1].0, TranscriptSender::Interviewer);

        // All three frames were forwarded.
        for _ in 0..3 {
            assert!(rx.try_recv().is_ok());
        }
    }
}
