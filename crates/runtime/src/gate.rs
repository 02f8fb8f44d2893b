//! The interview gate.
//!
//! A frame filter that is transparent during the interview and, once
//! sealed at completion, lets only lifecycle and system-class frames
//! through. Sealing is monotone: the gate never unseals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use viva_domain::error::Result;
use viva_domain::frames::Frame;

use crate::pipeline::{Outlet, Processor};

/// Shared handle used by the orchestrator to seal the gate.
#[derive(Clone, Default)]
pub struct GateHandle {
    sealed: Arc<AtomicBool>,
}

impl GateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal the gate. Idempotent.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::Release) {
            tracing::info!("interview gate sealed, blocking user and data frames");
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }
}

pub struct InterviewGate {
    handle: GateHandle,
}

impl InterviewGate {
    pub fn new(handle: GateHandle) -> Self {
        Self { handle }
    }
}

#[async_trait::async_trait]
impl Processor for InterviewGate {
    fn name(&self) -> &'static str {
        "interview_gate"
    }

    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()> {
        if frame.is_lifecycle() || !self.handle.is_sealed() || frame.is_system() {
            out.push(frame).await;
        } else {
            tracing::debug!(frame = frame.kind(), "gate: dropped frame after completion");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn user_frame() -> Frame {
        Frame::UserText {
            text: "hello".into(),
            timestamp: Utc::now(),
        }
    }

    async fn pass_through(gate: &mut InterviewGate, frame: Frame) -> Option<Frame> {
        let (tx, mut rx) = mpsc::channel(4);
        gate.process(frame, &Outlet::new(tx)).await.unwrap();
        rx.try_recv().ok()
    }

    #[tokio::test]
    async fn open_gate_passes_everything() {
        let mut gate = InterviewGate::new(GateHandle::new());
        assert!(pass_through(&mut gate, user_frame()).await.is_some());
        assert!(pass_through(&mut gate, Frame::BotText { text: "hi".into() })
            .await
            .is_some());
    }

    #[tokio::test]
    async fn sealed_gate_drops_user_and_data_frames() {
        let handle = GateHandle::new();
        let mut gate = InterviewGate::new(handle.clone());
        handle.seal();

        assert!(pass_through(&mut gate, user_frame()).await.is_none());
        assert!(pass_through(&mut gate, Frame::BotText { text: "hi".into() })
            .await
            .is_none());
    }

    #[tokio::test]
    async fn sealed_gate_passes_lifecycle_and_system_frames() {
        let handle = GateHandle::new();
        let mut gate = InterviewGate::new(handle.clone());
        handle.seal();

        assert!(pass_through(&mut gate, Frame::Start).await.is_some());
        assert!(pass_through(&mut gate, Frame::End).await.is_some());
        assert!(pass_through(
            &mut gate,
            Frame::Closure {
                message: "wrap".into(),
                session_duration_secs: 10,
                reason: "timer_expired".into(),
            }
        )
        .await
        .is_some());
        assert!(pass_through(
            &mut gate,
            Frame::LlmUpdate {
                messages: vec![],
                run_llm: false
            }
        )
        .await
        .is_some());
    }

    #[test]
    fn sealing_is_monotone_and_idempotent() {
        let handle = GateHandle::new();
        assert!(!handle.is_sealed());
        handle.seal();
        handle.seal();
        assert!(handle.is_sealed());
    }
}
