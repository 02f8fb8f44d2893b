//! Frame pipeline plumbing.
//!
//! Stages are [`Processor`] implementations connected by bounded mpsc
//! channels, one task per stage. Frames preserve order stage-to-stage. A
//! stage error is logged and the frame dropped; the pipeline itself never
//! tears down a live session.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use viva_domain::error::Result;
use viva_domain::frames::Frame;

const STAGE_CAPACITY: usize = 64;

/// Sending half of a stage's input channel.
///
/// Cloned freely: out-of-band producers (the timer's injector, debounce
/// tasks) push into the same channel as the upstream stage, so ordering
/// between a stage's forwards and its injections follows send order.
#[derive(Clone)]
pub struct Outlet {
    tx: mpsc::Sender<Frame>,
}

impl Outlet {
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }

    /// Push a frame downstream. A closed channel means the session is
    /// tearing down; the frame is dropped with a debug log.
    pub async fn push(&self, frame: Frame) {
        if let Err(e) = self.tx.send(frame).await {
            tracing::debug!(frame = e.0.kind(), "pipeline channel closed, dropping frame");
        }
    }
}

/// One stage of the pipeline.
#[async_trait::async_trait]
pub trait Processor: Send {
    fn name(&self) -> &'static str;

    /// Handle one frame. Forward it (possibly transformed) via `out`, or
    /// consume it.
    async fn process(&mut self, frame: Frame, out: &Outlet) -> Result<()>;
}

/// A running pipeline: per-stage input outlets, the tail receiver, and the
/// stage task handles.
pub struct SpawnedPipeline {
    /// Input outlet of each stage, in composition order. `inlets[0]` is the
    /// pipeline head.
    pub inlets: Vec<Outlet>,
    /// Frames leaving the last stage (the transport-out feed).
    pub tail: mpsc::Receiver<Frame>,
    pub handles: Vec<JoinHandle<()>>,
}

impl SpawnedPipeline {
    pub fn head(&self) -> Outlet {
        self.inlets[0].clone()
    }

    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Wire the stages together and spawn one task per stage.
pub fn spawn(stages: Vec<Box<dyn Processor>>) -> SpawnedPipeline {
    let (tail_tx, tail_rx) = mpsc::channel(STAGE_CAPACITY);

    // Build back to front so each stage knows its downstream outlet.
    let mut next_outlet = Outlet::new(tail_tx);
    let mut staged = Vec::with_capacity(stages.len());
    let mut inlets = Vec::with_capacity(stages.len());
    for stage in stages.into_iter().rev() {
        let (tx, rx) = mpsc::channel(STAGE_CAPACITY);
        staged.push((stage, rx, next_outlet));
        next_outlet = Outlet::new(tx);
        inlets.push(next_outlet.clone());
    }
    staged.reverse();
    inlets.reverse();

    let mut handles = Vec::with_capacity(staged.len());
    for (mut stage, mut rx, out) in staged {
        let name = stage.name();
        handles.push(tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let kind = frame.kind();
                if let Err(e) = stage.process(frame, &out).await {
                    tracing::warn!(stage = name, frame = kind, error = %e, "stage error, frame dropped");
                }
            }
            tracing::debug!(stage = name, "stage channel closed");
        }));
    }

    SpawnedPipeline {
        inlets,
        tail: tail_rx,
        handles,
    }
}
