//! Per-phase countdown timer.
//!
//! At most one active countdown per session. The timer emits signals on a
//! single channel, in order: `Started`, periodic `Tick`s, a one-shot `Nudge`
//! at 80 % progress, a final `Nudge` and `Expired` when the duration
//! elapses. It never advances phases itself; the orchestrator reacts to
//! `Expired`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use viva_domain::planner::PlannerField;

const TICK_INTERVAL_SECS: u64 = 10;
const NUDGE_THRESHOLD_PCT: f64 = 80.0;

#[derive(Debug, Clone)]
pub enum TimerSignal {
    Started { sequence: u32 },
    Tick(TimerStatus),
    Nudge { progress_pct: f64, is_final: bool },
    Expired { sequence: u32 },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TimerStatus {
    pub running: bool,
    pub paused: bool,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub progress_pct: f64,
    pub sequence: u32,
}

#[derive(Default)]
struct TimerState {
    running: bool,
    paused: bool,
    elapsed_secs: u64,
    duration_secs: u64,
    sequence: u32,
    nudge_sent: bool,
}

impl TimerState {
    fn progress_pct(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        (100.0 * self.elapsed_secs as f64 / self.duration_secs as f64).min(100.0)
    }

    fn status(&self) -> TimerStatus {
        TimerStatus {
            running: self.running,
            paused: self.paused,
            elapsed_secs: self.elapsed_secs,
            remaining_secs: self.duration_secs.saturating_sub(self.elapsed_secs),
            progress_pct: self.progress_pct(),
            sequence: self.sequence,
        }
    }
}

pub struct PhaseTimer {
    state: Arc<Mutex<TimerState>>,
    signals: mpsc::Sender<TimerSignal>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PhaseTimer {
    /// Create a timer whose signals arrive on the returned receiver.
    pub fn new() -> (Self, mpsc::Receiver<TimerSignal>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Self {
                state: Arc::new(Mutex::new(TimerState::default())),
                signals: tx,
                task: Mutex::new(None),
            },
            rx,
        )
    }

    /// Begin counting down one phase. Cancels any prior countdown and
    /// clears the nudge flag.
    pub async fn start(&self, planner: &PlannerField) {
        self.stop();

        {
            let mut state = self.state.lock();
            *state = TimerState {
                running: true,
                paused: false,
                elapsed_secs: 0,
                duration_secs: planner.duration_secs(),
                sequence: planner.sequence,
                nudge_sent: false,
            };
        }

        tracing::info!(
            sequence = planner.sequence,
            duration_minutes = planner.duration_minutes,
            question_id = %planner.question_id,
            "phase timer started"
        );

        let _ = self
            .signals
            .send(TimerSignal::Started {
                sequence: planner.sequence,
            })
            .await;

        let state = self.state.clone();
        let signals = self.signals.clone();
        let handle = tokio::spawn(run_countdown(state, signals));
        if let Some(old) = self.task.lock().replace(handle) {
            old.abort();
        }
    }

    /// Cancel the countdown. Idempotent.
    pub fn stop(&self) {
        self.state.lock().running = false;
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Freeze elapsed accumulation. No-op unless running and unpaused.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running || state.paused {
            return false;
        }
        state.paused = true;
        tracing::info!(sequence = state.sequence, "phase timer paused");
        true
    }

    /// Unfreeze elapsed accumulation. No-op unless running and paused.
    pub fn resume(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running || !state.paused {
            return false;
        }
        state.paused = false;
        tracing::info!(sequence = state.sequence, "phase timer resumed");
        true
    }

    pub fn status(&self) -> TimerStatus {
        self.state.lock().status()
    }
}

/// One-second accumulation loop. Runs until expiry, `stop`, or abort.
async fn run_countdown(state: Arc<Mutex<TimerState>>, signals: mpsc::Sender<TimerSignal>) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;

        enum Step {
            Continue,
            Tick(TimerStatus),
            Nudge(f64),
            Expired(u32),
            Stopped,
        }

        let step = {
            let mut s = state.lock();
            if !s.running {
                Step::Stopped
            } else if s.paused {
                Step::Continue
            } else {
                s.elapsed_secs += 1;
                let progress = s.progress_pct();
                if s.elapsed_secs >= s.duration_secs {
                    s.running = false;
                    Step::Expired(s.sequence)
                } else if progress >= NUDGE_THRESHOLD_PCT && !s.nudge_sent {
                    s.nudge_sent = true;
                    Step::Nudge(progress)
                } else if s.elapsed_secs % TICK_INTERVAL_SECS == 0 {
                    Step::Tick(s.status())
                } else {
                    Step::Continue
                }
            }
        };

        match step {
            Step::Continue => {}
            Step::Stopped => return,
            Step::Tick(status) => {
                tracing::debug!(
                    remaining_secs = status.remaining_secs,
                    progress_pct = status.progress_pct,
                    sequence = status.sequence,
                    "timer status"
                );
                if signals.send(TimerSignal::Tick(status)).await.is_err() {
                    return;
                }
            }
            Step::Nudge(progress) => {
                if signals
                    .send(TimerSignal::Nudge {
                        progress_pct: progress,
                        is_final: false,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Step::Expired(sequence) => {
                tracing::info!(sequence, "phase timer expired");
                // Expiry always carries a final nudge, even if the 80 %
                // nudge already fired.
                let _ = signals
                    .send(TimerSignal::Nudge {
                        progress_pct: 100.0,
                        is_final: true,
                    })
                    .await;
                let _ = signals.send(TimerSignal::Expired { sequence }).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viva_domain::planner::PlannerField;

    fn planner(minutes: u32) -> PlannerField {
        PlannerField::new(0, minutes, "q0", "kb").unwrap()
    }

    async fn drain_until_expired(rx: &mut mpsc::Receiver<TimerSignal>) -> Vec<TimerSignal> {
        let mut signals = Vec::new();
        while let Some(signal) = rx.recv().await {
            let done = matches!(signal, TimerSignal::Expired { .. });
            signals.push(signal);
            if done {
                break;
            }
        }
        signals
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_emits_ordered_signals() {
        let (timer, mut rx) = PhaseTimer::new();
        timer.start(&planner(1)).await;

        let signals = drain_until_expired(&mut rx).await;

        assert!(matches!(signals.first(), Some(TimerSignal::Started { sequence: 0 })));
        assert!(matches!(signals.last(), Some(TimerSignal::Expired { sequence: 0 })));

        // Exactly one non-final nudge (at 80 %), exactly one final nudge.
        let nudges: Vec<_> = signals
            .iter()
            .filter_map(|s| match s {
                TimerSignal::Nudge { progress_pct, is_final } => Some((*progress_pct, *is_final)),
                _ => None,
            })
            .collect();
        assert_eq!(nudges.len(), 2);
        assert!(nudges[0].0 >= 80.0 && !nudges[0].1);
        assert!((nudges[1].0 - 100.0).abs() < f64::EPSILON && nudges[1].1);

        // The final nudge precedes expiry; the 80% nudge precedes it.
        let nudge_idx = signals
            .iter()
            .position(|s| matches!(s, TimerSignal::Nudge { is_final: false, .. }))
            .unwrap();
        let final_idx = signals
            .iter()
            .position(|s| matches!(s, TimerSignal::Nudge { is_final: true, .. }))
            .unwrap();
        assert!(nudge_idx < final_idx);
        assert_eq!(final_idx + 1, signals.len() - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_roughly_every_ten_seconds() {
        let (timer, mut rx) = PhaseTimer::new();
        timer.start(&planner(1)).await;

        let signals = drain_until_expired(&mut rx).await;
        let ticks = signals
            .iter()
            .filter(|s| matches!(s, TimerSignal::Tick(_)))
            .count();
        // 60s duration, tick at 10,20,30,40,50 (48s is the nudge, 60 expires).
        assert!(ticks >= 4, "expected periodic ticks, got {ticks}");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_elapsed() {
        let (timer, _rx) = PhaseTimer::new();
        timer.start(&planner(5)).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        let before = timer.status().elapsed_secs;
        assert!(timer.pause());

        tokio::time::sleep(Duration::from_secs(30)).await;
        let during = timer.status().elapsed_secs;
        assert_eq!(before, during, "elapsed must not accumulate while paused");
        assert!(timer.status().paused);

        assert!(timer.resume());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(timer.status().elapsed_secs > during);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_resume_are_noops_when_not_applicable() {
        let (timer, _rx) = PhaseTimer::new();
        assert!(!timer.pause(), "pause before start is a no-op");
        assert!(!timer.resume());

        timer.start(&planner(1)).await;
        assert!(!timer.resume(), "resume while unpaused is a no-op");
        assert!(timer.pause());
        assert!(!timer.pause(), "double pause is a no-op");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_signals() {
        let (timer, mut rx) = PhaseTimer::new();
        timer.start(&planner(1)).await;
        // Consume Started.
        assert!(matches!(rx.recv().await, Some(TimerSignal::Started { .. })));

        timer.stop();
        timer.stop();
        assert!(!timer.status().running);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err(), "no signals after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_countdown_single_flight() {
        let (timer, mut rx) = PhaseTimer::new();
        timer.start(&planner(1)).await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        // Restarting resets elapsed and the nudge flag.
        let second = PlannerField::new(1, 1, "q1", "kb").unwrap();
        timer.start(&second).await;
        assert_eq!(timer.status().elapsed_secs, 0);
        assert_eq!(timer.status().sequence, 1);

        let signals = drain_until_expired(&mut rx).await;
        // Only one Expired in total, for the second phase.
        let expirations: Vec<_> = signals
            .iter()
            .filter_map(|s| match s {
                TimerSignal::Expired { sequence } => Some(*sequence),
                _ => None,
            })
            .collect();
        assert_eq!(expirations, vec![1]);
    }
}
