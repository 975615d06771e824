//! The per-session generation producer.
//!
//! [`GenerationLoop::run`] repeatedly offers its current universe on the
//! session's bounded handoff channel and then replaces it with the next
//! generation. A full channel blocks the loop, so the engine runs at most
//! `frame_buffer` generations ahead of the slowest consumer.
//!
//! The loop stops when:
//!
//! - the session's [`CancellationToken`] fires (checked at every offer and
//!   during every computation),
//! - the receiving side of the channel is dropped, or
//! - the engine fails more than `max_retries` times in a row on the same
//!   input.

use std::sync::Arc;

use life_core::{GenerationEngine, GenerationStep, Universe};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::ids::SessionToken;

/// Why a producer loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The session was cancelled.
    Cancelled,
    /// Nobody can receive frames any more.
    ReceiverDropped,
    /// The engine kept failing on the same generation.
    EngineFailed,
}

/// A not-yet-started producer loop, built together with its session.
///
/// Generic over the step function; sessions in the registry always use
/// the parallel [`GenerationEngine`].
#[derive(Debug)]
pub struct GenerationLoop<S = GenerationEngine> {
    pub(crate) session: SessionToken,
    pub(crate) seed: Universe,
    pub(crate) frames: mpsc::Sender<Arc<Universe>>,
    pub(crate) engine: S,
    pub(crate) max_retries: u32,
    pub(crate) cancel: CancellationToken,
}

impl<S: GenerationStep> GenerationLoop<S> {
    /// Run the loop on a background Tokio task.
    pub fn spawn(self) -> JoinHandle<LoopExit> {
        tokio::spawn(self.run())
    }

    /// Drive the loop until one of the stop conditions is met.
    pub async fn run(self) -> LoopExit {
        let Self {
            session,
            seed,
            frames,
            engine,
            max_retries,
            cancel,
        } = self;
        let mut current = Arc::new(seed);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(%session, generation = current.generation(), "Generation loop cancelled");
                    return LoopExit::Cancelled;
                }
                sent = frames.send(Arc::clone(&current)) => {
                    if sent.is_err() {
                        debug!(%session, "Frame receiver dropped, stopping generation loop");
                        return LoopExit::ReceiverDropped;
                    }
                }
            }

            let mut failures: u32 = 0;
            current = loop {
                let step = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(%session, generation = current.generation(), "Generation loop cancelled mid-step");
                        return LoopExit::Cancelled;
                    }
                    step = engine.step(Arc::clone(&current)) => step,
                };
                match step {
                    Ok(next) => break Arc::new(next),
                    Err(e) if failures < max_retries => {
                        failures = failures.saturating_add(1);
                        warn!(
                            %session,
                            generation = current.generation(),
                            attempt = failures,
                            error = %e,
                            "Generation failed, retrying with the same input"
                        );
                    }
                    Err(e) => {
                        error!(
                            %session,
                            generation = current.generation(),
                            error = %e,
                            "Generation failed past retry budget, stopping loop"
                        );
                        return LoopExit::EngineFailed;
                    }
                }
            };
        }
    }
}

/// Step function that fails a set number of times before falling back to
/// the sequential reference step. Clones share their counters.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct FlakyStep {
    failures_left: Arc<std::sync::atomic::AtomicU32>,
    attempts: Arc<std::sync::atomic::AtomicU32>,
}

#[cfg(test)]
impl FlakyStep {
    pub(crate) fn failing(times: u32) -> Self {
        Self {
            failures_left: Arc::new(std::sync::atomic::AtomicU32::new(times)),
            attempts: Arc::new(std::sync::atomic::AtomicU32::new(0)),
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl GenerationStep for FlakyStep {
    fn step(
        &self,
        current: Arc<Universe>,
    ) -> impl std::future::Future<Output = Result<Universe, life_core::EngineError>> + Send {
        use std::sync::atomic::Ordering;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        async move {
            if fail {
                Err(life_core::EngineError::WorkerFailed(String::from("injected failure")))
            } else {
                Ok(life_core::reference_next_generation(&current))
            }
        }
    }
}
