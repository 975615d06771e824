//! One simulation session and its viewers.
//!
//! # Frame sharing
//!
//! Several views may watch one session. [`Session::next_frame`] keeps the
//! frame of the current generation cached and counts how many requests
//! it has served. While that count is below the number of registered
//! listeners, requests get the cached frame. After that, the next request
//! pulls a fresh generation off the producer channel. Views are therefore
//! coupled to the slowest-polling peer within one generation.
//!
//! The listener count is read under the same lock, and in the same
//! critical section, as the reuse-or-advance decision, and frame pulls
//! are serialized. A concurrent registration therefore lands either
//! before or after a decision, never in the middle of one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use life_core::{Frame, GenerationStep, Universe};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::control::{ControlCommand, ControlEvent, ControlOutcome, Notification};
use crate::error::SessionError;
use crate::ids::{PageId, SessionToken};
use crate::listener::{ListenerHandle, ListenerTable};
use crate::producer::{GenerationLoop, LoopExit};

/// Mutable session state, guarded by the session lock.
pub(crate) struct SessionState {
    next_page_id: u64,
    pub(crate) listeners: ListenerTable,
    delay_ms: f64,
    paused: bool,
    current: Option<Arc<Frame>>,
    served: usize,
    closed: bool,
}

impl SessionState {
    const fn event(&self) -> ControlEvent {
        ControlEvent {
            delay_ms: self.delay_ms,
            paused: self.paused,
        }
    }
}

/// Lock session state. The state is consistent between statements, so a
/// poisoned lock is recovered rather than propagated.
pub(crate) fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A view freshly attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// The page id the view must present on frame and update requests.
    pub page_id: PageId,
    /// Control state at the time the view opened.
    pub event: ControlEvent,
    /// Existing listeners forced to refresh by this view opening.
    pub refreshed: usize,
}

/// Point-in-time summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session key.
    pub session: SessionToken,
    /// ISO 8601 creation time.
    pub created_at: String,
    /// Generation of the cached frame, if any frame was served yet.
    pub generation: Option<u64>,
    /// Current inter-generation delay in milliseconds.
    pub delay_ms: f64,
    /// Whether the session is paused.
    pub paused: bool,
    /// Registered listener slots.
    pub listeners: usize,
    /// Views opened so far.
    pub views: u64,
    /// Whether the session was cleared.
    pub closed: bool,
}

/// An independent simulation with its own producer and viewers.
pub struct Session {
    token: SessionToken,
    created_at: DateTime<Utc>,
    min_delay_ms: f64,
    max_delay_ms: f64,
    state: Arc<Mutex<SessionState>>,
    frames: tokio::sync::Mutex<mpsc::Receiver<Arc<Universe>>>,
    cancel: CancellationToken,
    producer: Mutex<Option<JoinHandle<LoopExit>>>,
}

impl Session {
    /// Build a session and its (not yet running) generation loop.
    ///
    /// The session is fully usable as soon as this returns. Frames become
    /// available once the loop is spawned with [`Session::start_producer`].
    pub fn new<S: GenerationStep>(
        token: SessionToken,
        config: &SessionConfig,
        engine: S,
        max_retries: u32,
        seed: Universe,
    ) -> (Arc<Self>, GenerationLoop<S>) {
        let (tx, rx) = mpsc::channel(config.effective_frame_buffer());
        let cancel = CancellationToken::new();
        let (min_delay_ms, max_delay_ms, initial_delay_ms) = config.delay_range();
        let session = Arc::new(Self {
            token,
            created_at: Utc::now(),
            min_delay_ms,
            max_delay_ms,
            state: Arc::new(Mutex::new(SessionState {
                next_page_id: 0,
                listeners: ListenerTable::default(),
                delay_ms: initial_delay_ms,
                paused: false,
                current: None,
                served: 0,
                closed: false,
            })),
            frames: tokio::sync::Mutex::new(rx),
            cancel: cancel.clone(),
            producer: Mutex::new(None),
        });
        let generation_loop = GenerationLoop {
            session: token,
            seed,
            frames: tx,
            engine,
            max_retries,
            cancel,
        };
        (session, generation_loop)
    }

    /// Spawn `generation_loop` and keep its handle so [`Session::close`]
    /// can wait for it.
    pub fn start_producer<S: GenerationStep>(&self, generation_loop: GenerationLoop<S>) {
        let handle = generation_loop.spawn();
        *self.producer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// The session key.
    pub const fn token(&self) -> SessionToken {
        self.token
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.state)
    }

    fn bounded_delay(&self, delay_ms: f64) -> f64 {
        delay_ms.max(self.min_delay_ms).min(self.max_delay_ms)
    }

    /// Hand out the next page id and force every pending listener to
    /// refresh.
    pub fn open_view(&self) -> View {
        let mut state = self.state();
        let page_id = PageId(state.next_page_id);
        state.next_page_id = state.next_page_id.saturating_add(1);
        let refreshed = state.listeners.broadcast(Notification::Refresh);
        debug!(session = %self.token, %page_id, refreshed, "View opened");
        View {
            page_id,
            event: state.event(),
            refreshed,
        }
    }

    /// The frame `page_id` should render next.
    ///
    /// Returns the cached frame while fewer requests than registered
    /// listeners have been served from it, otherwise waits for the next
    /// generation from the producer.
    pub async fn next_frame(&self, page_id: PageId) -> Result<Arc<Frame>, SessionError> {
        let mut frames = self.frames.lock().await;
        {
            let mut state = self.state();
            if state.closed {
                return Err(SessionError::Closed);
            }
            let listeners = state.listeners.len();
            if state.served < listeners {
                if let Some(frame) = state.current.clone() {
                    state.served = state.served.saturating_add(1);
                    debug!(
                        session = %self.token,
                        %page_id,
                        generation = frame.generation,
                        served = state.served,
                        listeners,
                        "Serving cached frame"
                    );
                    return Ok(frame);
                }
            }
        }

        let universe = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(SessionError::Closed),
            next = frames.recv() => next.ok_or(SessionError::ProducerStopped)?,
        };
        let frame = Arc::new(universe.frame());

        let mut state = self.state();
        state.current = Some(Arc::clone(&frame));
        state.served = 1;
        debug!(
            session = %self.token,
            %page_id,
            generation = frame.generation,
            listeners = state.listeners.len(),
            "Advanced to next generation"
        );
        Ok(frame)
    }

    /// Apply a control command and broadcast the resulting state to every
    /// registered listener.
    ///
    /// With no listeners the broadcast is a no-op; nothing is queued for
    /// later registrants. [`ControlCommand::Clear`] closes the session but
    /// does not remove it from a registry; use
    /// [`SessionRegistry::apply_control`](crate::registry::SessionRegistry::apply_control)
    /// for that.
    pub fn apply_control(&self, command: ControlCommand) -> ControlOutcome {
        if command == ControlCommand::Clear {
            let (event, notified) = self.shut_down();
            return ControlOutcome {
                command,
                event,
                notified,
                closed: true,
            };
        }

        let mut state = self.state();
        match command {
            ControlCommand::DelayMore => {
                state.delay_ms = self.bounded_delay(state.delay_ms * 2.0);
            }
            ControlCommand::DelayLess => {
                state.delay_ms = self.bounded_delay(state.delay_ms / 2.0);
            }
            ControlCommand::Pause => state.paused = true,
            ControlCommand::Resume => state.paused = false,
            ControlCommand::Clear => {}
        }
        let event = state.event();
        let notified = state.listeners.broadcast(Notification::Control(event));
        info!(
            session = %self.token,
            ?command,
            delay_ms = event.delay_ms,
            paused = event.paused,
            notified,
            "Control applied"
        );
        ControlOutcome {
            command,
            event,
            notified,
            closed: state.closed,
        }
    }

    /// Register a single-use listener slot for `page_id`.
    ///
    /// The returned handle resolves on the next control broadcast, view
    /// refresh, or session close. A slot already registered for the same
    /// page resolves as [`Notification::Superseded`]. On a closed session
    /// the handle resolves immediately with [`Notification::Closed`].
    pub fn add_listener(&self, page_id: PageId) -> ListenerHandle {
        let mut state = self.state();
        let (slot_id, rx) = state.listeners.register(page_id);
        if state.closed {
            state.listeners.broadcast(Notification::Closed);
        }
        ListenerHandle::new(page_id, slot_id, rx, Arc::downgrade(&self.state))
    }

    /// Remove the slot for `page_id`. Idempotent.
    pub fn remove_listener(&self, page_id: PageId) -> bool {
        self.state().listeners.remove(page_id)
    }

    /// Number of registered listener slots.
    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Current control state.
    pub fn control_state(&self) -> ControlEvent {
        self.state().event()
    }

    /// Whether the session was cleared.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Point-in-time summary.
    pub fn status(&self) -> SessionStatus {
        let state = self.state();
        SessionStatus {
            session: self.token,
            created_at: self.created_at.to_rfc3339(),
            generation: state.current.as_ref().map(|f| f.generation),
            delay_ms: state.delay_ms,
            paused: state.paused,
            listeners: state.listeners.len(),
            views: state.next_page_id,
            closed: state.closed,
        }
    }

    /// Close the session and wait for its producer to stop.
    ///
    /// Every pending listener resolves with [`Notification::Closed`].
    pub async fn close(&self) -> usize {
        let (_, notified) = self.shut_down();
        let handle = self
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(exit) => debug!(session = %self.token, ?exit, "Generation loop joined"),
                Err(e) => debug!(session = %self.token, error = %e, "Generation loop ended abnormally"),
            }
        }
        notified
    }

    /// Mark closed, cancel the producer, and release every listener.
    fn shut_down(&self) -> (ControlEvent, usize) {
        self.cancel.cancel();
        let mut state = self.state();
        let first_close = !state.closed;
        state.closed = true;
        let notified = state.listeners.broadcast(Notification::Closed);
        if first_close {
            info!(session = %self.token, notified, "Session closed");
        }
        (state.event(), notified)
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
