//! # Like Toggle
//!
//! Client-side state machine for the like affordance on a topic or reply.
//! The remote table has a uniqueness constraint per (actor, target) pair;
//! that constraint, not a client lock, resolves races between concurrent
//! actors. This controller's job is to serialize its own presses, keep an
//! optimistic view of the pair state, and classify constraint violations
//! as benign.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error};

use domains::error::{AppError, Result, StoreError};
use domains::models::LikeTarget;
use domains::traits::{Identity, LikeStore};

/// Presses closer together than this are treated as one.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The pair the UI binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeView {
    pub is_liked: bool,
    pub like_count: u32,
}

/// Idle, or exactly one remote mutation on the wire. A second press while
/// in flight is dropped; the variant makes the invariant structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    InFlight,
}

struct ToggleState {
    /// What the UI currently shows. Runs ahead of the backend while a
    /// mutation is in flight.
    view: LikeView,
    /// The last view the backend acknowledged. Hard failures roll back
    /// to this, not to the construction-time seed.
    confirmed: LikeView,
    phase: Phase,
    last_press: Option<Instant>,
}

/// One instance per (target kind, target id) shown on screen. Instances
/// are independent; each serializes only its own mutations.
pub struct LikeToggleController {
    identity: Arc<dyn Identity>,
    store: Arc<dyn LikeStore>,
    target: LikeTarget,
    debounce: Duration,
    state: Mutex<ToggleState>,
}

impl LikeToggleController {
    /// Seeds the view from values the caller already fetched (as part of
    /// loading the parent topic or reply). No fetch happens here.
    pub fn new(
        identity: Arc<dyn Identity>,
        store: Arc<dyn LikeStore>,
        target: LikeTarget,
        initial_is_liked: bool,
        initial_count: u32,
    ) -> Self {
        let seed = LikeView { is_liked: initial_is_liked, like_count: initial_count };
        Self {
            identity,
            store,
            target,
            debounce: DEFAULT_DEBOUNCE,
            state: Mutex::new(ToggleState {
                view: seed,
                confirmed: seed,
                phase: Phase::Idle,
                last_press: None,
            }),
        }
    }

    /// Overrides the debounce window, e.g. from `behavior.debounce_ms`.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn target(&self) -> LikeTarget {
        self.target
    }

    pub fn view(&self) -> LikeView {
        self.lock_state().view
    }

    pub fn is_liked(&self) -> bool {
        self.lock_state().view.is_liked
    }

    pub fn like_count(&self) -> u32 {
        self.lock_state().view.like_count
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().phase == Phase::InFlight
    }

    /// Flips the like state for the signed-in actor.
    ///
    /// Guards, in order: no actor fails with `Unauthenticated`; a press
    /// inside the debounce window is a silent no-op; a press while a
    /// mutation is in flight is a silent no-op. When none trips, the view
    /// flips optimistically, the matching insert/delete goes out, and on a
    /// hard failure the view rolls back to the last acknowledged pair and
    /// `OperationFailed` surfaces. Constraint violations that mean another
    /// call already produced the intended end state are absorbed.
    pub async fn toggle(&self) -> Result<()> {
        let Some(actor) = self.identity.current_user() else {
            debug!(target = %self.target, "like toggle without a signed-in actor");
            return Err(AppError::Unauthenticated);
        };

        // Guards and the optimistic flip run under the lock; the remote
        // call does not.
        let unliking = {
            let mut state = self.lock_state();

            let now = Instant::now();
            if let Some(last) = state.last_press {
                if now.duration_since(last) < self.debounce {
                    debug!(target = %self.target, "press inside the debounce window, dropped");
                    return Ok(());
                }
            }
            state.last_press = Some(now);

            if state.phase == Phase::InFlight {
                debug!(target = %self.target, "mutation already in flight, press dropped");
                return Ok(());
            }
            state.phase = Phase::InFlight;

            let unliking = state.view.is_liked;
            state.view = if unliking {
                LikeView {
                    is_liked: false,
                    like_count: state.view.like_count.saturating_sub(1),
                }
            } else {
                LikeView {
                    is_liked: true,
                    like_count: state.view.like_count + 1,
                }
            };
            unliking
        };

        let outcome = if unliking {
            match self.store.delete(actor.id, self.target).await {
                // The row was already gone, which is the end state the
                // actor wanted.
                Err(StoreError::MissingRow) => Ok(()),
                other => other,
            }
        } else {
            match self.store.insert(actor.id, self.target).await {
                // Already liked by a concurrent call.
                Err(StoreError::Duplicate) => Ok(()),
                other => other,
            }
        };

        // Every path out of the flight settles the phase before returning.
        let mut state = self.lock_state();
        state.phase = Phase::Idle;
        match outcome {
            Ok(()) => {
                state.confirmed = state.view;
                Ok(())
            }
            Err(err) => {
                error!(target = %self.target, error = %err, "like toggle failed, rolling back");
                state.view = state.confirmed;
                Err(AppError::OperationFailed(err.to_string()))
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ToggleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
