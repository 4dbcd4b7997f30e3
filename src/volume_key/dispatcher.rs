//! Volume-key dispatcher
//!
//! Owns the state machine, executes the effects it asks for against the
//! injected collaborators, and runs its deferred callbacks through a
//! [`Scheduler`].
//!
//! Key events and timer fires are serialised by one delivery lock held across
//! the transition and the delivery of its effects, so signals reach the host
//! in transition order whatever thread the scheduler runs tasks on.
//! Collaborators must not call back into the dispatcher.

use super::state::{
    Effect, KeyDisposition, KeyEvent, KeyPhase, KeyTimingStateMachine, KeyTimings, Timer,
    TimingState,
};
use crate::host::KeyCollaborators;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Deferred task run by a [`Scheduler`]
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay
///
/// There is no cancellation: tasks check their own guard state when they run.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: ScheduledTask);
}

/// [`Scheduler`] backed by a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the runtime the caller is running in, if any
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

struct DispatcherInner {
    /// Held from the start of a transition until its effects are delivered
    delivery: Mutex<()>,
    /// Only ever locked briefly, so phase queries never wait on collaborators
    machine: Mutex<KeyTimingStateMachine>,
    collaborators: KeyCollaborators,
    scheduler: Arc<dyn Scheduler>,
}

/// Thread-safe driver for [`KeyTimingStateMachine`]
#[derive(Clone)]
pub struct KeyDispatcher {
    inner: Arc<DispatcherInner>,
}

impl KeyDispatcher {
    pub fn new(
        keycode: u32,
        timings: KeyTimings,
        collaborators: KeyCollaborators,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                delivery: Mutex::new(()),
                machine: Mutex::new(KeyTimingStateMachine::new(keycode, timings)),
                collaborators,
                scheduler,
            }),
        }
    }

    /// Handle one key event from the host
    ///
    /// Returns whether the host should treat the event as consumed.
    pub fn handle_key_event(&self, event: &KeyEvent) -> KeyDisposition {
        let _delivery = self.inner.delivery.lock();
        let transition = self.inner.machine.lock().handle_event(event);
        self.run_effects(transition.effects);
        transition.disposition
    }

    pub fn phase(&self) -> KeyPhase {
        self.inner.machine.lock().phase()
    }

    pub fn state(&self) -> TimingState {
        self.inner.machine.lock().state().clone()
    }

    /// Drop any cycle in progress
    ///
    /// Timers already scheduled still run but find their guards cleared.
    pub fn reset(&self) {
        let _delivery = self.inner.delivery.lock();
        self.inner.machine.lock().reset();
    }

    fn fire(&self, timer: Timer) {
        let _delivery = self.inner.delivery.lock();
        let companion_active =
            timer == Timer::LongPress && self.inner.collaborators.companion.is_active();
        let effects = self.inner.machine.lock().on_timer(timer, companion_active);
        self.run_effects(effects);
    }

    fn run_effects(&self, effects: Vec<Effect>) {
        let collaborators = &self.inner.collaborators;
        for effect in effects {
            match effect {
                Effect::Signal(signal) => {
                    tracing::info!("Volume key signal: {}", signal);
                    collaborators.signals.send_signal(signal);
                }
                Effect::LowerVolume => {
                    tracing::debug!("Volume tap, lowering volume");
                    collaborators.volume.lower_volume();
                }
                Effect::LaunchCompanion => {
                    tracing::info!("Launching companion screen");
                    collaborators.companion.launch();
                }
                Effect::Vibrate { duration_ms } => {
                    collaborators
                        .haptics
                        .vibrate(Duration::from_millis(duration_ms));
                }
                Effect::Schedule { timer, delay_ms } => self.schedule(timer, delay_ms),
            }
        }
    }

    fn schedule(&self, timer: Timer, delay_ms: u64) {
        let weak: Weak<DispatcherInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(
            Duration::from_millis(delay_ms),
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    KeyDispatcher { inner }.fire(timer);
                }
            }),
        );
    }
}
