//! Volume-key timing state machine
//!
//! Pure transition logic: events and timer expiries go in, a disposition for
//! the key event and a list of [`Effect`]s come out. Executing effects and
//! running timers is left to the dispatcher.

use crate::host::AssistantSignal;
use serde::{Deserialize, Serialize};

/// Android `KEYCODE_VOLUME_DOWN`
pub const KEYCODE_VOLUME_DOWN: u32 = 25;

/// Hold time separating a tap from a long press (ms)
pub const LONG_PRESS_MS: u64 = 500;

/// Window after a long-press release in which a tap means "send" (ms)
pub const MAX_CONFIRM_MS: u64 = 3000;

/// Window after a volume tap in which further presses stay volume presses (ms)
pub const BAN_CANCEL_MS: u64 = 2000;

/// Delay between launching the companion screen and starting to listen (ms)
pub const START_DELAY_MS: u64 = 500;

/// Length of the long-press haptic pulse (ms)
pub const HAPTIC_MS: u64 = 100;

/// Timing thresholds for the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTimings {
    pub long_press_ms: u64,
    pub max_confirm_ms: u64,
    pub ban_cancel_ms: u64,
    pub start_delay_ms: u64,
    pub haptic_ms: u64,
}

impl Default for KeyTimings {
    fn default() -> Self {
        Self {
            long_press_ms: LONG_PRESS_MS,
            max_confirm_ms: MAX_CONFIRM_MS,
            ban_cancel_ms: BAN_CANCEL_MS,
            start_delay_ms: START_DELAY_MS,
            haptic_ms: HAPTIC_MS,
        }
    }
}

/// Physical key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

/// One key event as delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u32,
    pub action: KeyAction,
    /// Host event time in milliseconds (monotonic)
    pub timestamp_ms: u64,
}

impl KeyEvent {
    pub fn down(keycode: u32, timestamp_ms: u64) -> Self {
        Self {
            keycode,
            action: KeyAction::Down,
            timestamp_ms,
        }
    }

    pub fn up(keycode: u32, timestamp_ms: u64) -> Self {
        Self {
            keycode,
            action: KeyAction::Up,
            timestamp_ms,
        }
    }
}

/// Whether the service swallowed a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Handled here; the host must not act on it
    Consumed,
    /// Not ours; the host applies its default behaviour
    PassThrough,
}

impl KeyDisposition {
    pub fn is_consumed(self) -> bool {
        self == KeyDisposition::Consumed
    }
}

/// Deferred callbacks the machine asks to be run later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Key still held after the long-press threshold
    LongPress,
    /// Companion screen had time to come up
    StartDelay,
    /// Confirm window after a long press ran out
    ///
    /// Carries the number of the window it was scheduled for; it only
    /// expires that window.
    ConfirmTimeout { window: u64 },
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Signal(AssistantSignal),
    /// Plain volume tap: perform the default volume-down adjustment
    LowerVolume,
    LaunchCompanion,
    Vibrate { duration_ms: u64 },
    Schedule { timer: Timer, delay_ms: u64 },
}

/// Outcome of feeding one key event to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub disposition: KeyDisposition,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn consumed(effects: Vec<Effect>) -> Self {
        Self {
            disposition: KeyDisposition::Consumed,
            effects,
        }
    }

    fn pass_through() -> Self {
        Self {
            disposition: KeyDisposition::PassThrough,
            effects: Vec::new(),
        }
    }
}

/// Coarse view of [`TimingState`] for logging and status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyPhase {
    #[default]
    Idle,
    /// A volume tap just happened; presses adjust volume only
    Banned,
    /// Key held, long-press timer running
    Pressing,
    /// Long press released, waiting for the confirming tap
    AwaitingConfirm,
}

impl KeyPhase {
    pub fn description(&self) -> &'static str {
        match self {
            KeyPhase::Idle => "Waiting for key press",
            KeyPhase::Banned => "Volume adjustment in progress",
            KeyPhase::Pressing => "Key held",
            KeyPhase::AwaitingConfirm => "Waiting for confirming tap",
        }
    }
}

/// Mutable timing state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingState {
    /// 0 outside a cycle, 1 after a long press was released
    pub press_count: u8,
    pub is_pressing: bool,
    pub is_waiting_confirm: bool,
    pub is_banned: bool,
    pub is_in_start_delay: bool,
    pub key_down_time: u64,
    pub key_up_time: u64,
}

impl TimingState {
    pub fn phase(&self) -> KeyPhase {
        if self.is_banned {
            KeyPhase::Banned
        } else if self.press_count > 0 {
            KeyPhase::AwaitingConfirm
        } else if self.is_pressing {
            KeyPhase::Pressing
        } else {
            KeyPhase::Idle
        }
    }
}

/// Interprets press timing of one designated key
///
/// A long press starts listening, releasing it stops listening, and a tap
/// within the confirm window afterwards sends. A quick tap outside a cycle is
/// a volume adjustment and bans long-press handling for a grace window.
#[derive(Debug)]
pub struct KeyTimingStateMachine {
    keycode: u32,
    timings: KeyTimings,
    state: TimingState,
    /// Number of the latest confirm window; survives resets
    confirm_window: u64,
}

impl KeyTimingStateMachine {
    pub fn new(keycode: u32, timings: KeyTimings) -> Self {
        Self {
            keycode,
            timings,
            state: TimingState::default(),
            confirm_window: 0,
        }
    }

    pub fn keycode(&self) -> u32 {
        self.keycode
    }

    pub fn timings(&self) -> KeyTimings {
        self.timings
    }

    pub fn state(&self) -> &TimingState {
        &self.state
    }

    pub fn phase(&self) -> KeyPhase {
        self.state.phase()
    }

    pub fn reset(&mut self) {
        self.state = TimingState::default();
        tracing::info!("Volume key state machine reset to Idle");
    }

    /// Feed one key event
    pub fn handle_event(&mut self, event: &KeyEvent) -> Transition {
        if event.keycode != self.keycode {
            return Transition::pass_through();
        }

        let previous = self.state.phase();
        let transition = self.transition(event);
        let current = self.state.phase();

        tracing::debug!(
            "Volume key {:?}@{}: {:?} -> {:?} ({:?})",
            event.action,
            event.timestamp_ms,
            previous,
            current,
            transition.disposition
        );
        transition
    }

    fn transition(&mut self, event: &KeyEvent) -> Transition {
        let now = event.timestamp_ms;

        if self.state.is_banned {
            match event.action {
                KeyAction::Down => {
                    self.state.key_down_time = now;
                    if now.saturating_sub(self.state.key_up_time) < self.timings.ban_cancel_ms {
                        return Transition::pass_through();
                    }
                    self.state.is_banned = false;
                    tracing::debug!("Volume key ban lifted");
                }
                KeyAction::Up => {
                    self.state.key_up_time = now;
                    return Transition::pass_through();
                }
            }
        }

        match (self.state.press_count, event.action) {
            (0, KeyAction::Down) => self.on_cycle_down(now),
            (0, KeyAction::Up) => self.on_cycle_up(now),
            (_, KeyAction::Down) => self.on_confirm_down(now),
            (_, KeyAction::Up) => self.on_confirm_up(now),
        }
    }

    fn on_cycle_down(&mut self, now: u64) -> Transition {
        self.state.key_down_time = now;
        self.state.is_pressing = true;
        Transition::consumed(vec![Effect::Schedule {
            timer: Timer::LongPress,
            delay_ms: self.timings.long_press_ms,
        }])
    }

    fn on_cycle_up(&mut self, now: u64) -> Transition {
        self.state.key_up_time = now;
        if !self.state.is_pressing {
            // Release of a press we never took (e.g. a late confirm that was
            // passed to the host); its release belongs to the host too.
            self.state.is_in_start_delay = false;
            return Transition::pass_through();
        }

        self.state.is_pressing = false;
        self.state.is_in_start_delay = false;

        let held = now.saturating_sub(self.state.key_down_time);
        if held < self.timings.long_press_ms {
            self.state.is_banned = true;
            return Transition::consumed(vec![Effect::LowerVolume]);
        }

        self.state.press_count = 1;
        self.state.is_waiting_confirm = true;
        self.confirm_window += 1;
        tracing::info!("Long press released after {}ms, awaiting confirm", held);
        Transition::consumed(vec![
            Effect::Signal(AssistantSignal::StopListening),
            Effect::Schedule {
                timer: Timer::ConfirmTimeout {
                    window: self.confirm_window,
                },
                delay_ms: self.timings.max_confirm_ms,
            },
        ])
    }

    fn on_confirm_down(&mut self, now: u64) -> Transition {
        self.state.is_waiting_confirm = false;
        self.state.key_down_time = now;

        if now.saturating_sub(self.state.key_up_time) < self.timings.max_confirm_ms {
            return Transition::consumed(vec![Effect::Signal(AssistantSignal::Send)]);
        }

        // Too late to confirm: an ordinary press that the host should see
        self.state.press_count = 0;
        tracing::debug!("Confirm window missed, cycle abandoned");
        Transition::pass_through()
    }

    fn on_confirm_up(&mut self, now: u64) -> Transition {
        let confirmed = self
            .state
            .key_down_time
            .saturating_sub(self.state.key_up_time)
            < self.timings.max_confirm_ms;

        self.state.key_up_time = now;
        self.state.press_count = 0;
        self.state.is_waiting_confirm = false;

        if confirmed {
            Transition::consumed(Vec::new())
        } else {
            Transition::pass_through()
        }
    }

    /// Run a deferred callback
    ///
    /// Each timer re-checks its guard flag, so a timer whose press was
    /// released (or whose cycle already moved on) does nothing.
    /// `companion_active` is only consulted by [`Timer::LongPress`].
    pub fn on_timer(&mut self, timer: Timer, companion_active: bool) -> Vec<Effect> {
        match timer {
            Timer::LongPress => {
                if !self.state.is_pressing {
                    return Vec::new();
                }
                let mut effects = Vec::with_capacity(3);
                if companion_active {
                    effects.push(Effect::Signal(AssistantSignal::StartListening));
                } else {
                    self.state.is_in_start_delay = true;
                    effects.push(Effect::LaunchCompanion);
                    effects.push(Effect::Schedule {
                        timer: Timer::StartDelay,
                        delay_ms: self.timings.start_delay_ms,
                    });
                }
                effects.push(Effect::Vibrate {
                    duration_ms: self.timings.haptic_ms,
                });
                tracing::info!(
                    "Long press recognised (companion active: {})",
                    companion_active
                );
                effects
            }
            Timer::StartDelay => {
                if !self.state.is_in_start_delay {
                    return Vec::new();
                }
                self.state.is_in_start_delay = false;
                vec![Effect::Signal(AssistantSignal::StartListening)]
            }
            Timer::ConfirmTimeout { window } => {
                if window != self.confirm_window {
                    tracing::debug!("Stale confirm timeout for window {} ignored", window);
                } else if self.state.is_waiting_confirm {
                    self.state.press_count = 0;
                    self.state.is_waiting_confirm = false;
                    tracing::info!("Confirm window expired, cycle abandoned");
                }
                Vec::new()
            }
        }
    }
}

impl Default for KeyTimingStateMachine {
    fn default() -> Self {
        Self::new(KEYCODE_VOLUME_DOWN, KeyTimings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: u32 = KEYCODE_VOLUME_DOWN;

    fn down(sm: &mut KeyTimingStateMachine, t: u64) -> Transition {
        sm.handle_event(&KeyEvent::down(KEY, t))
    }

    fn up(sm: &mut KeyTimingStateMachine, t: u64) -> Transition {
        sm.handle_event(&KeyEvent::up(KEY, t))
    }

    #[test]
    fn test_initial_state_is_idle() {
        let sm = KeyTimingStateMachine::default();
        assert_eq!(sm.phase(), KeyPhase::Idle);
        assert_eq!(sm.state(), &TimingState::default());
    }

    #[test]
    fn test_other_keys_pass_through_untouched() {
        let mut sm = KeyTimingStateMachine::default();
        let result = sm.handle_event(&KeyEvent::down(24, 0));
        assert_eq!(result.disposition, KeyDisposition::PassThrough);
        assert!(result.effects.is_empty());
        assert_eq!(sm.state(), &TimingState::default());
    }

    #[test]
    fn test_down_schedules_long_press() {
        let mut sm = KeyTimingStateMachine::default();
        let result = down(&mut sm, 0);
        assert!(result.disposition.is_consumed());
        assert_eq!(
            result.effects,
            vec![Effect::Schedule {
                timer: Timer::LongPress,
                delay_ms: LONG_PRESS_MS
            }]
        );
        assert_eq!(sm.phase(), KeyPhase::Pressing);
    }

    #[test]
    fn test_plain_tap_lowers_volume_and_bans() {
        let mut sm = KeyTimingStateMachine::default();
        assert!(down(&mut sm, 0).disposition.is_consumed());
        let result = up(&mut sm, 300);

        assert!(result.disposition.is_consumed());
        assert_eq!(result.effects, vec![Effect::LowerVolume]);
        assert_eq!(sm.phase(), KeyPhase::Banned);

        // The long-press timer fires after release and must do nothing
        assert!(sm.on_timer(Timer::LongPress, true).is_empty());
    }

    #[test]
    fn test_ban_window() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 300);

        let result = down(&mut sm, 1000);
        assert_eq!(result.disposition, KeyDisposition::PassThrough);
        assert_eq!(sm.phase(), KeyPhase::Banned);
        assert_eq!(up(&mut sm, 1100).disposition, KeyDisposition::PassThrough);

        // 2500 - 1100 < 2000: still banned, measured from the latest release
        assert_eq!(down(&mut sm, 2500).disposition, KeyDisposition::PassThrough);
        up(&mut sm, 2550);

        let result = down(&mut sm, 4600);
        assert!(result.disposition.is_consumed());
        assert_eq!(sm.phase(), KeyPhase::Pressing);
        assert!(!sm.state().is_banned);
    }

    #[test]
    fn test_ban_lifted_after_window_without_intermediate_presses() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 300);

        assert_eq!(down(&mut sm, 1000).disposition, KeyDisposition::PassThrough);
        assert!(sm.state().is_banned);

        // No release since 300, so 2500 is outside the window
        let result = down(&mut sm, 2500);
        assert!(result.disposition.is_consumed());
        assert!(!sm.state().is_banned);
        assert_eq!(sm.phase(), KeyPhase::Pressing);
    }

    #[test]
    fn test_long_press_with_companion_active_starts_listening() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        let effects = sm.on_timer(Timer::LongPress, true);
        assert_eq!(
            effects,
            vec![
                Effect::Signal(AssistantSignal::StartListening),
                Effect::Vibrate {
                    duration_ms: HAPTIC_MS
                },
            ]
        );
        assert!(!sm.state().is_in_start_delay);
    }

    #[test]
    fn test_long_press_launches_companion_first() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        let effects = sm.on_timer(Timer::LongPress, false);
        assert_eq!(
            effects,
            vec![
                Effect::LaunchCompanion,
                Effect::Schedule {
                    timer: Timer::StartDelay,
                    delay_ms: START_DELAY_MS
                },
                Effect::Vibrate {
                    duration_ms: HAPTIC_MS
                },
            ]
        );
        assert!(sm.state().is_in_start_delay);
        assert_eq!(
            sm.on_timer(Timer::StartDelay, false),
            vec![Effect::Signal(AssistantSignal::StartListening)]
        );
    }

    #[test]
    fn test_release_during_start_delay_cancels_start() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        sm.on_timer(Timer::LongPress, false);
        up(&mut sm, 700);
        assert!(sm.on_timer(Timer::StartDelay, false).is_empty());
    }

    #[test]
    fn test_long_press_then_timely_confirm_sends() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        sm.on_timer(Timer::LongPress, true);

        let result = up(&mut sm, 600);
        assert!(result.disposition.is_consumed());
        assert_eq!(
            result.effects,
            vec![
                Effect::Signal(AssistantSignal::StopListening),
                Effect::Schedule {
                    timer: Timer::ConfirmTimeout { window: 1 },
                    delay_ms: MAX_CONFIRM_MS
                },
            ]
        );
        assert_eq!(sm.phase(), KeyPhase::AwaitingConfirm);

        let result = down(&mut sm, 900);
        assert!(result.disposition.is_consumed());
        assert_eq!(
            result.effects,
            vec![Effect::Signal(AssistantSignal::Send)]
        );

        let result = up(&mut sm, 950);
        assert!(result.disposition.is_consumed());
        assert!(result.effects.is_empty());
        assert_eq!(sm.phase(), KeyPhase::Idle);

        // The confirm timeout fires later and finds nothing to abandon
        assert!(sm
            .on_timer(Timer::ConfirmTimeout { window: 1 }, true)
            .is_empty());
        assert_eq!(sm.phase(), KeyPhase::Idle);
    }

    #[test]
    fn test_long_press_then_late_confirm_passes_through() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 600);

        let result = down(&mut sm, 4000);
        assert_eq!(result.disposition, KeyDisposition::PassThrough);
        assert!(result.effects.is_empty());
        assert_eq!(sm.phase(), KeyPhase::Idle);

        let result = up(&mut sm, 4100);
        assert_eq!(result.disposition, KeyDisposition::PassThrough);
        assert_eq!(sm.phase(), KeyPhase::Idle);
        assert!(!sm.state().is_banned);
    }

    #[test]
    fn test_confirm_timeout_abandons_cycle() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 600);
        assert_eq!(sm.phase(), KeyPhase::AwaitingConfirm);

        sm.on_timer(Timer::ConfirmTimeout { window: 1 }, true);
        assert_eq!(sm.phase(), KeyPhase::Idle);

        // A fresh press now starts a new cycle
        let result = down(&mut sm, 4000);
        assert!(result.disposition.is_consumed());
        assert_eq!(sm.phase(), KeyPhase::Pressing);
    }

    #[test]
    fn test_earlier_confirm_timeout_leaves_later_window_open() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 600);
        down(&mut sm, 900);
        up(&mut sm, 950);

        down(&mut sm, 1000);
        let result = up(&mut sm, 2000);
        assert!(result.effects.contains(&Effect::Schedule {
            timer: Timer::ConfirmTimeout { window: 2 },
            delay_ms: MAX_CONFIRM_MS
        }));

        // First cycle's timeout comes due at 3600, inside the second window
        sm.on_timer(Timer::ConfirmTimeout { window: 1 }, true);
        assert_eq!(sm.phase(), KeyPhase::AwaitingConfirm);

        let result = down(&mut sm, 4000);
        assert_eq!(result.effects, vec![Effect::Signal(AssistantSignal::Send)]);

        sm.on_timer(Timer::ConfirmTimeout { window: 2 }, true);
        assert!(up(&mut sm, 4050).disposition.is_consumed());
        assert_eq!(sm.phase(), KeyPhase::Idle);
    }

    #[test]
    fn test_confirm_window_numbering_survives_reset() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 600);
        sm.reset();

        down(&mut sm, 1000);
        up(&mut sm, 1600);
        sm.on_timer(Timer::ConfirmTimeout { window: 1 }, true);
        assert_eq!(sm.phase(), KeyPhase::AwaitingConfirm);
    }

    #[test]
    fn test_exact_threshold_counts_as_long_press() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 1000);
        let result = up(&mut sm, 1500);
        assert!(result
            .effects
            .contains(&Effect::Signal(AssistantSignal::StopListening)));
    }

    #[test]
    fn test_custom_timings() {
        let timings = KeyTimings {
            long_press_ms: 200,
            ..Default::default()
        };
        let mut sm = KeyTimingStateMachine::new(KEY, timings);
        down(&mut sm, 0);
        let result = up(&mut sm, 250);
        assert_eq!(sm.phase(), KeyPhase::AwaitingConfirm);
        assert!(result.disposition.is_consumed());
    }

    #[test]
    fn test_stray_release_passes_through() {
        let mut sm = KeyTimingStateMachine::default();
        let result = up(&mut sm, 100);
        assert_eq!(result.disposition, KeyDisposition::PassThrough);
        assert_eq!(sm.phase(), KeyPhase::Idle);
    }

    #[test]
    fn test_reset() {
        let mut sm = KeyTimingStateMachine::default();
        down(&mut sm, 0);
        up(&mut sm, 600);
        sm.reset();
        assert_eq!(sm.state(), &TimingState::default());
    }

    #[test]
    fn test_phase_descriptions() {
        assert_eq!(KeyPhase::Idle.description(), "Waiting for key press");
        assert_eq!(
            KeyPhase::AwaitingConfirm.description(),
            "Waiting for confirming tap"
        );
    }
}
