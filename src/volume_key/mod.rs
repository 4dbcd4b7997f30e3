//! Volume-key voice trigger
//!
//! Turns the press timing of a single hardware key (volume down by default)
//! into assistant commands while leaving ordinary volume presses working.
//!
//! ## Gestures
//!
//! - **tap** (released before the long-press threshold): lowers the volume and
//!   bans long-press handling for a grace window so repeated taps keep
//!   adjusting volume
//! - **long press**: starts listening once the threshold passes (launching the
//!   companion screen first when needed); releasing it stops listening
//! - **tap within the confirm window after a long press**: sends
//!
//! ## States
//!
//! ```text
//!            down                  held ≥ threshold, up
//! ┌──────┐ ───────► ┌──────────┐ ──────────────────────► ┌──────────────────┐
//! │ IDLE │          │ PRESSING │                          │ AWAITING_CONFIRM │
//! └──────┘ ◄─┐      └──────────┘                          └──────────────────┘
//!    ▲       │           │ up before threshold                │        │
//!    │       │           ▼                                    │        │
//!    │       │      ┌────────┐                                │        │
//!    │       └──────│ BANNED │   down after window             │        │
//!    │              └────────┘                                │        │
//!    │          timely down (send) + up / timeout / late down │        │
//!    └────────────────────────────────────────────────────────┴────────┘
//! ```
//!
//! ## Signals
//!
//! - `start-listening` - long press recognised
//! - `stop-listening` - long press released
//! - `send` - confirming tap

pub mod dispatcher;
pub mod state;

pub use dispatcher::{KeyDispatcher, ScheduledTask, Scheduler, TokioScheduler};
pub use state::{
    Effect, KeyAction, KeyDisposition, KeyEvent, KeyPhase, KeyTimingStateMachine, KeyTimings,
    Timer, TimingState, Transition, BAN_CANCEL_MS, HAPTIC_MS, KEYCODE_VOLUME_DOWN, LONG_PRESS_MS,
    MAX_CONFIRM_MS, START_DELAY_MS,
};
