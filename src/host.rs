//! Host collaborators
//!
//! Everything the core needs from the operating system is injected through
//! these traits: the live UI hierarchy, the volume UI, the vibrator, the
//! companion assistant screen, and the channel that carries key-triggered
//! signals to whoever orchestrates the agent.

use crate::widget::UiNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Payload-less notification emitted by the volume-key state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssistantSignal {
    /// Long press recognised: begin speech capture
    StartListening,
    /// Long press released: end speech capture
    StopListening,
    /// Confirming tap: submit the captured request
    Send,
}

impl AssistantSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantSignal::StartListening => "start-listening",
            AssistantSignal::StopListening => "stop-listening",
            AssistantSignal::Send => "send",
        }
    }
}

impl fmt::Display for AssistantSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to the UI hierarchy of the active window
pub trait ScreenSource {
    type Node: UiNode;

    /// Root element of the active window, if there is one
    fn active_root(&self) -> Option<Self::Node>;
}

/// System volume control
pub trait VolumeControl: Send + Sync {
    /// Lower the media volume one step and show the system volume UI
    fn lower_volume(&self);
}

/// Device vibration
pub trait Haptics: Send + Sync {
    fn vibrate(&self, duration: Duration);
}

/// The assistant's own foreground screen
pub trait CompanionApp: Send + Sync {
    /// Whether the assistant screen is alive and in the foreground
    fn is_active(&self) -> bool;

    /// Bring the assistant screen up
    fn launch(&self);
}

/// Delivery of [`AssistantSignal`]s to listeners
pub trait SignalSink: Send + Sync {
    fn send_signal(&self, signal: AssistantSignal);
}

/// Collaborators driven by the volume-key dispatcher
#[derive(Clone)]
pub struct KeyCollaborators {
    pub volume: Arc<dyn VolumeControl>,
    pub haptics: Arc<dyn Haptics>,
    pub companion: Arc<dyn CompanionApp>,
    pub signals: Arc<dyn SignalSink>,
}
