//! Assistant bridge - screen and volume-key access for a voice assistant agent
//!
//! Two independent pieces run inside the host's long-lived accessibility
//! service:
//!
//! - [`widget`] compacts the live UI hierarchy into a small tree the agent can
//!   read, and executes the agent's actions against it by operate id
//! - [`volume_key`] interprets press timing of the volume-down key as
//!   start-listening / stop-listening / send commands
//!
//! [`service::AssistantService`] wires both to the host collaborators in
//! [`host`].

pub mod config;
pub mod host;
pub mod logging;
pub mod service;
pub mod volume_key;
pub mod widget;

pub use host::{
    AssistantSignal, CompanionApp, Haptics, KeyCollaborators, ScreenSource, SignalSink,
    VolumeControl,
};
pub use service::{AssistantService, ConnectionFlag};
pub use volume_key::{KeyAction, KeyDisposition, KeyEvent, KeyPhase};
pub use widget::{CompactNode, NodeAction, OperationKind, TreeCompactor, UiNode};
