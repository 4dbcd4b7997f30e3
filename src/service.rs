//! Assistant bridge service
//!
//! One explicitly constructed object per host service instance. It answers
//! the agent's snapshot and action queries against the active window and
//! feeds host key events to the volume-key dispatcher.

use crate::config::Config;
use crate::host::{KeyCollaborators, ScreenSource};
use crate::volume_key::{KeyDisposition, KeyDispatcher, KeyEvent, KeyPhase, Scheduler};
use crate::widget::{CompactNode, TreeCompactor, UiNode};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, readable view of whether the service is attached to the host
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlag(Arc<AtomicBool>);

impl ConnectionFlag {
    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, connected: bool) -> bool {
        self.0.swap(connected, Ordering::SeqCst)
    }
}

/// Host-facing service combining widget snapshots and the volume-key trigger
pub struct AssistantService<S: ScreenSource> {
    screen: S,
    compactor: Mutex<TreeCompactor>,
    /// Tree from the latest snapshot; actions address this tree
    last_snapshot: Mutex<Option<CompactNode<S::Node>>>,
    keys: KeyDispatcher,
    connection: ConnectionFlag,
}

impl<S: ScreenSource> AssistantService<S> {
    pub fn new(
        screen: S,
        collaborators: KeyCollaborators,
        scheduler: Arc<dyn Scheduler>,
        config: &Config,
    ) -> Self {
        let keys = KeyDispatcher::new(
            config.key_timing.keycode,
            config.key_timing.timings(),
            collaborators,
            scheduler,
        );
        let compactor = TreeCompactor::new(config.snapshot.operate_ids, config.snapshot.id_space);

        Self {
            screen,
            compactor: Mutex::new(compactor),
            last_snapshot: Mutex::new(None),
            keys,
            connection: ConnectionFlag::default(),
        }
    }

    /// Host attached the service
    pub fn connect(&self) {
        if !self.connection.set(true) {
            tracing::info!("Assistant service connected");
        }
    }

    /// Host is tearing the service down
    pub fn disconnect(&self) {
        if self.connection.set(false) {
            tracing::info!("Assistant service disconnected");
        }
        self.keys.reset();
        *self.last_snapshot.lock() = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Handle that outside callers can poll before issuing requests
    pub fn connection_flag(&self) -> ConnectionFlag {
        self.connection.clone()
    }

    /// Compact the active window and return its snapshot record
    ///
    /// Returns `None` when no window is available. The compacted tree is kept
    /// so later [`perform_action`](Self::perform_action) calls can address it.
    pub fn widget_snapshot(&self) -> Option<Value> {
        let Some(root) = self.screen.active_root() else {
            tracing::debug!("Widget snapshot requested with no active window");
            return None;
        };

        let tree = self.compactor.lock().compact(Some(root))?;
        let record = tree.to_json();
        tracing::debug!(
            "Widget snapshot taken ({} operable nodes)",
            tree.operate_ids().len()
        );

        *self.last_snapshot.lock() = Some(tree);
        Some(record)
    }

    /// Package name of the active window, or an empty string
    pub fn current_package_name(&self) -> String {
        self.screen
            .active_root()
            .and_then(|root| root.package_name())
            .unwrap_or_default()
    }

    /// Act on a node of the latest snapshot
    ///
    /// Returns false when there is no snapshot yet or the action fails (see
    /// [`CompactNode::dispatch_action`]).
    pub fn perform_action(&self, operate_id: u32, action: &str, input_text: Option<&str>) -> bool {
        let snapshot = self.last_snapshot.lock();
        match snapshot.as_ref() {
            Some(tree) => tree.dispatch_action(operate_id, action, input_text),
            None => {
                tracing::warn!(
                    "Action {} on {} requested before any snapshot",
                    action,
                    operate_id
                );
                false
            }
        }
    }

    /// Entry point for every key event the host delivers
    pub fn on_key_event(&self, event: &KeyEvent) -> KeyDisposition {
        self.keys.handle_key_event(event)
    }

    pub fn key_phase(&self) -> KeyPhase {
        self.keys.phase()
    }
}
