//! Shared fakes for integration tests: an in-memory UI hierarchy, a
//! recording host and a virtual-time scheduler.

#![allow(dead_code)]

use assistant_bridge::config::Config;
use assistant_bridge::volume_key::{ScheduledTask, Scheduler};
use assistant_bridge::{
    AssistantService, AssistantSignal, CompanionApp, Haptics, KeyCollaborators, NodeAction,
    ScreenSource, SignalSink, UiNode, VolumeControl,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Fake UI hierarchy
// =============================================================================

#[derive(Default)]
struct NodeData {
    class_name: Option<String>,
    text: Option<String>,
    description: Option<String>,
    package: Option<String>,
    clickable: bool,
    long_clickable: bool,
    editable: bool,
    scrollable: bool,
    stale: bool,
    children: Vec<Option<FakeNode>>,
    performed: Mutex<Vec<NodeAction>>,
}

/// In-memory UI element recording every action performed on it
#[derive(Clone)]
pub struct FakeNode(Arc<NodeData>);

pub struct NodeBuilder(NodeData);

/// Start building an element of the given class
pub fn node(class_name: &str) -> NodeBuilder {
    NodeBuilder(NodeData {
        class_name: Some(class_name.to_string()),
        ..Default::default()
    })
}

impl NodeBuilder {
    pub fn text(mut self, text: &str) -> Self {
        self.0.text = Some(text.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.0.description = Some(description.to_string());
        self
    }

    pub fn package(mut self, package: &str) -> Self {
        self.0.package = Some(package.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.0.clickable = true;
        self
    }

    pub fn long_clickable(mut self) -> Self {
        self.0.long_clickable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.0.editable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.0.scrollable = true;
        self
    }

    /// Host refuses every action on this element
    pub fn stale(mut self) -> Self {
        self.0.stale = true;
        self
    }

    pub fn child(mut self, child: FakeNode) -> Self {
        self.0.children.push(Some(child));
        self
    }

    /// A child slot the host cannot resolve
    pub fn unresolvable_child(mut self) -> Self {
        self.0.children.push(None);
        self
    }

    pub fn build(self) -> FakeNode {
        FakeNode(Arc::new(self.0))
    }
}

impl FakeNode {
    pub fn performed(&self) -> Vec<NodeAction> {
        self.0.performed.lock().clone()
    }

    /// Number of actions performed anywhere in this subtree
    pub fn total_performed(&self) -> usize {
        self.0.performed.lock().len()
            + self
                .0
                .children
                .iter()
                .flatten()
                .map(FakeNode::total_performed)
                .sum::<usize>()
    }
}

impl UiNode for FakeNode {
    fn class_name(&self) -> Option<String> {
        self.0.class_name.clone()
    }

    fn text(&self) -> Option<String> {
        self.0.text.clone()
    }

    fn content_description(&self) -> Option<String> {
        self.0.description.clone()
    }

    fn package_name(&self) -> Option<String> {
        self.0.package.clone()
    }

    fn child_count(&self) -> usize {
        self.0.children.len()
    }

    fn child(&self, index: usize) -> Option<Self> {
        self.0.children.get(index).cloned().flatten()
    }

    fn is_clickable(&self) -> bool {
        self.0.clickable
    }

    fn is_long_clickable(&self) -> bool {
        self.0.long_clickable
    }

    fn is_editable(&self) -> bool {
        self.0.editable
    }

    fn is_scrollable(&self) -> bool {
        self.0.scrollable
    }

    fn perform_action(&self, action: &NodeAction) -> bool {
        self.0.performed.lock().push(action.clone());
        !self.0.stale
    }
}

/// Active window whose root can be swapped by the test
#[derive(Clone, Default)]
pub struct FakeScreen(Arc<Mutex<Option<FakeNode>>>);

impl FakeScreen {
    pub fn show(&self, root: FakeNode) {
        *self.0.lock() = Some(root);
    }

    pub fn clear(&self) {
        *self.0.lock() = None;
    }
}

impl ScreenSource for FakeScreen {
    type Node = FakeNode;

    fn active_root(&self) -> Option<FakeNode> {
        self.0.lock().clone()
    }
}

// =============================================================================
// Recording host
// =============================================================================

/// Records every collaborator call as a short string
#[derive(Default)]
pub struct RecordingHost {
    log: Mutex<Vec<String>>,
    companion_active: AtomicBool,
}

impl RecordingHost {
    pub fn with_companion_active(active: bool) -> Arc<Self> {
        let host = Self::default();
        host.companion_active.store(active, Ordering::SeqCst);
        Arc::new(host)
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn signals(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| matches!(e.as_str(), "start-listening" | "stop-listening" | "send"))
            .collect()
    }

    pub fn collaborators(self: &Arc<Self>) -> KeyCollaborators {
        KeyCollaborators {
            volume: self.clone(),
            haptics: self.clone(),
            companion: self.clone(),
            signals: self.clone(),
        }
    }

    fn push(&self, entry: impl Into<String>) {
        self.log.lock().push(entry.into());
    }
}

impl VolumeControl for RecordingHost {
    fn lower_volume(&self) {
        self.push("volume-lower");
    }
}

impl Haptics for RecordingHost {
    fn vibrate(&self, duration: Duration) {
        self.push(format!("vibrate-{}", duration.as_millis()));
    }
}

impl CompanionApp for RecordingHost {
    fn is_active(&self) -> bool {
        self.companion_active.load(Ordering::SeqCst)
    }

    fn launch(&self) {
        self.push("launch");
        self.companion_active.store(true, Ordering::SeqCst);
    }
}

impl SignalSink for RecordingHost {
    fn send_signal(&self, signal: AssistantSignal) {
        self.push(signal.as_str());
    }
}

// =============================================================================
// Virtual-time scheduler
// =============================================================================

struct Pending {
    due: u64,
    seq: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct Clock {
    now: u64,
    seq: u64,
    pending: Vec<Pending>,
}

/// Scheduler driven by the test: tasks run only when time is advanced
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<Clock>,
}

impl ManualScheduler {
    pub fn now(&self) -> u64 {
        self.clock.lock().now
    }

    pub fn pending(&self) -> usize {
        self.clock.lock().pending.len()
    }

    /// Run every task due at or before `t`, in due order, then set the clock
    pub fn advance_to(&self, t: u64) {
        loop {
            let next = {
                let mut clock = self.clock.lock();
                let index = clock
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= t)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                index.map(|i| {
                    let pending = clock.pending.remove(i);
                    clock.now = pending.due;
                    pending.task
                })
            };
            match next {
                Some(task) => task(),
                None => break,
            }
        }
        let mut clock = self.clock.lock();
        clock.now = clock.now.max(t);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        let mut clock = self.clock.lock();
        clock.seq += 1;
        let pending = Pending {
            due: clock.now + delay.as_millis() as u64,
            seq: clock.seq,
            task,
        };
        clock.pending.push(pending);
    }
}

// =============================================================================
// Service harness
// =============================================================================

pub struct Harness {
    pub service: AssistantService<FakeScreen>,
    pub screen: FakeScreen,
    pub host: Arc<RecordingHost>,
    pub scheduler: Arc<ManualScheduler>,
}

pub fn harness_with(config: &Config, companion_active: bool) -> Harness {
    let screen = FakeScreen::default();
    let host = RecordingHost::with_companion_active(companion_active);
    let scheduler = Arc::new(ManualScheduler::default());
    let service = AssistantService::new(
        screen.clone(),
        host.collaborators(),
        scheduler.clone(),
        config,
    );
    Harness {
        service,
        screen,
        host,
        scheduler,
    }
}

pub fn harness() -> Harness {
    harness_with(&Config::default(), true)
}
