//! Host UI element handles and the operations an agent may perform on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action requested from the host against one live UI element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Click,
    LongClick,
    ScrollForward,
    ScrollBackward,
    /// Replace the editable value with the given text
    SetText(String),
}

/// Read-only handle to one element of the live on-screen hierarchy
///
/// Implemented by the host accessibility layer. Handles may go stale at any
/// time when the UI changes underneath them; implementations report that by
/// returning `None` from accessors and `false` from [`UiNode::perform_action`],
/// never by panicking.
pub trait UiNode: Sized {
    /// Fully qualified class name, e.g. `android.widget.Button`
    fn class_name(&self) -> Option<String>;

    fn text(&self) -> Option<String>;

    fn content_description(&self) -> Option<String>;

    /// Package of the application owning this element
    fn package_name(&self) -> Option<String> {
        None
    }

    fn child_count(&self) -> usize;

    /// Child at `index`, or `None` if the host could not resolve it
    fn child(&self, index: usize) -> Option<Self>;

    fn is_clickable(&self) -> bool;

    fn is_long_clickable(&self) -> bool;

    fn is_editable(&self) -> bool;

    fn is_scrollable(&self) -> bool;

    /// Ask the host to perform `action`; returns whether the host accepted it
    fn perform_action(&self, action: &NodeAction) -> bool;
}

/// Capability exposed to the agent on a compacted node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Click,
    LongClick,
    Edit,
    ScrollDown,
    ScrollUp,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Click,
        OperationKind::LongClick,
        OperationKind::Edit,
        OperationKind::ScrollDown,
        OperationKind::ScrollUp,
    ];

    /// Name used in snapshots and accepted by action dispatch
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Click => "click",
            OperationKind::LongClick => "long_click",
            OperationKind::Edit => "edit",
            OperationKind::ScrollDown => "scroll_down",
            OperationKind::ScrollUp => "scroll_up",
        }
    }

    /// Operations advertised by a host element, in canonical order
    ///
    /// Scrollable elements always get both scroll directions.
    pub fn supported_by<N: UiNode>(node: &N) -> Vec<OperationKind> {
        let mut operations = Vec::new();
        if node.is_clickable() {
            operations.push(OperationKind::Click);
        }
        if node.is_long_clickable() {
            operations.push(OperationKind::LongClick);
        }
        if node.is_editable() {
            operations.push(OperationKind::Edit);
        }
        if node.is_scrollable() {
            operations.push(OperationKind::ScrollDown);
            operations.push(OperationKind::ScrollUp);
        }
        operations
    }

    /// Host action for this operation
    ///
    /// Edits need the replacement text; without it there is nothing to send.
    pub fn to_node_action(self, input_text: Option<&str>) -> Option<NodeAction> {
        match self {
            OperationKind::Click => Some(NodeAction::Click),
            OperationKind::LongClick => Some(NodeAction::LongClick),
            OperationKind::ScrollDown => Some(NodeAction::ScrollForward),
            OperationKind::ScrollUp => Some(NodeAction::ScrollBackward),
            OperationKind::Edit => input_text.map(|text| NodeAction::SetText(text.to_string())),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}
