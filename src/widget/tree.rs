//! Compacted widget tree handed to the agent
//!
//! A [`CompactNode`] tree is built fresh for every snapshot by
//! [`TreeCompactor`](super::TreeCompactor) and is not mutated afterwards. Nodes
//! carrying an operate id keep the host handle they were built from so the
//! agent can act on them later.

use super::node::{NodeAction, OperationKind, UiNode};
use serde_json::{Map, Value};

/// One node of the agent-facing widget tree
#[derive(Debug, Clone)]
pub struct CompactNode<N> {
    /// Short class name (last path segment)
    pub class_name: Option<String>,
    pub text: Option<String>,
    pub description: Option<String>,
    /// Capabilities exposed to the agent, in canonical order
    pub operations: Vec<OperationKind>,
    /// Present iff `operations` is non-empty
    pub operate_id: Option<u32>,
    pub children: Vec<CompactNode<N>>,
    pub(crate) has_operable_child: bool,
    pub(crate) handle: Option<N>,
}

impl<N> Default for CompactNode<N> {
    fn default() -> Self {
        Self {
            class_name: None,
            text: None,
            description: None,
            operations: Vec::new(),
            operate_id: None,
            children: Vec::new(),
            has_operable_child: false,
            handle: None,
        }
    }
}

impl<N> CompactNode<N> {
    /// True when the node carries no text, description or operations
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.description.is_none() && self.operations.is_empty()
    }

    /// True when the node or one of its descendants can be acted on
    pub fn is_operable(&self) -> bool {
        !self.operations.is_empty() || self.has_operable_child
    }

    /// Host handle this node was built from
    pub fn handle(&self) -> Option<&N> {
        self.handle.as_ref()
    }

    /// Depth-first search for the node addressed by `operate_id`
    pub fn find(&self, operate_id: u32) -> Option<&CompactNode<N>> {
        if self.operate_id == Some(operate_id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(operate_id))
    }

    /// Every operate id in the tree, in depth-first order
    pub fn operate_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<u32>) {
        ids.extend(self.operate_id);
        for child in &self.children {
            child.collect_ids(ids);
        }
    }

    /// Snapshot record for the agent
    ///
    /// Absent fields are omitted rather than emitted as null. Keys appear in a
    /// fixed order: `class`, `text`, `description`, `actions`, `id`, `children`.
    pub fn to_json(&self) -> Value {
        let mut record = Map::new();
        if let Some(ref class_name) = self.class_name {
            record.insert("class".into(), Value::from(class_name.as_str()));
        }
        if let Some(ref text) = self.text {
            record.insert("text".into(), Value::from(text.as_str()));
        }
        if let Some(ref description) = self.description {
            record.insert("description".into(), Value::from(description.as_str()));
        }
        if !self.operations.is_empty() {
            let actions = self
                .operations
                .iter()
                .map(|op| Value::from(op.as_str()))
                .collect();
            record.insert("actions".into(), Value::Array(actions));
        }
        if let Some(id) = self.operate_id {
            record.insert("id".into(), Value::from(id));
        }
        if !self.children.is_empty() {
            let children = self.children.iter().map(CompactNode::to_json).collect();
            record.insert("children".into(), Value::Array(children));
        }
        Value::Object(record)
    }
}

impl<N: UiNode> CompactNode<N> {
    /// Execute `action` on the node addressed by `operate_id`
    ///
    /// `action` is one of the lower-cased operation names. Returns false when
    /// the action name is unknown, an edit has no input text, no node carries
    /// the id, or the host refuses the action (e.g. the handle went stale).
    pub fn dispatch_action(&self, operate_id: u32, action: &str, input_text: Option<&str>) -> bool {
        let Ok(kind) = action.parse::<OperationKind>() else {
            tracing::debug!("Unknown widget action: {:?}", action);
            return false;
        };
        let Some(node_action) = kind.to_node_action(input_text) else {
            tracing::debug!("Edit requested on {} without input text", operate_id);
            return false;
        };

        let accepted = self.dispatch(operate_id, &node_action);
        tracing::debug!(
            "Widget action {} on {}: {}",
            kind,
            operate_id,
            if accepted { "accepted" } else { "rejected" }
        );
        accepted
    }

    fn dispatch(&self, operate_id: u32, action: &NodeAction) -> bool {
        if self.operate_id == Some(operate_id) {
            return match self.handle {
                Some(ref handle) => handle.perform_action(action),
                None => false,
            };
        }
        self.children
            .iter()
            .any(|child| child.dispatch(operate_id, action))
    }
}
