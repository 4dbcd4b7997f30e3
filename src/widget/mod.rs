//! Agent-facing view of the on-screen UI
//!
//! The host hands over its raw accessibility hierarchy as [`UiNode`] handles.
//! [`TreeCompactor`] reduces that hierarchy to a [`CompactNode`] tree where
//! every interactive element carries an operate id, and the agent later acts
//! on an element by passing that id back to [`CompactNode::dispatch_action`].
//!
//! ## Snapshot format
//!
//! ```text
//! {
//!   "class": "FrameLayout",
//!   "children": [
//!     { "class": "Button", "text": "Send", "actions": ["click"], "id": 482913 },
//!     { "text": "Inbox\nNo new messages\n" }
//!   ]
//! }
//! ```
//!
//! Fields that are absent are omitted. Ids are only valid against the
//! snapshot that produced them.

pub mod compactor;
pub mod node;
pub mod tree;

pub use compactor::{short_class_name, OperateIdStrategy, TreeCompactor, DEFAULT_ID_SPACE};
pub use node::{NodeAction, OperationKind, UiNode};
pub use tree::CompactNode;
