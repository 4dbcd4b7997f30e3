//! Raw accessibility tree → compact agent tree
//!
//! Compaction walks the host hierarchy post-order. Each compacted child falls
//! into one of three buckets:
//!
//! - **empty** (no text, description or operations): dropped, its own children
//!   are spliced into the parent and its operability propagates upward
//! - **operable** (operations on itself or a descendant): kept as a child
//! - **informative** (text or description only): folded into one merged text
//!   node shared by all such siblings
//!
//! A node left without any operable child absorbs the merged text into its
//! own fields and drops its children, so presentation chrome collapses into
//! the surrounding text and only real controls (or groups of them) branch.

use super::node::{OperationKind, UiNode};
use super::tree::CompactNode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default size of the random operate id space
pub const DEFAULT_ID_SPACE: u32 = 1_000_000;

/// How operate ids are drawn for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperateIdStrategy {
    /// Uniform draw from `0..id_space`; collisions are possible but unlikely
    #[default]
    Random,
    /// 1, 2, 3, ... restarting with every snapshot; always unique
    Sequential,
}

/// Source of operate ids for one compactor
#[derive(Debug)]
enum OperateIdAllocator {
    Random { rng: StdRng, space: u32 },
    Sequential { next: u32 },
}

impl OperateIdAllocator {
    fn next_id(&mut self) -> u32 {
        match self {
            OperateIdAllocator::Random { rng, space } => rng.gen_range(0..*space),
            OperateIdAllocator::Sequential { next } => {
                *next += 1;
                *next
            }
        }
    }

    fn restart(&mut self) {
        if let OperateIdAllocator::Sequential { next } = self {
            *next = 0;
        }
    }
}

/// Merged text of a node's informative-but-inoperable children
#[derive(Debug, Default)]
struct MergedText {
    text: Option<String>,
    description: Option<String>,
}

impl MergedText {
    fn absorb<N>(&mut self, child: CompactNode<N>) {
        if let Some(description) = child.description {
            append_line(&mut self.description, &description);
        }
        if let Some(text) = child.text {
            append_line(&mut self.text, &text);
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_none() && self.description.is_none()
    }

    fn to_node<N>(&self) -> CompactNode<N> {
        CompactNode {
            text: self.text.clone(),
            description: self.description.clone(),
            ..Default::default()
        }
    }
}

/// Builds [`CompactNode`] trees from host element handles
#[derive(Debug)]
pub struct TreeCompactor {
    ids: OperateIdAllocator,
}

impl TreeCompactor {
    /// Compactor drawing operate ids with `strategy`
    ///
    /// `id_space` bounds random ids; a zero space falls back to the default.
    pub fn new(strategy: OperateIdStrategy, id_space: u32) -> Self {
        let ids = match strategy {
            OperateIdStrategy::Random => OperateIdAllocator::Random {
                rng: StdRng::from_entropy(),
                space: id_space_or_default(id_space),
            },
            OperateIdStrategy::Sequential => OperateIdAllocator::Sequential { next: 0 },
        };
        Self { ids }
    }

    /// Random-id compactor with a fixed seed, for reproducible snapshots
    ///
    /// A zero `id_space` falls back to the default, as in [`Self::new`].
    pub fn with_seed(seed: u64, id_space: u32) -> Self {
        Self {
            ids: OperateIdAllocator::Random {
                rng: StdRng::seed_from_u64(seed),
                space: id_space_or_default(id_space),
            },
        }
    }

    /// Compact the tree rooted at `root`
    ///
    /// Returns `None` only when there is no root.
    pub fn compact<N: UiNode>(&mut self, root: Option<N>) -> Option<CompactNode<N>> {
        let root = root?;
        self.ids.restart();
        Some(self.compact_node(root))
    }

    fn compact_node<N: UiNode>(&mut self, raw: N) -> CompactNode<N> {
        let mut node = CompactNode::default();
        let mut merged = MergedText::default();

        for index in 0..raw.child_count() {
            let Some(raw_child) = raw.child(index) else {
                continue;
            };
            let child = self.compact_node(raw_child);

            if child.is_empty() {
                node.has_operable_child |= child.has_operable_child;
                node.children.extend(child.children);
            } else if child.is_operable() {
                node.has_operable_child = true;
                node.children.push(child);
            } else {
                merged.absorb(child);
            }
        }

        if !merged.is_empty() {
            node.children.push(merged.to_node());
        }

        if let Some(class_name) = non_empty(raw.class_name()) {
            node.class_name = Some(short_class_name(&class_name).to_string());
        }
        if let Some(description) = non_empty(raw.content_description()) {
            node.description = Some(description);
        }
        if let Some(text) = non_empty(raw.text()) {
            node.text = Some(text);
        }

        node.operations = OperationKind::supported_by(&raw);
        if !node.operations.is_empty() {
            node.operate_id = Some(self.ids.next_id());
        }
        node.handle = Some(raw);

        if !node.has_operable_child && !node.children.is_empty() {
            if let Some(description) = merged.description {
                node.description = Some(join_lines(node.description.take(), &description));
            }
            if let Some(text) = merged.text {
                node.text = Some(join_lines(node.text.take(), &text));
            }
            node.children.clear();
        }

        node
    }
}

impl Default for TreeCompactor {
    fn default() -> Self {
        Self::new(OperateIdStrategy::default(), DEFAULT_ID_SPACE)
    }
}

/// Last segment of a dotted class name
pub fn short_class_name(class_name: &str) -> &str {
    class_name.rsplit('.').next().unwrap_or(class_name)
}

fn id_space_or_default(id_space: u32) -> u32 {
    if id_space == 0 {
        DEFAULT_ID_SPACE
    } else {
        id_space
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn append_line(target: &mut Option<String>, line: &str) {
    let buffer = target.get_or_insert_with(String::new);
    buffer.push_str(line);
    buffer.push('\n');
}

/// Own value first, then the merged children's text on a new line
fn join_lines(own: Option<String>, merged: &str) -> String {
    let mut joined = own.unwrap_or_default();
    joined.push('\n');
    joined.push_str(merged);
    joined
}
