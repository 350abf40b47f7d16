#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Search predicate injected into a collection.
///
/// The engine never interprets item payloads itself; every match decision goes
/// through this trait (e.g. substring match against a label and its synonyms).
pub trait Matcher<T> {
    /// Returns `true` if the item matches the (non-empty) query.
    fn is_match(&self, item: &T, query: &str) -> bool;
}

impl<T, F> Matcher<T> for F
where
    F: Fn(&T, &str) -> bool,
{
    #[inline]
    fn is_match(&self, item: &T, query: &str) -> bool {
        self(item, query)
    }
}

/// Matcher that never matches.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchNone;

impl<T> Matcher<T> for MatchNone {
    #[inline]
    fn is_match(&self, _item: &T, _query: &str) -> bool {
        false
    }
}

/// Minimal contract for an item stored in a preorder flat array.
///
/// The descendants of a node must directly follow it, and a node's direct
/// children are the descendants whose depth is exactly one greater.
pub trait TreeItem {
    /// Index of the parent in the backing array (`None` for roots).
    fn parent(&self) -> Option<usize>;
    /// Depth of the node (roots are `0`).
    fn depth(&self) -> usize;
}

/// Display name used for group labels.
pub trait NodeLabel {
    /// Returns the name shown for the node.
    fn label(&self) -> &str;
}

/// Payload that can stand in for a synthetic group placeholder.
pub trait GroupNode: NodeLabel {
    /// Creates a group placeholder carrying the generated label.
    fn group(label: String) -> Self;
    /// Returns `true` if this payload is a group placeholder.
    fn is_group(&self) -> bool;
}

impl NodeLabel for String {
    fn label(&self) -> &str {
        self
    }
}

/// Payload wrapper that adds group placeholders to any labelled item.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Grouped<T> {
    /// A real, caller-supplied item.
    Item(T),
    /// A synthetic group inserted by chunking.
    Group(String),
}

impl<T> Grouped<T> {
    /// Returns the wrapped item, or `None` for a group placeholder.
    pub const fn item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            Self::Group(_) => None,
        }
    }
}

impl<T: NodeLabel> NodeLabel for Grouped<T> {
    fn label(&self) -> &str {
        match self {
            Self::Item(item) => item.label(),
            Self::Group(label) => label,
        }
    }
}

impl<T: NodeLabel> GroupNode for Grouped<T> {
    fn group(label: String) -> Self {
        Self::Group(label)
    }

    fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// Ready-made tree item: a payload plus its position in the flat array.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode<T> {
    /// Caller payload.
    pub value: T,
    /// Parent index (`None` for roots).
    pub parent: Option<usize>,
    /// Depth (roots are `0`).
    pub depth: usize,
    /// Number of strict descendants.
    #[cfg_attr(feature = "serde", serde(default))]
    pub descendants: usize,
}

impl<T> TreeNode<T> {
    /// Creates a node; `descendants` starts at zero (see [`recount_descendants`]).
    pub const fn new(value: T, parent: Option<usize>, depth: usize) -> Self {
        Self {
            value,
            parent,
            depth,
            descendants: 0,
        }
    }

    /// Builds preorder nodes from payloads and a parallel parent vector.
    ///
    /// Parents must precede their children. A parent index that does not
    /// point backwards is treated as a root.
    pub fn from_parents(values: Vec<T>, parents: &[Option<usize>]) -> Vec<Self> {
        let mut nodes: Vec<Self> = Vec::with_capacity(values.len());
        for (idx, value) in values.into_iter().enumerate() {
            let parent = parents
                .get(idx)
                .copied()
                .flatten()
                .filter(|&parent| parent < idx);
            let depth = parent.map_or(0, |parent| nodes[parent].depth + 1);
            nodes.push(Self::new(value, parent, depth));
        }
        recount_descendants(&mut nodes);
        nodes
    }
}

impl<T> TreeItem for TreeNode<T> {
    #[inline]
    fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    fn depth(&self) -> usize {
        self.depth
    }
}

impl<T: NodeLabel> NodeLabel for TreeNode<T> {
    fn label(&self) -> &str {
        self.value.label()
    }
}

/// Re-derives every node's `descendants` from the depth sequence.
pub fn recount_descendants<T>(nodes: &mut [TreeNode<T>]) {
    // Stack of open ancestors; each is closed by the first node not deeper than it.
    let mut stack: Vec<usize> = Vec::new();
    for idx in 0..nodes.len() {
        let depth = nodes[idx].depth;
        while let Some(&top) = stack.last() {
            if nodes[top].depth < depth {
                break;
            }
            nodes[top].descendants = idx - top - 1;
            stack.pop();
        }
        stack.push(idx);
    }
    let len = nodes.len();
    for top in stack {
        nodes[top].descendants = len - top - 1;
    }
}
