//! Branch chunking: bounds the number of direct children per branch by
//! inserting synthetic group nodes into a preorder flat array.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{GroupNode, TreeNode, recount_descendants};

/// Default limit for both thresholds of [`ChunkConfig`].
pub const DEFAULT_CHUNK_SIZE: usize = 250;

/// Invalid chunking configuration.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChunkConfigError {
    /// Groups of fewer than two children never shrink a branch.
    #[error("chunk size {0} is too small, groups need room for at least 2 children")]
    ChunkSizeTooSmall(usize),
}

/// Thresholds that decide which branches are chunked.
///
/// A branch is chunked only if it has more than `min_descendants` descendants
/// and more than `max_children` direct children.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ChunkThresholds"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    max_children: usize,
    min_descendants: usize,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct ChunkThresholds {
    max_children: usize,
    min_descendants: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<ChunkThresholds> for ChunkConfig {
    type Error = ChunkConfigError;

    fn try_from(raw: ChunkThresholds) -> Result<Self, Self::Error> {
        Self::with_thresholds(raw.max_children, raw.min_descendants)
    }
}

impl ChunkConfig {
    /// Uses `chunk_size` for both thresholds.
    pub const fn new(chunk_size: usize) -> Result<Self, ChunkConfigError> {
        Self::with_thresholds(chunk_size, chunk_size)
    }

    pub const fn with_thresholds(
        max_children: usize,
        min_descendants: usize,
    ) -> Result<Self, ChunkConfigError> {
        if max_children < 2 {
            return Err(ChunkConfigError::ChunkSizeTooSmall(max_children));
        }
        Ok(Self {
            max_children,
            min_descendants,
        })
    }

    /// Maximum number of direct children a branch may keep.
    pub const fn max_children(&self) -> usize {
        self.max_children
    }

    /// Descendant count a branch must exceed before it is considered.
    pub const fn min_descendants(&self) -> usize {
        self.min_descendants
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_children: DEFAULT_CHUNK_SIZE,
            min_descendants: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Reusable chunker holding its configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct BranchChunker {
    config: ChunkConfig,
}

impl BranchChunker {
    pub const fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// See [`process_nodes`].
    pub fn process<T: GroupNode>(&self, nodes: Vec<TreeNode<T>>) -> Vec<TreeNode<T>> {
        process_nodes(nodes, &self.config)
    }
}

/// Rewrites a preorder flat array so that no oversized branch keeps more than
/// `max_children` direct children.
///
/// Oversized branches get their direct children split, in order, into runs of
/// at most `max_children`; each run is placed under a new group node. Depths,
/// parent indices and descendant counts are updated accordingly. Descendant
/// counts are re-derived from depths first, so the input's counts are ignored.
/// Must run before the nodes seed a collection, since it shifts indices.
pub fn process_nodes<T: GroupNode>(
    mut nodes: Vec<TreeNode<T>>,
    config: &ChunkConfig,
) -> Vec<TreeNode<T>> {
    recount_descendants(&mut nodes);
    let mut from = 0;
    while let Some((idx, children)) = find_oversized(&nodes, from, config) {
        nodes = chunk_branch(nodes, idx, &children, config.max_children);
        // Nodes before `idx` are untouched by the insertion.
        from = idx;
    }
    nodes
}

fn find_oversized<T>(
    nodes: &[TreeNode<T>],
    from: usize,
    config: &ChunkConfig,
) -> Option<(usize, Vec<usize>)> {
    (from..nodes.len()).find_map(|idx| {
        let node = &nodes[idx];
        if node.descendants <= config.min_descendants {
            return None;
        }
        let end = (idx + 1 + node.descendants).min(nodes.len());
        let children: Vec<usize> = (idx + 1..end)
            .filter(|&child| nodes[child].depth == node.depth + 1)
            .collect();
        (children.len() > config.max_children).then_some((idx, children))
    })
}

fn chunk_branch<T: GroupNode>(
    nodes: Vec<TreeNode<T>>,
    idx: usize,
    children: &[usize],
    chunk_size: usize,
) -> Vec<TreeNode<T>> {
    let child_depth = nodes[idx].depth + 1;
    let end = (idx + 1 + nodes[idx].descendants).min(nodes.len());
    let starts: Vec<usize> = children.chunks(chunk_size).map(|run| run[0]).collect();
    let labels = group_labels(&nodes, children, chunk_size);
    let inserted = starts.len();
    debug!(
        idx,
        children = children.len(),
        groups = inserted,
        "chunking oversized branch"
    );

    let mut remap = vec![0_usize; nodes.len()];
    let mut out: Vec<TreeNode<T>> = Vec::with_capacity(nodes.len() + inserted);
    let mut labels = labels.into_iter();
    let mut next_group = 0;
    let mut current_group = None;
    for (old, mut node) in nodes.into_iter().enumerate() {
        if starts.get(next_group) == Some(&old) {
            let span_end = starts.get(next_group + 1).copied().unwrap_or(end);
            let label = labels.next().unwrap_or_default();
            let mut group = TreeNode::new(T::group(label), Some(idx), child_depth);
            group.descendants = span_end - old;
            current_group = Some(out.len());
            out.push(group);
            next_group += 1;
        }
        let inside = old > idx && old < end;
        node.parent = if inside && node.depth == child_depth {
            current_group
        } else {
            node.parent.and_then(|parent| remap.get(parent).copied())
        };
        if inside {
            node.depth += 1;
        }
        remap[old] = out.len();
        out.push(node);
    }

    let mut cursor = Some(idx);
    while let Some(ancestor) = cursor {
        out[ancestor].descendants += inserted;
        cursor = out[ancestor].parent.filter(|&parent| parent < ancestor);
    }
    out
}

fn group_labels<T: GroupNode>(
    nodes: &[TreeNode<T>],
    children: &[usize],
    chunk_size: usize,
) -> Vec<String> {
    let bounds: Vec<(&str, &str)> = children
        .chunks(chunk_size)
        .map(|run| {
            let last = run[run.len() - 1];
            (first_item(nodes, run[0]), last_item(nodes, last))
        })
        .collect();
    bounds
        .iter()
        .enumerate()
        .map(|(pos, &(first, last))| {
            let prev_last = pos.checked_sub(1).map(|prev| bounds[prev].1);
            let next_first = bounds.get(pos + 1).map(|next| next.0);
            group_label(first, last, prev_last, next_first)
        })
        .collect()
}

/// Name of the first real item at or below `idx`.
fn first_item<T: GroupNode>(nodes: &[TreeNode<T>], mut idx: usize) -> &str {
    // A group's first child follows it directly.
    while nodes[idx].value.is_group() && nodes[idx].descendants > 0 && idx + 1 < nodes.len() {
        idx += 1;
    }
    nodes[idx].value.label()
}

/// Name of the last real item grouped at or below `idx`.
fn last_item<T: GroupNode>(nodes: &[TreeNode<T>], mut idx: usize) -> &str {
    while nodes[idx].value.is_group() {
        let depth = nodes[idx].depth;
        let end = (idx + 1 + nodes[idx].descendants).min(nodes.len());
        match (idx + 1..end).rev().find(|&child| nodes[child].depth == depth + 1) {
            Some(child) => idx = child,
            None => break,
        }
    }
    nodes[idx].value.label()
}

/// Builds a `"[First - Last]"` label with each name cut to the shortest
/// prefix that still tells it apart (case-insensitively) from the adjacent
/// group's boundary name.
pub fn group_label(
    first: &str,
    last: &str,
    prev_last: Option<&str>,
    next_first: Option<&str>,
) -> String {
    let first = truncate(first, distinguishing_len(first, prev_last));
    let last = truncate(last, distinguishing_len(last, next_first));
    format!("[{first} - {last}]")
}

fn distinguishing_len(name: &str, neighbour: Option<&str>) -> usize {
    let total = name.chars().count();
    let common = neighbour.map_or(0, |other| {
        name.chars()
            .zip(other.chars())
            .take_while(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
            .count()
    });
    let len = (common + 1).min(total);
    let ends_on_space = len
        .checked_sub(1)
        .and_then(|last| name.chars().nth(last))
        .is_some_and(char::is_whitespace);
    if !ends_on_space {
        return len;
    }
    // A trailing space is trimmed away, so cut at the next visible character.
    name.chars()
        .skip(len)
        .position(|ch| !ch.is_whitespace())
        .map_or(total, |offset| len + offset + 1)
}

fn truncate(name: &str, len: usize) -> &str {
    let cut = name.char_indices().nth(len).map_or(name.len(), |(pos, _)| pos);
    name[..cut].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grouped, NodeLabel};

    type Node = TreeNode<Grouped<String>>;

    fn build(names: &[&str], parents: &[Option<usize>]) -> Vec<Node> {
        let values = names
            .iter()
            .map(|name| Grouped::Item((*name).to_string()))
            .collect();
        TreeNode::from_parents(values, parents)
    }

    fn labels(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|node| node.value.label()).collect()
    }

    fn direct_children(nodes: &[Node], idx: usize) -> usize {
        let end = idx + 1 + nodes[idx].descendants;
        (idx + 1..end)
            .filter(|&child| nodes[child].depth == nodes[idx].depth + 1)
            .count()
    }

    #[test]
    fn splits_leaf_children_into_groups() {
        let nodes = build(
            &["root", "alpha", "beta", "delta", "gamma", "kappa"],
            &[None, Some(0), Some(0), Some(0), Some(0), Some(0)],
        );
        let config = ChunkConfig::new(3).unwrap();

        let out = process_nodes(nodes, &config);

        assert_eq!(
            labels(&out),
            vec!["root", "[a - d]", "alpha", "beta", "delta", "[g - k]", "gamma", "kappa"]
        );
        let depths: Vec<_> = out.iter().map(|n| n.depth).collect();
        let parents: Vec<_> = out.iter().map(|n| n.parent).collect();
        let descendants: Vec<_> = out.iter().map(|n| n.descendants).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 2, 1, 2, 2]);
        assert_eq!(
            parents,
            vec![None, Some(0), Some(1), Some(1), Some(1), Some(0), Some(5), Some(5)]
        );
        assert_eq!(descendants, vec![7, 3, 0, 0, 0, 2, 0, 0]);
        assert!(out[1].value.is_group());
        assert!(!out[2].value.is_group());
    }

    #[test]
    fn groups_span_whole_subtrees() {
        let nodes = build(
            &["root", "ant", "x", "y", "bee", "cat", "dog"],
            &[None, Some(0), Some(1), Some(1), Some(0), Some(0), Some(0)],
        );
        let config = ChunkConfig::with_thresholds(2, 2).unwrap();

        let out = process_nodes(nodes, &config);

        assert_eq!(
            labels(&out),
            vec!["root", "[a - b]", "ant", "x", "y", "bee", "[c - d]", "cat", "dog"]
        );
        let depths: Vec<_> = out.iter().map(|n| n.depth).collect();
        let parents: Vec<_> = out.iter().map(|n| n.parent).collect();
        assert_eq!(depths, vec![0, 1, 2, 3, 3, 2, 1, 2, 2]);
        assert_eq!(
            parents,
            vec![None, Some(0), Some(1), Some(2), Some(2), Some(1), Some(0), Some(6), Some(6)]
        );
        assert_eq!(out[0].descendants, 8);
        assert_eq!(out[1].descendants, 4);
        assert_eq!(out[6].descendants, 2);
    }

    #[test]
    fn updates_ancestor_counts_of_nested_branch() {
        let nodes = build(
            &["top", "mid", "a", "b", "c", "tail"],
            &[None, Some(0), Some(1), Some(1), Some(1), Some(0)],
        );
        let config = ChunkConfig::with_thresholds(2, 0).unwrap();

        let out = process_nodes(nodes, &config);

        assert_eq!(labels(&out), vec!["top", "mid", "[a - b]", "a", "b", "[c - c]", "c", "tail"]);
        assert_eq!(out[0].descendants, 7);
        assert_eq!(out[1].descendants, 5);
        assert_eq!(out[7].parent, Some(0));
        assert_eq!(out[7].depth, 1);
    }

    #[test]
    fn deep_but_narrow_branches_are_untouched() {
        let nodes = build(
            &["root", "a", "b", "c", "d", "e"],
            &[None, Some(0), Some(1), Some(2), Some(3), Some(4)],
        );
        let config = ChunkConfig::with_thresholds(2, 2).unwrap();

        let out = process_nodes(nodes.clone(), &config);

        assert_eq!(labels(&out), labels(&nodes));
    }

    #[test]
    fn wide_groups_are_nested_until_bounded() {
        let names: Vec<String> = (0..30).map(|n| format!("item {n:02}")).collect();
        let mut all = vec!["root"];
        all.extend(names.iter().map(String::as_str));
        let mut parents = vec![None];
        parents.extend(std::iter::repeat_n(Some(0), 30));
        let config = ChunkConfig::with_thresholds(3, 3).unwrap();

        let out = process_nodes(build(&all, &parents), &config);

        for idx in 0..out.len() {
            assert!(direct_children(&out, idx) <= 3, "node {idx} is still too wide");
        }
        assert_eq!(out[0].descendants, out.len() - 1);
        let items = out.iter().filter(|node| !node.value.is_group()).count();
        assert_eq!(items, 31);
    }

    #[test]
    fn nested_groups_are_labelled_by_real_items() {
        let names = [
            "aterm", "bterm", "cterm", "dterm", "eterm", "fterm", "gterm", "hterm", "iterm",
            "jterm", "kterm", "lterm",
        ];
        let mut all = vec!["root"];
        all.extend(names);
        let mut parents = vec![None];
        parents.extend(std::iter::repeat_n(Some(0), names.len()));
        let config = ChunkConfig::new(3).unwrap();

        let out = process_nodes(build(&all, &parents), &config);

        assert_eq!(
            labels(&out),
            vec![
                "root", "[a - i]", "[a - c]", "aterm", "bterm", "cterm", "[d - f]", "dterm",
                "eterm", "fterm", "[g - i]", "gterm", "hterm", "iterm", "[j - l]", "[j - l]",
                "jterm", "kterm", "lterm",
            ]
        );
        assert_eq!(out[1].descendants, 12);
        assert_eq!(out[14].parent, Some(0));
        assert_eq!(out[15].parent, Some(14));
        assert_eq!(out[15].depth, 2);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let nodes = build(
            &["root", "alpha", "beta", "delta", "gamma", "kappa"],
            &[None, Some(0), Some(0), Some(0), Some(0), Some(0)],
        );
        let chunker = BranchChunker::new(ChunkConfig::new(2).unwrap());

        let once = chunker.process(nodes);
        let twice = chunker.process(once.clone());

        assert_eq!(once, twice);
    }

    #[test]
    fn labels_use_minimal_distinguishing_prefix() {
        assert_eq!(group_label("Cell line", "Cell type", None, Some("cellular")), "[C - Cell t]");
        assert_eq!(group_label("Cellular", "Centrifuge", Some("Cell type"), None), "[Cellu - C]");
        assert_eq!(group_label("abc", "abc", Some("ABC"), Some("abcd")), "[abc - abc]");
        assert_eq!(group_label("", "z", None, None), "[ - z]");
    }

    #[test]
    fn labels_never_end_on_the_distinguishing_space() {
        assert_eq!(group_label("ab x", "ab x", Some("ab"), None), "[ab x - a]");
        assert_eq!(group_label("ab", "ab", None, Some("ab x")), "[a - ab]");
        assert_eq!(group_label("a  b", "z", Some("a"), None), "[a  b - z]");
    }

    #[test]
    fn rejects_degenerate_chunk_size() {
        assert_eq!(ChunkConfig::new(1), Err(ChunkConfigError::ChunkSizeTooSmall(1)));
        assert_eq!(ChunkConfig::new(0), Err(ChunkConfigError::ChunkSizeTooSmall(0)));
        assert_eq!(ChunkConfig::default().max_children(), DEFAULT_CHUNK_SIZE);
        assert_eq!(ChunkConfig::default().min_descendants(), DEFAULT_CHUNK_SIZE);
    }
}
