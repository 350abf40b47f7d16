//! Property-based invariant tests for branch chunking.
//!
//! 1. No branch keeps more direct children than the chunk size
//! 2. Recorded descendant counts match the rewritten array
//! 3. Parent pointers and depths stay consistent with preorder
//! 4. Real items survive in their original order
//! 5. A second pass changes nothing

use proptest::prelude::*;
use treelist_mask::{
    ChunkConfig, GroupNode, Grouped, NodeLabel, TreeNode, process_nodes, recount_descendants,
};

type Node = TreeNode<Grouped<String>>;

// ── Strategies ──────────────────────────────────────────────────────────

/// Wide, shallow trees: depth may rise by one or fall back to any level.
fn build(seeds: &[u8]) -> Vec<Node> {
    let mut depths: Vec<usize> = Vec::with_capacity(seeds.len());
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(seeds.len());
    for (idx, seed) in seeds.iter().enumerate() {
        let depth = match depths.last() {
            // Bias towards siblings so branches get wide.
            Some(_) if seed % 4 != 0 => 1,
            Some(&prev) => usize::from(*seed) % (prev + 2),
            None => 0,
        };
        let parent = depth
            .checked_sub(1)
            .and_then(|wanted| (0..idx).rev().find(|&j| depths[j] == wanted));
        depths.push(depth);
        parents.push(parent);
    }
    let values = (0..seeds.len())
        .map(|idx| Grouped::Item(format!("term {idx:03}")))
        .collect();
    TreeNode::from_parents(values, &parents)
}

fn direct_children(nodes: &[Node], idx: usize) -> usize {
    let end = idx + 1 + nodes[idx].descendants;
    (idx + 1..end)
        .filter(|&child| nodes[child].depth == nodes[idx].depth + 1)
        .count()
}

proptest! {
    #[test]
    fn branches_are_bounded(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        chunk_size in 2usize..8,
    ) {
        let config = ChunkConfig::new(chunk_size).unwrap();
        let out = process_nodes(build(&seeds), &config);

        for idx in 0..out.len() {
            prop_assert!(
                direct_children(&out, idx) <= chunk_size,
                "node {} keeps {} children", idx, direct_children(&out, idx)
            );
        }
    }

    #[test]
    fn descendant_counts_match_array(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        chunk_size in 2usize..8,
    ) {
        let config = ChunkConfig::new(chunk_size).unwrap();
        let out = process_nodes(build(&seeds), &config);

        let mut recounted = out.clone();
        recount_descendants(&mut recounted);
        for (idx, (got, want)) in out.iter().zip(&recounted).enumerate() {
            prop_assert_eq!(got.descendants, want.descendants, "node {}", idx);
        }
    }

    #[test]
    fn parents_and_depths_stay_preorder(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        chunk_size in 2usize..8,
    ) {
        let config = ChunkConfig::new(chunk_size).unwrap();
        let out = process_nodes(build(&seeds), &config);

        for (idx, node) in out.iter().enumerate() {
            match node.parent {
                None => prop_assert_eq!(node.depth, 0),
                Some(parent) => {
                    prop_assert!(parent < idx);
                    prop_assert_eq!(out[parent].depth + 1, node.depth);
                    prop_assert!(idx <= parent + out[parent].descendants);
                    let nearest = (0..idx).rev().find(|&j| out[j].depth + 1 == node.depth);
                    prop_assert_eq!(nearest, Some(parent));
                }
            }
        }
    }

    #[test]
    fn items_keep_their_order(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        chunk_size in 2usize..8,
    ) {
        let input = build(&seeds);
        let expected: Vec<String> = input.iter().map(|node| node.label().to_string()).collect();
        let config = ChunkConfig::new(chunk_size).unwrap();

        let out = process_nodes(input, &config);

        let items: Vec<String> = out
            .iter()
            .filter(|node| !node.value.is_group())
            .map(|node| node.label().to_string())
            .collect();
        prop_assert_eq!(items, expected);
    }

    #[test]
    fn second_pass_is_identity(
        seeds in prop::collection::vec(any::<u8>(), 1..200),
        chunk_size in 2usize..8,
    ) {
        let config = ChunkConfig::new(chunk_size).unwrap();
        let once = process_nodes(build(&seeds), &config);
        let twice = process_nodes(once.clone(), &config);
        prop_assert_eq!(once, twice);
    }
}
