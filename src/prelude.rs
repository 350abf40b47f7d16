pub use crate::{
    BranchChunker, BranchState, ChunkConfig, GroupNode, Grouped, HierarchicalCollection,
    MaskedCollection, MatchNone, Matcher, NodeLabel, TreeAction, TreeItem, TreeNode,
    process_nodes,
};

#[cfg(feature = "widget")]
pub use crate::{CollectionView, CollectionViewStyle, LabelProvider, NodeLabels, ToggleGlyphs};
