//! Selection and visibility engine for flat-array lists and preorder trees.
//!
//! A [`MaskedCollection`] keeps visibility/selection masks parallel to a list of
//! items; a [`HierarchicalCollection`] adds parent/depth semantics with branch
//! open/close state. Every mutator returns the indices whose visibility changed,
//! so a renderer can patch only those rows. [`process_nodes`] pre-processes
//! oversized branches into synthetic group nodes.
//!
//! Feature flags:
//! - `widget` (default): Ratatui `CollectionView` rendering the visible rows.
//! - `serde`: serde support for `TreeNode`, `Grouped`, and `ChunkConfig`.

mod action;
mod chunk;
#[cfg(feature = "widget")]
mod context;
#[cfg(feature = "widget")]
mod glyphs;
mod masked;
mod model;
pub mod prelude;
#[cfg(feature = "widget")]
mod style;
mod tree;
#[cfg(feature = "widget")]
mod widget;

pub use action::TreeAction;
pub use chunk::{
    BranchChunker, ChunkConfig, ChunkConfigError, DEFAULT_CHUNK_SIZE, group_label, process_nodes,
};
#[cfg(feature = "widget")]
pub use context::RowContext;
#[cfg(feature = "widget")]
pub use glyphs::{LabelProvider, NodeLabels, ToggleGlyphs, row_line};
pub use masked::MaskedCollection;
pub use model::{
    GroupNode, Grouped, MatchNone, Matcher, NodeLabel, TreeItem, TreeNode, recount_descendants,
};
#[cfg(feature = "widget")]
pub use style::CollectionViewStyle;
pub use tree::{BranchState, HierarchicalCollection};
#[cfg(feature = "widget")]
pub use widget::CollectionView;
