use ratatui::style::Style;

use crate::tree::BranchState;

/// Per-row data handed to label rendering.
#[derive(Clone, Copy, Debug)]
pub struct RowContext {
    /// Index of the row's node in the backing array.
    pub index: usize,
    pub depth: usize,
    pub state: BranchState,
    /// The node is a direct match of the active search.
    pub is_match: bool,
    /// Matches below the node, present only while searching.
    pub match_count: Option<usize>,
    pub match_style: Style,
}
