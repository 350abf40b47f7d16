/// Single-node operations an event layer can route to a hierarchical collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction {
    /// Expand the branch one level.
    Open,
    /// Expand the branch one level, exposing only matching children.
    PartialOpen,
    /// Collapse the branch.
    Close,
    /// Close an open branch, otherwise open it (partially while searching).
    Toggle,
    /// Show the node and pull its ancestors into view.
    Show,
    /// Hide the node together with its subtree.
    Hide,
}
