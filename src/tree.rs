use std::ops::Range;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::action::TreeAction;
use crate::masked::MaskedCollection;
use crate::model::{Matcher, TreeItem};

/// Toggle affordance of a node: leaf, or one of three branch states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchState {
    /// The node has no children.
    Leaf,
    /// The branch is collapsed.
    Closed,
    /// The branch is open but only some direct children are visible.
    Partial,
    /// The branch is open and every direct child is visible.
    Open,
}

/// Masked collection over a preorder-flattened tree.
///
/// Adds branch open/close state on top of [`MaskedCollection`] and keeps the
/// ancestor invariant: a visible node always has visible ancestors.
pub struct HierarchicalCollection<T, M> {
    inner: MaskedCollection<T, M>,
    open: Vec<bool>,
    // A node has children iff the next item is deeper.
    has_children: Vec<bool>,
}

fn child_mask<T: TreeItem>(items: &[T]) -> Vec<bool> {
    let mut mask: Vec<bool> = items
        .windows(2)
        .map(|pair| pair[1].depth() > pair[0].depth())
        .collect();
    if !items.is_empty() {
        mask.push(false);
    }
    mask
}

impl<T: TreeItem, M: Matcher<T>> HierarchicalCollection<T, M> {
    /// Creates a fully expanded collection with every node visible.
    pub fn new(items: Vec<T>, matcher: M) -> Self {
        let has_children = child_mask(&items);
        let open = vec![false; items.len()];
        let mut tree = Self {
            inner: MaskedCollection::new(items, matcher),
            open,
            has_children,
        };
        tree.sync_open();
        tree
    }

    /// Replaces the backing array (e.g. after a fetched subtree was spliced in).
    pub fn set_data(&mut self, items: Vec<T>) {
        self.has_children = child_mask(&items);
        self.open = vec![false; items.len()];
        self.inner.set_data(items);
        self.sync_open();
    }

    /// Runs a search, pulling the ancestors of every direct match into view.
    ///
    /// While the search is active, each node's match count is the number of
    /// direct matches strictly below it.
    pub fn search(&mut self, query: &str) -> Vec<usize> {
        let next = if self.inner.apply_matches(query) {
            self.propagate_visibility()
        } else {
            vec![true; self.len()]
        };
        let changed = self.inner.set_visibility(&next);
        self.sync_open();
        debug!(
            query,
            hits = self.inner.count_hits(),
            changed = changed.len(),
            "tree search committed"
        );
        changed
    }

    fn propagate_visibility(&mut self) -> Vec<bool> {
        let mut next = self.inner.selected_mask().to_vec();
        let mut counts = vec![0_usize; next.len()];
        let matches: Vec<usize> = self
            .inner
            .selected_mask()
            .iter()
            .enumerate()
            .filter_map(|(idx, &selected)| selected.then_some(idx))
            .collect();
        for idx in matches {
            for ancestor in self.ancestors(idx) {
                next[ancestor] = true;
                counts[ancestor] += 1;
            }
        }
        for (slot, count) in self.inner.match_counts_mut().iter_mut().zip(counts) {
            *slot = Some(count);
        }
        next
    }

    /// Shows the given nodes, pulling in (and opening) their ancestors.
    pub fn show(&mut self, indices: &[usize]) -> Vec<usize> {
        let len = self.len();
        let mut next = self.inner.visible_mask().to_vec();
        let mut seen = FxHashSet::default();
        for &idx in indices.iter().filter(|&&idx| idx < len) {
            next[idx] = true;
            let chain: SmallVec<[usize; 16]> = self.ancestors(idx).collect();
            for ancestor in chain {
                // Everything above an already handled ancestor is handled too.
                if !seen.insert(ancestor) {
                    break;
                }
                next[ancestor] = true;
                self.open[ancestor] = true;
            }
        }
        self.inner.set_visibility(&next)
    }

    /// Hides the given nodes and collapses their subtrees.
    ///
    /// A parent left without visible direct children is closed as well.
    pub fn hide(&mut self, indices: &[usize]) -> Vec<usize> {
        let len = self.len();
        let mut next = self.inner.visible_mask().to_vec();
        let mut parents = FxHashSet::default();
        for &idx in indices.iter().filter(|&&idx| idx < len) {
            next[idx] = false;
            self.open[idx] = false;
            for descendant in self.descendant_range(idx) {
                next[descendant] = false;
                self.open[descendant] = false;
            }
            parents.extend(self.parent(idx));
        }
        for parent in parents {
            if !self.direct_children(parent).any(|child| next[child]) {
                self.open[parent] = false;
            }
        }
        self.inner.set_visibility(&next)
    }

    /// Forces uniform visibility; branches end up all open or all closed.
    pub fn reset(&mut self, visible: bool) -> Vec<usize> {
        let changed = self.inner.reset(visible);
        self.sync_open();
        changed
    }

    /// Writes the visibility mask directly and re-derives open state from it.
    pub fn set_visibility(&mut self, new_state: &[bool]) -> Vec<usize> {
        let changed = self.inner.set_visibility(new_state);
        self.sync_open();
        changed
    }

    /// Expands the branch one level: direct children become visible, deeper
    /// descendants become hidden and closed.
    pub fn open_branch(&mut self, idx: usize) -> Vec<usize> {
        self.expand(idx, false)
    }

    /// Like [`Self::open_branch`], but only already selected children become visible.
    pub fn partial_open_branch(&mut self, idx: usize) -> Vec<usize> {
        self.expand(idx, true)
    }

    fn expand(&mut self, idx: usize, only_selected: bool) -> Vec<usize> {
        if !self.has_children(idx) {
            return Vec::new();
        }
        let mut next = self.inner.visible_mask().to_vec();
        next[idx] = true;
        let chain: SmallVec<[usize; 16]> = self.ancestors(idx).collect();
        for ancestor in chain {
            next[ancestor] = true;
            self.open[ancestor] = true;
        }

        let child_depth = self.inner.items()[idx].depth() + 1;
        let range = self.descendant_range(idx);
        let items = self.inner.items();
        let selected = self.inner.selected_mask();
        for child in range {
            let direct = items[child].depth() == child_depth;
            next[child] = direct && (!only_selected || selected[child]);
            self.open[child] = false;
        }
        self.open[idx] = true;

        let changed = self.inner.set_visibility(&next);
        trace!(idx, only_selected, changed = changed.len(), "branch opened");
        changed
    }

    /// Collapses an open branch; the node itself stays visible.
    pub fn close_branch(&mut self, idx: usize) -> Vec<usize> {
        if !self.is_open(idx) {
            return Vec::new();
        }
        self.open[idx] = false;
        let mut next = self.inner.visible_mask().to_vec();
        for descendant in self.descendant_range(idx) {
            next[descendant] = false;
            self.open[descendant] = false;
        }
        let changed = self.inner.set_visibility(&next);
        trace!(idx, changed = changed.len(), "branch closed");
        changed
    }

    /// Closes an open branch, otherwise opens it (partially while a search is active).
    pub fn toggle_branch(&mut self, idx: usize) -> Vec<usize> {
        if self.is_open(idx) {
            self.close_branch(idx)
        } else if self.inner.is_searching() {
            self.partial_open_branch(idx)
        } else {
            self.open_branch(idx)
        }
    }

    /// Routes a single-node action and returns the resulting diff.
    pub fn apply(&mut self, action: TreeAction, idx: usize) -> Vec<usize> {
        match action {
            TreeAction::Open => self.open_branch(idx),
            TreeAction::PartialOpen => self.partial_open_branch(idx),
            TreeAction::Close => self.close_branch(idx),
            TreeAction::Toggle => self.toggle_branch(idx),
            TreeAction::Show => self.show(&[idx]),
            TreeAction::Hide => self.hide(&[idx]),
        }
    }

    /// Recomputes open state: a branch is open iff one of its direct children is visible.
    fn sync_open(&mut self) {
        self.open.fill(false);
        let visible = self.inner.visible_mask();
        for (idx, item) in self.inner.items().iter().enumerate() {
            if !visible[idx] {
                continue;
            }
            if let Some(parent) = item.parent().filter(|&parent| parent < idx) {
                self.open[parent] = self.has_children[parent];
            }
        }
    }
}

impl<T: TreeItem, M> HierarchicalCollection<T, M> {
    /// Array range holding the strict descendants of `idx`.
    pub fn descendant_range(&self, idx: usize) -> Range<usize> {
        let items = self.inner.items();
        let Some(node) = items.get(idx) else {
            return 0..0;
        };
        let depth = node.depth();
        let start = idx + 1;
        let end = items[start..]
            .iter()
            .position(|item| item.depth() <= depth)
            .map_or(items.len(), |offset| start + offset);
        start..end
    }

    /// All strict descendants of `idx`.
    pub fn find_children(&self, idx: usize) -> Vec<usize> {
        self.descendant_range(idx).collect()
    }

    /// Descendants of `idx` exactly one level deeper.
    pub fn find_direct_children(&self, idx: usize) -> Vec<usize> {
        self.direct_children(idx).collect()
    }

    fn direct_children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let items = self.inner.items();
        let child_depth = items.get(idx).map_or(0, |node| node.depth() + 1);
        self.descendant_range(idx)
            .filter(move |&child| items[child].depth() == child_depth)
    }

    /// Ancestor chain of `idx`, nearest first.
    pub fn find_parents(&self, idx: usize) -> Vec<usize> {
        self.ancestors(idx).collect()
    }

    fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let items = self.inner.items();
        // Parents always precede their children; anything else ends the walk.
        std::iter::successors(Some(idx), move |&current| {
            items.get(current)?.parent().filter(|&parent| parent < current)
        })
        .skip(1)
    }

    /// Returns `true` if some, but not all, direct children are visible.
    pub fn is_partial_open(&self, idx: usize) -> bool {
        self.partial(idx, |child| self.inner.is_visible(child))
    }

    /// Returns `true` if some, but not all, direct children are selected.
    pub fn is_partial_selected(&self, idx: usize) -> bool {
        self.partial(idx, |child| self.inner.is_selected(child))
    }

    fn partial(&self, idx: usize, flag: impl Fn(usize) -> bool) -> bool {
        let (total, set) = self.count_children(idx, flag);
        set > 0 && set < total
    }

    fn count_children(&self, idx: usize, flag: impl Fn(usize) -> bool) -> (usize, usize) {
        self.direct_children(idx)
            .fold((0, 0), |(total, set), child| {
                (total + 1, set + usize::from(flag(child)))
            })
    }

    /// Toggle state used to pick between open, partial, and closed affordances.
    pub fn branch_state(&self, idx: usize) -> BranchState {
        if !self.has_children(idx) {
            return BranchState::Leaf;
        }
        if !self.is_open(idx) {
            return BranchState::Closed;
        }
        let (total, visible) = self.count_children(idx, |child| self.inner.is_visible(child));
        if visible == total {
            BranchState::Open
        } else {
            BranchState::Partial
        }
    }

    /// Parent index of `idx`.
    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.inner.get(idx).and_then(TreeItem::parent)
    }

    /// Depth of `idx`.
    pub fn depth(&self, idx: usize) -> Option<usize> {
        self.inner.get(idx).map(TreeItem::depth)
    }
}

impl<T, M> HierarchicalCollection<T, M> {
    /// Read access to the underlying masks and items.
    pub const fn masks(&self) -> &MaskedCollection<T, M> {
        &self.inner
    }

    /// Number of nodes.
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the tree holds no nodes.
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Backing nodes in preorder.
    pub fn items(&self) -> &[T] {
        self.inner.items()
    }

    /// Returns the node at `idx`.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.inner.get(idx)
    }

    #[inline]
    pub fn is_visible(&self, idx: usize) -> bool {
        self.inner.is_visible(idx)
    }

    #[inline]
    pub fn is_selected(&self, idx: usize) -> bool {
        self.inner.is_selected(idx)
    }

    #[inline]
    pub fn is_open(&self, idx: usize) -> bool {
        self.open.get(idx).copied().unwrap_or(false)
    }

    #[inline]
    pub fn has_children(&self, idx: usize) -> bool {
        self.has_children.get(idx).copied().unwrap_or(false)
    }

    /// Number of direct matches strictly below `idx` (`None` without an active search).
    pub fn match_count(&self, idx: usize) -> Option<usize> {
        self.inner.match_count(idx)
    }

    /// Number of direct matches of the active search.
    pub fn count_hits(&self) -> usize {
        self.inner.count_hits()
    }

    /// Indices of all currently visible nodes, ascending.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.inner.visible_indices()
    }

    /// Returns `true` while a non-empty query is applied.
    pub const fn is_searching(&self) -> bool {
        self.inner.is_searching()
    }
}
