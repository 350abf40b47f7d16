use tracing::{debug, trace};

use crate::model::Matcher;

/// Ordered items with parallel visibility/selection masks and match counts.
///
/// Every mutator returns the indices whose visibility actually flipped, in
/// ascending order, so a renderer can patch only the rows that changed.
/// Out-of-range indices are ignored rather than reported.
pub struct MaskedCollection<T, M> {
    items: Vec<T>,
    visible: Vec<bool>,
    selected: Vec<bool>,
    // `None` while no search is active.
    match_count: Vec<Option<usize>>,
    query: Option<String>,
    matcher: M,
}

impl<T, M: Matcher<T>> MaskedCollection<T, M> {
    /// Creates a collection with every item visible and no active search.
    pub fn new(items: Vec<T>, matcher: M) -> Self {
        let len = items.len();
        Self {
            items,
            visible: vec![true; len],
            selected: vec![false; len],
            match_count: vec![None; len],
            query: None,
            matcher,
        }
    }

    /// Replaces the backing items and re-derives every mask.
    pub fn set_data(&mut self, items: Vec<T>) {
        let len = items.len();
        self.items = items;
        self.visible = vec![true; len];
        self.selected = vec![false; len];
        self.match_count = vec![None; len];
        self.query = None;
    }

    /// Runs the matcher over every item and shows only direct matches.
    ///
    /// An empty query ends the search: everything becomes visible and
    /// selections and match counts are cleared.
    pub fn search(&mut self, query: &str) -> Vec<usize> {
        let next = if self.apply_matches(query) {
            for (count, &selected) in self.match_count.iter_mut().zip(&self.selected) {
                *count = Some(usize::from(selected));
            }
            self.selected.clone()
        } else {
            vec![true; self.items.len()]
        };
        let changed = self.set_visibility(&next);
        debug!(
            query,
            hits = self.count_hits(),
            changed = changed.len(),
            "list search committed"
        );
        changed
    }

    /// Evaluates the matcher and records the query; returns whether a search is active.
    ///
    /// Match counts are left at `Some(0)` for an active search and cleared otherwise.
    pub(crate) fn apply_matches(&mut self, query: &str) -> bool {
        if query.is_empty() {
            self.query = None;
            self.selected.fill(false);
            self.match_count.fill(None);
            return false;
        }
        for (selected, item) in self.selected.iter_mut().zip(&self.items) {
            *selected = self.matcher.is_match(item, query);
        }
        self.match_count.fill(Some(0));
        self.query = Some(query.to_owned());
        true
    }

    /// Makes the given indices visible.
    pub fn show(&mut self, indices: &[usize]) -> Vec<usize> {
        self.set_indices(indices, true)
    }

    /// Hides the given indices.
    pub fn hide(&mut self, indices: &[usize]) -> Vec<usize> {
        self.set_indices(indices, false)
    }

    fn set_indices(&mut self, indices: &[usize], visible: bool) -> Vec<usize> {
        let mut next = self.visible.clone();
        for &idx in indices {
            if let Some(slot) = next.get_mut(idx) {
                *slot = visible;
            }
        }
        self.set_visibility(&next)
    }

    /// Forces uniform visibility.
    pub fn reset(&mut self, visible: bool) -> Vec<usize> {
        let next = vec![visible; self.items.len()];
        self.set_visibility(&next)
    }

    /// Writes the visibility mask and returns the indices that flipped.
    ///
    /// This is the only writer of the visibility mask. Entries past the end
    /// of the collection are ignored; missing entries leave the slot as is.
    pub fn set_visibility(&mut self, new_state: &[bool]) -> Vec<usize> {
        let mut changed = Vec::new();
        for (idx, (current, &next)) in self.visible.iter_mut().zip(new_state).enumerate() {
            if *current != next {
                *current = next;
                changed.push(idx);
            }
        }
        trace!(changed = changed.len(), "visibility updated");
        changed
    }
}

impl<T, M> MaskedCollection<T, M> {
    pub(crate) fn match_counts_mut(&mut self) -> &mut [Option<usize>] {
        &mut self.match_count
    }

    pub(crate) fn visible_mask(&self) -> &[bool] {
        &self.visible
    }

    pub(crate) fn selected_mask(&self) -> &[bool] {
        &self.selected
    }

    /// Number of direct matches of the active search.
    pub fn count_hits(&self) -> usize {
        self.selected.iter().filter(|&&selected| selected).count()
    }

    /// Number of items.
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no items.
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Backing items in array order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Returns the item at `idx`.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    /// Returns the injected matcher.
    pub const fn matcher(&self) -> &M {
        &self.matcher
    }

    #[inline]
    pub fn is_visible(&self, idx: usize) -> bool {
        self.visible.get(idx).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_selected(&self, idx: usize) -> bool {
        self.selected.get(idx).copied().unwrap_or(false)
    }

    /// Match count of the active search (`None` when no search is active).
    pub fn match_count(&self, idx: usize) -> Option<usize> {
        self.match_count.get(idx).copied().flatten()
    }

    /// Indices of all currently visible items, ascending.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.visible
            .iter()
            .enumerate()
            .filter_map(|(idx, &visible)| visible.then_some(idx))
            .collect()
    }

    /// The active query, if a search is running.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns `true` while a non-empty query is applied.
    pub const fn is_searching(&self) -> bool {
        self.query.is_some()
    }
}
