use ratatui::layout::{Constraint, Rect};
use ratatui::prelude::Buffer;
use ratatui::widgets::{
    Block, Borders, Cell, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget,
    Table, TableState,
};

use crate::context::RowContext;
use crate::glyphs::{LabelProvider, ToggleGlyphs, row_line};
use crate::model::TreeItem;
use crate::style::CollectionViewStyle;
use crate::tree::HierarchicalCollection;

/// Renders the visible rows of a [`HierarchicalCollection`].
///
/// The table state's selection and offset refer to positions in the list of
/// visible rows, not to indices in the backing array.
pub struct CollectionView<'a, T, M, L> {
    collection: &'a HierarchicalCollection<T, M>,
    label: &'a L,
    style: CollectionViewStyle<'a>,
    glyphs: ToggleGlyphs<'a>,
}

impl<'a, T, M, L> CollectionView<'a, T, M, L>
where
    T: TreeItem,
    L: LabelProvider<T>,
{
    pub const fn new(
        collection: &'a HierarchicalCollection<T, M>,
        label: &'a L,
        style: CollectionViewStyle<'a>,
    ) -> Self {
        Self {
            collection,
            label,
            style,
            glyphs: ToggleGlyphs::unicode(),
        }
    }

    pub const fn glyphs(mut self, glyphs: ToggleGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    fn build_rows(&self, indices: &[usize]) -> Vec<Row<'a>> {
        let mut rows = Vec::with_capacity(indices.len());
        for &idx in indices {
            let Some(item) = self.collection.get(idx) else {
                continue;
            };
            let ctx = RowContext {
                index: idx,
                depth: item.depth(),
                state: self.collection.branch_state(idx),
                is_match: self.collection.is_selected(idx),
                match_count: self.collection.match_count(idx),
                match_style: self.style.match_style,
            };
            let line = row_line(&ctx, self.label.label(item), &self.glyphs);
            rows.push(Row::new([Cell::from(line)]));
        }
        rows
    }

    fn render_scrollbar(
        area: Rect,
        buf: &mut Buffer,
        offset: usize,
        inner_height: usize,
        scroll_rows: usize,
    ) {
        let scroll_len = scroll_rows.saturating_add(1);
        let mut scrollbar_state = ScrollbarState::new(scroll_len)
            .position(offset.min(scroll_len.saturating_sub(1)))
            .viewport_content_length(inner_height);
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .render(area, buf, &mut scrollbar_state);
    }
}

impl<T, M, L> StatefulWidget for CollectionView<'_, T, M, L>
where
    T: TreeItem,
    L: LabelProvider<T>,
{
    type State = TableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let visible = self.collection.visible_indices();
        if let Some(selected) = state.selected()
            && selected >= visible.len()
        {
            state.select(visible.len().checked_sub(1));
        }

        let mut block = Block::default().borders(self.style.borders);
        if let Some(title) = self.style.title.clone() {
            block = block.title(title);
        }
        block = block
            .style(self.style.block_style)
            .border_style(self.style.border_style);

        let inner_height = usize::from(block.inner(area).height);
        let scroll_rows = visible.len().saturating_sub(inner_height);
        let rows = self.build_rows(&visible);

        let (table_area, block, scrollbar_area) = if scroll_rows > 0 && area.width > 0 {
            let table_area = Rect {
                width: area.width.saturating_sub(1),
                ..area
            };
            let scrollbar_area = Rect {
                x: area.x + area.width - 1,
                y: area.y,
                width: 1,
                height: area.height,
            };
            let mut borders = self.style.borders;
            borders.remove(Borders::RIGHT);
            (table_area, block.borders(borders), Some(scrollbar_area))
        } else {
            (area, block, None)
        };

        let table = Table::new(rows, [Constraint::Percentage(100)])
            .style(self.style.block_style)
            .block(block)
            .row_highlight_style(self.style.highlight_style)
            .highlight_symbol(self.style.highlight_symbol);
        table.render(table_area, buf, state);

        if let Some(scrollbar_area) = scrollbar_area {
            Self::render_scrollbar(scrollbar_area, buf, state.offset(), inner_height, scroll_rows);
        }
    }
}
