use std::borrow::Cow;

use ratatui::text::{Line, Span};

use crate::context::RowContext;
use crate::model::NodeLabel;
use crate::tree::BranchState;

/// Indentation and toggle symbols for the 3-state branch affordance.
#[derive(Clone, Copy, Debug)]
pub struct ToggleGlyphs<'a> {
    pub indent: &'a str,
    pub leaf: &'a str,
    pub open: &'a str,
    pub partial: &'a str,
    pub closed: &'a str,
}

impl ToggleGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            indent: "  ",
            leaf: "•",
            open: "▼",
            partial: "▽",
            closed: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            indent: "  ",
            leaf: "*",
            open: "v",
            partial: "~",
            closed: ">",
        }
    }
}

impl<'a> ToggleGlyphs<'a> {
    /// Symbol for the given branch state.
    pub const fn toggle(&self, state: BranchState) -> &'a str {
        match state {
            BranchState::Leaf => self.leaf,
            BranchState::Closed => self.closed,
            BranchState::Partial => self.partial,
            BranchState::Open => self.open,
        }
    }
}

/// Supplies the display name of an item.
pub trait LabelProvider<T> {
    fn label<'a>(&'a self, item: &'a T) -> Cow<'a, str>;
}

/// Label provider for items implementing [`NodeLabel`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeLabels;

impl<T: NodeLabel> LabelProvider<T> for NodeLabels {
    fn label<'a>(&'a self, item: &'a T) -> Cow<'a, str> {
        Cow::Borrowed(item.label())
    }
}

/// Builds a row: indentation, toggle glyph, name, and the aggregated match count.
pub fn row_line<'a>(ctx: &RowContext, name: Cow<'a, str>, glyphs: &ToggleGlyphs<'a>) -> Line<'a> {
    let mut spans = Vec::with_capacity(ctx.depth + 4);
    for _ in 0..ctx.depth {
        spans.push(Span::raw(glyphs.indent));
    }
    spans.push(Span::raw(glyphs.toggle(ctx.state)));
    spans.push(Span::raw(" "));
    if ctx.is_match {
        spans.push(Span::styled(name, ctx.match_style));
    } else {
        spans.push(Span::raw(name));
    }
    if let Some(count) = ctx.match_count.filter(|&count| count > 0) {
        spans.push(Span::raw(format!(" ({count})")));
    }
    Line::from(spans)
}
