use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::Borders;

/// Visual settings of [`crate::CollectionView`].
#[derive(Clone)]
pub struct CollectionViewStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    pub highlight_style: Style,
    /// Style of labels that directly match the active search.
    pub match_style: Style,
    pub highlight_symbol: &'a str,
    pub borders: Borders,
}

impl Default for CollectionViewStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            highlight_style: Style::default(),
            match_style: Style::default(),
            highlight_symbol: ">> ",
            borders: Borders::ALL,
        }
    }
}
