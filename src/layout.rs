use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};

use crate::data::SpeciesCatalog;

/// Label shown on the reset button
pub const ALL_SPECIES: &str = "All Species";
/// Header button that opens the About panel
pub const ABOUT_LABEL: &str = "[About]";
/// Columns reserved left of the timeline plot for the vertical axis label
const AXIS_WIDTH: u16 = 8;
/// Upper bound on filter rows when measuring the button flow
const MAX_FILTER_ROWS: u16 = 64;
const TIMELINE_HEIGHT: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    All,
    /// Index into the species catalog
    Species(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButton {
    pub rect: Rect,
    pub target: FilterTarget,
    pub label: String,
}

/// Where every part of the screen sits. Drawing and mouse hit-testing
/// both use this so they can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    pub area: Rect,
    pub header: Rect,
    pub about_button: Rect,
    pub filters: Rect,
    pub buttons: Vec<FilterButton>,
    /// Timeline block including its border
    pub timeline: Rect,
    /// Axis label column left of the plot
    pub timeline_axis: Rect,
    pub timeline_plot: Rect,
    /// Row under the plot holding the scrubber handle
    pub timeline_handle: Rect,
    /// Map block including its border
    pub map: Rect,
    pub map_inner: Rect,
    pub legend: Rect,
    pub status: Rect,
}

impl ScreenLayout {
    pub fn compute(area: Rect, species: &SpeciesCatalog) -> Self {
        let filter_rows = filter_rows(area.width, species);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),               // Header
                Constraint::Length(filter_rows),     // Species toggles
                Constraint::Length(TIMELINE_HEIGHT), // Timeline
                Constraint::Min(3),                  // Map
                Constraint::Length(1),               // Legend and stats
                Constraint::Length(1),               // Status bar
            ])
            .split(area);

        let header = chunks[0];
        let about_width = (ABOUT_LABEL.len() as u16).min(header.width);
        let about_button = Rect::new(header.right().saturating_sub(about_width), header.y, about_width, header.height);

        let timeline = chunks[2];
        let timeline_inner = inner(timeline);
        let axis_width = AXIS_WIDTH.min(timeline_inner.width);
        let plot_height = timeline_inner.height.saturating_sub(1);
        let timeline_axis = Rect::new(timeline_inner.x, timeline_inner.y, axis_width, plot_height);
        let timeline_plot = Rect::new(
            timeline_inner.x + axis_width,
            timeline_inner.y,
            timeline_inner.width - axis_width,
            plot_height,
        );
        let timeline_handle = Rect::new(
            timeline_plot.x,
            timeline_plot.bottom(),
            timeline_plot.width,
            timeline_inner.height.min(1),
        );

        let map = chunks[3];
        Self {
            area,
            header,
            about_button,
            filters: chunks[1],
            buttons: layout_buttons(chunks[1], species),
            timeline,
            timeline_axis,
            timeline_plot,
            timeline_handle,
            map,
            map_inner: inner(map),
            legend: chunks[4],
            status: chunks[5],
        }
    }

    pub fn button_at(&self, col: u16, row: u16) -> Option<FilterTarget> {
        self.buttons
            .iter()
            .find(|b| b.rect.contains(Position::new(col, row)))
            .map(|b| b.target)
    }

    /// Plot or handle row: anywhere a press starts a scrub
    pub fn on_timeline_surface(&self, col: u16, row: u16) -> bool {
        let pos = Position::new(col, row);
        self.timeline_plot.contains(pos) || self.timeline_handle.contains(pos)
    }

    /// Map-panel cell under a screen position
    pub fn map_cell(&self, col: u16, row: u16) -> Option<(usize, usize)> {
        self.map_inner
            .contains(Position::new(col, row))
            .then(|| ((col - self.map_inner.x) as usize, (row - self.map_inner.y) as usize))
    }

    pub fn on_about_button(&self, col: u16, row: u16) -> bool {
        self.about_button.contains(Position::new(col, row))
    }
}

/// Area inside a one-cell border
fn inner(rect: Rect) -> Rect {
    Rect::new(
        rect.x.saturating_add(1),
        rect.y.saturating_add(1),
        rect.width.saturating_sub(2),
        rect.height.saturating_sub(2),
    )
}

/// Rows the button flow needs at `width`, so every species gets a toggle
fn filter_rows(width: u16, species: &SpeciesCatalog) -> u16 {
    layout_buttons(Rect::new(0, 0, width, MAX_FILTER_ROWS), species)
        .last()
        .map_or(1, |b| b.rect.y + 1)
}

/// Flow the toggle buttons left to right, wrapping onto the next row.
/// Labels wider than the area are cut; buttons past the last row are left out.
fn layout_buttons(area: Rect, species: &SpeciesCatalog) -> Vec<FilterButton> {
    let labels = std::iter::once((FilterTarget::All, ALL_SPECIES.to_string())).chain(
        species
            .iter()
            .enumerate()
            .map(|(idx, s)| (FilterTarget::Species(idx), s.name.clone())),
    );

    let mut buttons = Vec::new();
    let (mut x, mut y) = (area.x, area.y);
    for (target, label) in labels {
        let width = (label.chars().count() as u16 + 2).min(area.width);
        if x > area.x && x + width > area.right() {
            x = area.x;
            y += 1;
        }
        if y >= area.bottom() || width == 0 {
            break;
        }
        buttons.push(FilterButton {
            rect: Rect::new(x, y, width, 1),
            target,
            label,
        });
        x += width + 1;
    }
    buttons
}

/// Centered panel for the About overlay
pub fn about_panel(area: Rect) -> Rect {
    let width = 64.min(area.width);
    let height = 16.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
