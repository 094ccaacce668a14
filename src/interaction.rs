use ratatui::layout::Rect;

use crate::aggregate::{Aggregator, CountryBreakdown};
use crate::data::CountryShape;
use crate::state::ViewState;

/// Tooltip offset from the pointer (columns, rows)
const TOOLTIP_MARGIN: (u16, u16) = (2, 1);
/// Species rows listed before collapsing into "+N more"
const MAX_SPECIES_LINES: usize = 8;

/// Pointer interaction mode. Hover and timeline drag never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Hovering {
        code: String,
        /// Outline name, used when the country has no record this year
        name: Option<String>,
    },
    DraggingTimeline,
}

/// Keeps map hover, tooltip and timeline overlay consistent with the view state
#[derive(Debug)]
pub struct InteractionController {
    mode: Mode,
    pointer: (u16, u16),
    tooltip: Option<CountryBreakdown>,
    overlay: Option<Vec<(i32, u64)>>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            pointer: (0, 0),
            tooltip: None,
            overlay: None,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.mode == Mode::DraggingTimeline
    }

    pub fn tooltip(&self) -> Option<&CountryBreakdown> {
        self.tooltip.as_ref()
    }

    pub fn pointer(&self) -> (u16, u16) {
        self.pointer
    }

    /// Series for the timeline overlay, `None` when nothing is hovered
    pub fn overlay(&self) -> Option<&[(i32, u64)]> {
        self.overlay.as_deref()
    }

    /// Pointer moved over the map. `shape` is whatever lies under it.
    /// Shapes without a country code are not hover targets.
    pub fn hover(
        &mut self,
        state: &mut ViewState,
        aggregator: &Aggregator,
        shape: Option<&CountryShape>,
        pointer: (u16, u16),
    ) {
        if self.is_dragging() {
            return;
        }
        self.pointer = pointer;

        let Some(shape) = shape.filter(|s| s.code.is_some()) else {
            self.leave(state);
            return;
        };
        let code = shape.code.clone().unwrap_or_default();
        if matches!(&self.mode, Mode::Hovering { code: current, .. } if *current == code) {
            return;
        }

        log::debug!("hover enter {code}");
        state.hovered_country = Some(code.clone());
        self.mode = Mode::Hovering {
            code,
            name: shape.name.clone(),
        };
        self.refresh(state, aggregator);
    }

    /// Pointer left every country
    pub fn leave(&mut self, state: &mut ViewState) {
        if let Mode::Hovering { .. } = self.mode {
            self.mode = Mode::Idle;
        }
        state.hovered_country = None;
        self.tooltip = None;
        self.overlay = None;
    }

    /// A press on the timeline surface or handle. Any hover is dropped first.
    pub fn begin_drag(&mut self, state: &mut ViewState) {
        self.leave(state);
        self.mode = Mode::DraggingTimeline;
    }

    pub fn end_drag(&mut self) {
        if self.is_dragging() {
            self.mode = Mode::Idle;
        }
    }

    /// Rebuild tooltip and overlay after the year or species filter changed
    pub fn refresh(&mut self, state: &ViewState, aggregator: &Aggregator) {
        let Mode::Hovering { code, name } = &self.mode else {
            return;
        };
        let filter = &state.selected_species;
        self.tooltip = Some(aggregator.country_breakdown(code, state.current_year(), filter, name.as_deref()));
        self.overlay = Some(aggregator.country_time_series(code, filter));
    }
}

/// Group digits in threes: 12345 -> "12,345"
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Text rows of the tooltip body
pub fn tooltip_lines(breakdown: &CountryBreakdown) -> Vec<String> {
    let mut lines = vec![
        breakdown.display_name.clone(),
        format!("{}: {} whales", breakdown.year, format_count(breakdown.total)),
    ];
    if breakdown.species.is_empty() {
        lines.push("No recorded catches".to_string());
        return lines;
    }
    let name_width = breakdown
        .species
        .iter()
        .take(MAX_SPECIES_LINES)
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);
    for (name, count) in breakdown.species.iter().take(MAX_SPECIES_LINES) {
        lines.push(format!("{name:<name_width$}  {:>7}", format_count(*count)));
    }
    if breakdown.species.len() > MAX_SPECIES_LINES {
        lines.push(format!("+{} more", breakdown.species.len() - MAX_SPECIES_LINES));
    }
    lines
}

/// Place a `size` box next to the pointer, flipping to the other side of
/// the pointer when it would run past the right or bottom edge of `bounds`
pub fn place_tooltip(pointer: (u16, u16), size: (u16, u16), bounds: Rect) -> Rect {
    let width = size.0.min(bounds.width);
    let height = size.1.min(bounds.height);

    let place = |pos: u16, margin: u16, extent: u16, start: u16, end: u16| -> u16 {
        let after = pos.saturating_add(margin);
        if after.saturating_add(extent) <= end {
            after
        } else {
            pos.saturating_sub(margin.saturating_add(extent)).max(start)
        }
    };

    Rect::new(
        place(pointer.0, TOOLTIP_MARGIN.0, width, bounds.x, bounds.right()),
        place(pointer.1, TOOLTIP_MARGIN.1, height, bounds.y, bounds.bottom()),
        width,
        height,
    )
}
