use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

use crate::aggregate::{Aggregator, YearAggregate};
use crate::config::Settings;
use crate::data::{Dataset, MapOutline, ALIASES};
use crate::debounce::Debouncer;
use crate::error::LoadResult;
use crate::interaction::InteractionController;
use crate::layout::{about_panel, FilterTarget, ScreenLayout};
use crate::map::{highlight_mask, shape_fills, ChoroplethMap, Fill};
use crate::state::ViewState;
use crate::timeline::YearScale;

/// Event loop tick (~60fps)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Everything derived from the view state that drawing needs
#[derive(Debug, Default)]
pub struct Snapshot {
    pub aggregate: YearAggregate,
    /// One fill per outline shape
    pub fills: Vec<Fill>,
    /// One flag per outline shape: part of the hovered alias group
    pub highlight: Vec<bool>,
    /// Global curve under the current species filter
    pub global: Vec<(i32, u64)>,
    pub year_total: u64,
}

/// Application state
pub struct App {
    pub dataset: Dataset,
    pub state: ViewState,
    pub interaction: InteractionController,
    pub layout: ScreenLayout,
    outline: Option<Arc<MapOutline>>,
    /// Rasterized choropleth for the current map panel size
    map: Option<ChoroplethMap>,
    /// Why the map panel shows a placeholder
    map_error: Option<String>,
    resize: Debouncer<(u16, u16)>,
    snapshot: Snapshot,
    /// Species button picked with Tab, toggled with Space
    focus: Option<usize>,
    pub show_about: bool,
    pub should_quit: bool,
}

impl App {
    /// `outline` failing only degrades the map panel
    pub fn new(dataset: Dataset, outline: LoadResult<MapOutline>, settings: &Settings, area: Rect) -> Self {
        let (outline, map_error) = match outline {
            Ok(outline) => (Some(Arc::new(outline)), None),
            Err(err) => {
                log::warn!("map unavailable: {err}");
                (None, Some(err.to_string()))
            }
        };

        let mut app = Self {
            state: ViewState::new(&dataset, settings.initial_year),
            layout: ScreenLayout::compute(area, &dataset.species),
            dataset,
            interaction: InteractionController::new(),
            outline,
            map: None,
            map_error,
            resize: Debouncer::new(settings.resize_debounce),
            snapshot: Snapshot::default(),
            focus: None,
            show_about: false,
            should_quit: false,
        };
        app.rebuild_map();
        app.refresh();
        app
    }

    pub fn map(&self) -> Option<&ChoroplethMap> {
        self.map.as_ref()
    }

    pub fn map_error(&self) -> Option<&str> {
        self.map_error.as_deref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Catalog index of the keyboard-focused species button
    pub fn focused_species(&self) -> Option<usize> {
        self.focus
    }

    /// Timeline scale for the current plot area
    pub fn year_scale(&self) -> YearScale {
        let plot = self.layout.timeline_plot;
        let (first, last) = self.state.year_range();
        YearScale::new(plot.x, plot.width, first, last)
    }

    /// How long the loop may wait for input before `tick` has work to do
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        self.resize
            .time_until_due(now)
            .map_or(FRAME_INTERVAL, |wait| wait.min(FRAME_INTERVAL))
    }

    /// Run work whose time has come
    pub fn tick(&mut self, now: Instant) {
        if let Some((width, height)) = self.resize.take_due(now) {
            log::debug!("terminal settled at {width}x{height}");
            self.rebuild_map();
        }
    }

    /// The layout follows the terminal at once; the raster waits for the
    /// resize to settle
    pub fn resize(&mut self, now: Instant, width: u16, height: u16) {
        self.layout = ScreenLayout::compute(Rect::new(0, 0, width, height), &self.dataset.species);
        self.interaction.leave(&mut self.state);
        self.refresh_highlight();
        self.resize.schedule(now, (width, height));
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc if self.show_about => self.show_about = false,
            KeyCode::Esc => self.quit(),
            KeyCode::Char('?') | KeyCode::Char('i') => self.toggle_about(),
            _ if self.show_about => {}
            KeyCode::Left | KeyCode::Char('h') => self.step_year(-1),
            KeyCode::Right | KeyCode::Char('l') => self.step_year(1),
            KeyCode::Home => self.set_year(self.dataset.first_year()),
            KeyCode::End => self.set_year(self.dataset.last_year()),
            KeyCode::Char('a') | KeyCode::Char('0') => self.apply_filter(FilterTarget::All),
            KeyCode::Char(c @ '1'..='9') => self.apply_filter(FilterTarget::Species(c as usize - '1' as usize)),
            KeyCode::Tab => self.move_focus(1),
            KeyCode::BackTab => self.move_focus(-1),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(idx) = self.focus {
                    self.apply_filter(FilterTarget::Species(idx));
                }
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let (col, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.press(col, row),
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.interaction.is_dragging() {
                    self.scrub_to(col);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.interaction.end_drag(),
            MouseEventKind::Moved => self.pointer_moved(col, row),
            _ => {}
        }
    }

    /// Cycle the focused species button, wrapping at both ends
    fn move_focus(&mut self, delta: isize) {
        let count = self.dataset.species.len();
        if count == 0 {
            return;
        }
        let next = match self.focus {
            Some(idx) => (idx as isize + delta).rem_euclid(count as isize) as usize,
            None if delta < 0 => count - 1,
            None => 0,
        };
        self.focus = Some(next);
    }

    fn press(&mut self, col: u16, row: u16) {
        if self.show_about {
            if !about_panel(self.layout.area).contains(Position::new(col, row)) {
                self.show_about = false;
            }
            return;
        }
        if self.layout.on_about_button(col, row) {
            self.toggle_about();
        } else if let Some(target) = self.layout.button_at(col, row) {
            self.apply_filter(target);
        } else if self.layout.on_timeline_surface(col, row) {
            self.interaction.begin_drag(&mut self.state);
            self.refresh_highlight();
            self.scrub_to(col);
        }
    }

    fn pointer_moved(&mut self, col: u16, row: u16) {
        // The raster still has the old panel size until the rebuild runs
        if self.show_about || self.resize.is_pending() {
            return;
        }
        let shape = self
            .layout
            .map_cell(col, row)
            .and_then(|(c, r)| self.map.as_ref()?.shape_at(c, r));
        let aggregator = Aggregator::new(&self.dataset, &ALIASES);
        let before = self.state.hovered_country.clone();
        self.interaction.hover(&mut self.state, &aggregator, shape, (col, row));
        if self.state.hovered_country != before {
            self.refresh_highlight();
        }
    }

    fn toggle_about(&mut self) {
        self.show_about = !self.show_about;
        if self.show_about {
            self.interaction.leave(&mut self.state);
            self.refresh_highlight();
        }
    }

    /// Move the year to whatever sits under `column`. Columns outside the
    /// plot are ignored.
    pub fn scrub_to(&mut self, column: u16) {
        if let Some(year) = self.year_scale().year_at(column) {
            self.set_year(year);
        }
    }

    pub fn set_year(&mut self, year: i32) {
        if self.state.set_year(year) {
            log::debug!("year -> {}", self.state.current_year());
            self.refresh();
        }
    }

    pub fn step_year(&mut self, delta: i32) {
        if self.state.step_year(delta) {
            log::debug!("year -> {}", self.state.current_year());
            self.refresh();
        }
    }

    pub fn apply_filter(&mut self, target: FilterTarget) {
        match target {
            FilterTarget::All => {
                if !self.state.clear_species() {
                    return;
                }
            }
            FilterTarget::Species(idx) => {
                let Some(species) = self.dataset.species.get(idx) else {
                    return;
                };
                self.state.toggle_species(&species.code);
            }
        }
        log::debug!(
            "species filter -> [{}]",
            self.state.selected_species.iter().collect::<Vec<_>>().join(", ")
        );
        self.refresh();
    }

    /// Recompute fills, curve, stats and tooltip for the current view state
    fn refresh(&mut self) {
        let aggregator = Aggregator::new(&self.dataset, &ALIASES);
        let filter = &self.state.selected_species;
        let year = self.state.current_year();

        let aggregate = aggregator.aggregate_for_year(year, filter);
        self.snapshot.fills = match &self.outline {
            Some(outline) => shape_fills(outline, &aggregator, &aggregate),
            None => Vec::new(),
        };
        self.snapshot.aggregate = aggregate;
        self.snapshot.global = aggregator.global_series(filter);
        self.snapshot.year_total = aggregator.year_total(year, filter);

        self.interaction.refresh(&self.state, &aggregator);
        self.refresh_highlight();
    }

    fn refresh_highlight(&mut self) {
        self.snapshot.highlight = match &self.outline {
            Some(outline) => highlight_mask(outline, self.state.hovered_country.as_deref(), &ALIASES),
            None => Vec::new(),
        };
    }

    fn rebuild_map(&mut self) {
        let Some(outline) = &self.outline else {
            return;
        };
        let inner = self.layout.map_inner;
        self.map = Some(ChoroplethMap::build(
            Arc::clone(outline),
            inner.width as usize,
            inner.height as usize,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountryShape, CountryYearEntry, Species, SpeciesCatalog};
    use crate::error::LoadError;
    use crate::interaction::Mode;
    use crossterm::event::KeyModifiers;
    use glam::DVec2;

    const AREA: Rect = Rect::new(0, 0, 100, 40);
    /// Center of the map panel for `AREA`
    const MAP_CENTER: (u16, u16) = (50, 25);

    fn dataset() -> Dataset {
        let species = SpeciesCatalog::new(vec![
            Species {
                code: "Fin".into(),
                name: "Fin Whale".into(),
            },
            Species {
                code: "Min".into(),
                name: "Common Minke".into(),
            },
        ]);
        let record = |year: i32, fin: u64, min: u64| CountryYearEntry {
            year,
            country: "Norway".into(),
            code: "NOR".into(),
            total: fin + min,
            species: [("Fin".to_string(), fin), ("Min".to_string(), min)].into_iter().collect(),
        };
        Dataset::new(
            vec![2000, 2001, 2002],
            species,
            Vec::new(),
            vec![record(2000, 10, 5), record(2001, 20, 0), record(2002, 1, 400)],
        )
        .unwrap()
    }

    fn outline() -> MapOutline {
        let ring = vec![
            DVec2::new(-170.0, -50.0),
            DVec2::new(170.0, -50.0),
            DVec2::new(170.0, 80.0),
            DVec2::new(-170.0, 80.0),
        ];
        MapOutline {
            shapes: vec![CountryShape::new(Some("NOR".into()), Some("Norway".into()), vec![ring])],
        }
    }

    fn app() -> App {
        App::new(dataset(), Ok(outline()), &Settings::default(), AREA)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_starts_on_last_year_with_full_snapshot() {
        let app = app();
        assert_eq!(app.state.current_year(), 2002);
        assert_eq!(app.snapshot().aggregate.total, 401);
        assert_eq!(app.snapshot().fills.len(), 1);
        assert_eq!(app.snapshot().global.len(), 3);
        assert!(app.map().is_some());
    }

    #[test]
    fn test_keys_step_and_jump() {
        let mut app = app();
        app.handle_key(KeyCode::Left);
        assert_eq!(app.state.current_year(), 2001);
        app.handle_key(KeyCode::Home);
        assert_eq!(app.state.current_year(), 2000);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.state.current_year(), 2000);
        app.handle_key(KeyCode::End);
        assert_eq!(app.snapshot().aggregate.total, 401);
    }

    #[test]
    fn test_species_keys_toggle_and_reset() {
        let mut app = app();
        app.handle_key(KeyCode::Char('1'));
        assert_eq!(app.snapshot().aggregate.total, 1);
        app.handle_key(KeyCode::Char('2'));
        assert_eq!(app.snapshot().aggregate.total, 401);
        app.handle_key(KeyCode::Char('9'));
        assert!(!app.state.selected_species.is_all());
        app.handle_key(KeyCode::Char('a'));
        assert!(app.state.selected_species.is_all());
    }

    #[test]
    fn test_filter_button_click() {
        let mut app = app();
        let fin = app
            .layout
            .buttons
            .iter()
            .find(|b| b.target == FilterTarget::Species(0))
            .map(|b| b.rect)
            .unwrap();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), fin.x, fin.y));
        assert!(app.state.selected_species.contains("Fin"));
        assert_eq!(app.snapshot().aggregate.total, 1);
    }

    #[test]
    fn test_timeline_drag_scrubs_and_ignores_outside_plot() {
        let mut app = app();
        let plot = app.layout.timeline_plot;
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), plot.x, plot.y));
        assert!(app.interaction.is_dragging());
        assert_eq!(app.state.current_year(), 2000);

        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), plot.right() - 1, plot.y));
        assert_eq!(app.state.current_year(), 2002);

        // Past the plot edge: ignored rather than clamped
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), plot.x - 1, plot.y));
        assert_eq!(app.state.current_year(), 2002);

        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), plot.x, plot.y));
        assert!(!app.interaction.is_dragging());
    }

    #[test]
    fn test_hover_highlights_and_press_on_timeline_clears_it() {
        let mut app = app();
        let (col, row) = MAP_CENTER;
        app.handle_mouse(mouse(MouseEventKind::Moved, col, row));
        assert_eq!(app.state.hovered_country.as_deref(), Some("NOR"));
        assert_eq!(app.snapshot().highlight, vec![true]);
        assert_eq!(app.interaction.tooltip().unwrap().total, 401);

        let plot = app.layout.timeline_plot;
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), plot.x, plot.y));
        assert_eq!(app.interaction.mode(), &Mode::DraggingTimeline);
        assert_eq!(app.state.hovered_country, None);
        assert_eq!(app.snapshot().highlight, vec![false]);
    }

    #[test]
    fn test_about_toggles_and_closes_on_backdrop() {
        let mut app = app();
        let button = app.layout.about_button;
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), button.x, button.y));
        assert!(app.show_about);

        // Keys other than close/quit are swallowed while open
        app.handle_key(KeyCode::Left);
        assert_eq!(app.state.current_year(), 2002);

        let panel = about_panel(AREA);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), panel.x + 1, panel.y + 1));
        assert!(app.show_about);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
        assert!(!app.show_about);

        app.handle_key(KeyCode::Char('?'));
        app.handle_key(KeyCode::Esc);
        assert!(!app.show_about);
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn test_resize_rebuilds_map_after_quiet_window() {
        let mut app = app();
        let start = Instant::now();
        assert_eq!(app.map().unwrap().size(), (98, 24));

        app.resize(start, 60, 30);
        app.resize(start + Duration::from_millis(100), 80, 30);
        assert_eq!(app.layout.area, Rect::new(0, 0, 80, 30));
        app.tick(start + Duration::from_millis(300));
        assert_eq!(app.map().unwrap().size(), (98, 24));

        app.tick(start + Duration::from_millis(350));
        let inner = app.layout.map_inner;
        assert_eq!(app.map().unwrap().size(), (inner.width as usize, inner.height as usize));
    }

    #[test]
    fn test_hover_waits_for_pending_rebuild() {
        let mut app = app();
        let start = Instant::now();
        app.resize(start, 100, 40);

        let (col, row) = MAP_CENTER;
        app.handle_mouse(mouse(MouseEventKind::Moved, col, row));
        assert_eq!(app.interaction.mode(), &Mode::Idle);
        assert_eq!(app.state.hovered_country, None);

        app.tick(start + Duration::from_millis(250));
        app.handle_mouse(mouse(MouseEventKind::Moved, col, row));
        assert_eq!(app.state.hovered_country.as_deref(), Some("NOR"));
    }

    #[test]
    fn test_tab_focus_reaches_every_species() {
        let mut app = app();
        assert_eq!(app.focused_species(), None);
        app.handle_key(KeyCode::Char(' '));
        assert!(app.state.selected_species.is_all());

        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focused_species(), Some(1));
        app.handle_key(KeyCode::Char(' '));
        assert!(app.state.selected_species.contains("Min"));
        assert_eq!(app.snapshot().aggregate.total, 400);

        // Wraps past the last species
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focused_species(), Some(0));
        app.handle_key(KeyCode::BackTab);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.focused_species(), Some(0));
        app.handle_key(KeyCode::Enter);
        assert!(app.state.selected_species.contains("Fin"));
        assert_eq!(app.snapshot().aggregate.total, 401);
    }

    #[cfg(unix)]
    #[test]
    fn test_outline_timeout_degrades_to_placeholder() {
        use crate::data::load_outline_with_timeout;

        // A FIFO with no writer blocks the loader's read forever
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("outline.json");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(status.success());

        let outline = load_outline_with_timeout(&fifo, Duration::from_millis(50));
        assert!(matches!(outline, Err(LoadError::Timeout(_))));

        let app = App::new(dataset(), outline, &Settings::default(), AREA);
        assert!(app.map().is_none());
        assert!(app.map_error().unwrap().contains("did not load"));
        assert!(app.snapshot().fills.is_empty());
        assert_eq!(app.snapshot().aggregate.total, 401);
    }

    #[test]
    fn test_poll_timeout_shrinks_for_pending_rebuild() {
        let mut app = app();
        let start = Instant::now();
        assert_eq!(app.poll_timeout(start), FRAME_INTERVAL);
        app.resize(start, 80, 30);
        assert_eq!(app.poll_timeout(start + Duration::from_millis(245)), Duration::from_millis(5));
    }

    #[test]
    fn test_missing_outline_degrades_map_only() {
        let mut app = App::new(dataset(), Err(LoadError::EmptyOutline), &Settings::default(), AREA);
        assert!(app.map().is_none());
        assert!(app.map_error().is_some());
        assert!(app.snapshot().fills.is_empty());

        let (col, row) = MAP_CENTER;
        app.handle_mouse(mouse(MouseEventKind::Moved, col, row));
        assert_eq!(app.interaction.mode(), &Mode::Idle);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.snapshot().year_total, 0);
        assert_eq!(app.snapshot().aggregate.total, 20);
    }
}
