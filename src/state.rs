use crate::aggregate::SpeciesFilter;
use crate::data::Dataset;

/// What the user is looking at. Owned by the app and handed to renderers
/// as a read-only snapshot each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    current_year: i32,
    first_year: i32,
    last_year: i32,
    pub selected_species: SpeciesFilter,
    pub hovered_country: Option<String>,
}

impl ViewState {
    /// Start at `initial_year` (clamped) or the most recent year
    pub fn new(dataset: &Dataset, initial_year: Option<i32>) -> Self {
        let mut state = Self {
            current_year: dataset.last_year(),
            first_year: dataset.first_year(),
            last_year: dataset.last_year(),
            selected_species: SpeciesFilter::all(),
            hovered_country: None,
        };
        if let Some(year) = initial_year {
            state.set_year(year);
        }
        state
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn year_range(&self) -> (i32, i32) {
        (self.first_year, self.last_year)
    }

    /// Set the year, clamping silently. Returns true when it changed.
    pub fn set_year(&mut self, year: i32) -> bool {
        let year = year.clamp(self.first_year, self.last_year);
        let changed = year != self.current_year;
        self.current_year = year;
        changed
    }

    pub fn step_year(&mut self, delta: i32) -> bool {
        self.set_year(self.current_year.saturating_add(delta))
    }

    pub fn toggle_species(&mut self, code: &str) {
        self.selected_species.toggle(code);
    }

    /// The "All Species" button
    pub fn clear_species(&mut self) -> bool {
        let changed = !self.selected_species.is_all();
        self.selected_species.clear();
        changed
    }
}
