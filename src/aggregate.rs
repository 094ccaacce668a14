use std::collections::{BTreeSet, HashMap};

use crate::data::{AliasMap, Dataset};

/// Species codes to count. Empty means every species.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesFilter(BTreeSet<String>);

impl SpeciesFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    /// Add the code if absent, remove it if present
    pub fn toggle(&mut self, code: &str) {
        if !self.0.remove(code) {
            self.0.insert(code.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Count matching catches given a record's total and per-species counts.
    /// Species missing from `species` count as zero.
    pub fn count(&self, total: u64, species: &HashMap<String, u64>) -> u64 {
        if self.is_all() {
            total
        } else {
            self.0.iter().filter_map(|code| species.get(code)).sum()
        }
    }
}

/// Per-country totals for one year
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearAggregate {
    /// Country code -> catches. Countries with zero matching catches are absent.
    pub per_country: HashMap<String, u64>,
    pub total: u64,
}

impl YearAggregate {
    /// Upper bound of the color scale domain
    pub fn max_value(&self) -> u64 {
        self.per_country.values().copied().max().unwrap_or(0)
    }
}

/// What the tooltip shows for a hovered country
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryBreakdown {
    pub display_name: String,
    pub year: i32,
    pub total: u64,
    /// (species name, count), largest first
    pub species: Vec<(String, u64)>,
}

/// Filtering and aggregation over an immutable dataset
#[derive(Clone, Copy)]
pub struct Aggregator<'a> {
    dataset: &'a Dataset,
    aliases: &'a AliasMap,
}

impl<'a> Aggregator<'a> {
    pub fn new(dataset: &'a Dataset, aliases: &'a AliasMap) -> Self {
        Self { dataset, aliases }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Per-country totals for `year`, visiting only that year's records.
    /// Out-of-range years are clamped.
    pub fn aggregate_for_year(&self, year: i32, filter: &SpeciesFilter) -> YearAggregate {
        let year = self.dataset.clamp_year(year);
        let mut per_country: HashMap<String, u64> = HashMap::new();
        for entry in self.dataset.entries_for_year(year) {
            let count = filter.count(entry.total, &entry.species);
            if count > 0 {
                *per_country.entry(entry.code.clone()).or_default() += count;
            }
        }
        let total = per_country.values().sum();
        YearAggregate { per_country, total }
    }

    /// Value to paint for a map shape. A territory only inherits its
    /// governing country's figure when it has no record of its own.
    pub fn resolve_display_value(&self, code: &str, per_country: &HashMap<String, u64>) -> u64 {
        if let Some(&value) = per_country.get(code) {
            return value;
        }
        match self.aliases.governing(code) {
            Some(parent) => per_country.get(parent).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// One entry per dataset year, summing the code's whole alias group
    pub fn country_time_series(&self, code: &str, filter: &SpeciesFilter) -> Vec<(i32, u64)> {
        let group = self.aliases.group(code);
        let mut by_year: HashMap<i32, u64> = HashMap::new();
        for entry in &self.dataset.by_country_year {
            if group.iter().any(|c| *c == entry.code) {
                *by_year.entry(entry.year).or_default() += filter.count(entry.total, &entry.species);
            }
        }
        self.dataset
            .years
            .iter()
            .map(|&year| (year, by_year.get(&year).copied().unwrap_or(0)))
            .collect()
    }

    /// Global catches for one year from the timeline
    pub fn year_total(&self, year: i32, filter: &SpeciesFilter) -> u64 {
        let year = self.dataset.clamp_year(year);
        self.dataset
            .timeline_entry(year)
            .map(|entry| filter.count(entry.total, &entry.species))
            .unwrap_or(0)
    }

    /// Global curve: one entry per dataset year
    pub fn global_series(&self, filter: &SpeciesFilter) -> Vec<(i32, u64)> {
        self.dataset
            .years
            .iter()
            .map(|&year| (year, self.year_total(year, filter)))
            .collect()
    }

    /// Tooltip content for `code` and its alias group in `year`.
    /// `fallback_name` is used when the group has no record that year.
    pub fn country_breakdown(
        &self,
        code: &str,
        year: i32,
        filter: &SpeciesFilter,
        fallback_name: Option<&str>,
    ) -> CountryBreakdown {
        let year = self.dataset.clamp_year(year);
        let group = self.aliases.group(code);

        let mut names: Vec<&str> = Vec::new();
        let mut total = 0;
        let mut per_species: HashMap<&str, u64> = HashMap::new();
        for entry in self.dataset.entries_for_year(year) {
            if !group.iter().any(|c| *c == entry.code) {
                continue;
            }
            if !names.contains(&entry.country.as_str()) {
                names.push(&entry.country);
            }
            total += filter.count(entry.total, &entry.species);
            for (species, &count) in &entry.species {
                if filter.is_all() || filter.contains(species) {
                    *per_species.entry(species.as_str()).or_default() += count;
                }
            }
        }

        let display_name = if names.is_empty() {
            fallback_name.unwrap_or(code).to_string()
        } else {
            names.join(" / ")
        };

        let catalog = &self.dataset.species;
        let mut species: Vec<(&str, u64)> = per_species.into_iter().filter(|(_, n)| *n > 0).collect();
        species.sort_by_key(|(code, count)| (std::cmp::Reverse(*count), catalog.position(code).unwrap_or(usize::MAX)));

        CountryBreakdown {
            display_name,
            year,
            total,
            species: species
                .into_iter()
                .map(|(code, count)| (catalog.name_of(code).to_string(), count))
                .collect(),
        }
    }
}
