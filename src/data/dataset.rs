use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{LoadError, LoadResult};

/// One whale species as listed in the dataset metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    pub code: String,
    pub name: String,
}

/// Species in the order the dataset lists them (also the filter button order)
#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog(Vec<Species>);

impl SpeciesCatalog {
    pub fn new(entries: Vec<Species>) -> Self {
        Self(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Species> {
        self.0.get(idx)
    }

    /// Display position of a species code, used to break ties when sorting
    pub fn position(&self, code: &str) -> Option<usize> {
        self.0.iter().position(|s| s.code == code)
    }

    pub fn name_of<'a>(&'a self, code: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.name.as_str())
            .unwrap_or(code)
    }
}

// A plain HashMap would lose the document order of the species object.
impl<'de> Deserialize<'de> for SpeciesCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = SpeciesCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of species code to species name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((code, name)) = map.next_entry::<String, String>()? {
                    entries.push(Species { code, name });
                }
                Ok(SpeciesCatalog(entries))
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

/// Globally aggregated catches for one year
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEntry {
    pub year: i32,
    pub total: u64,
    /// Per-species counts, flattened next to `year` and `total` in the JSON
    #[serde(flatten)]
    pub species: HashMap<String, u64>,
}

/// Catches of one country in one year
#[derive(Debug, Clone, Deserialize)]
pub struct CountryYearEntry {
    pub year: i32,
    /// Display name as recorded by the source (e.g. "USSR")
    pub country: String,
    /// ISO 3166-1 alpha-3 code
    pub code: String,
    pub total: u64,
    #[serde(default)]
    pub species: HashMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    years: Vec<i32>,
    #[serde(default)]
    countries: Vec<String>,
    #[serde(default)]
    species: SpeciesCatalog,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    metadata: Option<RawMetadata>,
    timeline: Option<Vec<TimelineEntry>>,
    #[serde(rename = "byCountryYear")]
    by_country_year: Option<Vec<CountryYearEntry>>,
}

/// The whaling dataset, immutable once loaded
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: String,
    pub url: String,
    pub years: Vec<i32>,
    pub countries: Vec<String>,
    pub species: SpeciesCatalog,
    pub timeline: Vec<TimelineEntry>,
    pub by_country_year: Vec<CountryYearEntry>,
    /// Indices into `by_country_year`, grouped by year
    by_year: HashMap<i32, Vec<usize>>,
    /// Index into `timeline` for each year
    timeline_by_year: HashMap<i32, usize>,
}

impl Dataset {
    /// Build a dataset and its lookup indices. Years are sorted and deduplicated.
    pub fn new(
        mut years: Vec<i32>,
        species: SpeciesCatalog,
        timeline: Vec<TimelineEntry>,
        by_country_year: Vec<CountryYearEntry>,
    ) -> LoadResult<Self> {
        years.sort_unstable();
        years.dedup();
        if years.is_empty() {
            return Err(LoadError::NoYears);
        }

        let mut by_year: HashMap<i32, Vec<usize>> = HashMap::new();
        for (idx, entry) in by_country_year.iter().enumerate() {
            by_year.entry(entry.year).or_default().push(idx);
        }

        let timeline_by_year = timeline
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.year, idx))
            .collect();

        Ok(Self {
            source: String::new(),
            url: String::new(),
            years,
            countries: Vec::new(),
            species,
            timeline,
            by_country_year,
            by_year,
            timeline_by_year,
        })
    }

    /// Parse the preprocessed dataset JSON. `origin` is only used in error messages.
    pub fn from_slice(origin: &Path, bytes: &mut [u8]) -> LoadResult<Self> {
        let raw: RawDataset = simd_json::serde::from_slice(bytes).map_err(|source| LoadError::Json {
            path: origin.to_path_buf(),
            source,
        })?;

        let metadata = raw.metadata.ok_or(LoadError::MissingKey("metadata"))?;
        let timeline = raw.timeline.ok_or(LoadError::MissingKey("timeline"))?;
        let by_country_year = raw
            .by_country_year
            .ok_or(LoadError::MissingKey("byCountryYear"))?;

        let mut dataset = Self::new(metadata.years, metadata.species, timeline, by_country_year)?;
        dataset.source = metadata.source;
        dataset.url = metadata.url;
        dataset.countries = metadata.countries;
        Ok(dataset)
    }

    pub fn first_year(&self) -> i32 {
        self.years[0]
    }

    pub fn last_year(&self) -> i32 {
        self.years[self.years.len() - 1]
    }

    /// Clamp a year into the dataset's range
    pub fn clamp_year(&self, year: i32) -> i32 {
        year.clamp(self.first_year(), self.last_year())
    }

    /// Country-year entries recorded for `year`
    pub fn entries_for_year(&self, year: i32) -> impl Iterator<Item = &CountryYearEntry> {
        self.by_year
            .get(&year)
            .into_iter()
            .flatten()
            .map(|&idx| &self.by_country_year[idx])
    }

    pub fn timeline_entry(&self, year: i32) -> Option<&TimelineEntry> {
        self.timeline_by_year.get(&year).map(|&idx| &self.timeline[idx])
    }
}

/// Read and parse the dataset file. Any failure here is fatal for the session.
pub fn load_dataset(path: &Path) -> LoadResult<Dataset> {
    let mut bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = Dataset::from_slice(path, &mut bytes)?;
    log::info!(
        "loaded dataset {}: {} years ({}-{}), {} species, {} country-year records",
        path.display(),
        dataset.years.len(),
        dataset.first_year(),
        dataset.last_year(),
        dataset.species.len(),
        dataset.by_country_year.len()
    );
    Ok(dataset)
}
