mod alias;
mod dataset;
mod iso;
mod outline;

pub use alias::{AliasMap, ALIASES};
pub use dataset::{
    load_dataset, CountryYearEntry, Dataset, Species, SpeciesCatalog, TimelineEntry,
};
pub use outline::{load_outline, load_outline_with_timeout, parse_outline, CountryShape, MapOutline, Ring};
