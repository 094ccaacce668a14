use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading the dataset or the map outline.
///
/// Dataset errors are fatal for the session; outline errors only
/// degrade the map panel to a placeholder.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: simd_json::Error,
    },

    #[error("malformed GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("dataset is missing top-level key `{0}`")]
    MissingKey(&'static str),

    #[error("dataset lists no years")]
    NoYears,

    #[error("map outline has no `objects.countries` collection")]
    NoCountries,

    #[error("map outline contains no drawable country shapes")]
    EmptyOutline,

    #[error("map outline did not load within {0:?}")]
    Timeout(Duration),

    #[error("map outline loader stopped unexpectedly")]
    LoaderGone,
}

pub type LoadResult<T> = Result<T, LoadError>;
