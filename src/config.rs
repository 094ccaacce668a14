use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Env, Target};
use log::LevelFilter;

/// Terminal choropleth of global whale catches
#[derive(Parser, Debug, Clone)]
#[command(name = "whaling-map", version, about)]
pub struct Cli {
    /// Preprocessed catches dataset (JSON)
    #[arg(long, default_value = "data/whaling_data.json")]
    pub data: PathBuf,

    /// World outline (TopoJSON with objects.countries, or GeoJSON)
    #[arg(long, default_value = "data/countries-110m.json")]
    pub map: PathBuf,

    /// Year to show first; clamped to the dataset's range
    #[arg(long)]
    pub year: Option<i32>,

    /// Give up on the map outline after this many milliseconds
    #[arg(long, default_value_t = 5000)]
    pub map_timeout_ms: u64,

    /// Quiet window before the map is rebuilt after a resize
    #[arg(long, default_value_t = 250)]
    pub resize_debounce_ms: u64,

    /// Write logs here (RUST_LOG picks the level). Logging is off otherwise.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Runtime settings derived from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_path: PathBuf,
    pub map_path: PathBuf,
    pub initial_year: Option<i32>,
    pub map_timeout: Duration,
    pub resize_debounce: Duration,
    pub log_file: Option<PathBuf>,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Self {
            data_path: cli.data,
            map_path: cli.map,
            initial_year: cli.year,
            map_timeout: Duration::from_millis(cli.map_timeout_ms),
            resize_debounce: Duration::from_millis(cli.resize_debounce_ms),
            log_file: cli.log_file,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Cli::parse_from(["whaling-map"]).into()
    }
}

/// Send logs to `path`, or switch them off. The terminal is in raw mode
/// while the app runs, so nothing is ever written to stderr.
pub fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        log::set_max_level(LevelFilter::Off);
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialized")?;
    Ok(())
}
