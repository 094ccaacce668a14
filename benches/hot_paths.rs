//! Hot paths of the whaling map: per-year aggregation, the per-country
//! series behind the hover overlay, and rasterizing the choropleth.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec2;
use whaling_map::aggregate::{Aggregator, SpeciesFilter};
use whaling_map::data::{CountryShape, CountryYearEntry, Dataset, MapOutline, Species, SpeciesCatalog, ALIASES};
use whaling_map::map::ChoroplethMap;

const SPECIES: [&str; 6] = ["Blue", "Fin", "Sei", "Hump", "Spm", "Min"];

fn synthetic_dataset(countries: usize, years: i32) -> Dataset {
    let catalog = SpeciesCatalog::new(
        SPECIES
            .iter()
            .map(|code| Species {
                code: code.to_string(),
                name: format!("{code} Whale"),
            })
            .collect(),
    );
    let mut records = Vec::new();
    for year in 1900..1900 + years {
        for c in 0..countries {
            let species: std::collections::HashMap<String, u64> = SPECIES
                .iter()
                .enumerate()
                .map(|(i, code)| (code.to_string(), ((c * 31 + i * 7 + year as usize) % 97) as u64))
                .collect();
            records.push(CountryYearEntry {
                year,
                country: format!("Country {c}"),
                code: format!("C{c:02}"),
                total: species.values().sum(),
                species,
            });
        }
    }
    Dataset::new((1900..1900 + years).collect(), catalog, Vec::new(), records).expect("synthetic dataset")
}

/// A grid of rectangular "countries" covering the fitted world
fn synthetic_outline() -> MapOutline {
    let mut shapes = Vec::new();
    for (row, lat) in (-50..80).step_by(10).enumerate() {
        for (col, lon) in (-180..180).step_by(15).enumerate() {
            let (lon, lat) = (lon as f64, lat as f64);
            let ring = vec![
                DVec2::new(lon, lat),
                DVec2::new(lon + 15.0, lat),
                DVec2::new(lon + 15.0, lat + 10.0),
                DVec2::new(lon, lat + 10.0),
            ];
            shapes.push(CountryShape::new(Some(format!("C{row}{col}")), None, vec![ring]));
        }
    }
    MapOutline { shapes }
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let dataset = synthetic_dataset(60, 120);
    let aggregator = Aggregator::new(&dataset, &ALIASES);
    let all = SpeciesFilter::all();
    let some = SpeciesFilter::only(["Fin", "Min"]);

    group.bench_function("aggregate_for_year_all", |b| {
        b.iter(|| aggregator.aggregate_for_year(black_box(1960), &all))
    });
    group.bench_function("aggregate_for_year_filtered", |b| {
        b.iter(|| aggregator.aggregate_for_year(black_box(1960), &some))
    });
    group.bench_function("country_time_series", |b| {
        b.iter(|| aggregator.country_time_series(black_box("C07"), &some))
    });

    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    let outline = Arc::new(synthetic_outline());

    for (cols, rows) in [(80usize, 24usize), (200, 60)] {
        group.bench_with_input(
            BenchmarkId::new("choropleth_build", format!("{cols}x{rows}")),
            &(cols, rows),
            |b, &(cols, rows)| b.iter(|| ChoroplethMap::build(Arc::clone(&outline), cols, rows)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_rasterize);
criterion_main!(benches);
