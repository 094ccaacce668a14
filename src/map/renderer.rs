use std::sync::Arc;

use glam::DVec2;
use ratatui::style::Color;
use rayon::prelude::*;

use crate::aggregate::{Aggregator, YearAggregate};
use crate::braille::BrailleCanvas;
use crate::data::{AliasMap, CountryShape, MapOutline, Ring};
use crate::map::color::ColorScale;
use crate::map::geometry::draw_line;
use crate::map::projection::Viewport;
use crate::map::spatial::FeatureGrid;

/// Bounding-box grid resolution in degrees
const GRID_CELL_DEGREES: f64 = 10.0;

/// How one shape is painted for the current aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// No catches, or the shape has no country code
    NoData,
    Value { value: u64, color: Color },
}

/// A choropleth rasterized for one panel size.
///
/// Built once per panel size and rebuilt from scratch on resize. The
/// interaction controller hit-tests against this handle.
pub struct ChoroplethMap {
    outline: Arc<MapOutline>,
    cols: usize,
    rows: usize,
    /// Shape index covering each character cell (row-major)
    owners: Vec<Option<u32>>,
    /// Country borders
    borders: BrailleCanvas,
}

impl ChoroplethMap {
    /// Rasterize `outline` into a `cols` x `rows` character panel
    pub fn build(outline: Arc<MapOutline>, cols: usize, rows: usize) -> Self {
        let viewport = Viewport::fit_world(cols * 2, rows * 4);
        let grid = FeatureGrid::build(outline.shapes.iter().map(|s| s.bbox), GRID_CELL_DEGREES);

        let mut owners = vec![None; cols * rows];
        if cols > 0 {
            let shapes = &outline.shapes;
            owners.par_chunks_mut(cols).enumerate().for_each(|(row, line)| {
                for (col, owner) in line.iter_mut().enumerate() {
                    // Sample the cell center (each cell is 2x4 braille pixels)
                    let (lon, lat) = viewport.unproject(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0);
                    let point = DVec2::new(lon, lat);
                    *owner = grid
                        .query_point(lon, lat)
                        .iter()
                        .copied()
                        .find(|&idx| shapes[idx].contains(point))
                        .map(|idx| idx as u32);
                }
            });
        }

        let mut borders = BrailleCanvas::new(cols, rows);
        for ring in outline.shapes.iter().flat_map(|s| s.rings.iter()) {
            draw_ring(&mut borders, ring, &viewport);
        }

        log::debug!("rebuilt choropleth for {cols}x{rows} cells");
        Self {
            outline,
            cols,
            rows,
            owners,
            borders,
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn outline(&self) -> &MapOutline {
        &self.outline
    }

    /// Index of the shape covering a panel cell
    pub fn owner(&self, col: usize, row: usize) -> Option<usize> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.owners[row * self.cols + col].map(|idx| idx as usize)
    }

    /// Shape under a panel cell, if any
    pub fn shape_at(&self, col: usize, row: usize) -> Option<&CountryShape> {
        self.owner(col, row).map(|idx| &self.outline.shapes[idx])
    }

    /// Border glyph for a panel cell
    pub fn border_glyph(&self, col: usize, row: usize) -> Option<char> {
        self.borders.glyph(col, row)
    }
}

/// Stroke a ring, skipping segments that wrap across the antimeridian
fn draw_ring(canvas: &mut BrailleCanvas, ring: &Ring, viewport: &Viewport) {
    if ring.len() < 2 {
        return;
    }
    let mut prev: Option<(i32, i32)> = None;
    for p in ring {
        let (px, py) = viewport.project(p.x, p.y);
        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width / 2 && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}

/// One fill per shape for the given aggregation. The color domain is
/// `[0, largest per-country total]`, recomputed on every call.
pub fn shape_fills(outline: &MapOutline, aggregator: &Aggregator, aggregate: &YearAggregate) -> Vec<Fill> {
    let scale = ColorScale::new(aggregate.max_value());
    outline
        .shapes
        .iter()
        .map(|shape| {
            let Some(code) = shape.code.as_deref() else {
                return Fill::NoData;
            };
            match aggregator.resolve_display_value(code, &aggregate.per_country) {
                0 => Fill::NoData,
                value => Fill::Value {
                    value,
                    color: scale.color(value),
                },
            }
        })
        .collect()
}

/// Shapes belonging to the hovered country's alias group
pub fn highlight_mask(outline: &MapOutline, hovered: Option<&str>, aliases: &AliasMap) -> Vec<bool> {
    outline
        .shapes
        .iter()
        .map(|shape| match (hovered, shape.code.as_deref()) {
            (Some(hovered), Some(code)) => aliases.related(hovered, code),
            _ => false,
        })
        .collect()
}
