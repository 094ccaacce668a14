use std::collections::HashMap;

/// Spatial index over shape bounding boxes.
/// Each shape is inserted into every cell its bbox overlaps, so a lookup
/// never misses a shape but may return ones that don't contain the point
/// (the caller runs the exact point-in-polygon test).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from (min_lon, min_lat, max_lon, max_lat) boxes; the index of
    /// each box is what queries return
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self {
            cells: HashMap::new(),
            cell_size,
        };
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            if !(min_lon <= max_lon && min_lat <= max_lat) {
                continue; // empty shape
            }
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate shapes whose bbox cell covers the point
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
