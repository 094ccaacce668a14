pub mod color;
mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use geometry::{draw_line, draw_polyline};
pub use projection::Viewport;
pub use renderer::{highlight_mask, shape_fills, ChoroplethMap, Fill};
