//! SVG rendering of the report figures (plotters).

pub mod charts;
pub mod svg;

pub use charts::*;
pub use svg::{DrawResult, FIGURE_SIZE, draw_svg};
