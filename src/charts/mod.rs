//! Charts module - Chart preparation and rendering

mod model;
mod plotter;
mod renderer;

pub use model::{prepare_chart, ChartData, ChartError, ChartKind, ChartRequest};
pub use plotter::ChartPlotter;
pub use renderer::ChartRenderer;
