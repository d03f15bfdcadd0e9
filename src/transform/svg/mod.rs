//! SVG stages: usvg normalization and component conversion.

mod component;
mod optimize;

pub use component::{DefaultUrl, component_module, parse_svg};
pub use optimize::optimize_svg;
